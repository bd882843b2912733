use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use courier_engine::{DeliveryError, Engine, Transport};
use courier_store::{ContentStore, StoreConfig};
use courier_types::{DeliveryReceipt, InboundEvent, MessageId, OutboundContent, UserId};

/// Stand-in transport for running the engine without a chat backend: every
/// send is logged and acknowledged with a sequential message id, deletes are
/// logged. Swap in real messaging-SDK glue here to go live.
struct LogTransport {
    next_id: AtomicI64,
}

impl LogTransport {
    fn new() -> Self {
        LogTransport {
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn send(
        &self,
        recipient: UserId,
        content: OutboundContent,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match &content {
            OutboundContent::Text { text } => {
                info!(recipient, message_id, %text, "send");
            }
            OutboundContent::Media {
                kind,
                media_ref,
                caption,
            } => {
                info!(
                    recipient,
                    message_id,
                    kind = kind.as_str(),
                    media_ref,
                    caption = caption.as_deref().unwrap_or(""),
                    "send media"
                );
            }
        }
        Ok(DeliveryReceipt { message_id })
    }

    async fn delete(&self, recipient: UserId, message_id: MessageId) -> Result<(), DeliveryError> {
        info!(recipient, message_id, "delete");
        Ok(())
    }
}

/// One request per input line, JSON-encoded.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Submit(InboundEvent),
    View {
        viewer: UserId,
        key: String,
        #[serde(default)]
        trigger: Option<MessageId>,
    },
    CreateBatch {
        name: String,
        teacher: String,
        #[serde(default)]
        description: String,
        user: UserId,
    },
    DeleteBatch {
        name: String,
        user: UserId,
    },
    EditDescription {
        name: String,
        user: UserId,
        text: String,
    },
    EditTeacher {
        name: String,
        user: UserId,
        teacher: String,
    },
    SetBanner {
        name: String,
        user: UserId,
        media_ref: String,
    },
    Subscribe {
        user: UserId,
        batch: String,
    },
    Unsubscribe {
        user: UserId,
        batch: String,
    },
    Overview {
        batch: String,
    },
    Page {
        batch: String,
        #[serde(default)]
        page: usize,
    },
    ListBatches,
    Profile {
        user: UserId,
    },
    TopItems {
        #[serde(default = "default_limit")]
        limit: usize,
    },
    TopUsers {
        #[serde(default = "default_limit")]
        limit: usize,
    },
    SearchItems {
        query: String,
    },
    SearchBatches {
        query: String,
    },
    SearchTeacher {
        query: String,
    },
    SearchDate {
        batch: String,
        date: String,
    },
    Share {
        batch: String,
        user: UserId,
        name: String,
    },
    OpenShare {
        token: String,
    },
}

fn default_limit() -> usize {
    10
}

async fn dispatch(engine: &Engine, request: Request) -> String {
    let result = match request {
        Request::Submit(event) => engine.handle_inbound(event),
        Request::View { viewer, key, trigger } => engine
            .view_item(viewer, &key, trigger)
            .await
            .map(|ids| format!("Delivered; {} messages armed for retraction.", ids.len())),
        Request::CreateBatch {
            name,
            teacher,
            description,
            user,
        } => engine.create_batch(&name, &teacher, &description, user),
        Request::DeleteBatch { name, user } => engine.delete_batch(&name, user),
        Request::EditDescription { name, user, text } => {
            engine.edit_description(&name, user, &text)
        }
        Request::EditTeacher { name, user, teacher } => engine.edit_teacher(&name, user, &teacher),
        Request::SetBanner {
            name,
            user,
            media_ref,
        } => engine.set_banner(&name, user, &media_ref),
        Request::Subscribe { user, batch } => engine.subscribe(user, &batch),
        Request::Unsubscribe { user, batch } => engine.unsubscribe(user, &batch),
        Request::Overview { batch } => engine.batch_overview(&batch),
        Request::Page { batch, page } => engine.batch_page(&batch, page),
        Request::ListBatches => Ok(engine.list_batches()),
        Request::Profile { user } => Ok(engine.profile(user)),
        Request::TopItems { limit } => Ok(engine.top_items(limit)),
        Request::TopUsers { limit } => Ok(engine.top_users(limit)),
        Request::SearchItems { query } => Ok(engine.search_items(&query)),
        Request::SearchBatches { query } => Ok(engine.search_batches(&query)),
        Request::SearchTeacher { query } => Ok(engine.search_by_teacher(&query)),
        Request::SearchDate { batch, date } => engine.search_by_date(&batch, &date),
        Request::Share { batch, user, name } => engine.share_batch(&batch, user, &name),
        Request::OpenShare { token } => engine.open_share(&token),
    };
    result.unwrap_or_else(|e| e.user_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug".into()),
        )
        .init();

    // Config
    let data_dir = std::env::var("COURIER_DATA_DIR").unwrap_or_else(|_| "courier-data".into());

    // Shared state
    let store = Arc::new(ContentStore::open(StoreConfig::new(&data_dir)));
    let transport: Arc<dyn Transport> = Arc::new(LogTransport::new());
    let engine = Engine::new(store.clone(), transport);

    // Background flusher: sweeps up documents dirtied between requests.
    {
        let store = store.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(5));
            loop {
                tick.tick().await;
                let store = store.clone();
                tokio::task::spawn_blocking(move || store.flush_due());
            }
        });
    }

    info!(data_dir, "courier ready; one JSON request per line on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Request>(line) {
                    Ok(request) => println!("{}\n", dispatch(&engine, request).await),
                    Err(e) => {
                        warn!(error = %e, "unparseable request");
                        println!("Could not parse that request: {e}\n");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    // Final flush so nothing buffered in the debounce window is lost.
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.flush_all()).await?;
    Ok(())
}
