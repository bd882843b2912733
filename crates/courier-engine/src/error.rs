use thiserror::Error;

use courier_store::StoreError;

use crate::transport::DeliveryError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The synchronous send of a requested view failed. Background sends
    /// (fan-out, retraction) never surface here; they are logged in place.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl EngineError {
    /// Human-readable explanation with a recovery hint. Every user-facing
    /// failure ends up here so no fault leaves the user without a response;
    /// the transport layer attaches its own "go back" affordance.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Store(StoreError::NotFound) => {
                "That content is no longer available. Pick another item from the batch list.".into()
            }
            EngineError::Store(StoreError::BatchNotFound(name)) => {
                format!("Batch '{name}' was not found. Check the batch list for available names.")
            }
            EngineError::Store(StoreError::DuplicateBatch(name)) => {
                format!("Batch '{name}' already exists. Pick a different name.")
            }
            EngineError::Store(StoreError::Forbidden) => {
                "Only the batch creator can do that.".into()
            }
            EngineError::Store(StoreError::InvalidInput(reason)) => {
                format!("Invalid input: {reason}. Please try again.")
            }
            EngineError::Delivery(_) => {
                "Could not deliver that content right now. Please try again.".into()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_user_message() {
        let errors = [
            EngineError::Store(StoreError::NotFound),
            EngineError::Store(StoreError::BatchNotFound("x".into())),
            EngineError::Store(StoreError::DuplicateBatch("x".into())),
            EngineError::Store(StoreError::Forbidden),
            EngineError::Store(StoreError::InvalidInput("empty".into())),
            EngineError::Delivery(DeliveryError::Send {
                recipient: 1,
                reason: "blocked".into(),
            }),
        ];
        for err in errors {
            assert!(!err.user_message().is_empty());
        }
    }
}
