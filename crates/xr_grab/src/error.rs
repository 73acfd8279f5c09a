//! Error types for the grab pipeline

use crate::config::ConfigError;
use crate::grab::interactor::InteractorId;
use crate::grab::transformer::TransformerKey;

/// Errors returned by grab operations
#[derive(thiserror::Error, Debug)]
pub enum GrabError {
    /// The transformer handle is stale or was never issued
    #[error("Unknown grab transformer: {0:?}")]
    UnknownTransformer(TransformerKey),

    /// Registry reordering was requested while transformers are being processed
    #[error("Cannot reorder grab transformers while they are being processed")]
    ProcessingInProgress,

    /// Index outside the registration list
    #[error("Index {index} is out of range for a list of {len} grab transformers")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current list length
        len: usize,
    },

    /// The interactor is not part of the current selection
    #[error("Interactor {0:?} is not selecting this interactable")]
    UnknownInteractor(InteractorId),

    /// The interactor already selects this interactable
    #[error("Interactor {0:?} is already selecting this interactable")]
    AlreadySelecting(InteractorId),

    /// Configuration rejected by validation
    #[error("Invalid grab configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Result alias for grab operations
pub type GrabResult<T> = Result<T, GrabError>;
