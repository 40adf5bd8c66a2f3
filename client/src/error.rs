//! Error types for the account client.

use shielded_account_lib::{AddressError, SelectionError};

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `init` has not installed the note ledger and merkle tree yet
    #[error("account not initialized")]
    NotInitialized,

    /// Deriving the shield key needs a message signer
    #[error("shield key signer not set")]
    ShieldSignerNotSet,

    /// Submitting a transaction needs a transaction signer
    #[error("transaction signer not set")]
    TransactionSignerNotSet,

    #[error("insufficient value in unspent notes: required {required}, available {available}")]
    InsufficientBalance { required: u128, available: u128 },

    #[error(transparent)]
    Decode(#[from] AddressError),

    /// A selected note is missing from the ledger's full note list
    #[error("selected note not found in note ledger")]
    NoteNotInLedger,

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by a ledger, prover or contract collaborator
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl From<SelectionError> for Error {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::InsufficientBalance {
                required,
                available,
            } => Error::InsufficientBalance {
                required,
                available,
            },
            SelectionError::ValueOverflow => Error::InvalidValue(e.to_string()),
        }
    }
}
