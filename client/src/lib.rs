//! Private account client: chain synchronization, note selection and
//! shield / unshield request building over pluggable collaborators.

pub mod abi;
pub mod account;
pub mod builder;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ledger;
pub mod submit;
pub mod sync;

pub use account::ShieldedAccount;
pub use builder::{NativeUnshieldRequest, TransactionRequestBuilder};
pub use config::AccountConfig;
pub use error::{Error, Result};
pub use ledger::{AlloyLedger, LedgerQuery, ReceiptLike};
pub use submit::AlloySubmitter;
pub use sync::{Cache, ChainSynchronizer, ScanState};
