pub mod error;
pub mod types;
pub mod codec;
pub mod voucher;
pub mod wire;
pub mod state_machine;
pub mod config;
pub mod custody;

pub use config::SessionPolicy;
pub use custody::{SignatureVerifier, VoucherSigner};
pub use error::CoreError;
pub use state_machine::{SessionEvent, SessionStateMachine, SessionStatus};
pub use types::{AccountId, SessionId};
pub use voucher::{SignedVoucher, Voucher};
