//! IOU Flows - Multi-party protocols over the IOU ledger
//!
//! ```text
//! Initiator (lender)                     Counterparty
//!     │ build + self-validate + sign
//!     │──────── Proposal(stx) ─────────────►│
//!     │                                     │ verify signatures
//!     │                                     │ run contract
//!     │◄─────── Signature / Refused ────────│
//!     │ full quorum?
//!     ▼
//! ┌─────────────────────────────┐
//! │ NOTARY COMMIT               │ ← conflicts on consumed inputs
//! └─────────────────────────────┘
//! ```

pub mod collect;
pub mod config;
pub mod error;
pub mod issue;
pub mod memory;
pub mod responder;
pub mod services;
pub mod transfer;

pub use config::FlowConfig;
pub use error::{FlowError, LookupError, NotaryError, SessionError, SigningError};
pub use issue::IssueFlow;
pub use responder::{Refusal, ResponderOutcome, SignTransactionResponder};
pub use services::{
    CommitReceipt, FlowMessage, FlowSession, IdentityService, NotaryService, ServiceHub,
    SessionTransport, SigningService, VaultService,
};
pub use transfer::{TransferFlow, TransferStep};
