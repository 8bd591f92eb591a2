//! IOU Ledger - State model, transactions and contract rules
//!
//! # Key Types
//! - `IouState`: One immutable version of an obligation
//! - `WireTransaction` / `SignedTransaction`: Proposed ledger update and its signatures
//! - `IouContract`: Pure validator for ISSUE and TRANSFER
//! - `PartySigner`: Ed25519 signing for a party

pub mod command;
pub mod contract;
pub mod error;
pub mod hash;
pub mod party;
pub mod signature;
pub mod state;
pub mod transaction;

pub use command::{Command, CommandData, IouCommand};
pub use contract::{ContractError, IouContract, Rule};
pub use error::LedgerError;
pub use party::{Party, PartyKey};
pub use signature::{PartySigner, SignatureAlgorithm, Signer, TransactionSignature};
pub use state::{IouState, LedgerState, LinearId, StateAndRef, StateRef};
pub use transaction::{SignedTransaction, TransactionBuilder, TxId, WireTransaction};
