//! In-memory collaborators
//!
//! Used by the `iou` node and by tests. A single [`InMemoryLedger`] plays
//! vault and notary for every node of an [`InMemoryNetwork`].

pub mod identity;
pub mod keys;
pub mod ledger;
pub mod network;

pub use identity::{PartyDirectory, StaticIdentity};
pub use keys::KeyStore;
pub use ledger::{InMemoryLedger, LedgerVault};
pub use network::{ChannelSession, InMemoryNetwork, InMemoryTransport, NodeBehaviour};
