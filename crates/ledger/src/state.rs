//! IOU state model
//!
//! An `IouState` is one immutable version of an obligation. Versions of the
//! same obligation share a `LinearId`; a transfer produces a new version via
//! [`IouState::with_new_lender`] rather than mutating the old one.

use crate::party::{Party, PartyKey};
use crate::transaction::TxId;
use iou_core::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier shared by every version of one obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinearId(Uuid);

impl LinearId {
    /// Fresh identifier, never reused
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinearId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LinearId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// One version of a bilateral obligation: `borrower` owes `amount` to `lender`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IouState {
    pub linear_id: LinearId,
    pub amount: Money,
    pub lender: Party,
    pub borrower: Party,
}

impl IouState {
    /// First version of a new obligation
    pub fn new(amount: Money, lender: Party, borrower: Party) -> Self {
        Self {
            linear_id: LinearId::new(),
            amount,
            lender,
            borrower,
        }
    }

    /// Parties whose consent is needed for this version
    pub fn participants(&self) -> [&Party; 2] {
        [&self.lender, &self.borrower]
    }

    pub fn participant_keys(&self) -> BTreeSet<PartyKey> {
        self.participants().iter().map(|p| p.owning_key()).collect()
    }

    /// Same obligation with only the lender replaced
    pub fn with_new_lender(&self, new_lender: Party) -> Self {
        Self {
            lender: new_lender,
            ..self.clone()
        }
    }
}

impl fmt::Display for IouState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IOU {} ({} owed by {} to {})",
            self.linear_id, self.amount, self.borrower, self.lender
        )
    }
}

/// A state slot in a transaction.
///
/// The ledger carries states of other contracts too; the IOU contract and
/// its counter-signers only accept the `Iou` variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerState {
    Iou(IouState),
    Other {
        type_name: String,
        payload: serde_json::Value,
    },
}

impl LedgerState {
    pub fn as_iou(&self) -> Option<&IouState> {
        match self {
            LedgerState::Iou(iou) => Some(iou),
            LedgerState::Other { .. } => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            LedgerState::Iou(_) => "IouState",
            LedgerState::Other { type_name, .. } => type_name,
        }
    }
}

impl From<IouState> for LedgerState {
    fn from(iou: IouState) -> Self {
        LedgerState::Iou(iou)
    }
}

/// Pointer to an output of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateRef {
    pub tx_id: TxId,
    pub index: u32,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tx_id, self.index)
    }
}

/// A state together with the ledger position it was created at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state: IouState,
    pub reference: StateRef,
}
