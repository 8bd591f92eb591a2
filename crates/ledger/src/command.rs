//! Transaction commands

use crate::party::PartyKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};

/// Operations understood by the IOU contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IouCommand {
    /// Create the first version of an obligation
    Issue,
    /// Reassign the lender position
    Transfer,
}

/// Command payload as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandData {
    Iou(IouCommand),
    /// A command of some other contract
    Unrecognized(String),
}

/// A command plus the keys that must sign for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub data: CommandData,
    pub signers: BTreeSet<PartyKey>,
}

impl Command {
    pub fn new(data: CommandData, signers: impl IntoIterator<Item = PartyKey>) -> Self {
        Self {
            data,
            signers: signers.into_iter().collect(),
        }
    }

    pub fn issue(signers: impl IntoIterator<Item = PartyKey>) -> Self {
        Self::new(CommandData::Iou(IouCommand::Issue), signers)
    }

    pub fn transfer(signers: impl IntoIterator<Item = PartyKey>) -> Self {
        Self::new(CommandData::Iou(IouCommand::Transfer), signers)
    }

    pub fn iou_command(&self) -> Option<IouCommand> {
        match &self.data {
            CommandData::Iou(command) => Some(*command),
            CommandData::Unrecognized(_) => None,
        }
    }
}
