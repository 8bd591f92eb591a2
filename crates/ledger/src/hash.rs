//! Transaction id hashing

use crate::command::{Command, CommandData};
use crate::party::Party;
use crate::state::{IouState, LedgerState, StateAndRef};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA256 over the content of a transaction (everything except the id).
///
/// Fields are fed length-prefixed so that adjacent variable-length values
/// cannot be shifted into each other.
pub fn calculate_tx_id(
    inputs: &[StateAndRef],
    outputs: &[LedgerState],
    commands: &[Command],
    notary: &Party,
    created_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();

    update(&mut hasher, b"inputs");
    hasher.update((inputs.len() as u64).to_le_bytes());
    for input in inputs {
        update(&mut hasher, input.reference.tx_id.as_str().as_bytes());
        hasher.update(input.reference.index.to_le_bytes());
        hash_iou(&mut hasher, &input.state);
    }

    update(&mut hasher, b"outputs");
    hasher.update((outputs.len() as u64).to_le_bytes());
    for output in outputs {
        match output {
            LedgerState::Iou(iou) => {
                update(&mut hasher, b"iou");
                hash_iou(&mut hasher, iou);
            }
            LedgerState::Other { type_name, payload } => {
                update(&mut hasher, b"other");
                update(&mut hasher, type_name.as_bytes());
                update(&mut hasher, payload.to_string().as_bytes());
            }
        }
    }

    update(&mut hasher, b"commands");
    hasher.update((commands.len() as u64).to_le_bytes());
    for command in commands {
        match &command.data {
            CommandData::Iou(kind) => update(&mut hasher, kind.to_string().as_bytes()),
            CommandData::Unrecognized(name) => {
                update(&mut hasher, b"unrecognized");
                update(&mut hasher, name.as_bytes());
            }
        }
        // BTreeSet iterates in key order
        hasher.update((command.signers.len() as u64).to_le_bytes());
        for key in &command.signers {
            hasher.update(key.as_bytes());
        }
    }

    hash_party(&mut hasher, notary);
    update(&mut hasher, created_at.to_rfc3339().as_bytes());

    hex::encode(hasher.finalize())
}

fn hash_iou(hasher: &mut Sha256, iou: &IouState) {
    hasher.update(iou.linear_id.as_uuid().as_bytes());
    update(hasher, iou.amount.quantity.to_string().as_bytes());
    update(hasher, iou.amount.token.code().as_bytes());
    hash_party(hasher, &iou.lender);
    hash_party(hasher, &iou.borrower);
}

fn hash_party(hasher: &mut Sha256, party: &Party) {
    update(hasher, party.name.as_bytes());
    hasher.update(party.key.as_bytes());
}

fn update(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
