//! Transactions
//!
//! - `WireTransaction`: immutable proposal (inputs, outputs, commands, notary)
//!   identified by the hash of its content
//! - `TransactionBuilder`: assembles a `WireTransaction`
//! - `SignedTransaction`: a proposal plus the signatures collected so far

use crate::command::Command;
use crate::error::LedgerError;
use crate::hash::calculate_tx_id;
use crate::party::{Party, PartyKey};
use crate::signature::TransactionSignature;
use crate::state::{IouState, LedgerState, StateAndRef, StateRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Hex-encoded SHA256 transaction id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A proposed ledger update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub id: TxId,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<LedgerState>,
    pub commands: Vec<Command>,
    pub notary: Party,
    pub created_at: DateTime<Utc>,
}

impl WireTransaction {
    /// Recompute the id from content
    pub fn compute_id(&self) -> TxId {
        TxId(calculate_tx_id(
            &self.inputs,
            &self.outputs,
            &self.commands,
            &self.notary,
            &self.created_at,
        ))
    }

    /// Check the carried id matches the content
    pub fn verify_id(&self) -> Result<(), LedgerError> {
        let expected = self.compute_id();
        if expected != self.id {
            return Err(LedgerError::TransactionIdMismatch {
                expected: expected.0,
                actual: self.id.0.clone(),
            });
        }
        Ok(())
    }

    /// Union of all command signers
    pub fn required_signers(&self) -> BTreeSet<PartyKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    pub fn input_refs(&self) -> impl Iterator<Item = &StateRef> {
        self.inputs.iter().map(|i| &i.reference)
    }

    /// The IOU output at `index`, addressed by its future ledger position
    pub fn out_ref(&self, index: usize) -> Result<StateAndRef, LedgerError> {
        let output = self
            .outputs
            .get(index)
            .ok_or(LedgerError::OutputIndexOutOfRange {
                index,
                count: self.outputs.len(),
            })?;
        let state = output
            .as_iou()
            .ok_or(LedgerError::NotAnIouOutput { index })?;

        Ok(StateAndRef {
            state: state.clone(),
            reference: StateRef {
                tx_id: self.id.clone(),
                index: index as u32,
            },
        })
    }

    /// All IOU outputs with their refs, skipping other state types
    pub fn iou_out_refs(&self) -> Vec<StateAndRef> {
        (0..self.outputs.len())
            .filter_map(|i| self.out_ref(i).ok())
            .collect()
    }

    pub fn iou_outputs(&self) -> impl Iterator<Item = &IouState> {
        self.outputs.iter().filter_map(LedgerState::as_iou)
    }
}

/// Builder for `WireTransaction`
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    notary: Party,
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
}

impl TransactionBuilder {
    pub fn new(notary: Party) -> Self {
        Self {
            notary,
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn input(mut self, input: StateAndRef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: impl Into<LedgerState>) -> Self {
        self.outputs.push(output.into());
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Build the transaction and assign its id.
    ///
    /// Contract rules are not checked here; run the contract on the result.
    pub fn build(self) -> Result<WireTransaction, LedgerError> {
        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if !seen.insert(&input.reference) {
                return Err(LedgerError::DuplicateInput(input.reference.clone()));
            }
        }

        let created_at = Utc::now();
        let id = TxId(calculate_tx_id(
            &self.inputs,
            &self.outputs,
            &self.commands,
            &self.notary,
            &created_at,
        ));

        Ok(WireTransaction {
            id,
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            notary: self.notary,
            created_at,
        })
    }
}

/// A transaction plus its signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: WireTransaction,
    pub signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub fn new(tx: WireTransaction) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
        }
    }

    pub fn id(&self) -> &TxId {
        &self.tx.id
    }

    /// Attach a signature after checking it is valid for this transaction
    /// and comes from a required signer. A repeated signer is ignored.
    pub fn add_signature(&mut self, signature: TransactionSignature) -> Result<(), LedgerError> {
        if !self.tx.required_signers().contains(&signature.by) {
            return Err(LedgerError::UnexpectedSigner(signature.by));
        }
        signature.verify(&self.tx.id)?;

        if !self.signatures.iter().any(|s| s.by == signature.by) {
            self.signatures.push(signature);
        }
        Ok(())
    }

    pub fn with_signature(mut self, signature: TransactionSignature) -> Result<Self, LedgerError> {
        self.add_signature(signature)?;
        Ok(self)
    }

    /// Keys that have signed
    pub fn signers(&self) -> BTreeSet<PartyKey> {
        self.signatures.iter().map(|s| s.by).collect()
    }

    /// Required keys that have not signed yet
    pub fn missing_signers(&self) -> BTreeSet<PartyKey> {
        let signed = self.signers();
        self.tx
            .required_signers()
            .into_iter()
            .filter(|k| !signed.contains(k))
            .collect()
    }

    /// Verify the id and every attached signature
    pub fn verify_signatures(&self) -> Result<(), LedgerError> {
        self.tx.verify_id()?;
        for sig in &self.signatures {
            sig.verify(&self.tx.id)?;
        }
        Ok(())
    }

    /// Verify signatures and that no required signer is missing
    pub fn verify_required_signatures(&self) -> Result<(), LedgerError> {
        self.verify_signatures()?;
        let missing = self.missing_signers();
        if !missing.is_empty() {
            return Err(LedgerError::MissingSignatures(missing.into_iter().collect()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{PartySigner, Signer};
    use iou_core::{Currency, Money};
    use rust_decimal_macros::dec;

    struct Fixture {
        alice: PartySigner,
        bob: PartySigner,
        notary: Party,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                alice: PartySigner::generate(),
                bob: PartySigner::generate(),
                notary: Party::new("NOTARY", PartySigner::generate().public_key()),
            }
        }

        fn issue_tx(&self) -> WireTransaction {
            let lender = Party::new("ALICE", self.alice.public_key());
            let borrower = Party::new("BOB", self.bob.public_key());
            let iou = IouState::new(
                Money::new(dec!(100), Currency::Usd).unwrap(),
                lender,
                borrower,
            );
            let signers = iou.participant_keys();
            TransactionBuilder::new(self.notary.clone())
                .output(iou)
                .command(Command::issue(signers))
                .build()
                .unwrap()
        }
    }

    #[test]
    fn test_build_assigns_content_id() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        assert_eq!(tx.id.as_str().len(), 64);
        assert!(tx.verify_id().is_ok());
    }

    #[test]
    fn test_tampered_content_breaks_id() {
        let f = Fixture::new();
        let mut tx = f.issue_tx();
        if let LedgerState::Iou(iou) = &mut tx.outputs[0] {
            iou.amount = Money::new(dec!(1000), Currency::Usd).unwrap();
        }
        assert!(matches!(
            tx.verify_id(),
            Err(LedgerError::TransactionIdMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let f = Fixture::new();
        let issued = f.issue_tx();
        let input = issued.out_ref(0).unwrap();

        let result = TransactionBuilder::new(f.notary.clone())
            .input(input.clone())
            .input(input)
            .build();
        assert!(matches!(result, Err(LedgerError::DuplicateInput(_))));
    }

    #[test]
    fn test_out_ref_points_at_output() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        let out = tx.out_ref(0).unwrap();
        assert_eq!(out.reference.tx_id, tx.id);
        assert_eq!(out.reference.index, 0);
        assert!(matches!(
            tx.out_ref(3),
            Err(LedgerError::OutputIndexOutOfRange { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_missing_signers_shrink_as_parties_sign() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        let mut stx = SignedTransaction::new(tx.clone());
        assert_eq!(stx.missing_signers().len(), 2);

        stx.add_signature(f.alice.sign(&tx)).unwrap();
        assert_eq!(stx.missing_signers(), BTreeSet::from([f.bob.public_key()]));
        assert!(matches!(
            stx.verify_required_signatures(),
            Err(LedgerError::MissingSignatures(_))
        ));

        stx.add_signature(f.bob.sign(&tx)).unwrap();
        assert!(stx.missing_signers().is_empty());
        assert!(stx.verify_required_signatures().is_ok());
    }

    #[test]
    fn test_repeated_signer_ignored() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        let mut stx = SignedTransaction::new(tx.clone());
        stx.add_signature(f.alice.sign(&tx)).unwrap();
        stx.add_signature(f.alice.sign(&tx)).unwrap();
        assert_eq!(stx.signatures.len(), 1);
    }

    #[test]
    fn test_unrequired_signer_rejected() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        let stranger = PartySigner::generate();
        let result = SignedTransaction::new(tx.clone()).with_signature(stranger.sign(&tx));
        assert!(matches!(result, Err(LedgerError::UnexpectedSigner(_))));
    }

    #[test]
    fn test_serde_roundtrip_keeps_id_valid() {
        let f = Fixture::new();
        let tx = f.issue_tx();
        let stx = SignedTransaction::new(tx.clone())
            .with_signature(f.alice.sign(&tx))
            .unwrap();

        let json = serde_json::to_string(&stx).unwrap();
        let parsed: SignedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stx);
        assert!(parsed.verify_signatures().is_ok());
    }
}
