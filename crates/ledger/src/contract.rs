//! IOU contract - the rules every IOU transaction must satisfy
//!
//! Verification is a pure function of the transaction: the initiator runs it
//! before asking anyone to sign, every counterparty runs it again before
//! counter-signing, and the notary runs it once more before committing.
//!
//! ```text
//! commands ──► exactly one, recognized ──► IOU states only ──► ISSUE | TRANSFER rules
//! ```
//!
//! The first violated [`Rule`] is reported; nothing is partially accepted.

use crate::command::IouCommand;
use crate::party::PartyKey;
use crate::state::{IouState, LedgerState};
use crate::transaction::WireTransaction;
use std::collections::BTreeSet;
use std::fmt;
use strum_macros::{EnumIter, IntoStaticStr};
use thiserror::Error;

/// A named contract requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    // === Structural ===
    SingleCommand,
    RecognizedCommand,
    IouStatesOnly,

    // === Issue ===
    IssueNoInputs,
    IssueSingleOutput,
    IssuePositiveAmount,
    IssueDistinctParties,
    IssueSigners,

    // === Transfer ===
    TransferSingleInput,
    TransferSingleOutput,
    TransferBorrowerUnchanged,
    TransferAmountUnchanged,
    TransferIdentifierUnchanged,
    TransferOnlyLenderChanges,
    TransferLenderChanges,
    TransferSigners,
}

impl Rule {
    /// Stable snake_case code, e.g. `transfer_signers`
    pub fn code(&self) -> &'static str {
        self.into()
    }

    /// Human-readable requirement
    pub fn requirement(&self) -> &'static str {
        match self {
            Rule::SingleCommand => "A transaction must carry exactly one command.",
            Rule::RecognizedCommand => "The command must be an IOU command.",
            Rule::IouStatesOnly => "All inputs and outputs must be IOU states.",
            Rule::IssueNoInputs => "No inputs should be consumed when issuing an IOU.",
            Rule::IssueSingleOutput => {
                "Only one output state should be created when issuing an IOU."
            }
            Rule::IssuePositiveAmount => "A newly issued IOU must have a positive amount.",
            Rule::IssueDistinctParties => {
                "The lender and borrower cannot have the same identity."
            }
            Rule::IssueSigners => {
                "Both lender and borrower together only may sign IOU issue transaction."
            }
            Rule::TransferSingleInput => {
                "An IOU transfer transaction should only consume one input state."
            }
            Rule::TransferSingleOutput => {
                "An IOU transfer transaction should only create one output state."
            }
            Rule::TransferBorrowerUnchanged => "The borrower may not change in a transfer.",
            Rule::TransferAmountUnchanged => "The amount may not change in a transfer.",
            Rule::TransferIdentifierUnchanged => "The linear id may not change in a transfer.",
            Rule::TransferOnlyLenderChanges => "Only the lender property may change.",
            Rule::TransferLenderChanges => "The lender property must change in a transfer.",
            Rule::TransferSigners => {
                "The borrower, old lender and new lender only must sign an IOU transfer transaction."
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.requirement(), self.code())
    }
}

/// Contract verification failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractError {
    #[error("Contract verification failed: {0}")]
    Rejected(Rule),
}

impl ContractError {
    pub fn rule(&self) -> Rule {
        match self {
            ContractError::Rejected(rule) => *rule,
        }
    }
}

pub type ContractResult = Result<(), ContractError>;

fn requires(condition: bool, rule: Rule) -> ContractResult {
    if condition {
        Ok(())
    } else {
        Err(ContractError::Rejected(rule))
    }
}

/// The IOU contract
pub struct IouContract;

impl IouContract {
    /// Verify a whole transaction
    pub fn verify(tx: &WireTransaction) -> ContractResult {
        // Structural precondition, before looking at the command kind
        requires(tx.commands.len() == 1, Rule::SingleCommand)?;
        let command = &tx.commands[0];
        let kind = command
            .iou_command()
            .ok_or(ContractError::Rejected(Rule::RecognizedCommand))?;

        let inputs: Vec<&IouState> = tx.inputs.iter().map(|i| &i.state).collect();
        let outputs = tx
            .outputs
            .iter()
            .map(LedgerState::as_iou)
            .collect::<Option<Vec<_>>>()
            .ok_or(ContractError::Rejected(Rule::IouStatesOnly))?;

        Self::verify_command(&inputs, &outputs, kind, &command.signers)
    }

    /// Verify one recognized command over already-extracted states
    pub fn verify_command(
        inputs: &[&IouState],
        outputs: &[&IouState],
        command: IouCommand,
        signers: &BTreeSet<PartyKey>,
    ) -> ContractResult {
        match command {
            IouCommand::Issue => verify_issue(inputs, outputs, signers),
            IouCommand::Transfer => verify_transfer(inputs, outputs, signers),
        }
    }
}

fn verify_issue(
    inputs: &[&IouState],
    outputs: &[&IouState],
    signers: &BTreeSet<PartyKey>,
) -> ContractResult {
    requires(inputs.is_empty(), Rule::IssueNoInputs)?;
    requires(outputs.len() == 1, Rule::IssueSingleOutput)?;
    let iou = outputs[0];

    requires(iou.amount.is_positive(), Rule::IssuePositiveAmount)?;
    requires(iou.lender != iou.borrower, Rule::IssueDistinctParties)?;
    requires(*signers == iou.participant_keys(), Rule::IssueSigners)
}

fn verify_transfer(
    inputs: &[&IouState],
    outputs: &[&IouState],
    signers: &BTreeSet<PartyKey>,
) -> ContractResult {
    requires(inputs.len() == 1, Rule::TransferSingleInput)?;
    requires(outputs.len() == 1, Rule::TransferSingleOutput)?;
    let (input, output) = (inputs[0], outputs[0]);

    requires(output.borrower == input.borrower, Rule::TransferBorrowerUnchanged)?;
    requires(output.amount == input.amount, Rule::TransferAmountUnchanged)?;
    requires(output.linear_id == input.linear_id, Rule::TransferIdentifierUnchanged)?;
    // Catch-all: undoing the lender substitution must give back the input
    requires(
        output.with_new_lender(input.lender.clone()) == *input,
        Rule::TransferOnlyLenderChanges,
    )?;
    requires(output.lender != input.lender, Rule::TransferLenderChanges)?;

    let expected: BTreeSet<PartyKey> = input
        .participant_keys()
        .union(&output.participant_keys())
        .copied()
        .collect();
    requires(*signers == expected, Rule::TransferSigners)
}
