//! End-to-end flow scenarios over the in-memory network

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use iou_core::{Currency, Money};
use iou_flows::memory::{InMemoryNetwork, NodeBehaviour};
use iou_flows::{
    FlowConfig, FlowError, FlowSession, IssueFlow, Refusal, ServiceHub, SessionError,
    SessionTransport, SignTransactionResponder, TransferFlow, TransferStep,
};
use iou_ledger::{
    Command, ContractError, LinearId, Party, Rule, SignedTransaction, TransactionBuilder,
};

struct TestNet {
    network: InMemoryNetwork,
    alice: Party,
    bob: Party,
    charlie: Party,
}

fn setup() -> TestNet {
    let config = FlowConfig::default().with_signature_timeout(Duration::from_millis(500));
    let network = InMemoryNetwork::new("Notary", config);
    TestNet {
        alice: network.create_party("Alice"),
        bob: network.create_party("Bob"),
        charlie: network.create_party("Charlie"),
        network,
    }
}

impl TestNet {
    fn hub(&self, party: &Party) -> ServiceHub {
        self.network.hub(party).unwrap()
    }

    /// Alice lends 100 USD to Bob
    async fn issue(&self) -> (SignedTransaction, LinearId) {
        let flow = IssueFlow::new(self.hub(&self.alice));
        let stx = flow
            .call(Money::new(dec!(100), Currency::Usd).unwrap(), self.bob.clone())
            .await
            .unwrap();
        let linear_id = stx.tx.iou_outputs().next().unwrap().linear_id;
        (stx, linear_id)
    }

    fn commit_count(&self) -> usize {
        self.network.ledger().transactions().len()
    }
}

/// Counts sessions opened through the wrapped transport
struct CountingTransport {
    inner: Arc<dyn SessionTransport>,
    opened: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionTransport for CountingTransport {
    async fn open_session(
        &self,
        counterparty: &Party,
    ) -> Result<Box<dyn FlowSession>, SessionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.open_session(counterparty).await
    }
}

// ============================================================================
// Issue
// ============================================================================

#[tokio::test]
async fn test_issue_creates_first_version() {
    let net = setup();
    let (stx, linear_id) = net.issue().await;

    assert_eq!(stx.signatures.len(), 2);
    assert!(stx.missing_signers().is_empty());

    let s1 = net.hub(&net.bob).vault.find_current(&linear_id).await.unwrap();
    assert_eq!(s1.state.lender, net.alice);
    assert_eq!(s1.state.borrower, net.bob);
    assert_eq!(s1.state.amount.to_string(), "100 USD");
}

#[tokio::test]
async fn test_issue_to_self_rejected_before_collection() {
    let net = setup();
    let flow = IssueFlow::new(net.hub(&net.alice));

    let err = flow
        .call(Money::new(dec!(100), Currency::Usd).unwrap(), net.alice.clone())
        .await
        .unwrap_err();

    assert_eq!(err.rule(), Some(Rule::IssueDistinctParties));
    assert_eq!(net.commit_count(), 0);
}

#[tokio::test]
async fn test_issue_zero_amount_rejected() {
    let net = setup();
    let flow = IssueFlow::new(net.hub(&net.alice));

    let err = flow
        .call(Money::zero(Currency::Usd), net.bob.clone())
        .await
        .unwrap_err();

    assert_eq!(err.rule(), Some(Rule::IssuePositiveAmount));
}

// ============================================================================
// Transfer
// ============================================================================

#[tokio::test]
async fn test_transfer_to_new_lender() {
    let net = setup();
    let (issue, linear_id) = net.issue().await;
    let s1 = issue.tx.out_ref(0).unwrap();

    let flow = TransferFlow::new(net.hub(&net.alice));
    let stx = flow.call(linear_id, net.charlie.clone()).await.unwrap();

    assert_eq!(flow.step(), TransferStep::Committed);
    assert_eq!(stx.signatures.len(), 3);
    assert!(net.network.ledger().is_consumed(&s1.reference));

    let s2 = net.hub(&net.charlie).vault.find_current(&linear_id).await.unwrap();
    assert_eq!(s2.state.lender, net.charlie);
    assert_eq!(s2.state.borrower, net.bob);
    assert_eq!(s2.state.amount, s1.state.amount);
    assert_eq!(s2.state.linear_id, linear_id);

    // Alice is no longer a participant
    let err = net.hub(&net.alice).vault.find_current(&linear_id).await.unwrap_err();
    assert_eq!(err, iou_flows::LookupError::NotFound(linear_id));
}

#[tokio::test]
async fn test_transfer_progress_is_observable() {
    let net = setup();
    let (_, linear_id) = net.issue().await;

    let flow = TransferFlow::new(net.hub(&net.alice));
    let progress = flow.progress();
    assert_eq!(*progress.borrow(), TransferStep::Start);

    flow.call(linear_id, net.charlie.clone()).await.unwrap();
    assert!(progress.has_changed().unwrap());
    assert_eq!(*progress.borrow(), TransferStep::Committed);
}

#[tokio::test]
async fn test_transfer_by_borrower_is_unauthorized() {
    let net = setup();
    let (_, linear_id) = net.issue().await;

    let opened = Arc::new(AtomicUsize::new(0));
    let mut hub = net.hub(&net.bob);
    hub.transport = Arc::new(CountingTransport {
        inner: hub.transport.clone(),
        opened: opened.clone(),
    });

    let flow = TransferFlow::new(hub);
    let err = flow.call(linear_id, net.charlie.clone()).await.unwrap_err();

    assert!(matches!(err, FlowError::Unauthorized { .. }));
    assert_eq!(opened.load(Ordering::SeqCst), 0);
    assert!(matches!(flow.step(), TransferStep::Failed(_)));
    assert_eq!(net.commit_count(), 1);
}

#[tokio::test]
async fn test_transfer_to_same_lender_rejected() {
    let net = setup();
    let (_, linear_id) = net.issue().await;

    let flow = TransferFlow::new(net.hub(&net.alice));
    let err = flow.call(linear_id, net.alice.clone()).await.unwrap_err();

    assert_eq!(err.rule(), Some(Rule::TransferLenderChanges));
    assert_eq!(net.commit_count(), 1);
}

#[tokio::test]
async fn test_transfer_unknown_iou() {
    let net = setup();
    let flow = TransferFlow::new(net.hub(&net.alice));
    let missing = LinearId::new();

    let err = flow.call(missing, net.charlie.clone()).await.unwrap_err();
    assert!(matches!(err, FlowError::NotFound(id) if id == missing));
}

#[tokio::test]
async fn test_declining_counterparty_aborts_transfer() {
    let net = setup();
    let (_, linear_id) = net.issue().await;
    net.network.set_behaviour(&net.bob, NodeBehaviour::Declining);

    let flow = TransferFlow::new(net.hub(&net.alice));
    let err = flow.call(linear_id, net.charlie.clone()).await.unwrap_err();

    match err {
        FlowError::SignatureRefused { party, .. } => assert_eq!(party, "BOB"),
        other => panic!("expected refusal, got {:?}", other),
    }
    assert_eq!(net.commit_count(), 1);
}

#[tokio::test]
async fn test_unreachable_counterparty_aborts_transfer() {
    let net = setup();
    let (_, linear_id) = net.issue().await;
    net.network.set_behaviour(&net.charlie, NodeBehaviour::Unreachable);

    let flow = TransferFlow::new(net.hub(&net.alice));
    let err = flow.call(linear_id, net.charlie.clone()).await.unwrap_err();

    assert!(matches!(err, FlowError::SessionFailure { ref party, .. } if party == "CHARLIE"));
    assert_eq!(net.commit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_silent_counterparty_times_out() {
    let net = setup();
    let (_, linear_id) = net.issue().await;
    net.network.set_behaviour(&net.charlie, NodeBehaviour::Silent);

    let flow = TransferFlow::new(net.hub(&net.alice));
    let err = flow.call(linear_id, net.charlie.clone()).await.unwrap_err();

    match err {
        FlowError::SessionFailure { party, reason } => {
            assert_eq!(party, "CHARLIE");
            assert!(reason.contains("500ms"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(net.commit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_transfer_commits_nothing() {
    let net = setup();
    let (issue, linear_id) = net.issue().await;
    let s1 = issue.tx.out_ref(0).unwrap();
    net.network.set_behaviour(&net.charlie, NodeBehaviour::Silent);

    let flow = TransferFlow::new(net.hub(&net.alice));
    let mut progress = flow.progress();

    // Drop the flow once it is waiting on counterparties
    tokio::select! {
        result = flow.call(linear_id, net.charlie.clone()) => {
            panic!("transfer finished before cancellation: {:?}", result)
        }
        _ = progress.wait_for(|step| *step == TransferStep::CollectingSignatures) => {}
    }

    // Let the responders notice the closed sessions
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(flow.step(), TransferStep::CollectingSignatures);
    assert_eq!(net.commit_count(), 1);
    assert!(!net.network.ledger().is_consumed(&s1.reference));
    let current = net.hub(&net.bob).vault.find_current(&linear_id).await.unwrap();
    assert_eq!(current.reference, s1.reference);
    assert_eq!(current.state.lender, net.alice);
}

#[tokio::test]
async fn test_concurrent_transfers_single_winner() {
    let net = setup();
    let dave = net.network.create_party("Dave");
    let (issue, linear_id) = net.issue().await;
    let s1 = issue.tx.out_ref(0).unwrap();

    let to_charlie = TransferFlow::new(net.hub(&net.alice));
    let to_dave = TransferFlow::new(net.hub(&net.alice));

    let (first, second) = tokio::join!(
        to_charlie.call(linear_id, net.charlie.clone()),
        to_dave.call(linear_id, dave.clone()),
    );

    let loser = match (&first, &second) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        _ => panic!(
            "expected exactly one commit, got {} and {}",
            first.is_ok(),
            second.is_ok()
        ),
    };
    assert!(loser.is_conflict(), "unexpected failure: {}", loser);

    // Exactly one successor of S1
    assert!(net.network.ledger().is_consumed(&s1.reference));
    assert_eq!(net.commit_count(), 2);
    let successor = net.hub(&net.bob).vault.find_current(&linear_id).await.unwrap();
    assert_ne!(successor.state.lender, net.alice);
}

// ============================================================================
// Responder
// ============================================================================

#[tokio::test]
async fn test_responder_rejects_missing_borrower_signature() {
    let net = setup();
    let (issue, _) = net.issue().await;
    let s1 = issue.tx.out_ref(0).unwrap();

    // Signers {A, C}: borrower left out
    let output = s1.state.with_new_lender(net.charlie.clone());
    let tx = TransactionBuilder::new(net.network.notary())
        .input(s1)
        .output(output)
        .command(Command::transfer([
            net.alice.owning_key(),
            net.charlie.owning_key(),
        ]))
        .build()
        .unwrap();
    let stx = SignedTransaction::new(tx);

    let responder = SignTransactionResponder::from_hub(&net.hub(&net.charlie));
    let refusal = responder.check_proposal(&stx).unwrap_err();
    assert!(matches!(
        refusal,
        Refusal::Contract(ContractError::Rejected(Rule::TransferSigners))
    ));
}

#[tokio::test]
async fn test_responder_refuses_when_not_a_signer() {
    let net = setup();
    let (issue, _) = net.issue().await;

    let responder = SignTransactionResponder::from_hub(&net.hub(&net.charlie));
    let refusal = responder.check_proposal(&issue).unwrap_err();
    assert!(matches!(refusal, Refusal::NotRequired));
}

#[tokio::test]
async fn test_responder_refuses_tampered_signature() {
    let net = setup();
    let (mut issue, _) = net.issue().await;
    issue.signatures[0].signature = "00".repeat(64);

    let responder = SignTransactionResponder::from_hub(&net.hub(&net.bob));
    let refusal = responder.check_proposal(&issue).unwrap_err();
    assert!(matches!(refusal, Refusal::BadSignature(_)));
}
