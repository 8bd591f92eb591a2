//! In-process network of nodes sharing one ledger
//!
//! Opening a session spawns the counterparty's responder on its own task,
//! connected to the initiator through a pair of bounded channels.

use async_trait::async_trait;
use iou_ledger::{Party, PartySigner, Signer};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::config::FlowConfig;
use crate::error::SessionError;
use crate::memory::identity::{PartyDirectory, StaticIdentity};
use crate::memory::keys::KeyStore;
use crate::memory::ledger::InMemoryLedger;
use crate::responder::SignTransactionResponder;
use crate::services::{FlowMessage, FlowSession, ServiceHub, SessionTransport};

const SESSION_BUFFER: usize = 8;

/// How a node answers incoming sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeBehaviour {
    /// Runs the counter-signing responder
    #[default]
    Online,
    /// Sessions cannot be opened
    Unreachable,
    /// Accepts the proposal and never answers
    Silent,
    /// Refuses every proposal
    Declining,
}

struct NodeEntry {
    party: Party,
    keys: Arc<KeyStore>,
    behaviour: NodeBehaviour,
}

/// Nodes, their keys and the ledger they share
#[derive(Clone)]
pub struct InMemoryNetwork {
    ledger: Arc<InMemoryLedger>,
    directory: PartyDirectory,
    nodes: Arc<RwLock<BTreeMap<String, NodeEntry>>>,
    config: FlowConfig,
}

impl InMemoryNetwork {
    /// New network with a freshly keyed notary
    pub fn new(notary_name: &str, config: FlowConfig) -> Self {
        let notary = Party::new(notary_name, PartySigner::generate().public_key());
        Self::with_ledger(Arc::new(InMemoryLedger::new(notary)), config)
    }

    pub fn with_ledger(ledger: Arc<InMemoryLedger>, config: FlowConfig) -> Self {
        let directory = PartyDirectory::new();
        directory.register(ledger.notary().clone());
        Self {
            ledger,
            directory,
            nodes: Arc::new(RwLock::new(BTreeMap::new())),
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn directory(&self) -> &PartyDirectory {
        &self.directory
    }

    pub fn notary(&self) -> Party {
        self.ledger.notary().clone()
    }

    /// Add a node with a new random key
    pub fn create_party(&self, name: &str) -> Party {
        self.add_party(name, PartySigner::generate())
    }

    /// Add a node holding the given key
    pub fn add_party(&self, name: &str, signer: PartySigner) -> Party {
        let keys = Arc::new(KeyStore::new());
        let party = Party::new(name, keys.insert(signer));

        self.directory.register(party.clone());
        self.nodes.write().unwrap_or_else(|e| e.into_inner()).insert(
            party.name.clone(),
            NodeEntry {
                party: party.clone(),
                keys,
                behaviour: NodeBehaviour::Online,
            },
        );
        tracing::debug!(party = %party, "Node joined network");
        party
    }

    pub fn set_behaviour(&self, party: &Party, behaviour: NodeBehaviour) {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = nodes.get_mut(&party.name) {
            entry.behaviour = behaviour;
        }
    }

    /// Services for flows started by `party`; `None` if it is not a node here
    pub fn hub(&self, party: &Party) -> Option<ServiceHub> {
        let keys = self.node(party).map(|(_, keys, _)| keys)?;
        Some(ServiceHub {
            identity: Arc::new(self.identity_of(party)),
            vault: Arc::new(self.ledger.vault_for(party.owning_key())),
            signing: keys,
            transport: Arc::new(InMemoryTransport {
                network: self.clone(),
                initiator: party.clone(),
            }),
            notary: self.ledger.clone(),
            config: self.config.clone(),
        })
    }

    fn identity_of(&self, party: &Party) -> StaticIdentity {
        StaticIdentity::new(party.clone(), self.notary(), self.directory.clone())
    }

    fn node(&self, party: &Party) -> Option<(Party, Arc<KeyStore>, NodeBehaviour)> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        nodes
            .get(&party.name)
            .filter(|entry| entry.party.owning_key() == party.owning_key())
            .map(|entry| (entry.party.clone(), entry.keys.clone(), entry.behaviour))
    }
}

/// Session transport for one initiating node
pub struct InMemoryTransport {
    network: InMemoryNetwork,
    initiator: Party,
}

#[async_trait]
impl SessionTransport for InMemoryTransport {
    async fn open_session(
        &self,
        counterparty: &Party,
    ) -> Result<Box<dyn FlowSession>, SessionError> {
        let (party, keys, behaviour) = self
            .network
            .node(counterparty)
            .ok_or_else(|| SessionError::Unreachable(counterparty.name.clone()))?;
        if behaviour == NodeBehaviour::Unreachable {
            return Err(SessionError::Unreachable(party.name));
        }

        let (to_responder, responder_inbox) = mpsc::channel(SESSION_BUFFER);
        let (to_initiator, initiator_inbox) = mpsc::channel(SESSION_BUFFER);

        let mut responder_side =
            ChannelSession::new(self.initiator.clone(), to_initiator, responder_inbox);
        let responder = SignTransactionResponder::new(
            Arc::new(self.network.identity_of(&party)),
            keys,
            self.network.config.clone(),
        );

        tracing::debug!(initiator = %self.initiator, counterparty = %party, ?behaviour, "Session opened");
        tokio::spawn(async move {
            run_responder(behaviour, &responder, &mut responder_side).await;
        });

        Ok(Box::new(ChannelSession::new(
            party,
            to_responder,
            initiator_inbox,
        )))
    }
}

async fn run_responder(
    behaviour: NodeBehaviour,
    responder: &SignTransactionResponder,
    session: &mut ChannelSession,
) {
    let result = match behaviour {
        NodeBehaviour::Online | NodeBehaviour::Unreachable => {
            responder.respond(session).await.map(|_| ())
        }
        NodeBehaviour::Declining => match session.receive().await {
            Ok(_) => session
                .send(FlowMessage::Refused("Declined by node operator".to_string()))
                .await,
            Err(e) => Err(e),
        },
        NodeBehaviour::Silent => {
            // Hold the session until the initiator goes away
            let _ = session.receive().await;
            let _ = session.receive().await;
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(counterparty = %session.counterparty, error = %e, "Responder session ended");
    }
}

/// One end of an in-process session
pub struct ChannelSession {
    counterparty: Party,
    outbox: mpsc::Sender<FlowMessage>,
    inbox: mpsc::Receiver<FlowMessage>,
}

impl ChannelSession {
    fn new(
        counterparty: Party,
        outbox: mpsc::Sender<FlowMessage>,
        inbox: mpsc::Receiver<FlowMessage>,
    ) -> Self {
        Self {
            counterparty,
            outbox,
            inbox,
        }
    }
}

#[async_trait]
impl FlowSession for ChannelSession {
    fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    async fn send(&mut self, message: FlowMessage) -> Result<(), SessionError> {
        self.outbox
            .send(message)
            .await
            .map_err(|_| SessionError::Disconnected(self.counterparty.name.clone()))
    }

    async fn receive(&mut self) -> Result<FlowMessage, SessionError> {
        self.inbox
            .recv()
            .await
            .ok_or_else(|| SessionError::Disconnected(self.counterparty.name.clone()))
    }
}
