//! In-process transport for tests and the demo binary.
//!
//! A `LoopbackHub` plays the part of the pub/sub service: it keeps the
//! session directory and one unbounded channel per connected endpoint.
//! Endpoints drain their channel with `try_recv` inside `poll`, so nothing
//! here needs a running async runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::transport::{
    DirectoryEntry, HostedSession, JoinedSession, ListenerId, Result, SessionMetadata,
    Transport, TransportError, TransportEvent,
};

/// Operation to fail on its next call, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Host,
    Join,
    List,
    Send,
}

#[derive(Debug)]
struct HubSession {
    metadata: SessionMetadata,
    members: Vec<String>,
}

#[derive(Debug, Default)]
struct HubState {
    sessions: HashMap<String, HubSession>,
    /// Hosting order, so listings are stable.
    session_order: Vec<String>,
    endpoints: HashMap<String, UnboundedSender<TransportEvent>>,
    next_client: u64,
    next_session: u64,
    fail_next: Option<FailOn>,
}

impl HubState {
    fn take_failure(&mut self, op: FailOn) -> bool {
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return true;
        }
        false
    }

    fn deliver(&self, recipients: &[String], event: &TransportEvent) {
        for client_id in recipients {
            if let Some(tx) = self.endpoints.get(client_id) {
                // A closed receiver means the endpoint is gone.
                let _ = tx.send(event.clone());
            }
        }
    }

    fn remove_member(&mut self, session_id: &str, client_id: &str) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        session.members.retain(|m| m != client_id);
        let remaining = session.members.clone();

        if remaining.is_empty() {
            self.sessions.remove(session_id);
            self.session_order.retain(|id| id != session_id);
            info!("Loopback session {} closed", session_id);
        } else {
            self.deliver(
                &remaining,
                &TransportEvent::Leaved {
                    client_id: client_id.to_string(),
                },
            );
        }
    }
}

/// Shared registry behind every loopback endpoint.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    state: Rc<RefCell<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new endpoint whose identity lives in `namespace`.
    pub fn connect(&self, namespace: &str) -> LoopbackTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        let client_id = {
            let mut state = self.state.borrow_mut();
            state.next_client += 1;
            let client_id = format!("client-{}", state.next_client);
            state.endpoints.insert(client_id.clone(), tx);
            client_id
        };
        debug!("Loopback endpoint {} connected", client_id);

        LoopbackTransport {
            hub: self.clone(),
            client_id,
            namespace: namespace.to_string(),
            session_id: None,
            rx,
            listener: None,
        }
    }

    /// Makes the next call of `op`, on any endpoint, fail.
    pub fn fail_next(&self, op: FailOn) {
        self.state.borrow_mut().fail_next = Some(op);
    }

    pub fn session_count(&self) -> usize {
        self.state.borrow().sessions.len()
    }

    pub fn members(&self, session_id: &str) -> Vec<String> {
        self.state
            .borrow()
            .sessions
            .get(session_id)
            .map(|s| s.members.clone())
            .unwrap_or_default()
    }
}

/// One participant's connection to a `LoopbackHub`.
#[derive(Debug)]
pub struct LoopbackTransport {
    hub: LoopbackHub,
    client_id: String,
    namespace: String,
    session_id: Option<String>,
    rx: UnboundedReceiver<TransportEvent>,
    listener: Option<ListenerId>,
}

impl LoopbackTransport {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

impl Transport for LoopbackTransport {
    fn host(&mut self, metadata: &SessionMetadata) -> Result<HostedSession> {
        let mut state = self.hub.state.borrow_mut();
        if state.take_failure(FailOn::Host) {
            return Err(TransportError::Host("injected failure".into()));
        }

        state.next_session += 1;
        let session_id = format!("session-{}", state.next_session);
        state.sessions.insert(
            session_id.clone(),
            HubSession {
                metadata: metadata.clone(),
                members: vec![self.client_id.clone()],
            },
        );
        state.session_order.push(session_id.clone());
        self.session_id = Some(session_id.clone());

        info!(
            "Loopback session {} hosted by {} ({})",
            session_id, self.client_id, metadata.display_name
        );
        Ok(HostedSession {
            session_id,
            client_id: self.client_id.clone(),
        })
    }

    fn join(&mut self, session_id: &str, _metadata: &SessionMetadata) -> Result<JoinedSession> {
        let mut state = self.hub.state.borrow_mut();
        if state.take_failure(FailOn::Join) {
            return Err(TransportError::Join("injected failure".into()));
        }

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| TransportError::SessionNotFound(session_id.to_string()))?;
        if session.members.len() >= session.metadata.max_clients {
            return Err(TransportError::SessionFull(session_id.to_string()));
        }

        let existing_clients = session.members.clone();
        session.members.push(self.client_id.clone());
        state.deliver(
            &existing_clients,
            &TransportEvent::Joined {
                client_id: self.client_id.clone(),
            },
        );
        self.session_id = Some(session_id.to_string());

        info!("Loopback endpoint {} joined {}", self.client_id, session_id);
        Ok(JoinedSession {
            session_id: session_id.to_string(),
            client_id: self.client_id.clone(),
            existing_clients,
        })
    }

    fn listen(&mut self) -> Result<ListenerId> {
        let id = ListenerId(1);
        self.listener = Some(id);
        Ok(id)
    }

    fn send_game_message(&mut self, document: &Value) -> Result<()> {
        let session_id = self.session_id.as_ref().ok_or(TransportError::NotConnected)?;
        let mut state = self.hub.state.borrow_mut();
        if state.take_failure(FailOn::Send) {
            return Err(TransportError::Send("injected failure".into()));
        }

        let recipients: Vec<String> = state
            .sessions
            .get(session_id)
            .ok_or(TransportError::NotConnected)?
            .members
            .iter()
            .filter(|m| **m != self.client_id)
            .cloned()
            .collect();
        state.deliver(
            &recipients,
            &TransportEvent::Game {
                sender: self.client_id.clone(),
                document: document.clone(),
            },
        );
        Ok(())
    }

    fn list_public_sessions(&mut self) -> Result<Vec<DirectoryEntry>> {
        let mut state = self.hub.state.borrow_mut();
        if state.take_failure(FailOn::List) {
            return Err(TransportError::List("injected failure".into()));
        }

        let entries = state
            .session_order
            .iter()
            .filter_map(|id| state.sessions.get(id).map(|s| (id, s)))
            .filter(|(_, s)| s.metadata.public && s.metadata.namespace == self.namespace)
            .map(|(id, s)| DirectoryEntry {
                id: id.clone(),
                name: s.metadata.display_name.clone(),
                clients: s.members.clone(),
                max_clients: s.metadata.max_clients,
            })
            .collect();
        Ok(entries)
    }

    fn poll(&mut self, on_event: &mut dyn FnMut(TransportEvent)) {
        if self.listener.is_none() {
            return;
        }
        while let Ok(event) = self.rx.try_recv() {
            on_event(event);
        }
    }

    fn leave(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            debug!("Loopback endpoint {} leaving {}", self.client_id, session_id);
            self.hub
                .state
                .borrow_mut()
                .remove_member(&session_id, &self.client_id);
        }
        self.listener = None;
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.leave();
        self.hub.state.borrow_mut().endpoints.remove(&self.client_id);
    }
}
