// Remote-control relay: pairs one desktop game screen with one mobile controller.
//
// The hub only routes frames; it holds no game state. Each connected socket
// owns an outbox channel and the hub keeps at most one socket per role.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metrics;

pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    Desktop,
    Mobile,
}

impl ClientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientRole::Desktop => "desktop",
            ClientRole::Mobile => "mobile",
        }
    }
}

/// A relay frame: `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ControlMessage {
    Register(ClientRole),
    MobileCommand(Value),
    CharacterPosition(Value),
    GameStatus(Value),
    MobileConnected,
    MobileDisconnected,
}

impl ControlMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ControlMessage::Register(_) => "register",
            ControlMessage::MobileCommand(_) => "mobileCommand",
            ControlMessage::CharacterPosition(_) => "characterPosition",
            ControlMessage::GameStatus(_) => "gameStatus",
            ControlMessage::MobileConnected => "mobileConnected",
            ControlMessage::MobileDisconnected => "mobileDisconnected",
        }
    }
}

struct Slot {
    id: Uuid,
    outbox: Outbox,
}

#[derive(Default)]
struct Slots {
    desktop: Option<Slot>,
    mobile: Option<Slot>,
}

impl Slots {
    fn get(&self, role: ClientRole) -> &Option<Slot> {
        match role {
            ClientRole::Desktop => &self.desktop,
            ClientRole::Mobile => &self.mobile,
        }
    }

    fn get_mut(&mut self, role: ClientRole) -> &mut Option<Slot> {
        match role {
            ClientRole::Desktop => &mut self.desktop,
            ClientRole::Mobile => &mut self.mobile,
        }
    }

    /// Free whichever slot `id` holds, returning its role.
    fn release(&mut self, id: Uuid) -> Option<ClientRole> {
        for role in [ClientRole::Desktop, ClientRole::Mobile] {
            let slot = self.get_mut(role);
            if slot.as_ref().is_some_and(|s| s.id == id) {
                *slot = None;
                return Some(role);
            }
        }
        None
    }
}

/// Thread-safe routing table shared by all control sockets.
#[derive(Clone, Default)]
pub struct ControlHub {
    inner: Arc<Mutex<Slots>>,
}

impl ControlHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self, role: ClientRole) -> bool {
        self.slots().get(role).is_some()
    }

    /// Handle a raw text frame from socket `id`. Unparseable frames are dropped.
    pub fn handle_frame(&self, id: Uuid, outbox: &Outbox, frame: &str) {
        match serde_json::from_str::<ControlMessage>(frame) {
            Ok(msg) => self.dispatch(id, outbox, msg),
            Err(e) => tracing::debug!("Ignoring control frame from {id}: {e}"),
        }
    }

    pub fn dispatch(&self, id: Uuid, outbox: &Outbox, msg: ControlMessage) {
        match msg {
            ControlMessage::Register(role) => self.register(id, role, outbox.clone()),
            ControlMessage::MobileCommand(_) => self.forward(ClientRole::Desktop, &msg),
            ControlMessage::CharacterPosition(_) | ControlMessage::GameStatus(_) => {
                self.forward(ClientRole::Mobile, &msg)
            }
            ControlMessage::MobileConnected | ControlMessage::MobileDisconnected => {
                tracing::debug!("Ignoring server-only event {} from {id}", msg.event_name());
            }
        }
    }

    /// Claim a role slot. A newer registration replaces the previous holder.
    pub fn register(&self, id: Uuid, role: ClientRole, outbox: Outbox) {
        let mut slots = self.slots();
        if let Some(previous) = slots.release(id) {
            metrics::CONNECTED_CONTROLLERS
                .with_label_values(&[previous.as_str()])
                .set(0);
        }
        *slots.get_mut(role) = Some(Slot { id, outbox });
        metrics::CONNECTED_CONTROLLERS
            .with_label_values(&[role.as_str()])
            .set(1);
        tracing::info!("Control client {id} registered as {}", role.as_str());

        if role == ClientRole::Mobile {
            send_to(slots.get(ClientRole::Desktop), &ControlMessage::MobileConnected);
        }
    }

    pub fn disconnect(&self, id: Uuid) {
        let mut slots = self.slots();
        let Some(role) = slots.release(id) else {
            return;
        };
        metrics::CONNECTED_CONTROLLERS
            .with_label_values(&[role.as_str()])
            .set(0);
        tracing::info!("Control client {id} ({}) disconnected", role.as_str());

        if role == ClientRole::Mobile {
            send_to(slots.get(ClientRole::Desktop), &ControlMessage::MobileDisconnected);
        }
    }

    fn forward(&self, to: ClientRole, msg: &ControlMessage) {
        let slots = self.slots();
        if send_to(slots.get(to), msg) {
            metrics::RELAYED_MESSAGES_TOTAL
                .with_label_values(&[msg.event_name()])
                .inc();
        }
    }
}

fn send_to(slot: &Option<Slot>, msg: &ControlMessage) -> bool {
    let Some(slot) = slot else {
        return false;
    };
    match serde_json::to_string(msg) {
        Ok(frame) => slot.outbox.send(frame).is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode control frame: {e}");
            false
        }
    }
}
