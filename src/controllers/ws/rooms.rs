use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::SessionId;

use super::messages::ServerEvent;

/// Per-session fan-out registry for the message transport: a mapping from
/// SessionId to the set of connection handles. Joining is O(1);
/// disconnection removes the handle from every room it joined.
#[derive(Default)]
pub struct Rooms {
    rooms: DashMap<SessionId, Vec<UnboundedSender<ServerEvent>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, session_id: SessionId, sender: UnboundedSender<ServerEvent>) {
        self.rooms.entry(session_id).or_default().push(sender);
    }

    /// Removes `sender` from `session_id`'s room. Called once per joined
    /// room when a connection disconnects.
    pub fn leave(&self, session_id: SessionId, sender: &UnboundedSender<ServerEvent>) {
        if let Some(mut senders) = self.rooms.get_mut(&session_id) {
            senders.retain(|s| !s.same_channel(sender));
        }
    }

    /// Broadcasts `event` to every connection joined to `session_id`'s
    /// room, dropping any sender whose receiver has already gone away.
    pub fn broadcast(&self, session_id: SessionId, event: ServerEvent) {
        if let Some(mut senders) = self.rooms.get_mut(&session_id) {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }
}
