//! Collaboration management for real-time multi-user editing.
//!
//! Local operations are queued as JSON for the host's transport to send;
//! incoming JSON is parsed into [`CollabEvent`]s. Merging remote operations
//! into the element store is done by the editing session so that it is
//! serialized with local input.

mod presence;
mod protocol;

pub use presence::{Collaborator, PresenceMap};
pub use protocol::{CollabEvent, CollabMessage, CursorPosition, PresenceState, UserInfo};

use crate::clock::PeerId;
use crate::element::ElementId;
use crate::store::StampedOp;

/// Presence tracking and the outgoing message queue for one peer.
#[derive(Debug)]
pub struct CollaborationManager {
    local_peer: PeerId,
    /// Whether messages are sent and received.
    enabled: bool,
    /// What this peer broadcasts about itself.
    presence: PresenceState,
    collaborators: PresenceMap,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl CollaborationManager {
    /// Create a disabled manager for `local_peer`.
    pub fn new(local_peer: PeerId) -> Self {
        Self {
            local_peer,
            enabled: false,
            presence: PresenceState::default(),
            collaborators: PresenceMap::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.local_peer
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start collaborating and announce this peer.
    pub fn join(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.queue(&CollabMessage::PeerJoined {
            peer_id: self.local_peer.clone(),
            user: self.presence.user.clone(),
        });
        log::info!("collaboration enabled for {}", self.local_peer);
    }

    /// Announce departure and stop collaborating.
    pub fn leave(&mut self) {
        if !self.enabled {
            return;
        }
        self.queue(&CollabMessage::PeerLeft {
            peer_id: self.local_peer.clone(),
        });
        self.enabled = false;
        self.collaborators.clear();
        log::info!("collaboration disabled for {}", self.local_peer);
    }

    /// Stop immediately, discarding anything not yet sent.
    pub fn shutdown(&mut self) {
        self.enabled = false;
        self.outgoing.clear();
        self.collaborators.clear();
    }

    pub fn collaborators(&self) -> &PresenceMap {
        &self.collaborators
    }

    pub fn presence(&self) -> &PresenceState {
        &self.presence
    }

    fn queue(&mut self, msg: &CollabMessage) {
        if !self.enabled {
            return;
        }
        match msg.to_json() {
            Ok(json) => self.outgoing.push(json),
            Err(err) => log::warn!("failed to encode collaboration message: {err}"),
        }
    }

    /// Queue local operations for broadcast.
    pub fn broadcast_ops(&mut self, ops: &[StampedOp]) {
        for op in ops {
            self.queue(&CollabMessage::Operation {
                operation: op.clone(),
            });
        }
    }

    fn queue_presence(&mut self) {
        self.queue(&CollabMessage::Presence {
            peer_id: self.local_peer.clone(),
            state: self.presence.clone(),
        });
    }

    /// Update the local cursor; `None` when the pointer left the document.
    pub fn set_cursor(&mut self, cursor: Option<CursorPosition>) {
        self.presence.cursor = cursor;
        self.queue_presence();
    }

    /// Update the locally selected elements shown to peers.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let mut ids: Vec<ElementId> = ids.into_iter().collect();
        ids.sort();
        if ids == self.presence.selected_element_ids {
            return;
        }
        self.presence.selected_element_ids = ids;
        self.queue_presence();
    }

    /// Set the display name and color shown to peers.
    pub fn set_user_info(&mut self, user: UserInfo) {
        self.presence.user = Some(user);
        self.queue_presence();
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Handle an incoming message.
    ///
    /// Malformed JSON, messages while disabled and echoes of our own
    /// messages yield `None`.
    pub fn handle_message(&mut self, json: &str) -> Option<CollabEvent> {
        if !self.enabled {
            log::debug!("collaboration disabled, incoming message dropped");
            return None;
        }
        let msg = match CollabMessage::from_json(json) {
            Ok(msg) => msg,
            Err(err) => {
                log::warn!("malformed collaboration message ignored: {err}");
                return None;
            }
        };

        match msg {
            CollabMessage::Presence { peer_id, .. } | CollabMessage::PeerJoined { peer_id, .. }
                if peer_id == self.local_peer =>
            {
                None
            }
            CollabMessage::Presence { peer_id, state } => {
                self.collaborators.upsert(&peer_id, &state);
                Some(CollabEvent::PresenceUpdated { peer_id })
            }
            CollabMessage::Operation { operation } => {
                if operation.author_id == self.local_peer {
                    return None;
                }
                Some(CollabEvent::Operation(operation))
            }
            CollabMessage::PeerJoined { peer_id, user } => {
                self.collaborators.join(&peer_id, user.as_ref());
                log::info!("peer {peer_id} joined");
                Some(CollabEvent::PeerJoined { peer_id })
            }
            CollabMessage::PeerLeft { peer_id } => {
                self.collaborators.remove(&peer_id);
                log::info!("peer {peer_id} left");
                Some(CollabEvent::PeerLeft { peer_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Stamp;
    use crate::store::ElementOp;

    fn remote_presence(peer: &str) -> String {
        CollabMessage::Presence {
            peer_id: PeerId::from(peer),
            state: PresenceState::default(),
        }
        .to_json()
        .unwrap()
    }

    #[test]
    fn test_disabled_by_default() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        assert!(!manager.is_enabled());
        manager.set_cursor(None);
        assert!(!manager.has_outgoing());
        assert!(manager.handle_message(&remote_presence("you")).is_none());
    }

    #[test]
    fn test_join_announces() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        manager.join();
        let out = manager.take_outgoing();
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("\"peer_joined\""));
        assert!(!manager.has_outgoing());
    }

    #[test]
    fn test_presence_upsert_and_prune() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        manager.join();
        let event = manager.handle_message(&remote_presence("you"));
        assert_eq!(
            event,
            Some(CollabEvent::PresenceUpdated {
                peer_id: PeerId::from("you")
            })
        );
        assert_eq!(manager.collaborators().len(), 1);

        let left = CollabMessage::PeerLeft {
            peer_id: PeerId::from("you"),
        }
        .to_json()
        .unwrap();
        manager.handle_message(&left);
        assert!(manager.collaborators().is_empty());
    }

    #[test]
    fn test_own_echo_is_ignored() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        manager.join();
        assert!(manager.handle_message(&remote_presence("me")).is_none());
        let echo = CollabMessage::Operation {
            operation: StampedOp::new(
                Stamp::new(1, PeerId::from("me")),
                ElementOp::Remove {
                    id: uuid::Uuid::new_v4(),
                    page_index: 0,
                },
            ),
        }
        .to_json()
        .unwrap();
        assert!(manager.handle_message(&echo).is_none());
    }

    #[test]
    fn test_malformed_json_is_ignored() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        manager.join();
        assert!(manager.handle_message("{not json").is_none());
        assert!(manager.handle_message(r#"{"type":"mystery"}"#).is_none());
    }

    #[test]
    fn test_selection_presence_deduplicated() {
        let mut manager = CollaborationManager::new(PeerId::from("me"));
        manager.join();
        manager.take_outgoing();
        let id = uuid::Uuid::new_v4();
        manager.set_selection([id]);
        manager.set_selection([id]);
        assert_eq!(manager.take_outgoing().len(), 1);
    }
}
