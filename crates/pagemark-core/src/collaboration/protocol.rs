//! Wire messages exchanged between peers.
//!
//! The transport is external; it only has to deliver these JSON strings
//! FIFO per peer.

use crate::clock::PeerId;
use crate::element::{ElementId, SerializableColor};
use crate::store::StampedOp;
use serde::{Deserialize, Serialize};

/// Messages sent and received over the collaboration transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollabMessage {
    /// Cursor and selection of a peer.
    Presence {
        peer_id: PeerId,
        #[serde(flatten)]
        state: PresenceState,
    },
    /// A replicated element mutation.
    Operation { operation: StampedOp },
    /// A peer joined the session.
    PeerJoined {
        peer_id: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<UserInfo>,
    },
    /// A peer's session ended.
    PeerLeft { peer_id: PeerId },
}

impl CollabMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Cursor location on a page (page space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub page_index: usize,
    pub x: f64,
    pub y: f64,
}

/// Display name and color of a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub color: SerializableColor,
}

/// Ephemeral state one peer broadcasts about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    #[serde(default)]
    pub selected_element_ids: Vec<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// What an incoming message did.
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// A peer's presence entry was created or updated.
    PresenceUpdated { peer_id: PeerId },
    /// A remote operation arrived and should be applied to the store.
    Operation(StampedOp),
    PeerJoined { peer_id: PeerId },
    PeerLeft { peer_id: PeerId },
}
