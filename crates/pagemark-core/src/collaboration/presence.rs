//! Ephemeral per-peer presence.

use super::protocol::{CursorPosition, PresenceState, UserInfo};
use crate::clock::PeerId;
use crate::element::{ElementId, SerializableColor};
use std::collections::BTreeMap;

/// Colors handed to peers that did not announce one.
const PALETTE: [SerializableColor; 6] = [
    SerializableColor::new(230, 57, 70, 255),
    SerializableColor::new(29, 53, 87, 255),
    SerializableColor::new(42, 157, 143, 255),
    SerializableColor::new(244, 162, 97, 255),
    SerializableColor::new(131, 56, 236, 255),
    SerializableColor::new(58, 134, 255, 255),
];

fn palette_color(peer: &PeerId) -> SerializableColor {
    let hash = peer
        .as_str()
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// A remote participant as seen locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Collaborator {
    pub id: PeerId,
    pub display_name: String,
    pub color: SerializableColor,
    pub cursor: Option<CursorPosition>,
    pub selected_element_ids: Vec<ElementId>,
}

impl Collaborator {
    pub fn new(id: PeerId) -> Self {
        Self {
            display_name: id.to_string(),
            color: palette_color(&id),
            id,
            cursor: None,
            selected_element_ids: Vec::new(),
        }
    }

    fn apply_user(&mut self, user: &UserInfo) {
        self.display_name = user.name.clone();
        self.color = user.color;
    }
}

/// Collaborators keyed by peer id.
///
/// Entries live until the peer's session ends; nothing expires on a timer.
#[derive(Debug, Clone, Default)]
pub struct PresenceMap {
    peers: BTreeMap<PeerId, Collaborator>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a peer from its broadcast state.
    pub fn upsert(&mut self, peer: &PeerId, state: &PresenceState) -> &Collaborator {
        let entry = self
            .peers
            .entry(peer.clone())
            .or_insert_with(|| Collaborator::new(peer.clone()));
        entry.cursor = state.cursor;
        entry.selected_element_ids = state.selected_element_ids.clone();
        if let Some(user) = &state.user {
            entry.apply_user(user);
        }
        entry
    }

    /// Register a peer that announced itself.
    pub fn join(&mut self, peer: &PeerId, user: Option<&UserInfo>) {
        let entry = self
            .peers
            .entry(peer.clone())
            .or_insert_with(|| Collaborator::new(peer.clone()));
        if let Some(user) = user {
            entry.apply_user(user);
        }
    }

    pub fn remove(&mut self, peer: &PeerId) -> Option<Collaborator> {
        self.peers.remove(peer)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&Collaborator> {
        self.peers.get(peer)
    }

    /// Collaborators in peer-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Collaborator> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
