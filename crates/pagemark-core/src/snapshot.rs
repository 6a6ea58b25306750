//! Serializable session state.

use crate::element::EditableElement;
use crate::error::{EditError, EditResult};
use serde::{Deserialize, Serialize};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume an editing session.
///
/// Selection, the text-edit flag, presence and history are UI state and
/// are not part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub page_count: usize,
    pub elements: Vec<EditableElement>,
    /// Logical clock at the time of the snapshot.
    pub clock: u64,
}

impl SessionSnapshot {
    pub fn new(page_count: usize, elements: Vec<EditableElement>, clock: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            page_count,
            elements,
            clock,
        }
    }

    pub fn to_json(&self) -> EditResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot, rejecting versions this build does not know.
    pub fn from_json(json: &str) -> EditResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(EditError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}
