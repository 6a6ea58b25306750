//! Hand-off of the final element list to the document writer.

use crate::element::{EditableElement, FragmentId};
use crate::store::ElementStore;
use serde::{Deserialize, Serialize};

/// One content-stream text replacement the writer must perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextReplacement {
    pub page_index: usize,
    pub fragment_id: FragmentId,
    pub original_text: String,
    pub new_text: String,
    /// The fragment's original text matrix.
    pub transform: [f64; 6],
    pub font_name: String,
    pub font_size: f64,
    pub width: f64,
    pub height: f64,
}

impl TextReplacement {
    /// Build a replacement for a modified reconciled text element.
    pub fn from_element(element: &EditableElement) -> Option<Self> {
        let text = element.as_text()?;
        if !text.is_modified() {
            return None;
        }
        let source = text.source.as_ref()?;
        Some(Self {
            page_index: element.page_index(),
            fragment_id: source.fragment_id.clone(),
            original_text: source.original_text.clone(),
            new_text: text.text.clone(),
            transform: source.transform,
            font_name: source.font_name.clone(),
            font_size: text.font_size,
            width: source.width,
            height: source.height,
        })
    }
}

/// Everything the export consumer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub page_count: usize,
    /// All elements in insertion order.
    pub elements: Vec<EditableElement>,
    /// Modified original text only.
    pub replacements: Vec<TextReplacement>,
}

impl ExportBundle {
    pub fn from_store(store: &ElementStore) -> Self {
        Self {
            page_count: store.context().page_count(),
            elements: store.all().to_vec(),
            replacements: store
                .modified_text()
                .filter_map(TextReplacement::from_element)
                .collect(),
        }
    }

    /// User-added elements, i.e. everything that is not projected page text.
    pub fn annotations(&self) -> impl Iterator<Item = &EditableElement> {
        self.elements
            .iter()
            .filter(|e| e.as_text().is_none_or(|t| t.source.is_none()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
