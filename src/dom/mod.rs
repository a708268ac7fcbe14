//! Parsed snapshot of a content document.
//!
//! Only what the viewer cares about survives parsing: the document title
//! and its `<a>` elements. The headless host renders its frame from this,
//! and the CLI reports on saved pages with it.

pub mod parser;

use crate::host::Anchor;

/// Parsed document with metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomTree {
    pub url: String,
    pub title: String,
    anchors: Vec<Anchor>,
}

impl DomTree {
    pub fn new(url: &str, title: impl Into<String>, anchors: Vec<Anchor>) -> Self {
        Self {
            url: url.to_string(),
            title: title.into(),
            anchors,
        }
    }

    /// Document with no content, as shown by a frame before anything loads.
    pub fn blank(url: &str) -> Self {
        Self::new(url, String::new(), Vec::new())
    }

    /// Anchors in document order; ids are their indices.
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn anchor(&self, id: usize) -> Option<&Anchor> {
        self.anchors.get(id)
    }
}
