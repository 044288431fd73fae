//! Drawing History Store
//!
//! The ordered, in-memory history of every accepted drawing element. Readers
//! always get a complete copy; appends and resets take the write lock so no
//! reader ever sees a half-applied change.

use tokio::sync::RwLock;

use super::types::{DrawingElement, Line};

/// Ordered history of accepted drawing elements
#[derive(Debug, Default)]
pub struct HistoryStore {
    elements: RwLock<Vec<DrawingElement>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element to the end of the history
    pub async fn append(&self, element: DrawingElement) {
        self.elements.write().await.push(element);
    }

    /// Copy of the whole history, in append order
    pub async fn snapshot(&self) -> Vec<DrawingElement> {
        self.elements.read().await.clone()
    }

    /// All line strokes, in append order
    pub async fn lines(&self) -> Vec<Line> {
        self.elements
            .read()
            .await
            .iter()
            .filter_map(DrawingElement::as_line)
            .cloned()
            .collect()
    }

    /// Drop the entire history
    pub async fn reset(&self) {
        let mut elements = self.elements.write().await;
        let cleared = elements.len();
        elements.clear();
        drop(elements);

        tracing::info!(cleared, "Canvas history reset");
    }

    pub async fn len(&self) -> usize {
        self.elements.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.elements.read().await.is_empty()
    }
}
