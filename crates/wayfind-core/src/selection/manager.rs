use std::sync::Arc;

use crate::geometry::Envelope;
use crate::search::ResultItem;

/// The currently highlighted subset of a result set.
///
/// Results are held by `Arc` and compared by id, so selecting the same
/// result twice leaves the set unchanged.
#[derive(Debug, Default, Clone)]
pub struct SelectionManager {
    selected: Vec<Arc<ResultItem>>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every highlight. Idempotent.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Highlights `result`. Returns `true` if the selection changed.
    pub fn select(&mut self, result: Arc<ResultItem>) -> bool {
        if self.is_selected(&result.id) {
            return false;
        }
        self.selected.push(result);
        true
    }

    /// Highlights every result in `results`; returns how many were added.
    pub fn select_all<'a>(&mut self, results: impl IntoIterator<Item = &'a Arc<ResultItem>>) -> usize {
        results
            .into_iter()
            .filter(|result| self.select(Arc::clone(result)))
            .count()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|r| r.id == id)
    }

    /// Selected results in selection order.
    pub fn selected(&self) -> &[Arc<ResultItem>] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Union of the selected geometries' extents; `None` when nothing is
    /// selected.
    pub fn bounding_extent(&self) -> Option<Envelope> {
        self.selected
            .iter()
            .filter_map(|r| r.geometry.extent())
            .reduce(|acc, e| acc.union(&e))
    }
}
