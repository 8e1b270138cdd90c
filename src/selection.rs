//! Selection tracking for completed jobs

use std::collections::HashSet;

use uuid::Uuid;

/// Set of job ids the user has marked for bulk export
///
/// The tracker itself is plain set math; the batch state gates mutations so
/// only ids of `done` jobs ever enter the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: HashSet<Uuid>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`
    pub fn toggle(&mut self, id: Uuid) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Replace the whole selection; not additive
    pub fn replace_with(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.selected = ids.into_iter().collect();
    }

    /// Empty the selection
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.selected.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_membership() {
        let mut tracker = SelectionTracker::new();
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        tracker.toggle(other);

        let before = tracker.clone();
        tracker.toggle(id);
        assert!(tracker.contains(&id));
        tracker.toggle(id);
        assert_eq!(tracker, before);
    }

    #[test]
    fn test_replace_is_not_additive() {
        let mut tracker = SelectionTracker::new();
        let stale = Uuid::new_v4();
        tracker.toggle(stale);

        let fresh: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        tracker.replace_with(fresh.clone());

        assert_eq!(tracker.len(), 3);
        assert!(!tracker.contains(&stale));
        for id in &fresh {
            assert!(tracker.contains(id));
        }
    }

    #[test]
    fn test_clear_empties_regardless_of_contents() {
        let mut tracker = SelectionTracker::new();
        tracker.replace_with((0..5).map(|_| Uuid::new_v4()));
        assert_eq!(tracker.len(), 5);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
