//! Editor-wide selection state.

use crate::id::{ObjectId, TackId};

/// Which objects are active, and which tack (if any) is mid-drag.
///
/// Navigation only ever produces a single active object, but the storage is a
/// list so hosts can extend it to multi-select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: Vec<ObjectId>,
    dragging: Option<TackId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with `id`.
    pub fn select_only(&mut self, id: ObjectId) {
        self.active.clear();
        self.active.push(id);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn active(&self) -> &[ObjectId] {
        &self.active
    }

    /// The selected object when exactly one is selected.
    pub fn single(&self) -> Option<ObjectId> {
        match self.active.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.active.contains(&id)
    }

    /// Drop `id` from the selection and from the drag slot.
    pub fn remove(&mut self, id: ObjectId) {
        self.active.retain(|a| *a != id);
        if id.as_tack().is_some() && self.dragging == id.as_tack() {
            self.dragging = None;
        }
    }

    pub fn dragging(&self) -> Option<TackId> {
        self.dragging
    }

    pub fn set_dragging(&mut self, id: Option<TackId>) {
        self.dragging = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TrackId;

    #[test]
    fn test_select_only_replaces() {
        let mut selection = Selection::new();
        let a = ObjectId::from(TackId::new());
        let b = ObjectId::from(TrackId::new());
        selection.select_only(a);
        selection.select_only(b);
        assert_eq!(selection.active(), &[b]);
        assert_eq!(selection.single(), Some(b));
        assert!(!selection.contains(a));
    }

    #[test]
    fn test_remove_clears_drag_slot() {
        let mut selection = Selection::new();
        let tack = TackId::new();
        selection.select_only(tack.into());
        selection.set_dragging(Some(tack));

        selection.remove(tack.into());
        assert!(selection.is_empty());
        assert_eq!(selection.dragging(), None);
    }

    #[test]
    fn test_remove_other_keeps_drag_slot() {
        let mut selection = Selection::new();
        let tack = TackId::new();
        selection.set_dragging(Some(tack));
        selection.remove(TackId::new().into());
        assert_eq!(selection.dragging(), Some(tack));
    }

    #[test]
    fn test_single_is_none_when_empty() {
        let mut selection = Selection::new();
        assert_eq!(selection.single(), None);
        selection.select_only(TrackId::new().into());
        selection.clear();
        assert!(selection.is_empty());
    }
}
