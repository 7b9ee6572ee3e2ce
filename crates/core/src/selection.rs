//! Multi-selection over the realized record order.
//!
//! Clicks address records by their index in the realized order. A plain
//! click toggles one record and becomes the anchor; an extending click
//! selects the inclusive range between the anchor and the clicked index on
//! top of the selection as it stood when the anchor was set. Repeated
//! extending clicks therefore replace the previous range rather than
//! accumulate.

use crate::record::{Record, RecordId};
use std::collections::HashSet;

/// Index-addressable sequence of record ids.
pub trait RealizedOrder {
    fn realized_len(&self) -> usize;
    fn id_at(&self, index: usize) -> Option<&RecordId>;
}

impl RealizedOrder for [RecordId] {
    fn realized_len(&self) -> usize {
        self.len()
    }

    fn id_at(&self, index: usize) -> Option<&RecordId> {
        self.get(index)
    }
}

impl RealizedOrder for [Record] {
    fn realized_len(&self) -> usize {
        self.len()
    }

    fn id_at(&self, index: usize) -> Option<&RecordId> {
        self.get(index).map(|record| &record.id)
    }
}

impl<T> RealizedOrder for Vec<T>
where
    [T]: RealizedOrder,
{
    fn realized_len(&self) -> usize {
        self.as_slice().realized_len()
    }

    fn id_at(&self, index: usize) -> Option<&RecordId> {
        self.as_slice().id_at(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: HashSet<RecordId>,
    /// Selection as it stood when the anchor was last set
    base: HashSet<RecordId>,
    anchor: Option<usize>,
    active: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether selection mode is on
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enter_mode(&mut self) {
        self.active = true;
    }

    /// Leaves selection mode, dropping the selected set and the anchor.
    pub fn exit_mode(&mut self) {
        self.clear();
        self.active = false;
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Handles a click at `index`. Returns false if `index` is outside the
    /// realized order.
    pub fn click<O>(&mut self, index: usize, extend: bool, order: &O) -> bool
    where
        O: RealizedOrder + ?Sized,
    {
        match (extend, self.anchor) {
            (true, Some(anchor)) => self.extend_to(anchor, index, order),
            _ => self.toggle(index, order),
        }
    }

    /// Flips the record at `index` and makes it the anchor.
    pub fn toggle<O>(&mut self, index: usize, order: &O) -> bool
    where
        O: RealizedOrder + ?Sized,
    {
        let Some(id) = order.id_at(index) else {
            return false;
        };
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
        self.base = self.selected.clone();
        self.anchor = Some(index);
        self.active = true;
        true
    }

    fn extend_to<O>(&mut self, anchor: usize, index: usize, order: &O) -> bool
    where
        O: RealizedOrder + ?Sized,
    {
        let len = order.realized_len();
        if index >= len {
            return false;
        }
        let (start, end) = if anchor <= index {
            (anchor, index)
        } else {
            (index, anchor)
        };
        let mut selected = self.base.clone();
        selected.extend((start..=end.min(len - 1)).filter_map(|i| order.id_at(i).cloned()));
        self.selected = selected;
        self.active = true;
        true
    }

    pub fn select_all<O>(&mut self, order: &O)
    where
        O: RealizedOrder + ?Sized,
    {
        self.selected = (0..order.realized_len())
            .filter_map(|i| order.id_at(i).cloned())
            .collect();
        self.base = self.selected.clone();
        self.active = true;
    }

    /// Empties the selection and drops the anchor; selection mode stays on.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.base.clear();
        self.anchor = None;
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.selected.iter()
    }

    /// Selected ids in realized order
    pub fn ordered_ids<O>(&self, order: &O) -> Vec<RecordId>
    where
        O: RealizedOrder + ?Sized,
    {
        (0..order.realized_len())
            .filter_map(|i| order.id_at(i))
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(n: usize) -> Vec<RecordId> {
        (0..n).map(|i| RecordId::new(format!("r{i}"))).collect()
    }

    fn selected_indices(selection: &Selection, order: &[RecordId]) -> Vec<usize> {
        (0..order.len())
            .filter(|&i| selection.is_selected(&order[i]))
            .collect()
    }

    #[test]
    fn test_toggle_sets_anchor() {
        let order = order(10);
        let mut selection = Selection::new();
        assert!(selection.click(3, false, &order));
        assert_eq!(selection.anchor(), Some(3));
        assert!(selection.is_active());
        assert_eq!(selected_indices(&selection, &order), vec![3]);

        selection.click(3, false, &order);
        assert!(selection.is_empty());
        assert_eq!(selection.anchor(), Some(3));
    }

    #[test]
    fn test_range_from_anchor() {
        let order = order(10);
        let mut selection = Selection::new();
        selection.click(3, false, &order);
        selection.click(7, true, &order);
        assert_eq!(selected_indices(&selection, &order), vec![3, 4, 5, 6, 7]);
        assert_eq!(selection.anchor(), Some(3));
    }

    #[test]
    fn test_range_replaces_previous_range() {
        let order = order(10);
        let mut selection = Selection::new();
        selection.click(3, false, &order);
        selection.click(7, true, &order);
        selection.click(1, true, &order);
        assert_eq!(selected_indices(&selection, &order), vec![1, 2, 3]);
    }

    #[test]
    fn test_range_keeps_earlier_toggles() {
        let order = order(10);
        let mut selection = Selection::new();
        selection.click(9, false, &order);
        selection.click(2, false, &order);
        selection.click(4, true, &order);
        assert_eq!(selected_indices(&selection, &order), vec![2, 3, 4, 9]);
    }

    #[test]
    fn test_extend_without_anchor_toggles() {
        let order = order(5);
        let mut selection = Selection::new();
        selection.click(2, true, &order);
        assert_eq!(selected_indices(&selection, &order), vec![2]);
        assert_eq!(selection.anchor(), Some(2));
    }

    #[test]
    fn test_out_of_range_click_ignored() {
        let order = order(5);
        let mut selection = Selection::new();
        assert!(!selection.click(5, false, &order));
        selection.click(1, false, &order);
        assert!(!selection.click(8, true, &order));
        assert_eq!(selected_indices(&selection, &order), vec![1]);
    }

    #[test]
    fn test_select_all_then_extend() {
        let order = order(4);
        let mut selection = Selection::new();
        selection.select_all(&order);
        assert_eq!(selection.len(), 4);
        assert_eq!(selection.ordered_ids(&order), order);
    }

    #[test]
    fn test_exit_mode_clears_anchor() {
        let order = order(5);
        let mut selection = Selection::new();
        selection.click(1, false, &order);
        selection.exit_mode();
        assert!(selection.is_empty());
        assert!(!selection.is_active());
        assert_eq!(selection.anchor(), None);

        // Extending after exit behaves like a fresh toggle
        selection.click(3, true, &order);
        assert_eq!(selected_indices(&selection, &order), vec![3]);
    }

    #[test]
    fn test_clear_keeps_mode() {
        let order = order(5);
        let mut selection = Selection::new();
        selection.click(1, false, &order);
        selection.clear();
        assert!(selection.is_empty());
        assert!(selection.is_active());
        assert_eq!(selection.anchor(), None);
    }

    #[test]
    fn test_works_over_records() {
        let records: Vec<Record> = (0..3).map(|i| Record::new(format!("r{i}"))).collect();
        let mut selection = Selection::new();
        selection.click(0, false, &records);
        selection.click(2, true, &records);
        assert_eq!(selection.len(), 3);
        assert!(selection.is_selected(&RecordId::from("r1")));
    }
}
