//! Append-only tuple slots

use crate::expr::{RowId, Tuple};

/// Table storage: a slot per row id, tombstoned on delete
///
/// Slots are never reused, so row ids stay valid for a tuple's lifetime.
#[derive(Debug, Default)]
pub struct Table {
    name: String,
    slots: Vec<Option<Tuple>>,
    indexes: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of slots, tombstones included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of live tuples
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Row id the next appended tuple receives
    pub fn next_row_id(&self) -> RowId {
        self.slots.len() as RowId
    }

    /// Live tuple at `row_id`
    pub fn get(&self, row_id: RowId) -> Option<&Tuple> {
        usize::try_from(row_id)
            .ok()
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// Appends a tuple, stamping its row id
    pub fn push(&mut self, mut tuple: Tuple) -> RowId {
        let row_id = self.next_row_id();
        tuple.set_row_id(row_id);
        self.slots.push(Some(tuple));
        row_id
    }

    /// Stores a tuple at a specific row id, growing the table with
    /// tombstones as needed. Fails if the slot is live.
    pub fn place(&mut self, row_id: RowId, mut tuple: Tuple) -> Result<(), Tuple> {
        let Ok(i) = usize::try_from(row_id) else {
            return Err(tuple);
        };
        if self.slots.get(i).is_some_and(Option::is_some) {
            return Err(tuple);
        }
        if self.slots.len() <= i {
            self.slots.resize(i + 1, None);
        }
        tuple.set_row_id(row_id);
        self.slots[i] = Some(tuple);
        Ok(())
    }

    /// Replaces a live tuple, returning the previous version
    pub fn replace(&mut self, row_id: RowId, mut tuple: Tuple) -> Option<Tuple> {
        let slot = self.slot_mut(row_id)?;
        tuple.set_row_id(row_id);
        slot.replace(tuple)
    }

    /// Tombstones a live tuple, returning it
    pub fn tombstone(&mut self, row_id: RowId) -> Option<Tuple> {
        self.slot_mut(row_id)?.take()
    }

    fn slot_mut(&mut self, row_id: RowId) -> Option<&mut Option<Tuple>> {
        let i = usize::try_from(row_id).ok()?;
        self.slots.get_mut(i).filter(|slot| slot.is_some())
    }

    /// Live tuples in row-id order
    pub fn iter_live(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Names of the table's indexes in declaration order
    pub fn index_names(&self) -> &[String] {
        &self.indexes
    }

    pub(crate) fn add_index(&mut self, name: impl Into<String>) {
        self.indexes.push(name.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> Tuple {
        Tuple::new().with("id", id)
    }

    #[test]
    fn test_push_assigns_sequential_row_ids() {
        let mut table = Table::new("users");
        assert_eq!(table.push(row(1)), 0);
        assert_eq!(table.push(row(2)), 1);
        assert_eq!(table.get(1).unwrap().row_id(), Some(1));
    }

    #[test]
    fn test_tombstone_keeps_slot() {
        let mut table = Table::new("users");
        table.push(row(1));
        table.push(row(2));

        assert_eq!(table.tombstone(0), Some(row(1)));
        assert_eq!(table.tombstone(0), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.live_count(), 1);
        assert_eq!(table.push(row(3)), 2);
    }

    #[test]
    fn test_replace_only_live_slots() {
        let mut table = Table::new("users");
        table.push(row(1));
        assert_eq!(table.replace(0, row(9)), Some(row(1)));
        table.tombstone(0);
        assert_eq!(table.replace(0, row(10)), None);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_place_grows_with_tombstones() {
        let mut table = Table::new("users");
        table.place(3, row(4)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.live_count(), 1);
        assert!(table.place(3, row(5)).is_err());
        let live: Vec<_> = table.iter_live().collect();
        assert_eq!(live, vec![&row(4)]);
    }
}
