//! Purpose: Reduce step that folds one worker's table into another of the same shape.
//! Exports: `GatherStats`, `Table::combine_with`.
//! Role: Used after sharded accumulation; one coordinating thread gathers finished tables.
//! Invariants: Nothing is written unless the two tables have the same format.
//! Invariants: Last writer wins per cell; overwrites are logged, never errors.
//! Notes: Not commutative under key overlap; sums and averages need explicit arithmetic.

use tracing::warn;

use crate::core::error::{Error, ErrorKind};
use crate::core::table::Table;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GatherStats {
    /// Rows of the incoming table that were new to the receiving table.
    pub rows_added: usize,
    pub cells_copied: usize,
    pub cells_overwritten: usize,
}

impl GatherStats {
    pub fn absorb(&mut self, other: GatherStats) {
        self.rows_added += other.rows_added;
        self.cells_copied += other.cells_copied;
        self.cells_overwritten += other.cells_overwritten;
    }
}

impl Table {
    /// Copies every stored cell of `other` into `self`.
    pub fn combine_with(&mut self, other: &Table) -> Result<GatherStats, Error> {
        if let Some(mismatch) = self.format_mismatch(other) {
            return Err(Error::new(ErrorKind::Mismatch)
                .with_message(format!(
                    "cannot combine table '{}': {mismatch}",
                    self.name()
                ))
                .with_hint("Only tables produced by the same tool configuration can be gathered."));
        }

        let mut stats = GatherStats::default();
        for (_, key) in other.rows() {
            if !self.contains_key(key) {
                stats.rows_added += 1;
            }
            self.touch(key);
        }

        for theirs in other.columns() {
            let idx = self.column_index(theirs.name())?;
            for (their_slot, key) in other.rows() {
                let Some(value) = theirs.stored(their_slot) else {
                    continue;
                };
                let slot = self.touch(key);
                let column = &mut self.columns_mut()[idx];
                if column.contains(slot) {
                    warn!(
                        table = %other.name(),
                        column = theirs.name(),
                        key = %key,
                        "overwriting row during gather"
                    );
                    stats.cells_overwritten += 1;
                } else {
                    stats.cells_copied += 1;
                }
                column.put(slot, value.clone());
            }
        }
        Ok(stats)
    }
}
