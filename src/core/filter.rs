// Stateless read predicates applied before records reach a table.

/// Alignment start reported by records that were never placed.
pub const NO_ALIGNMENT_START: i32 = 0;

pub trait AlignedRecord {
    fn is_unmapped(&self) -> bool;
    fn alignment_start(&self) -> i32;
}

pub trait RecordFilter<R: ?Sized> {
    /// `true` drops the record.
    fn filter_out(&self, record: &R) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnmappedReadFilter;

impl<R: AlignedRecord + ?Sized> RecordFilter<R> for UnmappedReadFilter {
    fn filter_out(&self, record: &R) -> bool {
        record.is_unmapped() || record.alignment_start() == NO_ALIGNMENT_START
    }
}
