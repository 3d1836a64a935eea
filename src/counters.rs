//! Allocation statistics (`counters` feature).

/// Allocation statistics for a [`MemoryManager`](crate::MemoryManager).
///
/// Updated on `allocate`, `free`, `initialize`, and `shutdown`. Read immediately
/// or clone the struct rather than holding onto the reference, since it borrows
/// the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Counters {
    /// Number of currently outstanding allocations.
    pub allocation_count: usize,
    /// Total number of allocations made since the last `initialize`.
    pub total_allocation_count: u64,

    /// Sum of currently allocated spans' sizes, in words.
    pub allocated_words: usize,
    /// Total words ever allocated since the last `initialize`.
    pub total_allocated_words: u64,

    /// Words free for allocation right now.
    pub available_words: usize,
    /// Number of hole spans right now.
    pub hole_count: usize,

    /// Failed allocation attempts (no fitting hole) since the last `initialize`.
    pub failed_allocation_count: u64,
}

impl Counters {
    pub(crate) fn on_initialize(&mut self, word_count: u16) {
        *self = Counters { available_words: word_count as usize, hole_count: 1, ..Counters::default() };
    }

    pub(crate) fn on_shutdown(&mut self) {
        *self = Counters::default();
    }

    /// `split` is whether the consumed hole was larger than `words` and left a
    /// trailing hole behind; when it wasn't, the hole disappeared entirely and
    /// `hole_count` drops by one.
    pub(crate) fn on_allocate(&mut self, words: u16, split: bool) {
        let words = words as usize;
        self.allocation_count += 1;
        self.total_allocation_count += 1;
        self.allocated_words += words;
        self.total_allocated_words += words as u64;
        self.available_words -= words;
        if !split {
            self.hole_count -= 1;
        }
    }

    pub(crate) fn on_free(&mut self, words: u16) {
        let words = words as usize;
        self.allocation_count -= 1;
        self.allocated_words -= words;
        self.available_words += words;
        self.hole_count += 1;
    }

    pub(crate) fn on_failed_allocate(&mut self) {
        self.failed_allocation_count += 1;
    }
}

impl core::fmt::Display for Counters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            r#"Stat                  | Current             | Total
----------------------|---------------------|--------------------
# of Allocations      | {:>19} | {:>19}
# of Allocated Words  | {:>19} | {:>19}
# of Available Words  | {:>19} |                 N/A
# of Holes            | {:>19} |                 N/A
# of Failed Allocates |                 N/A | {:>19}"#,
            self.allocation_count,
            self.total_allocation_count,
            self.allocated_words,
            self.total_allocated_words,
            self.available_words,
            self.hole_count,
            self.failed_allocation_count,
        )
    }
}
