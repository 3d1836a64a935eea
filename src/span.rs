//! The span list: a doubly-linked sequence of contiguous word ranges partitioning
//! the managed region into holes and allocated blocks.
//!
//! Nodes live in an arena (`Vec<Span>`) and refer to each other by [`SpanHandle`]
//! rather than by raw pointer. Spans are only ever split (one hole becomes a smaller
//! hole plus an allocated block) or flag-flipped on free, never removed or merged,
//! so the arena only ever grows between `reset` calls and a handle stays valid for
//! the lifetime of the region it was issued for.

/// An index into a [`SpanList`]'s arena, standing in for a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanHandle(u16);

/// A contiguous run of words, either free (a hole) or allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Starting word index within the region.
    pub head: u16,
    /// Length in words. Always at least 1.
    pub size: u16,
    /// Whether this span is free.
    pub hole: bool,
    prev: Option<SpanHandle>,
    next: Option<SpanHandle>,
}

/// The span list for a single managed region.
///
/// Empty (no spans, no region) until [`reset`](SpanList::reset) installs the initial
/// single-hole span; [`clear`](SpanList::clear) returns it to that empty state.
#[derive(Debug, Default)]
pub(crate) struct SpanList {
    arena: Vec<Span>,
    head: Option<SpanHandle>,
}

impl SpanList {
    pub const fn new() -> Self {
        Self { arena: Vec::new(), head: None }
    }

    /// Discards any existing spans and installs a single hole `[0, word_count)`.
    ///
    /// `word_count` must be nonzero, as guaranteed by
    /// [`MemoryManager::initialize`](crate::MemoryManager::initialize)'s validation.
    pub fn reset(&mut self, word_count: u16) {
        debug_assert!(word_count >= 1);
        self.arena.clear();
        self.arena.push(Span { head: 0, size: word_count, hole: true, prev: None, next: None });
        self.head = Some(SpanHandle(0));
    }

    /// Discards all spans, returning to the empty (uninitialized) state.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn span(&self, handle: SpanHandle) -> &Span {
        &self.arena[handle.0 as usize]
    }

    fn span_mut(&mut self, handle: SpanHandle) -> &mut Span {
        &mut self.arena[handle.0 as usize]
    }

    /// Iterates the spans in ascending `head` order.
    pub fn iter(&self) -> SpanIter<'_> {
        SpanIter { list: self, next: self.head }
    }

    /// Finds the span whose `head` equals `head`, if any.
    pub fn find_by_head(&self, head: u16) -> Option<SpanHandle> {
        self.iter().find(|(_, span)| span.head == head).map(|(handle, _)| handle)
    }

    /// Allocates the first `words` words of the hole at `handle`, splitting off a
    /// trailing hole span for the remainder if the hole was larger than required.
    ///
    /// `handle` must refer to a hole with `size >= words`.
    pub fn split_and_allocate(&mut self, handle: SpanHandle, words: u16) {
        let span = self.span(handle);
        debug_assert!(span.hole);
        debug_assert!(span.size >= words);

        let remainder = span.size - words;
        let new_head = span.head + words;
        let old_next = span.next;

        {
            let span = self.span_mut(handle);
            span.hole = false;
            span.size = words;
        }

        if remainder > 0 {
            // The arena holds at most `N` spans and `N` fits in u16 (N <= 65535).
            let new_handle = SpanHandle(self.arena.len() as u16);
            self.arena.push(Span {
                head: new_head,
                size: remainder,
                hole: true,
                prev: Some(handle),
                next: old_next,
            });

            if let Some(next) = old_next {
                self.span_mut(next).prev = Some(new_handle);
            }
            self.span_mut(handle).next = Some(new_handle);
        }
    }

    /// Flags the allocated span at `handle` as a hole. Does not merge with
    /// neighboring holes; freed spans stay distinct until reused.
    ///
    /// `handle` must refer to an allocated span.
    pub fn free(&mut self, handle: SpanHandle) {
        let span = self.span_mut(handle);
        debug_assert!(!span.hole);
        span.hole = true;
    }

    /// Walks the list checking that it partitions `[0, word_count)` with no gaps,
    /// overlaps, or zero-sized spans. Used by tests and by the `fuzzing` feature.
    #[cfg(any(test, debug_assertions, feature = "fuzzing"))]
    pub fn debug_check_invariants(&self, word_count: u16) {
        if self.is_empty() {
            return;
        }

        let mut expected_head = 0u16;
        let mut visited = 0usize;

        for (_, span) in self.iter() {
            assert_eq!(span.head, expected_head, "span list has a gap or overlap at {expected_head}");
            assert!(span.size >= 1, "zero-sized span at head {}", span.head);
            expected_head += span.size;
            visited += 1;
            assert!(visited <= self.arena.len(), "span list cycle detected");
        }

        assert_eq!(expected_head, word_count, "span list does not cover the region exactly");
    }
}

/// Iterator over a [`SpanList`]'s spans in ascending `head` order.
#[derive(Clone)]
pub(crate) struct SpanIter<'a> {
    list: &'a SpanList,
    next: Option<SpanHandle>,
}

impl<'a> Iterator for SpanIter<'a> {
    type Item = (SpanHandle, &'a Span);

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        let span = self.list.span(cur);
        self.next = span.next;
        Some((cur, span))
    }
}
