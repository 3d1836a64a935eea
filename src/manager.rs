//! The region manager: the public entry point tying the region, span list, and
//! placement policy together.

use core::ptr::NonNull;

use crate::policy::PlacementPolicy;
use crate::region::Region;
use crate::snapshot::{Bitmap, HoleSnapshot};
use crate::span::SpanList;

#[cfg(feature = "counters")]
use crate::counters::Counters;

/// The largest region size this manager supports, in words (the snapshot
/// format's 16-bit fields require `N <= 65535`).
pub const MAX_WORD_COUNT: u16 = 65535;

/// A word-granular memory manager over a single fixed-size region.
///
/// Constructed *empty* ([`new`](MemoryManager::new)) with a word size and placement
/// policy; [`initialize`](MemoryManager::initialize) acquires the backing region and
/// installs the initial single hole. Not `Sync`; share across threads via the
/// `sync` feature's `Locked` wrapper instead.
pub struct MemoryManager {
    word_size: usize,
    policy: PlacementPolicy,
    region: Region,
    spans: SpanList,
    word_count: u16,
    #[cfg(feature = "counters")]
    counters: Counters,
}

impl core::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("word_size", &self.word_size)
            .field("word_count", &self.word_count)
            .field("initialized", &self.region.is_acquired())
            .field("policy", &self.policy)
            .finish()
    }
}

impl MemoryManager {
    /// Constructs an uninitialized manager with the given word size (bytes per
    /// word, must be nonzero) and placement policy. No region is acquired; call
    /// [`initialize`](MemoryManager::initialize) before allocating.
    pub fn new(word_size: usize, policy: PlacementPolicy) -> Self {
        debug_assert!(word_size >= 1);
        Self {
            word_size,
            policy,
            region: Region::empty(),
            spans: SpanList::new(),
            word_count: 0,
            #[cfg(feature = "counters")]
            counters: Counters::default(),
        }
    }

    /// Acquires a region of `word_count` words and installs a single hole
    /// covering it. Silently does nothing if `word_count` is `0` or exceeds
    /// [`MAX_WORD_COUNT`]. If already initialized, performs an implicit
    /// [`shutdown`](MemoryManager::shutdown) first.
    pub fn initialize(&mut self, word_count: u16) {
        if word_count == 0 || word_count > MAX_WORD_COUNT {
            return;
        }

        self.shutdown();

        let size_bytes = word_count as usize * self.word_size;
        if !self.region.acquire(size_bytes) {
            return;
        }

        self.spans.reset(word_count);
        self.word_count = word_count;

        #[cfg(feature = "counters")]
        self.counters.on_initialize(word_count);
    }

    /// Releases the region and discards the span list. A no-op if uninitialized.
    /// Safe to call multiple times.
    pub fn shutdown(&mut self) {
        if !self.is_initialized() {
            return;
        }

        self.region.release();
        self.spans.clear();
        self.word_count = 0;

        #[cfg(feature = "counters")]
        self.counters.on_shutdown();
    }

    pub fn is_initialized(&self) -> bool {
        self.region.is_acquired()
    }

    /// Allocates `size_bytes` bytes, rounding up to the nearest whole word.
    /// Returns `None` if uninitialized, if `size_bytes` is `0`, or if no hole
    /// satisfies the request (the span list is left unchanged in either case).
    pub fn allocate(&mut self, size_bytes: usize) -> Option<NonNull<u8>> {
        if !self.is_initialized() || size_bytes == 0 {
            return None;
        }

        let required_words = self.words_for(size_bytes)?;

        let snapshot = HoleSnapshot::build(&self.spans);
        let head = self.policy.place(required_words, &snapshot);
        if head < 0 {
            #[cfg(feature = "counters")]
            self.counters.on_failed_allocate();
            return None;
        }
        let head = head as u16;

        let handle = self.spans.find_by_head(head).expect("policy returned a head with no span");
        let hole_size = self.spans.span(handle).size;
        debug_assert!(self.spans.span(handle).hole, "policy chose an allocated span");
        debug_assert!(hole_size >= required_words, "policy chose an undersized hole");

        self.spans.split_and_allocate(handle, required_words);

        #[cfg(any(debug_assertions, feature = "fuzzing"))]
        self.spans.debug_check_invariants(self.word_count);

        #[cfg(feature = "counters")]
        self.counters.on_allocate(required_words, hole_size > required_words);

        let base = self.region.base();
        let offset = head as usize * self.word_size;
        // SAFETY: `offset` lies within the acquired region by construction.
        Some(unsafe { NonNull::new_unchecked(base.as_ptr().add(offset)) })
    }

    /// Frees the allocation at `addr`. A silent no-op if `addr` is not the base
    /// of any currently-allocated span (including if uninitialized). Does not
    /// merge the freed span with adjacent holes.
    pub fn free(&mut self, addr: NonNull<u8>) {
        let Some(head) = self.word_index_of(addr) else { return };
        let Some(handle) = self.spans.find_by_head(head) else { return };

        let span = self.spans.span(handle);
        if span.hole {
            return;
        }

        #[cfg(feature = "counters")]
        let freed_words = span.size;

        self.spans.free(handle);

        #[cfg(any(debug_assertions, feature = "fuzzing"))]
        self.spans.debug_check_invariants(self.word_count);

        #[cfg(feature = "counters")]
        self.counters.on_free(freed_words);
    }

    /// Replaces the placement policy, effective on the next allocation.
    pub fn set_allocator(&mut self, policy: PlacementPolicy) {
        self.policy = policy;
    }

    /// Writes the current hole list to `path` as ASCII `[h, s] - [h, s]` text
    /// Returns `0` on success, `-1` if the file cannot be opened or
    /// written, or if uninitialized.
    pub fn dump_memory_map(&self, path: impl AsRef<std::path::Path>) -> i32 {
        if !self.is_initialized() {
            return -1;
        }

        let snapshot = HoleSnapshot::build(&self.spans);
        crate::dump::dump_memory_map(path, &snapshot)
    }

    /// Returns the packed hole-list snapshot.
    pub fn get_list(&self) -> HoleSnapshot {
        HoleSnapshot::build(&self.spans)
    }

    /// Returns the packed per-word allocation bitmap.
    pub fn get_bitmap(&self) -> Bitmap {
        Bitmap::build(&self.spans, self.word_count)
    }

    /// Bytes per word.
    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// The region's base address. Only meaningful while initialized.
    pub fn memory_start(&self) -> Option<NonNull<u8>> {
        self.is_initialized().then(|| self.region.base())
    }

    /// The region's size in bytes (`N * W`).
    pub fn memory_limit(&self) -> usize {
        self.word_count as usize * self.word_size
    }

    /// Allocation statistics, gated on the `counters` feature.
    #[cfg(feature = "counters")]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    fn words_for(&self, size_bytes: usize) -> Option<u16> {
        let words = (size_bytes + self.word_size - 1) / self.word_size;
        u16::try_from(words).ok()
    }

    fn word_index_of(&self, addr: NonNull<u8>) -> Option<u16> {
        if !self.is_initialized() {
            return None;
        }

        let base = self.region.base().as_ptr() as usize;
        let addr = addr.as_ptr() as usize;

        let offset = addr.checked_sub(base)?;
        if offset % self.word_size != 0 {
            return None;
        }

        u16::try_from(offset / self.word_size).ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_manager(policy: PlacementPolicy) -> MemoryManager {
        MemoryManager::new(8, policy)
    }

    /// `initialize(26); allocate(8); allocate(16)` with
    /// best-fit leaves a single hole `[3, 23]`.
    #[test]
    fn scenario_1_best_fit_split() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(26);

        let a = mgr.allocate(8).unwrap();
        let b = mgr.allocate(16).unwrap();

        assert_eq!(mgr.word_index_of(a), Some(0));
        assert_eq!(mgr.word_index_of(b), Some(1));

        let list = mgr.get_list();
        assert_eq!(list.as_words(), &[1, 3, 23]);
    }

    /// Freeing `A` and reallocating the same size returns
    /// the same address, since the freed 1-word hole has zero residual.
    #[test]
    fn scenario_2_best_fit_reuses_freed_hole() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(26);

        let a = mgr.allocate(8).unwrap();
        let _b = mgr.allocate(16).unwrap();

        mgr.free(a);
        let a_prime = mgr.allocate(8).unwrap();

        assert_eq!(a, a_prime);
    }

    /// An allocation larger than the whole region fails
    /// and `memory_limit` is unaffected.
    #[test]
    fn scenario_3_oversized_allocate_fails() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(10);

        let x = mgr.allocate(80);
        assert!(x.is_some());
        assert!(mgr.allocate(80).is_none());
        assert_eq!(mgr.memory_limit(), 80);
    }

    /// The bitmap starts all-free and gains set bits after
    /// a 3-word allocation.
    #[test]
    fn scenario_4_bitmap_tracks_allocated_words() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(8);

        assert_eq!(mgr.get_bitmap().as_bytes(), &[0x01, 0x00, 0x00]);

        mgr.allocate(24).unwrap();
        assert_eq!(mgr.get_bitmap().payload(), &[0x07]);
    }

    /// Worst-fit always chooses the largest hole.
    #[test]
    fn scenario_5_worst_fit_picks_largest_hole_each_time() {
        let mut mgr = new_manager(PlacementPolicy::WorstFit);
        mgr.initialize(10);

        let a = mgr.allocate(8).unwrap();
        assert_eq!(mgr.word_index_of(a), Some(0));
        let b = mgr.allocate(8).unwrap();
        assert_eq!(mgr.word_index_of(b), Some(1));

        mgr.free(a);
        let c = mgr.allocate(8).unwrap();
        // the freed 1-word hole at 0 and the 8-word tail hole at 2: worst-fit
        // picks the larger one.
        assert_eq!(mgr.word_index_of(c), Some(2));
    }

    /// The map dump after the split-hole scenario is exactly `[1, 3, 23]`.
    #[test]
    fn scenario_6_dump_matches_hole_list() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(26);
        mgr.allocate(8).unwrap();
        mgr.allocate(16).unwrap();

        let path = std::env::temp_dir().join(format!("memmgr-test-{}.txt", std::process::id()));
        let result = mgr.dump_memory_map(&path);
        assert_eq!(result, 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[3, 23]");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn allocate_before_initialize_returns_none() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        assert!(mgr.allocate(8).is_none());
    }

    #[test]
    fn shutdown_then_allocate_does_not_auto_reinitialize() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(10);
        mgr.shutdown();
        assert!(mgr.allocate(8).is_none());
    }

    #[test]
    fn free_is_idempotent() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(10);
        let a = mgr.allocate(8).unwrap();
        mgr.free(a);
        mgr.free(a);
        assert_eq!(mgr.get_list().count(), 1);
    }

    #[test]
    fn free_unknown_address_is_silent_no_op() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(10);
        let bogus = mgr.region.base();
        let bogus = unsafe { NonNull::new_unchecked(bogus.as_ptr().wrapping_add(4096)) };
        mgr.free(bogus);
        assert_eq!(mgr.get_list().count(), 1);
    }

    #[test]
    fn reinitialize_performs_implicit_shutdown() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        mgr.initialize(10);
        mgr.allocate(8).unwrap();
        mgr.initialize(20);

        assert_eq!(mgr.memory_limit(), 160);
        assert_eq!(mgr.get_list().count(), 1);
        assert_eq!(mgr.get_list().holes().next(), Some(crate::snapshot::HoleEntry { head: 0, size: 20 }));
    }

    #[test]
    fn randomized_allocate_free_round_trip_covers_region_when_all_freed() {
        let mut mgr = new_manager(PlacementPolicy::BestFit);
        let word_count = 64u16;
        mgr.initialize(word_count);

        let rng = fastrand::Rng::with_seed(0xC0FFEE);
        let mut outstanding: Vec<NonNull<u8>> = Vec::new();

        for _ in 0..500 {
            if outstanding.is_empty() || rng.bool() {
                let words = rng.u16(1..=4);
                if let Some(addr) = mgr.allocate(words as usize * mgr.word_size()) {
                    outstanding.push(addr);
                }
            } else {
                let index = rng.usize(0..outstanding.len());
                let addr = outstanding.swap_remove(index);
                mgr.free(addr);
            }
        }

        for addr in outstanding {
            mgr.free(addr);
        }

        mgr.spans.debug_check_invariants(word_count);
        let list = mgr.get_list();
        let total: u32 = list.holes().map(|h| h.size as u32).sum();
        assert_eq!(total, word_count as u32);
    }
}
