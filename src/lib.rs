//! A word-granular memory manager over a single fixed-size region, with a
//! pluggable placement policy choosing which hole satisfies each allocation.
//!
//! The core is the free-space bookkeeping: a list of spans partitioning the
//! region into holes and allocated blocks ([`span`]), the packed snapshot views
//! derived from it ([`snapshot`]), and the policies that consume those snapshots
//! ([`policy`]). [`MemoryManager`] ties these together with a backing
//! [`region`].
//!
//! ```
//! use memmgr::{MemoryManager, PlacementPolicy};
//!
//! let mut manager = MemoryManager::new(8, PlacementPolicy::BestFit);
//! manager.initialize(26);
//!
//! let a = manager.allocate(8).unwrap();
//! let b = manager.allocate(16).unwrap();
//! assert_ne!(a, b);
//!
//! manager.free(a);
//! assert_eq!(manager.get_list().count(), 2);
//! ```

mod dump;
mod manager;
mod policy;
mod region;
mod snapshot;
mod span;

#[cfg(feature = "counters")]
mod counters;
#[cfg(feature = "sync")]
mod sync;

pub use manager::{MemoryManager, MAX_WORD_COUNT};
pub use policy::{best_fit, first_fit, next_fit, worst_fit, PlacementPolicy, NO_FIT};
pub use snapshot::{Bitmap, HoleEntry, HoleSnapshot};

#[cfg(feature = "counters")]
pub use counters::Counters;
#[cfg(feature = "sync")]
pub use sync::Locked;
