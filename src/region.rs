//! Acquisition and release of the backing byte region.
//!
//! The default backend stores the region in a heap buffer. Behind the
//! `system-backed` feature, a second backend acquires a real anonymous OS mapping
//! instead.

use core::ptr::NonNull;

/// A contiguous byte buffer of fixed size, acquired once and released once.
///
/// Constructed empty (no backing memory); [`Region::acquire`] installs the buffer,
/// [`Region::release`] discards it. The base address is stable for the lifetime of
/// an acquired region.
#[derive(Debug, Default)]
pub(crate) enum Region {
    #[default]
    Empty,
    Heap(Box<[u8]>),
    #[cfg(feature = "system-backed")]
    System(system::SystemRegion),
}

impl Region {
    pub const fn empty() -> Self {
        Region::Empty
    }

    pub fn is_acquired(&self) -> bool {
        !matches!(self, Region::Empty)
    }

    /// Acquires `size_bytes` of backing storage. Returns `false` if acquisition
    /// fails (the caller is left uninitialized).
    #[cfg(not(feature = "system-backed"))]
    pub fn acquire(&mut self, size_bytes: usize) -> bool {
        *self = Region::Heap(vec![0u8; size_bytes].into_boxed_slice());
        true
    }

    #[cfg(feature = "system-backed")]
    pub fn acquire(&mut self, size_bytes: usize) -> bool {
        match system::SystemRegion::acquire(size_bytes) {
            Some(region) => {
                *self = Region::System(region);
                true
            }
            None => false,
        }
    }

    /// Releases the backing storage, if any, returning to the empty state.
    pub fn release(&mut self) {
        match core::mem::take(self) {
            Region::Empty => {}
            Region::Heap(_) => {}
            #[cfg(feature = "system-backed")]
            Region::System(region) => region.release(),
        }
    }

    /// The base address of the acquired region.
    ///
    /// Panics if the region has not been acquired; callers must check
    /// [`is_acquired`](Region::is_acquired) first (or rely on `MemoryManager`'s own
    /// initialized-state tracking, which never calls this on an empty region).
    pub fn base(&self) -> NonNull<u8> {
        match self {
            Region::Empty => unreachable!("region base queried before acquisition"),
            Region::Heap(buf) => NonNull::new(buf.as_ptr() as *mut u8).unwrap(),
            #[cfg(feature = "system-backed")]
            Region::System(region) => region.base(),
        }
    }
}

#[cfg(feature = "system-backed")]
mod system {
    use core::ptr::NonNull;

    /// An anonymous OS mapping acquired via `libc::mmap` (Unix) or
    /// `VirtualAlloc` (Windows), released via the matching teardown call.
    #[derive(Debug)]
    pub(super) struct SystemRegion {
        base: NonNull<u8>,
        size: usize,
    }

    impl SystemRegion {
        pub fn acquire(size_bytes: usize) -> Option<Self> {
            if size_bytes == 0 {
                return None;
            }
            imp::map(size_bytes).map(|base| Self { base, size: size_bytes })
        }

        pub fn release(self) {
            unsafe { imp::unmap(self.base, self.size) };
        }

        pub fn base(&self) -> NonNull<u8> {
            self.base
        }
    }

    #[cfg(target_family = "unix")]
    mod imp {
        use core::ptr::NonNull;

        pub(super) fn map(size: usize) -> Option<NonNull<u8>> {
            let ptr = unsafe {
                libc::mmap(
                    core::ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_ANONYMOUS | libc::MAP_PRIVATE,
                    -1,
                    0,
                )
            };

            if ptr == libc::MAP_FAILED {
                return None;
            }

            NonNull::new(ptr.cast())
        }

        pub(super) unsafe fn unmap(base: NonNull<u8>, size: usize) {
            let result = unsafe { libc::munmap(base.as_ptr().cast(), size) };
            debug_assert_eq!(result, 0, "munmap failed");
        }
    }

    #[cfg(target_family = "windows")]
    mod imp {
        use core::ptr::{null_mut, NonNull};
        use windows_sys::Win32::System::Memory::{
            VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
        };

        pub(super) fn map(size: usize) -> Option<NonNull<u8>> {
            let ptr = unsafe {
                VirtualAlloc(null_mut(), size, MEM_RESERVE | MEM_COMMIT, PAGE_READWRITE)
            };

            NonNull::new(ptr.cast())
        }

        pub(super) unsafe fn unmap(base: NonNull<u8>, _size: usize) {
            let result = unsafe { VirtualFree(base.as_ptr().cast(), 0, MEM_RELEASE) };
            debug_assert_ne!(result, 0, "VirtualFree failed");
        }
    }
}
