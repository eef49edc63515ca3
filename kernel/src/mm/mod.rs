//! Physical/virtual memory collaborator stand-ins.
//!
//! `spec.md` places page allocation and address-space mapping out of
//! scope ("assume a collaborator memory manager"); this module is that
//! collaborator's interface, backed by a bump allocator over a fixed
//! arena so `ipc::shm` has something real to call without pulling in a
//! full page-frame allocator and page tables.

use alloc::collections::BTreeMap;

use spin::Mutex;

use crate::config::PAGE_SIZE;
use crate::error::{KernelError, KernelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysicalAddress(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtualAddress(pub usize);

bitflags::bitflags! {
    /// Page-table permission bits a mapping is established with. Spec.md
    /// §6 gives `map_vm_range` a `flags` parameter precisely so callers
    /// like `shmat` can omit the writable bit for a read-only attach
    /// (spec.md §4.5, §8's "never yields a writable mapping" invariant).
    #[derive(Clone, Copy)]
    pub struct MapFlags: u32 {
        const WRITABLE = 1 << 0;
    }
}

pub const PAGE_SIZE_BYTES: usize = PAGE_SIZE;

/// Total pages backing the simulated physical arena. Sized generously
/// enough for `config::SHM_MAX_SEGMENTS` worth of small test segments
/// without this stand-in needing real frame reclamation semantics.
const ARENA_PAGES: usize = 4096;

struct PhysicalArena {
    used: [bool; ARENA_PAGES],
}

impl PhysicalArena {
    const fn new() -> Self {
        Self { used: [false; ARENA_PAGES] }
    }
}

static ARENA: Mutex<PhysicalArena> = Mutex::new(PhysicalArena::new());

/// Next unused virtual address handed out by `find_free_vm_range`; a
/// real kernel would consult the faulting task's page tables / VMA tree.
static NEXT_VIRTUAL: Mutex<usize> = Mutex::new(0x4000_0000);

/// Permission bits each live mapping was established with, keyed by its
/// base virtual address -- the stand-in for real page-table entries, just
/// enough to let callers (and tests) observe whether a mapping is
/// writable.
static MAPPINGS: Mutex<BTreeMap<usize, MapFlags>> = Mutex::new(BTreeMap::new());

/// Allocate `page_count` contiguous physical pages.
pub fn allocate_physical_pages(page_count: usize) -> KernelResult<PhysicalAddress> {
    let mut arena = ARENA.lock();
    let mut run_start = None;
    let mut run_len = 0;
    for i in 0..ARENA_PAGES {
        if arena.used[i] {
            run_start = None;
            run_len = 0;
            continue;
        }
        if run_start.is_none() {
            run_start = Some(i);
        }
        run_len += 1;
        if run_len == page_count {
            let start = run_start.unwrap();
            for slot in arena.used.iter_mut().skip(start).take(page_count) {
                *slot = true;
            }
            return Ok(PhysicalAddress(start * PAGE_SIZE_BYTES));
        }
    }
    Err(KernelError::OutOfMemory { requested: page_count * PAGE_SIZE_BYTES })
}

pub fn free_physical_pages(addr: PhysicalAddress, page_count: usize) {
    let start = addr.0 / PAGE_SIZE_BYTES;
    let mut arena = ARENA.lock();
    for slot in arena.used.iter_mut().skip(start).take(page_count) {
        *slot = false;
    }
}

/// Find an unused virtual-address range of `page_count` pages in the
/// calling task's address space. This stand-in hands out a
/// monotonically increasing range rather than tracking per-task VMAs.
pub fn find_free_vm_range(page_count: usize) -> KernelResult<VirtualAddress> {
    let mut next = NEXT_VIRTUAL.lock();
    let addr = *next;
    let len = page_count * PAGE_SIZE_BYTES;
    *next = next.checked_add(len).ok_or(KernelError::NoVirtualSpace)?;
    Ok(VirtualAddress(addr))
}

/// Map `page_count` pages starting at `phys` into the range starting at
/// `virt` with the given permission `flags`. A real implementation would
/// walk/populate page tables; this stand-in records `flags` so callers
/// (and tests) can confirm a read-only attach never carries `WRITABLE`.
pub fn map_vm_range(virt: VirtualAddress, _phys: PhysicalAddress, _page_count: usize, flags: MapFlags) -> KernelResult<()> {
    MAPPINGS.lock().insert(virt.0, flags);
    Ok(())
}

pub fn unmap_vm_range(virt: VirtualAddress, _page_count: usize) -> KernelResult<()> {
    MAPPINGS.lock().remove(&virt.0);
    Ok(())
}

/// The permission flags the mapping at `virt` was established with, if any.
pub fn mapping_flags(virt: VirtualAddress) -> Option<MapFlags> {
    MAPPINGS.lock().get(&virt.0).copied()
}

pub fn physical_address_of(virt: VirtualAddress, phys_base: PhysicalAddress, virt_base: VirtualAddress) -> PhysicalAddress {
    PhysicalAddress(phys_base.0 + (virt.0 - virt_base.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_allows_reuse() {
        let a = allocate_physical_pages(4).unwrap();
        free_physical_pages(a, 4);
        let b = allocate_physical_pages(4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn virtual_ranges_never_overlap() {
        let a = find_free_vm_range(2).unwrap();
        let b = find_free_vm_range(2).unwrap();
        assert!(b.0 >= a.0 + 2 * PAGE_SIZE_BYTES);
    }
}
