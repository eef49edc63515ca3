//! System V shared memory: `shmget`/`shmat`/`shmdt`/`shmctl`.
//!
//! Grounded in the teacher's `ipc::shared_memory` (`SharedMemoryManager`
//! over a `Mutex<BTreeMap<...>>`) and `ipc::posix_shm` (deferred destroy:
//! `IPC_RMID` sets an `unlinked`-style flag and the segment is only freed
//! once its reference count drops to zero) -- spec.md §4.5 asks for the
//! same semantics against a System V, not POSIX, shm call surface,
//! including the `perm` owner/creator uid/gid and mode-bit model.

use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

use crate::config::{PAGE_SIZE, SHM_MAX_SEGMENTS};
use crate::error::{KernelError, KernelResult};
use crate::mm::{self, PhysicalAddress, VirtualAddress};
use crate::sched::TaskId;

pub const IPC_PRIVATE: i32 = 0;
pub const IPC_CREAT: i32 = 0o1000;
pub const IPC_EXCL: i32 = 0o2000;
pub const IPC_RMID: i32 = 0;
pub const IPC_STAT: i32 = 2;
pub const SHM_RDONLY: i32 = 0o10000;

const MODE_MASK: i32 = 0o777;
const READ_BIT: u16 = 0o4;
const WRITE_BIT: u16 = 0o2;

/// Owner/creator identity and the low-9 permission bits, mirrored from
/// `shmflg` at create time (spec.md §3: "owner uid/gid, creator uid/gid,
/// mode bits (low 9)").
#[derive(Debug, Clone, Copy)]
pub struct ShmPerm {
    pub uid: u32,
    pub gid: u32,
    pub cuid: u32,
    pub cgid: u32,
    pub mode: u16,
}

impl ShmPerm {
    /// The class of mode bits (owner/group/other) that apply to `(uid, gid)`.
    fn applicable_bits(&self, uid: u32, gid: u32) -> u16 {
        if uid == self.uid {
            (self.mode >> 6) & 0o7
        } else if gid == self.gid {
            (self.mode >> 3) & 0o7
        } else {
            self.mode & 0o7
        }
    }

    fn allows(&self, uid: u32, gid: u32, want_read: bool, want_write: bool) -> bool {
        let bits = self.applicable_bits(uid, gid);
        (!want_read || bits & READ_BIT != 0) && (!want_write || bits & WRITE_BIT != 0)
    }
}

#[derive(Debug, Clone)]
pub struct ShmSegment {
    pub id: i32,
    pub key: i32,
    pub size: usize,
    pub page_count: usize,
    pub phys_addr: PhysicalAddress,
    pub nattch: u32,
    pub perm: ShmPerm,
    pub creator: TaskId,
    pub creator_pid: u64,
    pub last_op_pid: u64,
    pub atime: u64,
    pub dtime: u64,
    pub ctime: u64,
    pub marked_for_destruction: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ShmStat {
    pub id: i32,
    pub key: i32,
    pub size: usize,
    pub nattch: u32,
    pub perm: ShmPerm,
    pub atime: u64,
    pub dtime: u64,
    pub ctime: u64,
    pub creator_pid: u64,
    pub last_op_pid: u64,
}

struct Attachment {
    id: i32,
    page_count: usize,
}

struct ShmTable {
    by_id: BTreeMap<i32, ShmSegment>,
    by_key: BTreeMap<i32, i32>,
    attachments: BTreeMap<usize, Attachment>,
    next_id: i32,
    /// Monotonic counter used to mint distinct negative keys for
    /// `IPC_PRIVATE` requests, so two `shmget(IPC_PRIVATE, ...)` calls
    /// never collide even though neither supplied a real key (spec.md
    /// §9 open question, resolved here -- see DESIGN.md).
    next_private_key: i32,
}

impl ShmTable {
    const fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_key: BTreeMap::new(),
            attachments: BTreeMap::new(),
            next_id: 1,
            next_private_key: -1,
        }
    }
}

static TABLE: Mutex<ShmTable> = Mutex::new(ShmTable::new());

/// No wall clock is wired up yet; `/proc/ipc/shm`'s `atime`/`dtime`/`ctime`
/// columns are populated from this monotonic tick instead of real time.
static CLOCK: AtomicU64 = AtomicU64::new(1);

fn tick() -> u64 {
    CLOCK.fetch_add(1, Ordering::Relaxed)
}

fn page_count_for(size: usize) -> usize {
    size.div_ceil(PAGE_SIZE)
}

/// `spec.md` §4.5: `IPC_PRIVATE` unconditionally creates a fresh segment,
/// independent of whether `IPC_CREAT` was set; only a real, caller-supplied
/// key goes through the lookup/`IPC_CREAT`-gated path below.
pub fn shmget(key: i32, size: usize, flags: i32) -> KernelResult<i32> {
    if size == 0 {
        return Err(KernelError::InvalidArgument { name: "size" });
    }

    let (uid, gid) = crate::sched::caller_identity();

    // spec.md §5: the whole lookup-or-create body runs as one critical
    // section -- interrupts stay masked for its duration, not just while
    // `TABLE`'s spinlock is held, so a keyboard IRQ landing mid-creation
    // can't observe a half-built segment through some other lock ordering.
    crate::arch::x86::without_interrupts(|| {
        let mut table = TABLE.lock();

        if key == IPC_PRIVATE {
            let private_key = table.next_private_key;
            table.next_private_key -= 1;
            return create_segment(&mut table, private_key, size, flags, uid, gid);
        }

        if let Some(&id) = table.by_key.get(&key) {
            let existing = table.by_id.get(&id).expect("by_key/by_id desynced");
            if flags & IPC_CREAT != 0 && flags & IPC_EXCL != 0 {
                return Err(KernelError::AlreadyExists { resource: "shm key" });
            }
            if size > existing.size {
                return Err(KernelError::InvalidArgument { name: "size" });
            }
            let requested = (flags & MODE_MASK) as u16;
            if !existing.perm.allows(uid, gid, requested & READ_BIT != 0, requested & WRITE_BIT != 0) {
                return Err(KernelError::PermissionDenied);
            }
            return Ok(id);
        }

        if flags & IPC_CREAT == 0 {
            return Err(KernelError::NotFound { resource: "shm key" });
        }

        create_segment(&mut table, key, size, flags, uid, gid)
    })
}

fn create_segment(table: &mut ShmTable, key: i32, size: usize, flags: i32, uid: u32, gid: u32) -> KernelResult<i32> {
    if table.by_id.len() >= SHM_MAX_SEGMENTS {
        return Err(KernelError::OutOfMemory { requested: size });
    }

    let page_count = page_count_for(size);
    let phys_addr = mm::allocate_physical_pages(page_count)?;

    let id = table.next_id;
    table.next_id += 1;

    let creator = crate::sched::current_task().unwrap_or(TaskId(0));
    let now = tick();

    table.by_id.insert(
        id,
        ShmSegment {
            id,
            key,
            size,
            page_count,
            phys_addr,
            nattch: 0,
            perm: ShmPerm { uid, gid, cuid: uid, cgid: gid, mode: (flags & MODE_MASK) as u16 },
            creator,
            creator_pid: creator.0,
            last_op_pid: creator.0,
            atime: 0,
            dtime: 0,
            ctime: now,
            marked_for_destruction: false,
        },
    );
    table.by_key.insert(key, id);

    Ok(id)
}

pub fn shmat(id: i32, flags: i32) -> KernelResult<VirtualAddress> {
    let readonly = flags & SHM_RDONLY != 0;
    let (uid, gid) = crate::sched::caller_identity();
    let caller = crate::sched::current_task().unwrap_or(TaskId(0));

    // spec.md §4.4/§5: the permission check, page-table mapping, and
    // attachment bookkeeping happen atomically -- a second attacher or an
    // IRQ can't see the segment's `nattch` bumped before the mapping exists.
    crate::arch::x86::without_interrupts(|| {
        let mut table = TABLE.lock();
        let segment = table.by_id.get_mut(&id).ok_or(KernelError::NotFound { resource: "shm id" })?;

        if !segment.perm.allows(uid, gid, true, !readonly) {
            return Err(KernelError::PermissionDenied);
        }

        let page_count = segment.page_count;
        let phys_addr = segment.phys_addr;

        let map_flags = if readonly { mm::MapFlags::empty() } else { mm::MapFlags::WRITABLE };
        let vaddr = mm::find_free_vm_range(page_count)?;
        mm::map_vm_range(vaddr, phys_addr, page_count, map_flags)?;

        segment.nattch += 1;
        segment.atime = tick();
        segment.last_op_pid = caller.0;
        table.attachments.insert(vaddr.0, Attachment { id, page_count });

        Ok(vaddr)
    })
}

pub fn shmdt(vaddr: VirtualAddress) -> KernelResult<()> {
    let caller = crate::sched::current_task().unwrap_or(TaskId(0));

    crate::arch::x86::without_interrupts(|| {
        let mut table = TABLE.lock();
        let attachment = table.attachments.remove(&vaddr.0).ok_or(KernelError::NotFound { resource: "shm attachment" })?;

        mm::unmap_vm_range(vaddr, attachment.page_count)?;

        let should_destroy = {
            let segment = table.by_id.get_mut(&attachment.id).expect("attachment outlived its segment");
            segment.nattch -= 1;
            segment.dtime = tick();
            segment.last_op_pid = caller.0;
            segment.nattch == 0 && segment.marked_for_destruction
        };

        if should_destroy {
            destroy_segment(&mut table, attachment.id);
        }

        Ok(())
    })
}

/// `IPC_RMID`: remove the key so no new `shmget` can find this segment,
/// and destroy it immediately if nothing is attached -- otherwise defer
/// destruction to the last matching `shmdt` (teacher's `posix_shm`
/// `unlinked`-flag pattern). Per spec.md §4.5, the caller's uid must match
/// either the segment's owner or its creator.
pub fn shmctl_rmid(id: i32, caller: TaskId) -> KernelResult<()> {
    let (uid, _gid) = crate::sched::caller_identity();

    crate::arch::x86::without_interrupts(|| {
        let mut table = TABLE.lock();
        let segment = table.by_id.get(&id).ok_or(KernelError::NotFound { resource: "shm id" })?;
        if segment.creator != caller && uid != segment.perm.uid && uid != segment.perm.cuid {
            return Err(KernelError::NotOwner);
        }

        table.by_key.remove(&segment.key);

        if segment.nattch == 0 {
            destroy_segment(&mut table, id);
        } else {
            table.by_id.get_mut(&id).unwrap().marked_for_destruction = true;
        }

        Ok(())
    })
}

pub fn shmctl_stat(id: i32) -> KernelResult<ShmStat> {
    let table = TABLE.lock();
    let segment = table.by_id.get(&id).ok_or(KernelError::NotFound { resource: "shm id" })?;
    Ok(ShmStat {
        id: segment.id,
        key: segment.key,
        size: segment.size,
        nattch: segment.nattch,
        perm: segment.perm,
        atime: segment.atime,
        dtime: segment.dtime,
        ctime: segment.ctime,
        creator_pid: segment.creator_pid,
        last_op_pid: segment.last_op_pid,
    })
}

fn destroy_segment(table: &mut ShmTable, id: i32) {
    if let Some(segment) = table.by_id.remove(&id) {
        mm::free_physical_pages(segment.phys_addr, segment.page_count);
        table.by_key.remove(&segment.key);
    }
}

/// Rows for `/proc/ipc/shm`, one per live segment (spec.md §11).
pub fn proc_ipc_shm_rows() -> alloc::vec::Vec<ShmStat> {
    TABLE
        .lock()
        .by_id
        .values()
        .map(|s| ShmStat {
            id: s.id,
            key: s.key,
            size: s.size,
            nattch: s.nattch,
            perm: s.perm,
            atime: s.atime,
            dtime: s.dtime,
            ctime: s.ctime,
            creator_pid: s.creator_pid,
            last_op_pid: s.last_op_pid,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_returns_same_id() {
        let id = shmget(42, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        let id2 = shmget(42, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        assert_eq!(id, id2);
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn excl_rejects_existing_key() {
        let id = shmget(43, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        let err = shmget(43, PAGE_SIZE, IPC_CREAT | IPC_EXCL | 0o666).unwrap_err();
        assert_eq!(err.to_errno(), -crate::error::EEXIST);
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn private_keys_never_collide() {
        let a = shmget(IPC_PRIVATE, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        let b = shmget(IPC_PRIVATE, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        assert_ne!(a, b);
        shmctl_rmid(a, TaskId(0)).unwrap();
        shmctl_rmid(b, TaskId(0)).unwrap();
    }

    #[test]
    fn ipc_private_creates_unconditionally_without_ipc_creat() {
        // spec.md §4.5: IPC_PRIVATE always creates, unlike a real key,
        // which needs IPC_CREAT to create rather than -ENOENT.
        let id = shmget(IPC_PRIVATE, PAGE_SIZE, 0o666).unwrap();
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn rmid_with_live_attachment_defers_destruction() {
        let id = shmget(44, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        let vaddr = shmat(id, 0).unwrap();
        shmctl_rmid(id, TaskId(0)).unwrap();
        // Segment still exists: a stat would still resolve it here since
        // it's not yet destroyed.
        assert!(shmctl_stat(id).is_ok());
        shmdt(vaddr).unwrap();
        assert!(shmctl_stat(id).is_err());
    }

    #[test]
    fn non_creator_cannot_rmid() {
        let id = shmget(45, PAGE_SIZE, IPC_CREAT | 0o666).unwrap();
        let err = shmctl_rmid(id, TaskId(999)).unwrap_err();
        assert_eq!(err.to_errno(), -crate::error::EPERM);
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn shmat_read_only_never_requires_write_bit() {
        // Owner-only mode (0o600): read+write for owner, nothing for
        // others. The caller here is always the default (0, 0) identity,
        // i.e. the owner, so a read-only attach must succeed regardless.
        let id = shmget(46, PAGE_SIZE, IPC_CREAT | 0o600).unwrap();
        let vaddr = shmat(id, SHM_RDONLY).unwrap();
        // spec.md §8: SHM_RDONLY never yields a writable mapping.
        assert!(!mm::mapping_flags(vaddr).unwrap().contains(mm::MapFlags::WRITABLE));
        shmdt(vaddr).unwrap();
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn shmat_read_write_sets_writable_bit() {
        let id = shmget(47, PAGE_SIZE, IPC_CREAT | 0o600).unwrap();
        let vaddr = shmat(id, 0).unwrap();
        assert!(mm::mapping_flags(vaddr).unwrap().contains(mm::MapFlags::WRITABLE));
        shmdt(vaddr).unwrap();
        shmctl_rmid(id, TaskId(0)).unwrap();
    }

    #[test]
    fn shmget_denies_access_when_requested_mode_exceeds_grant() {
        // Segment granted only 0o600 (owner rw, nobody else); a later
        // shmget requesting world-writable access on the same key with a
        // different caller identity must fail with EACCES. Since this
        // kernel's default caller identity is always (0, 0) -- matching
        // the creator -- exercise the other-class path directly through
        // `ShmPerm::allows` instead of a second distinct caller identity.
        let perm = ShmPerm { uid: 7, gid: 7, cuid: 7, cgid: 7, mode: 0o600 };
        assert!(!perm.allows(1, 1, true, true));
        assert!(perm.allows(7, 7, true, true));
    }
}
