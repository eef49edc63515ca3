//! System V IPC shared memory.
//!
//! Module layout mirrors the teacher's `ipc::mod` (thin re-export over a
//! `shared_memory` implementation file).

pub mod shm;

pub use shm::{
    shmat, shmctl_rmid, shmctl_stat, shmdt, shmget, ShmSegment, ShmStat, IPC_CREAT, IPC_EXCL, IPC_PRIVATE, IPC_RMID,
    IPC_STAT, SHM_RDONLY,
};

/// Render `/proc/ipc/shm`: a header line followed by one line per live
/// segment with fields `key id perms segsz uid gid cuid cgid atime dtime
/// ctime cpid lpid nattch` (spec.md §4.5/§11).
pub fn format_proc_ipc_shm() -> alloc::string::String {
    use core::fmt::Write;

    let mut out = alloc::string::String::new();
    let _ = writeln!(out, "key id perms segsz uid gid cuid cgid atime dtime ctime cpid lpid nattch");
    for row in shm::proc_ipc_shm_rows() {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            row.key,
            row.id,
            row.perm.mode,
            row.size,
            row.perm.uid,
            row.perm.gid,
            row.perm.cuid,
            row.perm.cgid,
            row.atime,
            row.dtime,
            row.ctime,
            row.creator_pid,
            row.last_op_pid,
            row.nattch,
        );
    }
    out
}

/// Offset/length-bounded read over the rendered `/proc/ipc/shm` text, the
/// "supports offset-based paging" requirement in spec.md §4.5.
pub fn read_proc_ipc_shm(offset: usize, nbyte: usize) -> alloc::vec::Vec<u8> {
    let rendered = format_proc_ipc_shm();
    let bytes = rendered.as_bytes();
    if offset >= bytes.len() {
        return alloc::vec::Vec::new();
    }
    let end = (offset + nbyte).min(bytes.len());
    bytes[offset..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_listing_includes_live_segments() {
        let id = shmget(IPC_PRIVATE, 4096, IPC_CREAT | 0o666).unwrap();
        let rendered = format_proc_ipc_shm();
        assert!(rendered.contains(&alloc::format!("{}", id)));
        shmctl_rmid(id, crate::sched::TaskId(0)).unwrap();
    }

    #[test]
    fn offset_paged_read_honors_bounds() {
        let id = shmget(IPC_PRIVATE, 4096, IPC_CREAT | 0o666).unwrap();
        let full = format_proc_ipc_shm();
        let page = read_proc_ipc_shm(0, 4);
        assert_eq!(page.as_slice(), &full.as_bytes()[..4]);
        assert!(read_proc_ipc_shm(full.len() + 10, 4).is_empty());
        shmctl_rmid(id, crate::sched::TaskId(0)).unwrap();
    }
}
