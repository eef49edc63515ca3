//! Crate-wide error type.
//!
//! Mirrors the teacher's `error::KernelError`: structured variants carrying
//! context rather than bare strings, a `Display` impl, and a conversion to
//! the POSIX-style negative error codes `spec.md` §7 requires at the
//! syscall boundary.

use core::fmt;

/// Kernel-wide result alias.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors the core subsystems can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// Bad identifier, negative id, bad cmd, bad size.
    InvalidArgument { name: &'static str },
    /// Segment/key/mapping/task not found.
    NotFound { resource: &'static str },
    /// `IPC_CREAT|IPC_EXCL` raced an existing key.
    AlreadyExists { resource: &'static str },
    /// Permission denied on attach/get.
    PermissionDenied,
    /// Non-creator/non-owner invoked `IPC_RMID`.
    NotOwner,
    /// Physical page allocation failed.
    OutOfMemory { requested: usize },
    /// No free virtual-address range of the requested length.
    NoVirtualSpace,
    /// Process/task table has no such task.
    TaskNotFound { pid: u32 },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { name } => write!(f, "invalid argument: {name}"),
            Self::NotFound { resource } => write!(f, "{resource} not found"),
            Self::AlreadyExists { resource } => write!(f, "{resource} already exists"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::NotOwner => write!(f, "caller is neither owner nor creator"),
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: requested {requested} bytes")
            }
            Self::NoVirtualSpace => write!(f, "no free virtual address range"),
            Self::TaskNotFound { pid } => write!(f, "task {pid} not found"),
        }
    }
}

impl KernelError {
    /// Map to the POSIX-style negative errno spec.md §7 specifies.
    pub fn to_errno(self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => -EINVAL,
            Self::NotFound { .. } | Self::NoVirtualSpace | Self::TaskNotFound { .. } => -ENOENT,
            Self::AlreadyExists { .. } => -EEXIST,
            Self::PermissionDenied => -EACCES,
            Self::NotOwner => -EPERM,
            // Legacy shmget behavior: allocation failure at create time
            // surfaces as ENOENT (spec.md §7 notes this explicitly).
            Self::OutOfMemory { .. } => -ENOENT,
        }
    }
}

/// `-EINVAL`
pub const EINVAL: i32 = 22;
/// `-ENOENT`
pub const ENOENT: i32 = 2;
/// `-EEXIST`
pub const EEXIST: i32 = 17;
/// `-EACCES`
pub const EACCES: i32 = 13;
/// `-EPERM`
pub const EPERM: i32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_matches_spec() {
        assert_eq!(
            KernelError::NotFound { resource: "segment" }.to_errno(),
            -ENOENT
        );
        assert_eq!(
            KernelError::AlreadyExists { resource: "segment" }.to_errno(),
            -EEXIST
        );
        assert_eq!(KernelError::PermissionDenied.to_errno(), -EACCES);
        assert_eq!(KernelError::NotOwner.to_errno(), -EPERM);
        assert_eq!(
            KernelError::InvalidArgument { name: "id" }.to_errno(),
            -EINVAL
        );
        assert_eq!(
            KernelError::OutOfMemory { requested: 4096 }.to_errno(),
            -ENOENT
        );
    }
}
