//! Compile-time tunables for the core subsystems.
//!
//! `spec.md` pins these as numbers in prose (ring capacity, cooked-buffer
//! capacity, ...); centralizing them here avoids repeating magic numbers
//! through `keyboard`, `tty`, and `ipc`, following the same pattern as the
//! teacher's per-module constants (e.g. `SHM_NAME_MAX`, `SHM_MAX_OBJECTS` in
//! its `ipc::posix_shm`).

/// Capacity of the scancode ring buffer shared between the ISR and the
/// line discipline. Must be a value `get`/`push_back` can index mod-wise;
/// no power-of-two requirement since `ScancodeRing` uses `%`, not `&`.
pub const SCANCODE_RING_CAPACITY: usize = 256;

/// Capacity of each task's cooked input buffer.
pub const COOKED_BUFFER_CAPACITY: usize = 256;

/// Page size assumed by the shared-memory allocator stand-in.
pub const PAGE_SIZE: usize = 4096;

/// Upper bound on concurrently live shared-memory segments.
pub const SHM_MAX_SEGMENTS: usize = 4096;

/// Upper bound on concurrently live tasks tracked by the scheduler stand-in.
pub const MAX_TASKS: usize = 64;

/// Depth of each task's pending-signal queue.
pub const SIGNAL_QUEUE_CAPACITY: usize = 8;

/// Keyboard layouts the keymap table supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Italian,
    Us,
}

/// Default logger severity, overridable at build time via `MENTOS_LOG`
/// (see `build.rs`); falls back to `"info"` if the env var was unset.
pub const DEFAULT_LOG_LEVEL: &str = env!("MENTOS_LOG_LEVEL");
