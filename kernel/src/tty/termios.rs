//! Terminal mode flags, modeled on POSIX `termios.c_lflag`.
//!
//! `spec.md` §4.3 only needs four of the real `termios` local-mode bits;
//! kept as a `bitflags!` type rather than a full `termios` struct, in
//! keeping with this kernel's "only what the traced subsystem touches"
//! scope.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TerminalFlags: u32 {
        /// Canonical (line-buffered, editable) mode vs. raw passthrough.
        const ICANON = 1 << 0;
        /// Echo input bytes back to the output side.
        const ECHO   = 1 << 1;
        /// Erase the echoed character, not just delete it, on Backspace.
        const ECHOE  = 1 << 2;
        /// Let INTR/QUIT/SUSP bytes raise signals instead of being queued.
        const ISIG   = 1 << 3;
    }
}

impl Default for TerminalFlags {
    fn default() -> Self {
        Self::ICANON | Self::ECHO | Self::ECHOE | Self::ISIG
    }
}

/// `ioctl` request codes the line discipline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermiosRequest {
    GetAttr,
    SetAttr,
}
