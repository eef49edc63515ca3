//! Architecture layer.
//!
//! `spec.md` treats the PS/2 port driver, the interrupt/trap dispatch
//! table, and the FPU instructions as external collaborators whose
//! interfaces the core touches but whose implementation is out of scope.
//! This module provides the thin, hardware-facing primitives (port I/O,
//! IDT, PIC, FXSAVE/FXRSTOR) those collaborators would be built from,
//! scoped to 32-bit protected mode as `spec.md` §1 requires.

pub mod x86;
