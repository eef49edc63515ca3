//! 32-bit protected-mode primitives.
//!
//! Grounded in the teacher's `arch::x86_64` layout (`msr.rs`, `idt.rs`,
//! `gdt.rs`, `context.rs`): one small file per concern, each raw
//! `core::arch::asm!` block carrying a `SAFETY` comment explaining the
//! precondition. The teacher's own dependencies for this layer
//! (`x86_64`, `pic8259`, `uart_16550`, `pc-keyboard`) hard-require
//! `target_arch = "x86_64"` (the `x86_64` crate refuses to compile
//! otherwise), so a 32-bit kernel cannot reuse them; this module
//! reimplements the same primitives directly in the teacher's
//! asm-plus-SAFETY-comment idiom instead.

pub mod fpu;
pub mod idt;
pub mod pic;
pub mod port;
pub mod serial;

/// Run `f` with interrupts disabled, restoring the prior interrupt flag
/// on return. Mirrors the "interrupts disabled during the protocol body"
/// requirement spec.md §4.4/§5 places on the FPU and shm critical
/// sections.
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let was_enabled = interrupts_enabled();
    disable_interrupts();
    let result = f();
    if was_enabled {
        enable_interrupts();
    }
    result
}

#[cfg(target_arch = "x86")]
fn interrupts_enabled() -> bool {
    let flags: u32;
    // SAFETY: PUSHFD/POPFD read EFLAGS without side effects; no memory or
    // control-flow hazard.
    unsafe {
        core::arch::asm!(
            "pushfd",
            "pop {0}",
            out(reg) flags,
            options(nomem, preserves_flags),
        );
    }
    flags & 0x200 != 0
}

#[cfg(target_arch = "x86")]
fn disable_interrupts() {
    // SAFETY: CLI is unprivileged from ring 0 and has no effect beyond
    // masking maskable interrupts.
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
}

#[cfg(target_arch = "x86")]
fn enable_interrupts() {
    // SAFETY: STI is unprivileged from ring 0; the caller holds no lock
    // across this call that an interrupt handler could reacquire.
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack));
    }
}

// Host builds (unit tests) have no interrupt flag to manipulate; the
// critical section still runs, just without real masking.
#[cfg(not(target_arch = "x86"))]
fn interrupts_enabled() -> bool {
    false
}

#[cfg(not(target_arch = "x86"))]
fn disable_interrupts() {}

#[cfg(not(target_arch = "x86"))]
fn enable_interrupts() {}
