//! FXSAVE/FXRSTOR/FNINIT and the CR0/CR4 bits the lazy FPU protocol toggles.
//!
//! Grounded in the teacher's `arch::x86_64::context` (`save_fpu_state`,
//! `restore_fpu_state`, `init_fpu`) -- same instructions, same
//! one-`asm!`-block-per-operation shape, retargeted to 32-bit general
//! registers.
//!
//! `spec.md` §4.4 requires the save/restore protocol to be independently
//! testable (single-owner, no-touch-no-save). Real FXSAVE/FXRSTOR are
//! privileged and cannot run in a host unit test process, so the
//! non-`x86` build substitutes a plain `memcpy`-based stand-in that
//! behaves like a hardware register file for the purpose of the
//! single-owner bookkeeping in `crate::fpu`.

/// 512-byte, 16-byte-aligned FXSAVE area -- one per task.
#[repr(C, align(16))]
#[derive(Clone)]
pub struct FpuSaveArea(pub [u8; 512]);

impl FpuSaveArea {
    pub const fn zeroed() -> Self {
        Self([0; 512])
    }
}

impl Default for FpuSaveArea {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Set CR0.TS (Task Switched), trapping the next FPU instruction with `#NM`.
#[cfg(target_arch = "x86")]
pub fn set_task_switched() {
    // SAFETY: CR0.TS (bit 3) only affects whether FPU/MMX/SSE instructions
    // trap; setting it from ring 0 is always valid.
    unsafe {
        core::arch::asm!(
            "mov eax, cr0",
            "or eax, 0x8",
            "mov cr0, eax",
            out("eax") _,
            options(nomem, nostack),
        );
    }
}

/// Clear CR0.TS, also ensuring CR0.MP and CR4's SSE bits are set.
#[cfg(target_arch = "x86")]
pub fn clear_task_switched_and_enable_sse() {
    // SAFETY: clearing CR0.TS (bit 3), setting CR0.MP (bit 1, bit 2 EM
    // cleared), and setting CR4.OSFXSR/OSXMMEXCPT (bits 9-10) is the
    // standard FPU/SSE enablement sequence, valid from ring 0 at any point
    // after the CPU has initialized its control registers.
    unsafe {
        core::arch::asm!(
            "mov eax, cr0",
            "and eax, 0xFFFFFFF5", // clear TS (bit 3) and EM (bit 2)
            "or eax, 0x2",         // set MP (bit 1)
            "mov cr0, eax",
            "mov eax, cr4",
            "or eax, 0x600", // OSFXSR | OSXMMEXCPT
            "mov cr4, eax",
            out("eax") _,
            options(nomem, nostack),
        );
    }
}

/// FXSAVE the live FPU/SSE register state into `area`.
#[cfg(target_arch = "x86")]
pub fn fxsave(area: &mut FpuSaveArea) {
    // SAFETY: `area` is 16-byte aligned (enforced by `repr(align(16))`)
    // and 512 bytes, matching the FXSAVE memory operand requirements.
    unsafe {
        core::arch::asm!("fxsave [{0}]", in(reg) area as *mut FpuSaveArea, options(nostack));
    }
}

/// FXRSTOR the FPU/SSE register state from `area`.
#[cfg(target_arch = "x86")]
pub fn fxrstor(area: &FpuSaveArea) {
    // SAFETY: `area` was previously populated by `fxsave` (or is the
    // all-zero initial state, which FXRSTOR accepts), and is correctly
    // aligned.
    unsafe {
        core::arch::asm!("fxrstor [{0}]", in(reg) area as *const FpuSaveArea, options(nostack));
    }
}

/// FNINIT: reset the FPU to its power-up state.
#[cfg(target_arch = "x86")]
pub fn fninit() {
    // SAFETY: FNINIT has no memory operands and cannot fault.
    unsafe {
        core::arch::asm!("fninit", options(nomem, nostack));
    }
}

// --- Host stand-ins -------------------------------------------------------
//
// There is no real FPU register file to save/restore outside ring 0, so
// these model one: `fxsave`/`fxrstor` copy bytes to/from a single
// process-wide "hardware" buffer, and `fninit` resets it. This is enough
// for `crate::fpu::owner`'s single-owner bookkeeping to be exercised by
// ordinary `#[test]` functions.

#[cfg(not(target_arch = "x86"))]
use spin::Mutex;

#[cfg(not(target_arch = "x86"))]
static SIMULATED_HARDWARE: Mutex<FpuSaveArea> = Mutex::new(FpuSaveArea::zeroed());

#[cfg(not(target_arch = "x86"))]
pub fn set_task_switched() {}

#[cfg(not(target_arch = "x86"))]
pub fn clear_task_switched_and_enable_sse() {}

#[cfg(not(target_arch = "x86"))]
pub fn fxsave(area: &mut FpuSaveArea) {
    area.0.copy_from_slice(&SIMULATED_HARDWARE.lock().0);
}

#[cfg(not(target_arch = "x86"))]
pub fn fxrstor(area: &FpuSaveArea) {
    SIMULATED_HARDWARE.lock().0.copy_from_slice(&area.0);
}

#[cfg(not(target_arch = "x86"))]
pub fn fninit() {
    SIMULATED_HARDWARE.lock().0 = [0; 512];
    // FNINIT leaves a recognizable "initialized" marker so tests can
    // distinguish "never touched" (all zero) from "initialized" state.
    SIMULATED_HARDWARE.lock().0[0] = 0xFF;
}
