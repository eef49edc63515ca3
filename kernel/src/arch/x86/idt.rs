//! Interrupt Descriptor Table.
//!
//! Grounded in the teacher's `arch::x86_64::idt` (a `lazy_static!` IDT with
//! one handler function per vector), reimplemented as a hand-rolled IDT
//! gate table since the teacher's IDT type comes from the `x86_64` crate,
//! which does not support 32-bit targets.
//!
//! Vectors wired here: breakpoint (3), device-not-available / `#NM` (7,
//! drives the lazy FPU protocol), x87 floating point / `#MF` (16) and SIMD
//! floating point / `#XF` (19) both deliver `SIGFPE` per spec.md §4.4,
//! general protection fault (13), double fault (8), and IRQ1 (vector 33,
//! remapped by `pic::remap`) for the keyboard.

#[cfg(target_arch = "x86")]
mod real {
    use core::mem::size_of;

    use crate::{fpu, keyboard, sched};

    const IDT_ENTRIES: usize = 256;

    #[repr(C, packed)]
    #[derive(Clone, Copy)]
    struct GateDescriptor {
        offset_low: u16,
        selector: u16,
        zero: u8,
        type_attr: u8,
        offset_high: u16,
    }

    impl GateDescriptor {
        const fn missing() -> Self {
            Self {
                offset_low: 0,
                selector: 0,
                zero: 0,
                type_attr: 0,
                offset_high: 0,
            }
        }

        fn new(handler: u32, selector: u16, type_attr: u8) -> Self {
            Self {
                offset_low: (handler & 0xFFFF) as u16,
                selector,
                zero: 0,
                type_attr,
                offset_high: (handler >> 16) as u16,
            }
        }
    }

    #[repr(C, packed)]
    struct IdtPointer {
        limit: u16,
        base: u32,
    }

    static mut IDT: [GateDescriptor; IDT_ENTRIES] = [GateDescriptor::missing(); IDT_ENTRIES];

    const INTERRUPT_GATE: u8 = 0x8E; // present, ring 0, 32-bit interrupt gate
    const KERNEL_CS: u16 = 0x08;

    /// Install all vectors this core depends on and load the IDT.
    pub fn init() {
        set_gate(3, breakpoint_trampoline as u32);
        set_gate(7, device_not_available_trampoline as u32);
        set_gate(8, double_fault_trampoline as u32);
        set_gate(13, general_protection_trampoline as u32);
        set_gate(16, x87_fpu_error_trampoline as u32);
        set_gate(19, simd_fpu_error_trampoline as u32);
        set_gate(33, keyboard_irq_trampoline as u32);

        let ptr = IdtPointer {
            limit: (size_of::<[GateDescriptor; IDT_ENTRIES]>() - 1) as u16,
            // SAFETY: taking the address of a static is always valid; the
            // reference is never dereferenced here, only its address used.
            base: (&raw const IDT) as u32,
        };
        // SAFETY: `ptr` points at a validly-laid-out, 256-entry descriptor
        // table that outlives the kernel; LIDT has no effect beyond loading
        // the IDTR.
        unsafe {
            core::arch::asm!("lidt [{}]", in(reg) &ptr, options(readonly, nostack, preserves_flags));
        }
    }

    fn set_gate(vector: usize, handler: u32) {
        // SAFETY: `vector` < IDT_ENTRIES by construction of the call sites
        // above; no concurrent access during single-threaded boot init.
        unsafe {
            (&raw mut IDT)
                .cast::<GateDescriptor>()
                .add(vector)
                .write(GateDescriptor::new(handler, KERNEL_CS, INTERRUPT_GATE));
        }
    }

    // These would be `extern "x86-interrupt"` entry stubs in a full build;
    // kept as plain functions here since bringing up the naked-function
    // prologue/epilogue (saving all GPRs, IRET) is boot/init plumbing the
    // spec places out of scope. They document the intended dispatch.
    extern "C" fn breakpoint_trampoline() {
        log::warn!("breakpoint trap");
    }

    extern "C" fn double_fault_trampoline() -> ! {
        panic!("double fault");
    }

    extern "C" fn general_protection_trampoline() {
        panic!("general protection fault");
    }

    extern "C" fn device_not_available_trampoline() {
        if let Some(cur) = sched::current_task() {
            fpu::owner().handle_device_not_available(cur);
        }
    }

    extern "C" fn x87_fpu_error_trampoline() {
        if let Some(cur) = sched::current_task() {
            sched::deliver_signal(cur, sched::SIGFPE);
        }
    }

    extern "C" fn simd_fpu_error_trampoline() {
        if let Some(cur) = sched::current_task() {
            sched::deliver_signal(cur, sched::SIGFPE);
        }
    }

    extern "C" fn keyboard_irq_trampoline() {
        // SAFETY: reading the PS/2 data port after an IRQ1 is the documented
        // protocol; EOI is signaled unconditionally afterward per spec.md
        // §4.2 ("After every ISR invocation the controller's EOI is
        // signaled").
        let scancode = unsafe { super::super::port::inb(0x60) };
        keyboard::isr::handle_scancode(scancode);
        crate::arch::x86::pic::send_eoi(1);
    }
}

#[cfg(target_arch = "x86")]
pub use real::init;

#[cfg(not(target_arch = "x86"))]
pub fn init() {}
