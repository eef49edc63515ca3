//! MentOS kernel library.
//!
//! Exposes the keyboard input pipeline, the System V shared-memory IPC
//! subsystem, and the lazy FPU context-switch protocol as a `no_std`
//! library, built the way the teacher's kernel crate is: bare-metal on
//! its real target, linked against the host's standard allocator when
//! built for `cargo test`.

#![no_std]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(all(target_arch = "x86", target_os = "none"))]
use linked_list_allocator::LockedHeap;

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

// Host target (used for `cargo test`): delegate to the system allocator so
// `alloc::vec::Vec`/`alloc::string::String` work in ordinary `#[test]`s.
#[cfg(not(target_os = "none"))]
extern crate std;
#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

pub mod arch;
pub mod config;
pub mod error;
pub mod fpu;
pub mod ipc;
pub mod keyboard;
pub mod logger;
pub mod mm;
pub mod sched;
pub mod tty;

/// Boot sequence: logger, PIC remap, IDT. Called from `main.rs` on the
/// bare-metal target; exercised indirectly by the module-level tests on
/// host, where each subsystem initializes lazily instead.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub fn init() {
    logger::init();
    arch::x86::pic::remap(0x20, 0x28);
    arch::x86::idt::init();
}

#[cfg(all(target_os = "none", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("panic: {info}");
    loop {
        core::hint::spin_loop();
    }
}

/// Heap allocation failure is unrecoverable in a `no_std` kernel.
#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error_handler(layout: core::alloc::Layout) -> ! {
    panic!("allocation error: {layout:?}");
}
