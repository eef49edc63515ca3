//! Bare-metal entry point. Not built for `cargo test` (the lib crate's
//! `#[cfg(test)]` modules cover every subsystem on host instead).

#![no_std]
#![no_main]

#[cfg(target_os = "none")]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    mentos_kernel::init();
    log::info!("MentOS kernel up");
    loop {
        core::hint::spin_loop();
    }
}

// A `fn main` is required to satisfy `rustc` on hosts that still expect
// one even under `#![no_main]` with no matching `target_os = "none"` arm.
#[cfg(not(target_os = "none"))]
fn main() {}
