//! PS/2 keyboard driver: ISR, scancode ring, keymaps and modifier state.
//!
//! Mirrors the teacher's `drivers::keyboard` module layout (ring buffer +
//! ISR + modifier bitmask in one driver module), split across files the
//! way the teacher splits `process` into `pcb`/`lifecycle`/`exit`.

pub mod isr;
pub mod keymap;
pub mod modifiers;
pub mod ring;

use spin::Mutex;

use ring::RingBuffer;

/// Resolved output of the ISR: ASCII bytes, CSI escape-sequence bytes, or
/// an `(scancode << 16)` Alt-chord marker. Read by the line discipline in
/// `crate::tty`.
pub(crate) static SCANCODES: Mutex<RingBuffer<i32, { crate::config::SCANCODE_RING_CAPACITY }>> =
    Mutex::new(RingBuffer::new());

/// Pop the next resolved code, if any is queued.
pub fn read_code() -> Option<i32> {
    SCANCODES.lock().pop_front()
}

pub use isr::{handle_scancode, set_layout};
