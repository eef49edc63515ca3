//! Line discipline: canonical-mode editing, echo, and signal generation
//! sitting between the keyboard ISR and a reading task.
//!
//! Grounded in the teacher's `process::signal_delivery` (`deliver_signal`
//! keyed on a constants module) for the ISIG path, and in `drivers::keyboard`
//! for the echo-on-input shape; implements the per-`read()`-call protocol
//! spec.md §4.3 specifies step by step.

pub mod cooked_buffer;
pub mod termios;

use cooked_buffer::CookedBuffer;
use termios::TerminalFlags;

use crate::sched::{self, SIGSTOP, SIGTERM};

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const INTR: u8 = 0x03; // Ctrl-C
const SUSP: u8 = 0x1A; // Ctrl-Z
const DELETE_SEQUENCE: &[u8] = b"\x1b[3~";

/// One per task with an attached terminal.
pub struct LineDiscipline {
    buffer: CookedBuffer,
    flags: TerminalFlags,
    owner: sched::TaskId,
}

impl LineDiscipline {
    pub const fn new(owner: sched::TaskId) -> Self {
        Self { buffer: CookedBuffer::new(), flags: TerminalFlags::ICANON.union(TerminalFlags::ECHO).union(TerminalFlags::ECHOE).union(TerminalFlags::ISIG), owner }
    }

    pub fn get_attr(&self) -> TerminalFlags {
        self.flags
    }

    pub fn set_attr(&mut self, flags: TerminalFlags) {
        self.flags = flags;
    }

    /// The per-`read()`-call protocol (spec.md §4.3, steps 1-6). `out`
    /// receives at most one byte except for the control-range echo case,
    /// which reports a 3-byte "virtual" read without writing to `out`
    /// (the 3 bytes went to the display and `CookedBuffer`, matching
    /// spec.md §8 scenario 4).
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        // Step 1: a line is ready if ICANON is off (every byte readable
        // immediately) or the most recently pushed byte was '\n'.
        if !self.buffer.is_empty() && (!self.flags.contains(TerminalFlags::ICANON) || self.buffer.peek_last() == Some(b'\n')) {
            if let Some(b) = self.buffer.pop_first() {
                if let Some(slot) = out.first_mut() {
                    *slot = b;
                }
                return 1;
            }
        }

        // Steps 2-3: pull one resolved code from the scancode ring.
        let Some(code) = crate::keyboard::read_code() else { return 0 };
        let byte = (code & 0xFF) as u8; // step 4

        self.apply(byte, out)
    }

    fn apply(&mut self, byte: u8, out: &mut [u8]) -> usize {
        match byte {
            BACKSPACE => {
                if self.flags.contains(TerminalFlags::ICANON) {
                    self.buffer.pop_last();
                    if self.flags.contains(TerminalFlags::ECHOE) {
                        self.emit_display(&[BACKSPACE]);
                    }
                    0
                } else {
                    self.buffer.push(BACKSPACE);
                    if let Some(slot) = out.first_mut() {
                        *slot = BACKSPACE;
                    }
                    1
                }
            }
            DELETE => {
                if self.flags.contains(TerminalFlags::ECHO) {
                    self.emit_display(DELETE_SEQUENCE);
                }
                for &b in DELETE_SEQUENCE {
                    self.buffer.push(b);
                }
                0
            }
            0x01..=0x1A if byte != b'\n' && byte != b'\t' => {
                if self.flags.contains(TerminalFlags::ISIG) {
                    match byte {
                        INTR => sched::deliver_signal(self.owner, SIGTERM),
                        SUSP => sched::deliver_signal(self.owner, SIGSTOP),
                        _ => {}
                    }
                }
                let echoed = b'A' + (byte - 1);
                if self.flags.contains(TerminalFlags::ECHO) {
                    self.emit_display(&[b'^', echoed]);
                }
                self.buffer.push(0x1B);
                self.buffer.push(b'^');
                self.buffer.push(echoed);
                3
            }
            _ => {
                self.buffer.push(byte);
                if !self.flags.contains(TerminalFlags::ICANON) {
                    if let Some(b) = self.buffer.pop_first() {
                        if let Some(slot) = out.first_mut() {
                            *slot = b;
                        }
                        return 1;
                    }
                }
                0
            }
        }
    }

    /// Write straight to the display -- `spec.md` treats the display as
    /// an external collaborator; this is its host-testable stand-in.
    fn emit_display(&self, bytes: &[u8]) {
        log::trace!("tty display: {bytes:?}");
    }

    /// `write()` on the tty file: bytes go straight to the display.
    pub fn write(&self, bytes: &[u8]) {
        self.emit_display(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> LineDiscipline {
        LineDiscipline::new(sched::TaskId(1))
    }

    fn feed_all(tty: &mut LineDiscipline, bytes: &[u8]) {
        for &b in bytes {
            crate::keyboard::SCANCODES.lock().push_back(b as i32);
        }
        let mut sink = [0u8; 1];
        for _ in bytes {
            tty.read(&mut sink);
        }
    }

    #[test]
    fn scenario_canonical_mode_line() {
        // spec.md §8 scenario 3.
        let mut tty = fresh();
        crate::keyboard::SCANCODES.lock().push_back(b'h' as i32);
        crate::keyboard::SCANCODES.lock().push_back(b'i' as i32);
        crate::keyboard::SCANCODES.lock().push_back(b'\n' as i32);

        let mut out = [0u8; 1];
        assert_eq!(tty.read(&mut out), 0); // 'h' queued, no newline yet
        assert_eq!(tty.read(&mut out), 0); // 'i' queued
        assert_eq!(tty.read(&mut out), 0); // '\n' queued, line now complete

        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'h');
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'i');
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'\n');
        assert_eq!(tty.read(&mut out), 0);
    }

    #[test]
    fn scenario_ctrl_c_under_isig_delivers_sigterm() {
        // spec.md §8 scenario 4.
        let mut tty = fresh();
        crate::keyboard::SCANCODES.lock().push_back(INTR as i32);
        let mut out = [0u8; 1];
        assert_eq!(tty.read(&mut out), 3);
        assert_eq!(sched::next_signal(sched::TaskId(1)), Some(SIGTERM));
    }

    #[test]
    fn ctrl_z_under_isig_delivers_sigstop() {
        let mut tty = fresh();
        crate::keyboard::SCANCODES.lock().push_back(SUSP as i32);
        let mut out = [0u8; 1];
        tty.read(&mut out);
        assert_eq!(sched::next_signal(sched::TaskId(1)), Some(SIGSTOP));
    }

    #[test]
    fn backspace_erases_last_buffered_character() {
        let mut tty = fresh();
        feed_all(&mut tty, b"hi");
        crate::keyboard::SCANCODES.lock().push_back(BACKSPACE as i32);
        let mut out = [0u8; 1];
        tty.read(&mut out); // consumes the backspace, erases 'i'
        crate::keyboard::SCANCODES.lock().push_back(b'\n' as i32);
        tty.read(&mut out);
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'h');
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'\n');
    }

    #[test]
    fn delete_key_queues_csi_sequence_and_returns_zero() {
        let mut tty = fresh();
        crate::keyboard::SCANCODES.lock().push_back(DELETE as i32);
        let mut out = [0u8; 1];
        assert_eq!(tty.read(&mut out), 0);
        for _ in 0..2 {
            tty.read(&mut out);
        }
        crate::keyboard::SCANCODES.lock().push_back(b'\n' as i32);
        tty.read(&mut out);
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], 0x1B);
    }

    #[test]
    fn raw_mode_delivers_every_byte_immediately() {
        let mut tty = fresh();
        tty.set_attr(TerminalFlags::empty());
        crate::keyboard::SCANCODES.lock().push_back(b'x' as i32);
        let mut out = [0u8; 1];
        assert_eq!(tty.read(&mut out), 1);
        assert_eq!(out[0], b'x');
    }
}
