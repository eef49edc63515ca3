//! Minimal 16550 UART driver for the kernel log sink.
//!
//! `spec.md` treats the serial debug logger as an external collaborator;
//! this is the thin driver the logger (`crate::logger`) writes through.
//! Grounded in the teacher's `arch::x86_64::serial` (there backed by the
//! `uart_16550` crate) -- reimplemented directly over port I/O since
//! `uart_16550` also hard-requires `target_arch = "x86_64"`.

use core::fmt;

use super::port::{inb, outb};

const COM1: u16 = 0x3F8;

/// A single 16550-compatible serial port.
pub struct SerialPort {
    base: u16,
    initialized: bool,
}

impl SerialPort {
    /// COM1, the conventional kernel debug port.
    pub const fn com1() -> Self {
        Self {
            base: COM1,
            initialized: false,
        }
    }

    fn ensure_init(&mut self) {
        if self.initialized {
            return;
        }
        // SAFETY: standard 16550 init sequence (disable interrupts, set
        // baud divisor, 8N1, enable FIFO, assert RTS/DTR). `self.base`
        // points at a real UART on bare metal; on host builds these are
        // no-ops (see `port::{inb,outb}` host stand-ins).
        unsafe {
            outb(self.base + 1, 0x00); // disable interrupts
            outb(self.base + 3, 0x80); // enable DLAB
            outb(self.base, 0x03); // divisor low byte: 38400 baud
            outb(self.base + 1, 0x00); // divisor high byte
            outb(self.base + 3, 0x03); // 8 bits, no parity, one stop bit
            outb(self.base + 2, 0xC7); // enable FIFO, clear, 14-byte threshold
            outb(self.base + 4, 0x0B); // IRQs enabled, RTS/DSR set
        }
        self.initialized = true;
    }

    fn write_byte(&mut self, byte: u8) {
        self.ensure_init();
        // SAFETY: polling the line-status register bit 5 (transmit
        // holding register empty) before writing is the standard 16550
        // handshake; `self.base` is a valid UART base.
        unsafe {
            while inb(self.base + 5) & 0x20 == 0 {
                core::hint::spin_loop();
            }
            outb(self.base, byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

// SAFETY: all mutable state is behind the caller's `&mut self`; the port
// number itself is plain data. Shared access across contexts is mediated
// by `spin::Mutex<SerialPort>` in `crate::logger`.
unsafe impl Send for SerialPort {}
