//! 8259 PIC remap and end-of-interrupt signaling.
//!
//! Grounded in the teacher's use of `pic8259::ChainedPics` (see
//! `arch::x86_64::idt`'s timer handler, which issues a raw EOI write to
//! port 0x20); reimplemented directly over port I/O here because
//! `pic8259` also hard-requires `target_arch = "x86_64"`.

use super::port::outb;

const PIC1_CMD: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_CMD: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;

/// Remap the PIC so IRQ0-7 land on vectors 32-39 and IRQ8-15 on 40-47,
/// clear of the CPU's reserved exception vectors 0-31.
pub fn remap(offset1: u8, offset2: u8) {
    // SAFETY: standard 8259 initialization control word sequence; both
    // PICs are always present on this platform and the sequence is only
    // run once during boot, before interrupts are enabled.
    unsafe {
        outb(PIC1_CMD, ICW1_INIT);
        outb(PIC2_CMD, ICW1_INIT);
        outb(PIC1_DATA, offset1);
        outb(PIC2_DATA, offset2);
        outb(PIC1_DATA, 0b0000_0100); // tell master PIC2 is at IRQ2
        outb(PIC2_DATA, 0b0000_0010); // tell slave its cascade identity
        outb(PIC1_DATA, ICW4_8086);
        outb(PIC2_DATA, ICW4_8086);
        outb(PIC1_DATA, 0x00); // unmask all master IRQs
        outb(PIC2_DATA, 0x00); // unmask all slave IRQs
    }
}

/// Signal end-of-interrupt for the given IRQ line (0-15).
pub fn send_eoi(irq: u8) {
    // SAFETY: writing 0x20 to the command port is the documented EOI
    // sequence; the slave PIC must also be acknowledged for IRQ >= 8.
    unsafe {
        if irq >= 8 {
            outb(PIC2_CMD, 0x20);
        }
        outb(PIC1_CMD, 0x20);
    }
}
