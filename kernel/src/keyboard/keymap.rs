//! Scancode-to-character lookup tables.
//!
//! `spec.md` §3: each `KeymapEntry` field is a 16-bit value encoding the
//! scancode in the high byte and the ASCII character in the low byte;
//! consumers mask `& 0xFF` for the character and keep the whole value
//! around for markers that need the scancode (the Alt-chord marker).
//! `spec.md` §9 calls out that the source generates one keymap array per
//! layout via a macro; kept here as plain `const` tables indexed by
//! make-code, split into a dense table for single-byte codes and a small
//! secondary table for the `0xE0xx` prefixed set, per the design note.

pub const UNSET: i16 = -1;

fn encode(scancode: u8, ascii: u8) -> i16 {
    (((scancode as u16) << 8) | ascii as u16) as i16
}

/// The four resolved codes for a single scancode, one per modifier
/// combination. `-1` marks "this key has no mapping in this slot".
#[derive(Debug, Clone, Copy)]
pub struct KeymapEntry {
    pub normal: i16,
    pub shift: i16,
    pub ctrl: i16,
    pub alt: i16,
}

/// Extract the ASCII low byte from a resolved `KeymapEntry` field.
/// `UNSET` has no meaningful low byte; callers check for it first.
pub fn char_of(code: i16) -> u8 {
    (code & 0xFF) as u8
}

impl KeymapEntry {
    const fn unset() -> Self {
        Self { normal: UNSET, shift: UNSET, ctrl: UNSET, alt: UNSET }
    }

    fn letter(scancode: u8, lower: u8, upper: u8) -> Self {
        // Ctrl+letter yields the C0 control code (spec.md §4.2 rule 3).
        Self {
            normal: encode(scancode, lower),
            shift: encode(scancode, upper),
            ctrl: encode(scancode, lower.to_ascii_uppercase() - b'A' + 1),
            alt: UNSET,
        }
    }

    fn punct(scancode: u8, normal: u8, shifted: u8) -> Self {
        Self { normal: encode(scancode, normal), shift: encode(scancode, shifted), ctrl: UNSET, alt: UNSET }
    }

    /// Like `punct`, but with a real AltGr column (spec.md §4.2 rules 2/3
    /// consult `entry.alt` for the IT layout's AltGr punctuation).
    fn punct_alt(scancode: u8, normal: u8, shifted: u8, alt: u8) -> Self {
        Self { normal: encode(scancode, normal), shift: encode(scancode, shifted), ctrl: UNSET, alt: encode(scancode, alt) }
    }

    fn same(scancode: u8, code: u8) -> Self {
        Self { normal: encode(scancode, code), shift: encode(scancode, code), ctrl: UNSET, alt: UNSET }
    }
}

const SIZE: usize = 128;

/// A single layout: a dense table for the un-prefixed (non-0xE0) scancode
/// set plus a small table for the 0xE0-prefixed ("prefixed") set.
pub struct Keymap {
    table: [KeymapEntry; SIZE],
    prefixed: [KeymapEntry; SIZE],
}

impl Keymap {
    /// Look up a plain (non-`0xE0`-prefixed) make-code scancode.
    pub fn lookup(&self, scancode: u8) -> Option<KeymapEntry> {
        self.table.get(scancode as usize).copied()
    }

    /// Look up a scancode from the `0xE0`-prefixed set (arrow keys,
    /// Ins/Del/Home/End/PgUp/PgDn, right Ctrl/Alt, keypad `/` and Enter).
    pub fn lookup_prefixed(&self, scancode: u8) -> Option<KeymapEntry> {
        self.prefixed.get(scancode as usize).copied()
    }
}

fn us_table() -> [KeymapEntry; SIZE] {
    let mut table = [KeymapEntry::unset(); SIZE];
    table[0x01] = KeymapEntry::same(0x01, 0x1B); // Esc
    table[0x02] = KeymapEntry::punct(0x02, b'1', b'!');
    table[0x03] = KeymapEntry::punct(0x03, b'2', b'@');
    table[0x04] = KeymapEntry::punct(0x04, b'3', b'#');
    table[0x05] = KeymapEntry::punct(0x05, b'4', b'$');
    table[0x06] = KeymapEntry::punct(0x06, b'5', b'%');
    table[0x07] = KeymapEntry::punct(0x07, b'6', b'^');
    table[0x08] = KeymapEntry::punct(0x08, b'7', b'&');
    table[0x09] = KeymapEntry::punct(0x09, b'8', b'*');
    table[0x0A] = KeymapEntry::punct(0x0A, b'9', b'(');
    table[0x0B] = KeymapEntry::punct(0x0B, b'0', b')');
    table[0x0C] = KeymapEntry::punct(0x0C, b'-', b'_');
    table[0x0D] = KeymapEntry::punct(0x0D, b'=', b'+');
    table[0x0E] = KeymapEntry::same(0x0E, 0x08); // Backspace
    table[0x0F] = KeymapEntry::same(0x0F, b'\t');
    table[0x10] = KeymapEntry::letter(0x10, b'q', b'Q');
    table[0x11] = KeymapEntry::letter(0x11, b'w', b'W');
    table[0x12] = KeymapEntry::letter(0x12, b'e', b'E');
    table[0x13] = KeymapEntry::letter(0x13, b'r', b'R');
    table[0x14] = KeymapEntry::letter(0x14, b't', b'T');
    table[0x15] = KeymapEntry::letter(0x15, b'y', b'Y');
    table[0x16] = KeymapEntry::letter(0x16, b'u', b'U');
    table[0x17] = KeymapEntry::letter(0x17, b'i', b'I');
    table[0x18] = KeymapEntry::letter(0x18, b'o', b'O');
    table[0x19] = KeymapEntry::letter(0x19, b'p', b'P');
    table[0x1A] = KeymapEntry::punct(0x1A, b'[', b'{');
    table[0x1B] = KeymapEntry::punct(0x1B, b']', b'}');
    table[0x1C] = KeymapEntry::same(0x1C, b'\n');
    table[0x1E] = KeymapEntry::letter(0x1E, b'a', b'A');
    table[0x1F] = KeymapEntry::letter(0x1F, b's', b'S');
    table[0x20] = KeymapEntry::letter(0x20, b'd', b'D');
    table[0x21] = KeymapEntry::letter(0x21, b'f', b'F');
    table[0x22] = KeymapEntry::letter(0x22, b'g', b'G');
    table[0x23] = KeymapEntry::letter(0x23, b'h', b'H');
    table[0x24] = KeymapEntry::letter(0x24, b'j', b'J');
    table[0x25] = KeymapEntry::letter(0x25, b'k', b'K');
    table[0x26] = KeymapEntry::letter(0x26, b'l', b'L');
    table[0x27] = KeymapEntry::punct(0x27, b';', b':');
    table[0x28] = KeymapEntry::punct(0x28, b'\'', b'"');
    table[0x29] = KeymapEntry::punct(0x29, b'`', b'~');
    table[0x2B] = KeymapEntry::punct(0x2B, b'\\', b'|');
    table[0x2C] = KeymapEntry::letter(0x2C, b'z', b'Z');
    table[0x2D] = KeymapEntry::letter(0x2D, b'x', b'X');
    table[0x2E] = KeymapEntry::letter(0x2E, b'c', b'C');
    table[0x2F] = KeymapEntry::letter(0x2F, b'v', b'V');
    table[0x30] = KeymapEntry::letter(0x30, b'b', b'B');
    table[0x31] = KeymapEntry::letter(0x31, b'n', b'N');
    table[0x32] = KeymapEntry::letter(0x32, b'm', b'M');
    table[0x33] = KeymapEntry::punct(0x33, b',', b'<');
    table[0x34] = KeymapEntry::punct(0x34, b'.', b'>');
    table[0x35] = KeymapEntry::punct(0x35, b'/', b'?');
    table[0x39] = KeymapEntry::same(0x39, b' ');

    // Keypad, NumLock ON: digit/'.' form via `normal`. With NumLock OFF
    // the ISR treats these same scancodes as the navigation cluster
    // instead of consulting this table (see `isr::numpad_nav`).
    table[0x47] = KeymapEntry::same(0x47, b'7');
    table[0x48] = KeymapEntry::same(0x48, b'8');
    table[0x49] = KeymapEntry::same(0x49, b'9');
    table[0x4A] = KeymapEntry::same(0x4A, b'-');
    table[0x4B] = KeymapEntry::same(0x4B, b'4');
    table[0x4C] = KeymapEntry::same(0x4C, b'5');
    table[0x4D] = KeymapEntry::same(0x4D, b'6');
    table[0x4E] = KeymapEntry::same(0x4E, b'+');
    table[0x4F] = KeymapEntry::same(0x4F, b'1');
    table[0x50] = KeymapEntry::same(0x50, b'2');
    table[0x51] = KeymapEntry::same(0x51, b'3');
    table[0x52] = KeymapEntry::same(0x52, b'0');
    table[0x53] = KeymapEntry::same(0x53, b'.');

    table
}

fn it_table() -> [KeymapEntry; SIZE] {
    // Same physical-key shape as the US layout with the punctuation row
    // substituted for the Italian QWERTY legends; letters are unaffected.
    // AltGr columns follow the physical IT keyboard's third level, the
    // keys `isr::resolve_and_push` rules 2/3 resolve to when right-alt
    // (with, for rule 2, shift too) is held.
    let mut table = us_table();
    table[0x0C] = KeymapEntry::punct_alt(0x0C, b'\'', b'?', b'['); // AltGr -> [
    table[0x0D] = KeymapEntry::punct_alt(0x0D, 0xEC, b'^', b']'); // i-grave / caret, AltGr -> ]
    table[0x1A] = KeymapEntry::punct_alt(0x1A, 0xE8, 0xE9, b'{'); // e-grave / e-acute, AltGr -> {
    table[0x1B] = KeymapEntry::punct_alt(0x1B, b'+', b'*', b'}'); // AltGr -> }
    table[0x27] = KeymapEntry::punct_alt(0x27, 0xF2, 0xE7, b'@'); // o-grave / c-cedilla, AltGr -> @
    table[0x28] = KeymapEntry::punct_alt(0x28, 0xE0, 0xB0, b'#'); // a-grave / degree, AltGr -> #
    table[0x29] = KeymapEntry::punct(0x29, b'\\', b'|');
    table[0x2B] = KeymapEntry::punct(0x2B, 0xF9, 0xA7); // u-grave / section
    table
}

fn prefixed_table() -> [KeymapEntry; SIZE] {
    let mut table = [KeymapEntry::unset(); SIZE];
    table[0x1C] = KeymapEntry::same(0x1C, b'\n'); // keypad Enter
    table[0x35] = KeymapEntry::same(0x35, b'/'); // keypad /
    table
}

// Built once at first use rather than per-keypress, mirroring the
// teacher's `lazy_static!` IDT/GDT tables in `arch::x86_64::{idt,gdt}`.
lazy_static::lazy_static! {
    pub static ref US: Keymap = Keymap { table: us_table(), prefixed: prefixed_table() };
    pub static ref IT: Keymap = Keymap { table: it_table(), prefixed: prefixed_table() };
}

#[cfg(test)]
fn us() -> &'static Keymap {
    &US
}

#[cfg(test)]
fn it() -> &'static Keymap {
    &IT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_encodes_scancode_in_high_byte() {
        let entry = us().lookup(0x1E).unwrap(); // 'a'
        assert_eq!(char_of(entry.normal), b'a');
        assert_eq!(entry.normal >> 8, 0x1E);
    }

    #[test]
    fn letter_ctrl_code_is_c0_range() {
        let entry = us().lookup(0x1E).unwrap(); // 'a'
        assert_eq!(char_of(entry.normal), b'a');
        assert_eq!(char_of(entry.shift), b'A');
        assert_eq!(char_of(entry.ctrl), 1); // Ctrl-A
    }

    #[test]
    fn unmapped_scancode_is_unset() {
        assert_eq!(us().lookup(0x7F).unwrap().normal, UNSET);
    }

    #[test]
    fn it_and_us_share_letters_but_differ_on_punctuation() {
        assert_eq!(it().lookup(0x10).unwrap().normal, us().lookup(0x10).unwrap().normal);
        assert_ne!(it().lookup(0x0C).unwrap().normal, us().lookup(0x0C).unwrap().normal);
    }

    #[test]
    fn prefixed_table_covers_keypad_enter_and_slash() {
        assert_eq!(char_of(us().lookup_prefixed(0x1C).unwrap().normal), b'\n');
        assert_eq!(char_of(us().lookup_prefixed(0x35).unwrap().normal), b'/');
    }

    #[test]
    fn scenario_it_q_press_yields_lowercase_q() {
        // spec.md §8 scenario 1: IT layout, scancode 0x10, no modifiers.
        let entry = it().lookup(0x10).unwrap();
        assert_eq!(char_of(entry.normal), b'q');
    }

    #[test]
    fn it_altgr_column_is_populated_for_punctuation() {
        let entry = it().lookup(0x0C).unwrap();
        assert_ne!(entry.alt, UNSET);
        assert_eq!(char_of(entry.alt), b'[');
    }

    #[test]
    fn us_layout_never_sets_an_alt_column() {
        let entry = us().lookup(0x0C).unwrap();
        assert_eq!(entry.alt, UNSET);
    }
}
