//! Scancode decode and resolution, invoked from the IRQ1 handler.
//!
//! Grounded in the teacher's `drivers::keyboard` modifier/GUI-mode state
//! machine (`MODIFIER_STATE: AtomicU8`, `GUI_MODE` toggling escape-sequence
//! vs single-byte encoding); `spec.md` §4.2 keeps the same shape: a
//! break/make and `0xE0`-prefix state machine feeding a fixed modifier
//! resolution order, the result pushed onto the scancode ring that the
//! line discipline reads from.

use spin::Mutex;

use super::keymap::{self, char_of, Keymap, KeymapEntry, UNSET};
use super::modifiers::{LedState, ModifierState};
use super::SCANCODES;

const BREAK_BIT: u8 = 0x80;
const PREFIX_E0: u8 = 0xE0;

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const LEFT_CTRL: u8 = 0x1D;
const LEFT_ALT: u8 = 0x38;
const CAPS_LOCK: u8 = 0x3A;
const NUM_LOCK: u8 = 0x45;
const SCROLL_LOCK: u8 = 0x46;

static PENDING_E0: Mutex<bool> = Mutex::new(false);
static MODIFIERS: Mutex<ModifierState> = Mutex::new(ModifierState::empty());
static ACTIVE_LAYOUT: Mutex<crate::config::Layout> = Mutex::new(crate::config::Layout::Us);

fn active_keymap() -> &'static Keymap {
    match *ACTIVE_LAYOUT.lock() {
        crate::config::Layout::Us => &keymap::US,
        crate::config::Layout::Italian => &keymap::IT,
    }
}

pub fn set_layout(layout: crate::config::Layout) {
    *ACTIVE_LAYOUT.lock() = layout;
}

/// Entry point for IRQ1: one raw byte read from the PS/2 data port.
///
/// Handles the `0xE0` prefix and break/make state machine, folds modifier
/// and lock keys into `MODIFIERS`, and for ordinary keys resolves a code
/// (or an escape sequence) and pushes it onto the scancode ring.
pub fn handle_scancode(byte: u8) {
    if byte == PREFIX_E0 {
        *PENDING_E0.lock() = true;
        return;
    }

    let prefixed = core::mem::take(&mut *PENDING_E0.lock());
    let pressed = byte & BREAK_BIT == 0;
    let code = byte & !BREAK_BIT;

    if handle_modifier(code, prefixed, pressed) {
        return;
    }

    if !pressed {
        return; // only make (press) events produce output
    }

    // The physical arrow/nav cluster arrives 0xE0-prefixed; the keypad
    // sends the same scancodes un-prefixed. With NumLock off, the keypad
    // behaves like the nav cluster too (spec.md §4.2 "keypad resolution").
    let num_lock = MODIFIERS.lock().num_lock();
    if prefixed || (!num_lock && is_keypad_nav_scancode(code)) {
        if let Some(bytes) = nav_sequence(code, MODIFIERS.lock().ctrl()) {
            push_bytes(bytes);
            return;
        }
    }

    if !prefixed {
        if let Some(seq) = function_key_sequence(code) {
            push_bytes(seq);
            return;
        }
    }

    let entry = if prefixed { active_keymap().lookup_prefixed(code) } else { active_keymap().lookup(code) };
    let Some(entry) = entry else { return };

    resolve_and_push(entry);
}

/// Returns `true` if `code` was a modifier/lock key and has been handled
/// (callers should not fall through to key resolution).
fn handle_modifier(code: u8, prefixed: bool, pressed: bool) -> bool {
    let mut mods = MODIFIERS.lock();
    match code {
        LEFT_SHIFT => {
            mods.set(ModifierState::LEFT_SHIFT, pressed);
            true
        }
        RIGHT_SHIFT => {
            mods.set(ModifierState::RIGHT_SHIFT, pressed);
            true
        }
        LEFT_CTRL if !prefixed => {
            mods.set(ModifierState::LEFT_CTRL, pressed);
            true
        }
        LEFT_CTRL if prefixed => {
            mods.set(ModifierState::RIGHT_CTRL, pressed);
            true
        }
        LEFT_ALT if !prefixed => {
            mods.set(ModifierState::LEFT_ALT, pressed);
            if pressed {
                drop(mods);
                SCANCODES.lock().push_front((code as i32) << 16);
            }
            true
        }
        LEFT_ALT if prefixed => {
            mods.set(ModifierState::RIGHT_ALT, pressed);
            if pressed {
                drop(mods);
                SCANCODES.lock().push_front((code as i32) << 16);
            }
            true
        }
        CAPS_LOCK if pressed => {
            mods.toggle(ModifierState::CAPS_LOCK);
            write_leds(LedState::from(*mods));
            true
        }
        NUM_LOCK if pressed => {
            mods.toggle(ModifierState::NUM_LOCK);
            write_leds(LedState::from(*mods));
            true
        }
        SCROLL_LOCK if pressed => {
            mods.toggle(ModifierState::SCROLL_LOCK);
            write_leds(LedState::from(*mods));
            true
        }
        CAPS_LOCK | NUM_LOCK | SCROLL_LOCK => true, // lock-key break events: swallow
        _ => false,
    }
}

fn push_bytes(bytes: &[u8]) {
    let mut ring = SCANCODES.lock();
    for &b in bytes {
        ring.push_back(b as i32);
    }
}

/// Resolution order for printable keys (spec.md §4.2, first match wins):
/// 1. Exactly one of {shift, caps_lock} set and the char is alphabetic ->
///    shifted code (XOR semantics: caps lock inverts shift for letters).
/// 2. Layout is IT and right-alt+shift held -> `alt`.
/// 3. Right-alt held -> `alt`.
/// 4. Ctrl held -> `ctrl`.
/// 5. Otherwise -> `normal`.
fn resolve_and_push(entry: KeymapEntry) {
    let mods = *MODIFIERS.lock();
    let is_letter = char_of(entry.normal).is_ascii_alphabetic();

    let code = if (mods.shift() ^ mods.caps_lock()) && is_letter {
        entry.shift
    } else if *ACTIVE_LAYOUT.lock() == crate::config::Layout::Italian && mods.right_alt() && mods.shift() && entry.alt != UNSET {
        entry.alt
    } else if mods.right_alt() && entry.alt != UNSET {
        entry.alt
    } else if mods.ctrl() && entry.ctrl != UNSET {
        entry.ctrl
    } else {
        entry.normal
    };

    if code != UNSET {
        SCANCODES.lock().push_back(char_of(code) as i32);
    }
}

const fn is_keypad_nav_scancode(code: u8) -> bool {
    matches!(code, 0x47 | 0x48 | 0x49 | 0x4B | 0x4D | 0x4F | 0x50 | 0x51 | 0x52 | 0x53)
}

/// CSI sequences for the navigation cluster (arrows, Home/End/PgUp/PgDn,
/// Insert, Delete), shared by the `0xE0`-prefixed physical keys and the
/// keypad-with-NumLock-off case. Delete pushes a bare `0x7F`, not a CSI
/// sequence (spec.md §4.2): the line discipline is the layer that turns
/// `0x7F` into `ESC [ 3 ~` (spec.md §4.3).
fn nav_sequence(code: u8, ctrl: bool) -> Option<&'static [u8]> {
    Some(match (code, ctrl) {
        (0x48, false) => b"\x1b[A",
        (0x48, true) => b"\x1b[1;5A",
        (0x50, false) => b"\x1b[B",
        (0x50, true) => b"\x1b[1;5B",
        (0x4D, false) => b"\x1b[C",
        (0x4D, true) => b"\x1b[1;5C",
        (0x4B, false) => b"\x1b[D",
        (0x4B, true) => b"\x1b[1;5D",
        (0x47, _) => b"\x1b[1~", // Home
        (0x4F, _) => b"\x1b[4~", // End
        (0x49, _) => b"\x1b[5~", // PgUp
        (0x51, _) => b"\x1b[6~", // PgDn
        (0x52, _) => b"\x1b[2~", // Insert
        (0x53, _) => b"\x7f",    // Delete: bare DEL byte
        _ => return None,
    })
}

/// F1-F12 CSI sequences (spec.md §4.2). Never `0xE0`-prefixed.
fn function_key_sequence(code: u8) -> Option<&'static [u8]> {
    Some(match code {
        0x3B => b"\x1b[11~",
        0x3C => b"\x1b[12~",
        0x3D => b"\x1b[13~",
        0x3E => b"\x1b[14~",
        0x3F => b"\x1b[15~",
        0x40 => b"\x1b[17~",
        0x41 => b"\x1b[18~",
        0x42 => b"\x1b[19~",
        0x43 => b"\x1b[20~",
        0x44 => b"\x1b[21~",
        0x57 => b"\x1b[23~",
        0x58 => b"\x1b[24~",
        _ => return None,
    })
}

/// Push the current lock-key state to the keyboard controller's LEDs.
fn write_leds(leds: LedState) {
    use crate::arch::x86::port::outb;
    // SAFETY: 0x60/0x64 are the standard PS/2 controller data/status ports;
    // 0xED is the documented "set LEDs" command, acknowledged by the
    // controller echoing 0xFA before the LED byte is accepted.
    unsafe {
        outb(0x60, 0xED);
        outb(0x60, leds.bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset() {
        *MODIFIERS.lock() = ModifierState::empty();
        *PENDING_E0.lock() = false;
        *ACTIVE_LAYOUT.lock() = crate::config::Layout::Us;
        SCANCODES.lock().clear();
    }

    #[test]
    fn scenario_plain_keypress_it_layout() {
        // spec.md §8 scenario 1.
        reset();
        set_layout(crate::config::Layout::Italian);
        handle_scancode(0x10);
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'q' as i32));
        set_layout(crate::config::Layout::Us);
    }

    #[test]
    fn scenario_shift_a_us_layout() {
        // spec.md §8 scenario 2.
        reset();
        handle_scancode(LEFT_SHIFT);
        handle_scancode(0x1E);
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'A' as i32));
        handle_scancode(LEFT_SHIFT | BREAK_BIT);
    }

    #[test]
    fn caps_lock_inverts_shift_for_letters_only() {
        reset();
        handle_scancode(CAPS_LOCK);
        handle_scancode(0x1E); // 'a' -> 'A' under caps lock
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'A' as i32));
        handle_scancode(0x02); // '1' unaffected by caps lock
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'1' as i32));
        handle_scancode(CAPS_LOCK); // restore
    }

    #[test]
    fn ctrl_a_yields_c0_control_code() {
        reset();
        handle_scancode(LEFT_CTRL);
        handle_scancode(0x1E);
        assert_eq!(SCANCODES.lock().pop_front(), Some(1));
        handle_scancode(LEFT_CTRL | BREAK_BIT);
    }

    #[test]
    fn alt_press_pushes_marker_ahead_of_queue() {
        reset();
        handle_scancode(0x1E); // queued 'a' first
        handle_scancode(LEFT_ALT); // marker should jump ahead
        let ring = SCANCODES.lock();
        assert_eq!(ring.peek_front(), Some((LEFT_ALT as i32) << 16));
        drop(ring);
        handle_scancode(LEFT_ALT | BREAK_BIT);
    }

    #[test]
    fn break_events_produce_no_output() {
        reset();
        handle_scancode(0x1E | BREAK_BIT);
        assert_eq!(SCANCODES.lock().pop_front(), None);
    }

    #[test]
    fn arrow_key_emits_csi_sequence() {
        reset();
        handle_scancode(PREFIX_E0);
        handle_scancode(0x48); // Up
        let ring = SCANCODES.lock();
        assert_eq!(ring.get(0), Some(0x1B));
        assert_eq!(ring.get(1), Some(b'[' as i32));
        assert_eq!(ring.get(2), Some(b'A' as i32));
    }

    #[test]
    fn delete_key_pushes_bare_del_byte() {
        reset();
        handle_scancode(PREFIX_E0);
        handle_scancode(0x53);
        assert_eq!(SCANCODES.lock().pop_front(), Some(0x7F));
    }

    #[test]
    fn keypad_without_numlock_behaves_like_nav_cluster() {
        reset();
        handle_scancode(0x48); // KP8, NumLock off by default
        let ring = SCANCODES.lock();
        assert_eq!(ring.get(0), Some(0x1B));
        assert_eq!(ring.get(2), Some(b'A' as i32));
    }

    #[test]
    fn keypad_with_numlock_on_yields_digit() {
        reset();
        handle_scancode(NUM_LOCK); // toggle on
        handle_scancode(0x48); // KP8
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'8' as i32));
        handle_scancode(NUM_LOCK); // restore
    }

    #[test]
    fn scenario_it_altgr_yields_bracket() {
        // spec.md §4.2 rule 3: right-alt alone resolves to `entry.alt`.
        reset();
        set_layout(crate::config::Layout::Italian);
        handle_scancode(PREFIX_E0);
        handle_scancode(LEFT_ALT); // 0xE0 0x38 make: right-alt pressed
        SCANCODES.lock().clear(); // drop the alt-press marker, not under test here
        handle_scancode(0x0C);
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'[' as i32));
        handle_scancode(PREFIX_E0);
        handle_scancode(LEFT_ALT | BREAK_BIT);
        set_layout(crate::config::Layout::Us);
    }

    #[test]
    fn scenario_it_altgr_shift_yields_bracket_via_rule_two() {
        // spec.md §4.2 rule 2: IT layout, right-alt+shift both held.
        reset();
        set_layout(crate::config::Layout::Italian);
        handle_scancode(PREFIX_E0);
        handle_scancode(LEFT_ALT);
        handle_scancode(LEFT_SHIFT);
        SCANCODES.lock().clear();
        handle_scancode(0x1A);
        assert_eq!(SCANCODES.lock().pop_front(), Some(b'{' as i32));
        handle_scancode(LEFT_SHIFT | BREAK_BIT);
        handle_scancode(PREFIX_E0);
        handle_scancode(LEFT_ALT | BREAK_BIT);
        set_layout(crate::config::Layout::Us);
    }

    #[test]
    fn function_key_emits_expected_sequence() {
        reset();
        handle_scancode(0x3B); // F1
        let ring = SCANCODES.lock();
        let bytes: alloc::vec::Vec<i32> = (0..5).filter_map(|i| ring.get(i)).collect();
        assert_eq!(bytes, alloc::vec![0x1B, b'[' as i32, b'1' as i32, b'1' as i32, b'~' as i32]);
    }
}
