//! Modifier and LED state.
//!
//! `spec.md` §3 models `ModifierState` as "a word of bit flags"; the
//! teacher declares `bitflags` as a workspace dependency but (in the
//! snapshot this kernel is grounded on) had not yet reached for it,
//! hand-rolling bitfields instead (see `cap::types::CapabilityPermissions`).
//! This is exactly the case `bitflags!` exists for, so this module uses it
//! directly.

use bitflags::bitflags;

bitflags! {
    /// Mutated only from the ISR (spec.md §5).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModifierState: u16 {
        const LEFT_SHIFT   = 1 << 0;
        const RIGHT_SHIFT  = 1 << 1;
        const CAPS_LOCK    = 1 << 2;
        const NUM_LOCK     = 1 << 3;
        const SCROLL_LOCK  = 1 << 4;
        const LEFT_CTRL    = 1 << 5;
        const RIGHT_CTRL   = 1 << 6;
        const LEFT_ALT     = 1 << 7;
        const RIGHT_ALT    = 1 << 8;
    }
}

impl ModifierState {
    pub const SHIFT: Self = Self::LEFT_SHIFT.union(Self::RIGHT_SHIFT);
    pub const CTRL: Self = Self::LEFT_CTRL.union(Self::RIGHT_CTRL);

    pub fn shift(self) -> bool {
        self.intersects(Self::SHIFT)
    }

    pub fn ctrl(self) -> bool {
        self.intersects(Self::CTRL)
    }

    pub fn caps_lock(self) -> bool {
        self.contains(Self::CAPS_LOCK)
    }

    pub fn num_lock(self) -> bool {
        self.contains(Self::NUM_LOCK)
    }

    pub fn right_alt(self) -> bool {
        self.intersects(Self::RIGHT_ALT)
    }
}

bitflags! {
    /// Derived from `ModifierState` after every lock-key toggle and
    /// written to the keyboard controller (spec.md §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LedState: u8 {
        const SCROLL_LOCK = 1 << 0;
        const NUM_LOCK    = 1 << 1;
        const CAPS_LOCK   = 1 << 2;
    }
}

impl From<ModifierState> for LedState {
    fn from(mods: ModifierState) -> Self {
        let mut leds = LedState::empty();
        leds.set(LedState::SCROLL_LOCK, mods.contains(ModifierState::SCROLL_LOCK));
        leds.set(LedState::NUM_LOCK, mods.contains(ModifierState::NUM_LOCK));
        leds.set(LedState::CAPS_LOCK, mods.contains(ModifierState::CAPS_LOCK));
        leds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_is_either_physical_key() {
        assert!(ModifierState::LEFT_SHIFT.shift());
        assert!(ModifierState::RIGHT_SHIFT.shift());
        assert!(!ModifierState::CAPS_LOCK.shift());
    }

    #[test]
    fn led_state_mirrors_lock_bits_only() {
        let mods = ModifierState::CAPS_LOCK | ModifierState::LEFT_SHIFT | ModifierState::NUM_LOCK;
        let leds = LedState::from(mods);
        assert!(leds.contains(LedState::CAPS_LOCK));
        assert!(leds.contains(LedState::NUM_LOCK));
        assert!(!leds.contains(LedState::SCROLL_LOCK));
    }
}
