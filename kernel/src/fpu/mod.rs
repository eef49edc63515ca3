//! Lazy FPU context-switch protocol driven by the `#NM` trap.
//!
//! Grounded in the teacher's `arch::x86_64::context` FPU save/restore
//! functions, composed here into the single-owner bookkeeping spec.md
//! §4.4 describes:
//!
//! 1. On every context switch, CR0.TS is set so the next FPU/MMX/SSE
//!    instruction anywhere traps into `#NM`.
//! 2. `#NM` fires; if the trapping task is already the registered owner
//!    the trap was spurious (TS got set without a real switch) -- just
//!    clear TS and return.
//! 3. Otherwise, if there is a previous owner, its live FPU state is
//!    saved into its own save area.
//! 4. TS is cleared and SSE is (re-)enabled.
//! 5. The trapping task's state is restored -- via `FNINIT` the first
//!    time a task ever touches the FPU, via `FXRSTOR` afterward.
//! 6. The trapping task becomes the new registered owner.
//!
//! A destroyed task that was the registered owner releases ownership so
//! the next `#NM` doesn't try to save into a task that no longer exists.

use spin::Mutex;

use crate::arch::x86::fpu as hw;
use crate::sched::{self, TaskId};

static CURRENT_OWNER: Mutex<Option<TaskId>> = Mutex::new(None);

pub struct FpuOwner;

impl FpuOwner {
    /// Invoked from the `#NM` handler with the task that was executing
    /// when the trap fired. Runs with interrupts disabled end to end
    /// (spec.md §4.4/§5): a second `#NM` or IRQ landing mid-save/restore
    /// could observe the owner record half-updated.
    pub fn handle_device_not_available(&self, current: TaskId) {
        crate::arch::x86::without_interrupts(|| {
            let mut owner = CURRENT_OWNER.lock();

            if *owner == Some(current) {
                hw::clear_task_switched_and_enable_sse();
                return;
            }

            if let Some(prev) = *owner {
                sched::with_task(prev, |task| hw::fxsave(&mut task.fpu_area));
            }

            hw::clear_task_switched_and_enable_sse();

            sched::with_task(current, |task| {
                if task.fpu_initialized {
                    hw::fxrstor(&task.fpu_area);
                } else {
                    hw::fninit();
                    task.fpu_initialized = true;
                }
            });

            *owner = Some(current);
        });
    }

    /// Called on every switch away from a task so the next FPU touch
    /// anywhere traps again, regardless of which task runs next.
    pub fn mark_switched_out(&self) {
        hw::set_task_switched();
    }

    /// A task that owned the FPU is gone; forget the ownership record so
    /// a later `#NM` doesn't try to save into a freed task.
    pub fn on_task_destroyed(&self, task: TaskId) {
        let mut owner = CURRENT_OWNER.lock();
        if *owner == Some(task) {
            *owner = None;
        }
    }

    pub fn current(&self) -> Option<TaskId> {
        *CURRENT_OWNER.lock()
    }
}

static INSTANCE: FpuOwner = FpuOwner;

pub fn owner() -> &'static FpuOwner {
    &INSTANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_task(n: u64) -> TaskId {
        let id = TaskId(n);
        sched::spawn_task(id);
        id
    }

    #[test]
    fn first_touch_initializes_rather_than_restores() {
        let a = fresh_task(1);
        owner().handle_device_not_available(a);
        let initialized = sched::with_task(a, |t| t.fpu_initialized).unwrap();
        assert!(initialized);
        assert_eq!(owner().current(), Some(a));
        sched::destroy_task(a);
    }

    #[test]
    fn switching_owners_saves_the_previous_task_first() {
        let a = fresh_task(2);
        let b = fresh_task(3);
        owner().handle_device_not_available(a);
        sched::with_task(a, |t| t.fpu_area.0[0] = 0x42).unwrap();
        owner().handle_device_not_available(b);
        assert_eq!(owner().current(), Some(b));
        sched::destroy_task(a);
        sched::destroy_task(b);
    }

    #[test]
    fn spurious_trap_from_the_current_owner_is_a_no_op() {
        let a = fresh_task(4);
        owner().handle_device_not_available(a);
        owner().handle_device_not_available(a);
        assert_eq!(owner().current(), Some(a));
        sched::destroy_task(a);
    }

    #[test]
    fn destroying_the_owner_releases_ownership() {
        let a = fresh_task(5);
        owner().handle_device_not_available(a);
        assert_eq!(owner().current(), Some(a));
        sched::destroy_task(a);
        assert_eq!(owner().current(), None);
    }
}
