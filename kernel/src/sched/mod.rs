//! Minimal task-table stand-in for the collaborator the spec calls
//! "the scheduler" -- just enough state (current task, per-task signal
//! queue, per-task FPU save area) for the keyboard/tty/FPU modules this
//! kernel actually implements to have something to point at.
//!
//! Grounded in the teacher's `process::mod` (`current_process()`) and
//! `process::signal_delivery`'s numbering for the constants reused here.

pub mod task;

use spin::Mutex;
pub use task::{Task, TaskId};

pub const SIGFPE: i32 = 8;
pub const SIGTERM: i32 = 15;
pub const SIGSTOP: i32 = 19;

struct TaskTable {
    tasks: [Option<Task>; crate::config::MAX_TASKS],
    current: Option<TaskId>,
}

impl TaskTable {
    const fn new() -> Self {
        const NONE: Option<Task> = None;
        Self { tasks: [NONE; crate::config::MAX_TASKS], current: None }
    }

    fn slot_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| matches!(t, Some(task) if task.id == id))
    }
}

static TABLE: Mutex<TaskTable> = Mutex::new(TaskTable::new());

/// Register a new task, returning `false` if the table is full or `id`
/// is already present.
pub fn spawn_task(id: TaskId) -> bool {
    let mut table = TABLE.lock();
    if table.slot_of(id).is_some() {
        return false;
    }
    match table.tasks.iter().position(|t| t.is_none()) {
        Some(slot) => {
            table.tasks[slot] = Some(Task::new(id));
            true
        }
        None => false,
    }
}

pub fn destroy_task(id: TaskId) {
    let mut table = TABLE.lock();
    if let Some(slot) = table.slot_of(id) {
        table.tasks[slot] = None;
    }
    if table.current == Some(id) {
        table.current = None;
    }
    crate::fpu::owner().on_task_destroyed(id);
}

pub fn current_task() -> Option<TaskId> {
    TABLE.lock().current
}

/// `(uid, gid)` of the running task, defaulting to `(0, 0)` (root) when
/// there is no current task -- the kernel itself acting on a task's behalf.
pub fn caller_identity() -> (u32, u32) {
    current_task().and_then(|id| with_task(id, |task| (task.uid, task.gid))).unwrap_or((0, 0))
}

pub fn set_current_task(id: Option<TaskId>) {
    TABLE.lock().current = id;
}

/// Run `f` against the task identified by `id`, if it still exists.
pub fn with_task<R>(id: TaskId, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
    let mut table = TABLE.lock();
    let slot = table.slot_of(id)?;
    table.tasks[slot].as_mut().map(f)
}

pub fn deliver_signal(id: TaskId, signum: i32) {
    with_task(id, |task| task.push_signal(signum));
}

pub fn next_signal(id: TaskId) -> Option<i32> {
    with_task(id, |task| task.next_signal()).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_then_destroy_frees_the_slot() {
        let id = TaskId(9001);
        assert!(spawn_task(id));
        assert!(!spawn_task(id)); // duplicate rejected
        destroy_task(id);
        assert!(spawn_task(id)); // slot reusable
        destroy_task(id);
    }

    #[test]
    fn deliver_signal_is_queued_fifo() {
        let id = TaskId(9002);
        spawn_task(id);
        deliver_signal(id, SIGTERM);
        deliver_signal(id, SIGSTOP);
        assert_eq!(next_signal(id), Some(SIGTERM));
        assert_eq!(next_signal(id), Some(SIGSTOP));
        assert_eq!(next_signal(id), None);
        destroy_task(id);
    }

    #[test]
    fn caller_identity_defaults_to_root_without_a_current_task() {
        set_current_task(None);
        assert_eq!(caller_identity(), (0, 0));
    }

    #[test]
    fn current_task_round_trips() {
        let id = TaskId(9003);
        spawn_task(id);
        set_current_task(Some(id));
        assert_eq!(current_task(), Some(id));
        set_current_task(None);
        destroy_task(id);
    }
}
