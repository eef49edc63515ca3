//! The per-task state the keyboard/tty and FPU subsystems hang off of.
//!
//! A stand-in for the teacher's `process::pcb::ProcessControlBlock` --
//! this kernel's traced subsystems (lazy FPU, line discipline) only need
//! a handful of the real PCB's fields, so only those are modeled.

use crate::arch::x86::fpu::FpuSaveArea;
use crate::keyboard::ring::RingBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

pub struct Task {
    pub id: TaskId,
    pub uid: u32,
    pub gid: u32,
    pub fpu_area: FpuSaveArea,
    pub fpu_initialized: bool,
    pending_signals: RingBuffer<i32, { crate::config::SIGNAL_QUEUE_CAPACITY }>,
}

impl Task {
    pub const fn new(id: TaskId) -> Self {
        Self { id, uid: 0, gid: 0, fpu_area: FpuSaveArea::zeroed(), fpu_initialized: false, pending_signals: RingBuffer::new() }
    }

    pub fn push_signal(&mut self, signum: i32) {
        self.pending_signals.push_back(signum);
    }

    pub fn next_signal(&mut self) -> Option<i32> {
        self.pending_signals.pop_front()
    }
}
