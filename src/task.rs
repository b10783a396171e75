//! # Task Slots
//!
//! Defines the task model for the tick scheduler. Each slot holds an
//! optional work function plus its countdown state; an empty slot
//! (`task == None`) is never decremented or marked due.
//!
//! ## Timing Model
//!
//! ```text
//!   add_task(f, delay = d, period = p)
//!        │
//!        ▼          tick() × d
//!   delay = d ───────────────────► delay = 0, run_me += 1
//!                                       │
//!                          p > 0        │        p == 0
//!                  delay = p (re-arm) ◄─┴─► stays due once (one-shot)
//! ```
//!
//! All countdown arithmetic happens inside the tick interrupt, so every
//! field is a single machine word or smaller and updates never allocate.

// ---------------------------------------------------------------------------
// Task function
// ---------------------------------------------------------------------------

/// The unit of scheduled work. Invoked from the main-loop dispatcher once
/// per due-marking; must run to completion without blocking. Long-running
/// work belongs in a staged [`Context`](crate::engine::Context) driven from
/// inside the task body.
pub type TaskFn = fn();

// ---------------------------------------------------------------------------
// Task slot
// ---------------------------------------------------------------------------

/// One entry in the scheduler's fixed-size task table.
///
/// Shared between the tick interrupt (decrement / due-marking) and the
/// main loop (registration, deletion, dispatch). Every field fits in a
/// single word so slot updates inside a critical section are cheap.
#[derive(Debug, Clone, Copy)]
pub struct TaskSlot {
    /// The work to perform when due. `None` marks the slot unused.
    pub task: Option<TaskFn>,

    /// Remaining ticks until the task is next due. Never decremented
    /// below zero; `0` means "due this tick".
    pub delay: u32,

    /// Ticks between recurring runs. `0` means one-shot: the task is
    /// marked due once and the dispatcher deletes the slot after running it.
    pub period: u32,

    /// Saturating due-count. Incremented by the tick handler each time the
    /// task becomes due, consumed by the dispatcher. Saturates rather than
    /// wrapping so a stalled main loop cannot corrupt the count.
    pub run_me: u8,
}

impl TaskSlot {
    /// An unused slot. Used to initialize the static table.
    pub const EMPTY: TaskSlot = TaskSlot {
        task: None,
        delay: 0,
        period: 0,
        run_me: 0,
    };

    /// Populate this slot with a task.
    pub fn arm(&mut self, task: TaskFn, delay: u32, period: u32) {
        self.task = Some(task);
        self.delay = delay;
        self.period = period;
        self.run_me = 0;
    }

    /// Zero the slot, returning it to the unused state.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// Whether this slot holds no task.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.task.is_none()
    }

    /// Whether this slot's task is waiting to be dispatched.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.task.is_some() && self.run_me > 0
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
