//! # Tick Scheduler
//!
//! Core scheduling logic: a fixed-capacity table of task slots driven by a
//! periodic tick interrupt. The tick handler only decrements countdowns and
//! marks due tasks; the actual work runs later, from the main loop's
//! dispatch pass. Tasks therefore cooperate — nothing is ever preempted.
//!
//! ## Per-Tick Algorithm
//!
//! At each tick interrupt, for every slot:
//! 1. **Skip empty slots** — an unused slot is never touched
//! 2. **Decrement the countdown** — only while `delay > 0`, so the unsigned
//!    countdown can never underflow
//! 3. **Mark due tasks** — when the countdown reaches zero, increment the
//!    slot's saturating due-count
//! 4. **Re-arm periodic tasks** — `delay = period`; one-shot tasks
//!    (`period == 0`) are not re-armed and are deleted by the dispatcher
//!    after their single run
//!
//! The loop is O(`MAX_TASKS`), performs no blocking operation and
//! allocates nothing, keeping it inside the interrupt's time budget.
//!
//! ## Error Indicator
//!
//! Registration and deletion faults do not unwind or panic. They are
//! recorded in a sticky per-scheduler error indicator (`last_error`) that
//! the application checks after registration calls, in addition to the
//! `Result` each call returns.

use crate::config::MAX_TASKS;
use crate::task::{TaskFn, TaskSlot};

// ---------------------------------------------------------------------------
// Error indicator
// ---------------------------------------------------------------------------

/// Faults raised by the registration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every slot in the task table is occupied.
    TableFull,
    /// The slot index was out of range, or the slot holds no task.
    NoSuchTask,
}

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The scheduler state: the slot table, the tick counter and the sticky
/// error indicator. Owned explicitly and passed by reference to every
/// operation; `kernel.rs` holds the one global instance and wraps access
/// in critical sections.
///
/// ## Sharing Discipline
///
/// The table is shared mutable state between the tick interrupt
/// ([`tick`](Self::tick)) and the main loop (registration, deletion,
/// dispatch). Main-loop mutation must run with the tick interrupt masked
/// (see `sync::critical_section`); partial slot writes observed mid-
/// interrupt would corrupt `delay`/`period`/`run_me` consistency.
pub struct Scheduler {
    /// Fixed-size slot table. Slot order is dispatch order.
    pub tasks: [TaskSlot; MAX_TASKS],

    /// Wrapping tick counter — the system time base. Advanced once per
    /// [`tick`](Self::tick).
    pub ticks: u32,

    /// Sticky record of the most recent registration/deletion fault.
    last_error: Option<SchedulerError>,
}

impl Scheduler {
    /// Create a scheduler with every slot empty and the error indicator
    /// clear. Must run before any other scheduler operation; cannot fail.
    pub const fn new() -> Self {
        Self {
            tasks: [TaskSlot::EMPTY; MAX_TASKS],
            ticks: 0,
            last_error: None,
        }
    }

    /// Called from the tick interrupt, once per tick.
    ///
    /// Advances the tick counter, then walks the table decrementing
    /// countdowns and marking due tasks. Never blocks, never allocates,
    /// never fails — faults cannot propagate out of the interrupt context.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);

        // NOTE: calculations are in *ticks*, not milliseconds.
        for slot in self.tasks.iter_mut() {
            if slot.task.is_none() {
                continue;
            }
            if slot.delay > 0 {
                slot.delay -= 1;
                if slot.delay > 0 {
                    // Not yet due.
                    continue;
                }
                slot.run_me = slot.run_me.saturating_add(1);
            } else {
                // Countdown already at zero: due this tick. A pending
                // one-shot must not be marked due a second time while it
                // waits for dispatch.
                if slot.run_me > 0 {
                    continue;
                }
                slot.run_me = 1;
            }
            if slot.period > 0 {
                // Re-arm for the next cycle.
                slot.delay = slot.period;
            }
        }
    }

    /// Register a task in the first empty slot.
    ///
    /// - `delay`: ticks until the first run (`0` = due on the next tick)
    /// - `period`: ticks between recurring runs (`0` = one-shot)
    ///
    /// # Returns
    /// - `Ok(index)` — the slot holding the new task
    /// - `Err(TableFull)` — no free slot; also recorded in `last_error`
    pub fn add_task(
        &mut self,
        task: TaskFn,
        delay: u32,
        period: u32,
    ) -> Result<usize, SchedulerError> {
        for (index, slot) in self.tasks.iter_mut().enumerate() {
            if slot.is_empty() {
                slot.arm(task, delay, period);
                return Ok(index);
            }
        }
        self.last_error = Some(SchedulerError::TableFull);
        Err(SchedulerError::TableFull)
    }

    /// Delete the task at `index`, zeroing the slot.
    ///
    /// Deleting an out-of-range index or an already-empty slot records
    /// `NoSuchTask`. Removal takes effect at the next dispatch pass; a
    /// task already mid-run is not interrupted.
    pub fn delete_task(&mut self, index: usize) -> Result<(), SchedulerError> {
        match self.tasks.get_mut(index) {
            Some(slot) if !slot.is_empty() => {
                slot.clear();
                Ok(())
            }
            _ => {
                self.last_error = Some(SchedulerError::NoSuchTask);
                Err(SchedulerError::NoSuchTask)
            }
        }
    }

    /// Run one dispatch pass over the table, in slot order.
    ///
    /// Each due slot has one unit of its due-count consumed and its task
    /// run; one-shot tasks are deleted after their single run. Returns
    /// the number of tasks run.
    ///
    /// Call from the main loop with the tick interrupt masked, or use
    /// `kernel::dispatch_tasks` which consumes one due task per critical
    /// section so task bodies run with interrupts enabled.
    pub fn dispatch(&mut self) -> usize {
        let mut ran = 0;
        for slot in self.tasks.iter_mut() {
            let Some(task) = slot.task else { continue };
            if slot.run_me == 0 {
                continue;
            }
            slot.run_me -= 1;
            if slot.period == 0 {
                // One-shot: gone until re-added.
                slot.clear();
            }
            task();
            ran += 1;
        }
        ran
    }

    /// Consume and return the first due task, in slot order.
    ///
    /// Splits dispatch into a short table mutation (done here, inside a
    /// critical section) and the task body itself (run by the caller with
    /// interrupts enabled). Returns `None` when nothing is due.
    pub fn take_due(&mut self) -> Option<TaskFn> {
        for slot in self.tasks.iter_mut() {
            if !slot.is_due() {
                continue;
            }
            let task = slot.task;
            slot.run_me -= 1;
            if slot.period == 0 {
                slot.clear();
            }
            return task;
        }
        None
    }

    /// The most recent registration/deletion fault, if any.
    pub fn last_error(&self) -> Option<SchedulerError> {
        self.last_error
    }

    /// Clear the error indicator.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Current tick count (wrapping).
    #[inline]
    pub fn now(&self) -> u32 {
        self.ticks
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
