//! # Kernel
//!
//! Top-level public API around the one global scheduler instance. All
//! thread-context functions wrap their table access in critical sections;
//! the tick interrupt reaches the same instance through `SCHEDULER_PTR`.
//!
//! ## Startup Sequence
//!
//! ```text
//! main()
//!   ├─► kernel::init()            ← Clear the table and error indicator
//!   ├─► kernel::add_task() × N    ← Register the initial recurring tasks
//!   ├─► kernel::start()           ← Enable the periodic tick (SysTick)
//!   └─► loop {
//!         kernel::dispatch_tasks();   ← Run whatever came due
//!         cortex_m::asm::wfi();       ← Sleep until the next tick
//!       }
//! ```
//!
//! `start()` comes after task registration so the initial countdowns all
//! begin from the same tick and periodic tasks keep their phase.

use core::ptr::addr_of_mut;

use crate::arch::cortex_m4;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sync;
use crate::task::TaskFn;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler instance.
///
/// # Safety
/// Accessed via `SCHEDULER_PTR` which is set during `init()`. All access
/// is through critical sections or from the tick handler (where the
/// interrupt itself serializes access).
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler. Used by the SysTick handler,
/// which cannot easily use references.
///
/// # Safety
/// Set once during `init()`, read from ISR context.
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the scheduler: every slot cleared, error indicator reset.
///
/// Must be called exactly once before any other kernel function; always
/// succeeds.
///
/// # Safety
/// Call from the main thread, before `start()`.
pub fn init() {
    unsafe {
        SCHEDULER = Scheduler::new();
        SCHEDULER_PTR = addr_of_mut!(SCHEDULER);
    }
    #[cfg(feature = "defmt")]
    defmt::info!("scheduler initialized ({=usize} slots)", crate::config::MAX_TASKS);
}

/// Register a task with the global scheduler.
///
/// - `delay`: ticks until the first run (`0` = due on the next tick)
/// - `period`: ticks between recurring runs (`0` = one-shot)
///
/// On a full table the fault is returned *and* latched in the scheduler's
/// error indicator (see [`last_error`]), for callers registering from
/// contexts where checking a return value is inconvenient.
pub fn add_task(task: TaskFn, delay: u32, period: u32) -> Result<usize, SchedulerError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).add_task(task, delay, period) })
}

/// Delete the task in slot `index`.
///
/// A deleted slot is never dispatched again; a task already mid-run is
/// not interrupted. Deleting an empty slot records
/// [`SchedulerError::NoSuchTask`].
pub fn delete_task(index: usize) -> Result<(), SchedulerError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).delete_task(index) })
}

/// Run every currently-due task, in table-slot order.
///
/// Call from the main loop. Each due task is consumed from the table
/// inside a critical section, then its body runs with interrupts
/// enabled — the tick keeps advancing underneath long-running tasks.
/// Returns the number of tasks run this pass.
pub fn dispatch_tasks() -> usize {
    let mut ran = 0;
    loop {
        let due = sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).take_due() });
        match due {
            Some(task) => {
                task();
                ran += 1;
            }
            None => return ran,
        }
    }
}

/// The most recent registration/deletion fault, if any.
pub fn last_error() -> Option<SchedulerError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).last_error() })
}

/// Clear the scheduler's error indicator.
pub fn clear_error() {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).clear_error() })
}

/// Current tick count (wrapping). Suitable as the tick source for
/// [`Context::process`](crate::engine::Context::process).
pub fn now() -> u32 {
    let scheduler = unsafe { SCHEDULER_PTR };
    if scheduler.is_null() {
        return 0;
    }
    // Single aligned word, mutated only by the tick handler; volatile
    // read so the compiler re-reads it across Again iterations.
    unsafe { core::ptr::addr_of!((*scheduler).ticks).read_volatile() }
}

/// Start the scheduler by enabling the periodic tick.
///
/// Configures SysTick to fire every `tick_interval_ms` milliseconds; the
/// SysTick handler drives [`Scheduler::tick`]. Call after all initial
/// recurring tasks are registered, to keep their phases synchronized.
/// Only this periodic source should be enabled as an interrupt touching
/// the task table.
pub fn start(syst: &mut cortex_m::peripheral::SYST, tick_interval_ms: u32) {
    #[cfg(feature = "defmt")]
    defmt::info!("tick configured at {=u32} ms", tick_interval_ms);
    cortex_m4::configure_systick(syst, tick_interval_ms);
}
