//! # Cortex-M4 Port Layer
//!
//! Hardware tick source for the scheduler: SysTick timer configuration
//! and the SysTick exception handler that drives
//! [`Scheduler::tick`](crate::scheduler::Scheduler::tick).
//!
//! This is the only interrupt the scheduler needs. There is no context
//! switching — tasks cooperate, so no PendSV machinery, no per-task
//! stacks. The tick handler runs entirely inside the interrupt, never
//! blocks and never allocates.

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::SYSTEM_CLOCK_HZ;

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire every `tick_interval_ms` milliseconds.
///
/// Registering the handler below as the tick hook happens through the
/// vector table: providing the `SysTick` symbol is the registration.
///
/// # Parameters
/// - `syst`: Mutable reference to the SysTick peripheral
/// - `tick_interval_ms`: Tick interval in milliseconds (the scheduler's
///   unit of time)
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST, tick_interval_ms: u32) {
    let reload = (SYSTEM_CLOCK_HZ / 1000) * tick_interval_ms - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — the scheduler's tick entry point.
///
/// Fires at the configured interval, advances the tick counter and marks
/// due tasks. Cannot fail; faults never propagate out of the interrupt
/// context.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let scheduler = crate::kernel::SCHEDULER_PTR;
    if scheduler.is_null() {
        // Tick fired before kernel::init(); nothing to drive yet.
        return;
    }
    (*scheduler).tick();
}
