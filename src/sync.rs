//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstraction. The task table is shared
//! between the tick interrupt and the main loop, so every main-loop
//! mutation of a slot (registration, deletion, due-count consumption)
//! must run with the tick interrupt masked — a partial slot write
//! observed mid-interrupt would corrupt the countdown state.

use cortex_m::interrupt;

/// Execute a closure within a critical section (interrupts disabled).
///
/// The only mechanism this crate uses for accessing the shared scheduler
/// instance from thread context. Interrupts are disabled on entry and
/// restored on exit, ensuring atomicity of the enclosed operation.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     // Mutate the task table safely
/// });
/// ```
///
/// Keep critical sections short: the tick handler must keep running at
/// its configured interval, and task bodies themselves always run with
/// interrupts enabled.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
