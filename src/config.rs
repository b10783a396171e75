//! # Configuration
//!
//! Compile-time constants governing the scheduler and the staged state
//! engine. All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of task slots in the scheduler table.
/// This bounds the static slot array; registration fails with
/// [`SchedulerError::TableFull`](crate::scheduler::SchedulerError) once
/// every slot is occupied.
pub const MAX_TASKS: usize = 8;

/// Maximum number of consecutive `Again` returns a state function may
/// produce within a single `process()` call before the engine treats the
/// state as faulty. Bounds the worst-case latency a single task can add
/// to one scheduling opportunity.
pub const MAX_RECURRING_CALLS: u32 = 99;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
/// Used to derive the SysTick reload value for a given tick interval.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
