//! # CoopOS — Cooperative Tick Scheduler + Staged State Engine
//!
//! The concurrency backbone of an embedded application: a cooperative,
//! tick-driven task scheduler for resource-constrained targets, paired
//! with a lightweight per-task staged state machine with recursion-abuse
//! and timeout protection.
//!
//! ## Overview
//!
//! A hardware timer interrupt advances a tick counter and marks due tasks
//! as runnable; the main loop later dispatches them. Each task that needs
//! more than a single slice of work models itself as a small state
//! machine that advances through well-defined stages across successive
//! scheduler invocations rather than blocking:
//!
//! - **Tick scheduler** — a fixed-capacity table of task slots. Each tick
//!   decrements countdowns and flags due tasks; the dispatcher runs them
//!   in slot order. One-shot and periodic tasks, underflow-safe countdown
//!   arithmetic, a sticky error indicator for registration faults.
//! - **Staged state engine** — a per-task execution context tracking the
//!   active state function, its Begin/Main/End stage, a recursion counter
//!   and two fallback error states. Driven once per scheduling
//!   opportunity; bounded `Again` re-invocation keeps one buggy task from
//!   starving the rest.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Application Tasks                       │
//! │        (optionally driving a staged Context each)         │
//! ├──────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                    │
//! │   init() · add_task() · start() · dispatch_tasks() · now()│
//! ├───────────────┬───────────────────────┬──────────────────┤
//! │   Scheduler   │   Staged Engine       │  Sync Primitives │
//! │  scheduler.rs │   engine.rs           │  sync.rs         │
//! │  ─ tick()     │   ─ process()         │  ─ critical_     │
//! │  ─ dispatch() │   ─ goto_stage()      │     section      │
//! │  ─ take_due() │   ─ change_state()    │                  │
//! ├───────────────┴───────────────────────┴──────────────────┤
//! │              Task Slots (task.rs)                         │
//! │        TaskSlot · TaskFn · delay/period/run_me            │
//! ├──────────────────────────────────────────────────────────┤
//! │           Arch Port (arch/cortex_m4.rs)                   │
//! │           SysTick config · tick interrupt                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! One interrupt context (the tick handler) plus one cooperative
//! main-loop context. The tick handler only decrements and marks; it
//! never blocks, allocates or fails. All main-loop mutation of the task
//! table goes through `sync::critical_section`. Task bodies run with
//! interrupts enabled and must not block — long-running work is expressed
//! as repeated `Yield`-terminated invocations of the staged engine across
//! ticks.
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **No `alloc`**: Pure `core` only
//! - **Fixed-size slot table**: `[TaskSlot; MAX_TASKS]`
//! - **Critical sections**: `cortex_m::interrupt::free()` for shared state
//!
//! ## Logging
//!
//! Enable the `defmt` cargo feature for trace/info output from state
//! transitions and fault paths; public enums then also implement
//! `defmt::Format`.

#![no_std]

pub mod arch;
pub mod config;
pub mod engine;
pub mod kernel;
pub mod scheduler;
pub mod sync;
pub mod task;
