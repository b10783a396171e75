//! # Staged State Engine
//!
//! A per-task execution context that advances through well-defined stages
//! across successive scheduler invocations instead of blocking. A task's
//! dispatch code drives its [`Context`] once per scheduling opportunity
//! via [`Context::process`]; the active state function does a slice of
//! work for the current stage and either yields until the next
//! opportunity or asks to be re-invoked immediately.
//!
//! ## Stage Model
//!
//! Each logical state is subdivided into `Begin`/`Main`/`End` phases:
//!
//! ```text
//!                 change_state(S)
//!                       │
//!                       ▼
//!   ┌─────── S ────────────────────────┐
//!   │  Begin ──► Main ──► End          │   stage moves via goto_stage(),
//!   └───────────────────────────────────┘   state moves via change_state()
//!
//!   Invalid ◄── goto_stage(Invalid)        trap stage; recovered by the
//!                                          registered fallback handler
//! ```
//!
//! ## Runaway Protection
//!
//! `Again` re-invocation is an explicit bounded loop, not call-stack
//! recursion, so worst-case stack depth is constant. Two ceilings bound a
//! single `process()` call: the consecutive-call ceiling
//! ([`MAX_RECURRING_CALLS`]) and a caller-supplied wall-tick budget. Both
//! share the `on_max_calls` error path, so one buggy state function can
//! stall neither the dispatcher nor the other tasks.

use crate::config::MAX_RECURRING_CALLS;

// ---------------------------------------------------------------------------
// Stages and control signals
// ---------------------------------------------------------------------------

/// The phase within the current state that the next invocation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Entry phase: one-time setup for the current state.
    Begin,
    /// Steady-state phase: the bulk of the work.
    Main,
    /// Exit phase: teardown before leaving the current state.
    End,
    /// Trap stage reached by a malformed `goto_stage` request. Not a
    /// normal operating stage; cleared by the next valid stage change.
    Invalid,
}

/// Control signal returned by a state function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateReturn {
    /// Stop processing; the next `process()` call resumes at the
    /// currently recorded state and stage.
    Yield,
    /// Re-invoke immediately within the same scheduling opportunity.
    /// Used for internal stage advancement (e.g. Begin → Main).
    Again,
}

/// Faults a `process()` call can surface when no fallback handler absorbs
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The context is trapped in [`Stage::Invalid`] and no
    /// `on_invalid_stage` handler is registered.
    InvalidStage,
    /// A state function returned `Again` more than
    /// [`MAX_RECURRING_CALLS`] times in one `process()` call.
    MaxRecurringCalls,
    /// Repeated `Again` processing consumed more wall-tick budget than
    /// the caller allotted.
    TimeoutExpired,
}

/// A unit of behavior bound to a context. Given the context, the stage to
/// execute and the current tick count, it performs work for that stage
/// and signals whether to pause or continue.
pub type StateFn<A> = fn(&mut Context<A>, Stage, u32) -> StateReturn;

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Staged execution context for one task.
///
/// Owned by the application for the task's lifetime; mutated on every
/// `process()` call, never implicitly destroyed. Generic over the
/// application data `A`, the only channel for task-specific state into
/// the state functions.
pub struct Context<A> {
    /// The active state function; the unit of dispatch.
    state: StateFn<A>,

    /// Phase the next invocation executes.
    stage: Stage,

    /// Diagnostic name for the current state, for observability only.
    info: Option<&'static str>,

    /// Consecutive same-opportunity re-invocations without yielding.
    calls: u32,

    /// Application-owned data, passed through unexamined.
    pub app: A,

    /// Fallback invoked instead of the current state while trapped in
    /// `Stage::Invalid`.
    on_invalid_stage: Option<StateFn<A>>,

    /// Fallback invoked when a recursion or wall-tick ceiling is hit.
    on_max_calls: Option<StateFn<A>>,
}

/// Initial state: ready but idle. Yields until the application installs a
/// real state via [`Context::change_state`].
fn initial_state<A>(_ctx: &mut Context<A>, _stage: Stage, _ticks: u32) -> StateReturn {
    StateReturn::Yield
}

impl<A> Context<A> {
    /// Create an initialized context: initial no-op state, `stage =
    /// Begin`, call counter zeroed. Construction cannot fail — there is
    /// no null context to guard against.
    pub fn new(app: A) -> Self {
        Self {
            state: initial_state::<A>,
            stage: Stage::Begin,
            info: None,
            calls: 0,
            app,
            on_invalid_stage: None,
            on_max_calls: None,
        }
    }

    /// Register the fallback handlers for the invalid-stage and
    /// ceiling faults. Either may be `None`; an unhandled fault then
    /// surfaces as a failed `process()` call with no state mutation.
    pub fn set_error_states(
        &mut self,
        on_invalid_stage: Option<StateFn<A>>,
        on_max_calls: Option<StateFn<A>>,
    ) {
        self.on_invalid_stage = on_invalid_stage;
        self.on_max_calls = on_max_calls;
    }

    /// Attach a diagnostic label to the current state transition. No
    /// effect on control flow.
    pub fn set_state_info(&mut self, info: &'static str) {
        #[cfg(feature = "defmt")]
        defmt::trace!("state info: {=str}", info);
        self.info = Some(info);
    }

    /// Request a stage change within the current state.
    ///
    /// `Begin`/`Main`/`End` are the valid subset: the stage is set, the
    /// call counter is released (a stage change signifies forward
    /// progress) and `true` is returned. Requesting `Invalid` is the
    /// malformed case: the context is trapped in `Stage::Invalid` and
    /// `false` is returned; the next valid stage change clears the trap.
    pub fn goto_stage(&mut self, new_stage: Stage) -> bool {
        match new_stage {
            Stage::Begin | Stage::Main | Stage::End => {
                self.stage = new_stage;
                self.calls = 0;
                true
            }
            Stage::Invalid => {
                self.stage = Stage::Invalid;
                false
            }
        }
    }

    /// Switch to a different state function, restarting at `Begin`.
    ///
    /// Represents a transition between logically distinct states of the
    /// machine. Unlike `goto_stage`, this does not release the call
    /// counter — only an explicit stage change does.
    pub fn change_state(&mut self, new_state: StateFn<A>) {
        self.state = new_state;
        self.stage = Stage::Begin;
    }

    /// Drive the state machine for one scheduling opportunity.
    ///
    /// Repeatedly invokes the active state function (or the
    /// `on_invalid_stage` fallback while trapped) with the current stage
    /// and tick count from `now`:
    ///
    /// - `Yield` stops processing and returns `Ok(())`.
    /// - `Again` re-invokes immediately, bounded by two ceilings: more
    ///   than [`MAX_RECURRING_CALLS`] consecutive `Again`s, or more than
    ///   `timeout_ticks` of elapsed wall ticks since the call started.
    ///   Hitting either resets the call counter, then invokes the
    ///   `on_max_calls` fallback once if registered (recovered, `Ok`) or
    ///   fails with the corresponding [`Fault`].
    ///
    /// A failure means "this task's execution this round encountered a
    /// fault"; the caller may log, skip or reset the task without
    /// affecting the scheduler or other tasks.
    pub fn process<F>(&mut self, mut now: F, timeout_ticks: u32) -> Result<(), Fault>
    where
        F: FnMut() -> u32,
    {
        let start = now();
        loop {
            let func = if self.stage == Stage::Invalid {
                match self.on_invalid_stage {
                    Some(handler) => handler,
                    // Trapped with no handler: fail without touching the
                    // context so the fault is observable and recoverable.
                    None => return Err(Fault::InvalidStage),
                }
            } else {
                self.state
            };

            let stage = self.stage;
            let ticks = now();
            match func(self, stage, ticks) {
                StateReturn::Yield => return Ok(()),
                StateReturn::Again => {
                    self.calls += 1;
                    if self.calls > MAX_RECURRING_CALLS {
                        self.calls = 0;
                        return self.ceiling_fault(Fault::MaxRecurringCalls, now());
                    }
                    if now().wrapping_sub(start) > timeout_ticks {
                        self.calls = 0;
                        return self.ceiling_fault(Fault::TimeoutExpired, now());
                    }
                }
            }
        }
    }

    /// Shared error path for the recursion and wall-tick ceilings.
    fn ceiling_fault(&mut self, fault: Fault, ticks: u32) -> Result<(), Fault> {
        #[cfg(feature = "defmt")]
        defmt::warn!("staged engine fault: {}", fault);
        match self.on_max_calls {
            Some(handler) => {
                let stage = self.stage;
                handler(self, stage, ticks);
                Ok(())
            }
            None => Err(fault),
        }
    }

    /// Phase the next invocation will execute.
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Consecutive `Again` count since the last release.
    #[inline]
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Diagnostic label of the current state, if one was attached.
    #[inline]
    pub fn info(&self) -> Option<&'static str> {
        self.info
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Frozen clock for tests that don't exercise the wall-tick budget.
    fn frozen() -> u32 {
        0
    }

    #[derive(Default)]
    struct Counters {
        begins: u32,
        mains: u32,
        agains: u32,
        faults: u32,
        recoveries: u32,
    }

    fn staged(ctx: &mut Context<Counters>, stage: Stage, _ticks: u32) -> StateReturn {
        match stage {
            Stage::Begin => {
                ctx.app.begins += 1;
                ctx.goto_stage(Stage::Main);
                StateReturn::Again
            }
            Stage::Main => {
                ctx.app.mains += 1;
                StateReturn::Yield
            }
            _ => StateReturn::Yield,
        }
    }

    fn always_again(ctx: &mut Context<Counters>, _stage: Stage, _ticks: u32) -> StateReturn {
        ctx.app.agains += 1;
        StateReturn::Again
    }

    fn settled(_ctx: &mut Context<Counters>, _stage: Stage, _ticks: u32) -> StateReturn {
        StateReturn::Yield
    }

    fn on_trap(ctx: &mut Context<Counters>, _stage: Stage, _ticks: u32) -> StateReturn {
        ctx.app.faults += 1;
        ctx.change_state(settled);
        ctx.goto_stage(Stage::Begin);
        StateReturn::Again
    }

    fn on_ceiling(ctx: &mut Context<Counters>, _stage: Stage, _ticks: u32) -> StateReturn {
        ctx.app.recoveries += 1;
        ctx.change_state(settled);
        StateReturn::Yield
    }

    #[test]
    fn test_initial_state_yields() {
        let mut ctx = Context::new(Counters::default());
        assert_eq!(ctx.stage(), Stage::Begin);
        assert_eq!(ctx.calls(), 0);
        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.stage(), Stage::Begin);
    }

    #[test]
    fn test_begin_advances_to_main_in_one_process() {
        // Scenario: Begin does setup, advances the stage and asks to be
        // re-invoked; Main yields. One process() call covers both, and
        // the call counter reads 1 afterwards (the stage change released
        // it before the Again was counted).
        let mut ctx = Context::new(Counters::default());
        ctx.change_state(staged);
        ctx.set_state_info("staged");

        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.stage(), Stage::Main);
        assert_eq!(ctx.calls(), 1);
        assert_eq!(ctx.app.begins, 1);
        assert_eq!(ctx.app.mains, 1);
        assert_eq!(ctx.info(), Some("staged"));

        // Resumes at Main on the next opportunity
        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.app.begins, 1);
        assert_eq!(ctx.app.mains, 2);
    }

    #[test]
    fn test_goto_invalid_traps_and_valid_change_clears() {
        let mut ctx = Context::<Counters>::new(Counters::default());
        assert!(!ctx.goto_stage(Stage::Invalid));
        assert_eq!(ctx.stage(), Stage::Invalid);

        // No handler registered: process fails with no state mutation
        assert_eq!(ctx.process(frozen, 10), Err(Fault::InvalidStage));
        assert_eq!(ctx.stage(), Stage::Invalid);

        // The next valid stage change clears the trap
        assert!(ctx.goto_stage(Stage::Main));
        assert_eq!(ctx.stage(), Stage::Main);
        assert_eq!(ctx.calls(), 0);
    }

    #[test]
    fn test_invalid_stage_recovered_by_handler() {
        let mut ctx = Context::new(Counters::default());
        ctx.set_error_states(Some(on_trap), None);
        ctx.goto_stage(Stage::Invalid);

        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.app.faults, 1);
        assert_eq!(ctx.stage(), Stage::Begin);

        // Recovered: subsequent processing runs the replacement state
        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.app.faults, 1);
    }

    #[test]
    fn test_max_calls_fault_without_handler() {
        let mut ctx = Context::new(Counters::default());
        ctx.change_state(always_again);

        assert_eq!(ctx.process(frozen, u32::MAX), Err(Fault::MaxRecurringCalls));
        // The fault fires exactly once, on the (MAX + 1)th Again
        assert_eq!(ctx.app.agains, MAX_RECURRING_CALLS + 1);
        // The counter is released so the next invocation starts clean
        assert_eq!(ctx.calls(), 0);

        // A second round faults again after another full ceiling
        assert_eq!(ctx.process(frozen, u32::MAX), Err(Fault::MaxRecurringCalls));
        assert_eq!(ctx.app.agains, 2 * (MAX_RECURRING_CALLS + 1));
    }

    #[test]
    fn test_max_calls_recovered_by_handler() {
        let mut ctx = Context::new(Counters::default());
        ctx.change_state(always_again);
        ctx.set_error_states(None, Some(on_ceiling));

        assert_eq!(ctx.process(frozen, u32::MAX), Ok(()));
        assert_eq!(ctx.app.recoveries, 1);
        assert_eq!(ctx.calls(), 0);

        // The handler swapped in a settled state
        assert_eq!(ctx.process(frozen, u32::MAX), Ok(()));
        assert_eq!(ctx.app.recoveries, 1);
    }

    #[test]
    fn test_timeout_budget_expires() {
        let mut ctx = Context::new(Counters::default());
        ctx.change_state(always_again);

        // A ticking clock and a 3-tick budget: the wall-tick ceiling
        // trips long before the call ceiling would.
        let mut ticks = 0u32;
        let clock = move || {
            ticks += 1;
            ticks
        };
        assert_eq!(ctx.process(clock, 3), Err(Fault::TimeoutExpired));
        assert!(ctx.app.agains < MAX_RECURRING_CALLS);
        assert_eq!(ctx.calls(), 0);
    }

    #[test]
    fn test_timeout_shares_ceiling_handler() {
        let mut ctx = Context::new(Counters::default());
        ctx.change_state(always_again);
        ctx.set_error_states(None, Some(on_ceiling));

        let mut ticks = 0u32;
        let clock = move || {
            ticks += 1;
            ticks
        };
        assert_eq!(ctx.process(clock, 3), Ok(()));
        assert_eq!(ctx.app.recoveries, 1);
    }

    #[test]
    fn test_change_state_resets_stage_not_calls() {
        fn three_then_yield(ctx: &mut Context<Counters>, _stage: Stage, _ticks: u32) -> StateReturn {
            if ctx.app.agains < 3 {
                ctx.app.agains += 1;
                StateReturn::Again
            } else {
                StateReturn::Yield
            }
        }

        let mut ctx = Context::new(Counters::default());
        ctx.change_state(three_then_yield);
        ctx.goto_stage(Stage::Main);

        assert_eq!(ctx.process(frozen, 10), Ok(()));
        assert_eq!(ctx.calls(), 3);

        // change_state restarts at Begin but keeps the call counter
        ctx.change_state(settled);
        assert_eq!(ctx.stage(), Stage::Begin);
        assert_eq!(ctx.calls(), 3);

        // Only a stage change releases the counter
        ctx.goto_stage(Stage::Main);
        assert_eq!(ctx.calls(), 0);
    }
}
