//! # Architecture Abstraction Layer
//!
//! Provides the hardware tick source for the scheduler. Currently
//! implements the Cortex-M4 port (SysTick); extensible to other
//! architectures by adding sibling modules.

pub mod cortex_m4;
