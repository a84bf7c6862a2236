//! Background Tasks Module
//!
//! Contains the periodic drivers that advance the timer wheel.
//!
//! # Drivers
//! - `TokioTicker`: ticks on a tokio task
//! - `ThreadTicker`: ticks on a dedicated OS thread

mod tick;

pub use tick::{ThreadTicker, TickAction, TickDriver, TickHandle, TokioTicker};
