//! The scheduled-probe engine.
//!
//! A [`Monitor`] owns one [`ticker::ProbeLoop`] per configured probe. Every loop
//! aligns itself to the next whole wall-clock second, then launches one
//! detached probe task per tick until the shared [`shutdown::Shutdown`] signal fires.
//! Probe tasks already in flight are never aborted; they finish on their own
//! and still emit their record.

use std::time::SystemTimeError;

use thiserror::Error;

pub mod shutdown;
pub mod supervisor;
pub mod ticker;

pub use supervisor::Monitor;

/// Setup failures that stop the engine before any probe runs.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("cannot align to the wall clock: {0}")]
    Clock(#[from] SystemTimeError),

    #[error("probe {0}: period must be greater than zero")]
    ZeroPeriod(String),
}
