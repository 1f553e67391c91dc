//! Utility library for the Motor Control Interface

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod logger;
pub mod params;
pub mod session;
pub mod time;
