//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - parameter metadata and domain constraints (`Parameter`, `Constraint`)
//! - solver configuration (`FitSettings`)
//! - fit outputs (`FitReport`, `Termination`, `IterationRecord`)

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
