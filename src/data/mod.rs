//! Dataset sources.

pub mod sample;

pub use sample::{SampleData, SampleSpec, SampleStats, SeriesFamily, generate, generate_family};
