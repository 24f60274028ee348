//! Data model and owned engine state.
pub mod frame;
pub mod registry;
pub mod types;

pub use frame::SeriesFrame;
pub use registry::FilterRegistry;
pub use types::*;
