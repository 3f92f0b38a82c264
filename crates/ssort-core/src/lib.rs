//! Line reordering engine for ssort
//!
//! This crate provides matching, buffering, flush scheduling and the
//! source/sink tasks that surround them.

mod buffer;
mod error;
mod matcher;
mod normalize;
mod pipeline;
mod scheduler;
mod sink;
mod source;

pub use buffer::PriorityBuffer;
pub use error::SetupError;
pub use matcher::Matcher;
pub use normalize::Normalizer;
pub use pipeline::{Pipeline, run};
pub use scheduler::FlushScheduler;
pub use sink::OutputSink;
pub use source::LineSource;

// Re-export types used in our public API
pub use ssort_types::{BufferedItem, Emission, InputSource, Priority, RunConfig};
