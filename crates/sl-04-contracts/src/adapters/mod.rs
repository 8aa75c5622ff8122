//! # Adapters
//!
//! Reference implementations of the outbound ports:
//!
//! - [`SimpleMathEvaluator`]: arithmetic formulas over `rust_decimal`
//! - [`RecordingEventSink`]: keeps delivered events in memory

pub mod event_sink;
pub mod math;

pub use event_sink::*;
pub use math::*;
