//! Trace output destinations.
//!
//! This module provides:
//! - The [`Destination`] trait and the process-global destination set
//! - A JSON-lines file destination with size-based rotation
//! - A parser for textual destination descriptions
//! - A service that installs destinations on start and removes them on stop,
//!   bridging the `tracing` facade into the same sink while running

mod destination;
mod parser;
mod rotation;
mod service;

pub use destination::{
    add_destinations, remove_destination, CollectingDestination, Destination, FileDestination,
};
pub(crate) use destination::broadcast;
pub use parser::{parse_destination_description, DestinationSpec};
pub use rotation::{RotatingLogFile, DEFAULT_MAX_ROTATED_FILES, DEFAULT_ROTATE_LENGTH};
pub use service::{TraceLoggingService, TracingBridge};
