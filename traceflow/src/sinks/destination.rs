//! Destination trait and implementations.

use std::io::Write;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::warn;

/// A sink that receives emitted trace events.
///
/// Destinations must never fail upward: [`emit`](Destination::emit) logs and
/// suppresses its own errors, so one broken sink cannot take down the code
/// that is tracing.
pub trait Destination: Send + Sync {
    /// Delivers one structured event to the destination.
    fn emit(&self, event: &serde_json::Value);
}

fn destinations() -> &'static Mutex<Vec<Arc<dyn Destination>>> {
    static DESTINATIONS: OnceLock<Mutex<Vec<Arc<dyn Destination>>>> = OnceLock::new();
    DESTINATIONS.get_or_init(|| Mutex::new(Vec::new()))
}

/// Adds destinations to the process-global set.
pub fn add_destinations(new: impl IntoIterator<Item = Arc<dyn Destination>>) {
    destinations().lock().extend(new);
}

/// Removes a destination from the process-global set, by identity.
pub fn remove_destination(destination: &Arc<dyn Destination>) {
    destinations()
        .lock()
        .retain(|existing| !Arc::ptr_eq(existing, destination));
}

/// Delivers one event to every installed destination.
///
/// The set is cloned out before delivery so a destination that itself logs
/// (for example, to report a write failure) cannot deadlock on the set.
pub(crate) fn broadcast(event: &serde_json::Value) {
    let installed: Vec<Arc<dyn Destination>> = destinations().lock().clone();
    for destination in installed {
        destination.emit(event);
    }
}

/// A destination that writes events as JSON lines to a writer.
pub struct FileDestination {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl FileDestination {
    /// Creates a destination writing to the given writer.
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Creates a destination writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

fn write_line(writer: &mut dyn Write, event: &serde_json::Value) -> std::io::Result<()> {
    // One write per record: the rotating writer decides rotation between
    // write calls, so an event serialized in pieces could be split across
    // a rotation boundary.
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()
}

impl Destination for FileDestination {
    fn emit(&self, event: &serde_json::Value) {
        let mut writer = self.writer.lock();
        if let Err(error) = write_line(&mut **writer, event) {
            warn!(%error, "failed to write trace event");
        }
    }
}

/// A collecting destination for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingDestination {
    events: Mutex<Vec<serde_json::Value>>,
}

impl CollectingDestination {
    /// Creates a new collecting destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.events.lock().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Returns events whose `message_type` matches exactly.
    #[must_use]
    pub fn events_of_type(&self, message_type: &str) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .iter()
            .filter(|event| event["message_type"] == message_type)
            .cloned()
            .collect()
    }
}

impl Destination for CollectingDestination {
    fn emit(&self, event: &serde_json::Value) {
        self.events.lock().push(event.clone());
    }
}
