//! Lifecycle management for trace destinations.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::errors::TraceflowError;
use crate::sinks::destination::{add_destinations, remove_destination, Destination};
use crate::sinks::parser::{parse_destination_description, DestinationSpec};
use crate::trace::TraceMessage;

/// A service that owns a set of trace destinations.
///
/// On [`start`](Self::start) every configured destination is opened and
/// installed into the process-global set; on [`stop`](Self::stop) they are
/// removed again. While running, events from the `tracing` facade are
/// forwarded into the same destinations through a [`TracingBridge`].
pub struct TraceLoggingService {
    specs: Vec<DestinationSpec>,
    active: Vec<Arc<dyn Destination>>,
    bridge_enabled: Arc<AtomicBool>,
    running: bool,
}

impl TraceLoggingService {
    /// Creates a service for the given destination specs.
    #[must_use]
    pub fn new(specs: Vec<DestinationSpec>) -> Self {
        Self {
            specs,
            active: Vec::new(),
            bridge_enabled: Arc::new(AtomicBool::new(false)),
            running: false,
        }
    }

    /// Creates a service by parsing textual destination descriptions.
    pub fn from_descriptions<S: AsRef<str>>(
        descriptions: impl IntoIterator<Item = S>,
    ) -> Result<Self, TraceflowError> {
        let specs = descriptions
            .into_iter()
            .map(|description| parse_destination_description(description.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(specs))
    }

    /// Returns a bridge layer that forwards `tracing` events into the
    /// service's destinations while the service is running.
    #[must_use]
    pub fn bridge(&self) -> TracingBridge {
        TracingBridge {
            enabled: self.bridge_enabled.clone(),
        }
    }

    /// Returns true if the service has been started and not yet stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Opens and installs every configured destination.
    ///
    /// Starting an already-running service is a no-op. The bridge is
    /// registered as the global `tracing` subscriber on a best-effort basis;
    /// if the process already has one, the existing subscriber is kept and
    /// the bridge must be composed into it by the caller.
    pub fn start(&mut self) -> Result<(), TraceflowError> {
        if self.running {
            return Ok(());
        }
        let opened = self
            .specs
            .iter()
            .map(DestinationSpec::open)
            .collect::<Result<Vec<_>, _>>()?;
        add_destinations(opened.iter().cloned());
        self.active = opened;
        self.bridge_enabled.store(true, Ordering::Relaxed);
        let _ = tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(self.bridge()),
        );
        self.running = true;
        tracing::debug!(destinations = self.active.len(), "trace logging started");
        Ok(())
    }

    /// Removes every destination installed by [`start`](Self::start).
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.bridge_enabled.store(false, Ordering::Relaxed);
        for destination in self.active.drain(..) {
            remove_destination(&destination);
        }
        self.running = false;
        tracing::debug!("trace logging stopped");
    }
}

impl Drop for TraceLoggingService {
    fn drop(&mut self) {
        self.stop();
    }
}

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

struct ForwardingGuard;

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        FORWARDING.with(|flag| flag.set(false));
    }
}

/// A `tracing` layer that forwards events into the trace destinations.
///
/// Each event becomes a `traceflow:tracing` message carrying the event's
/// level, target, and fields, attributed to the current context stack like
/// any other trace message.
#[derive(Debug, Clone)]
pub struct TracingBridge {
    enabled: Arc<AtomicBool>,
}

#[derive(Default)]
struct JsonVisitor {
    fields: Vec<(String, serde_json::Value)>,
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{value:?}").into()));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.push((field.name().to_string(), value.into()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push((field.name().to_string(), value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name().to_string(), value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name().to_string(), value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push((field.name().to_string(), value.into()));
    }
}

impl<S: Subscriber> Layer<S> for TracingBridge {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        // A destination may itself log through `tracing` (for example to
        // report a write failure); forwarding that again would recurse.
        if FORWARDING.with(Cell::get) {
            return;
        }
        FORWARDING.with(|flag| flag.set(true));
        let _reset = ForwardingGuard;

        let metadata = event.metadata();
        let mut message = TraceMessage::new("traceflow:tracing")
            .with_field("level", metadata.level().to_string())
            .with_field("target", metadata.target());
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        for (key, value) in visitor.fields {
            message = message.with_field(key, value);
        }
        message.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::destination::CollectingDestination;

    #[test]
    fn test_service_installs_and_removes_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");

        let mut service =
            TraceLoggingService::from_descriptions([format!("file:{}", path.display())]).unwrap();
        assert!(!service.is_running());

        service.start().unwrap();
        assert!(service.is_running());
        TraceMessage::new("service:while-running").emit();

        service.stop();
        assert!(!service.is_running());
        TraceMessage::new("service:after-stop").emit();

        let written = std::fs::read_to_string(&path).unwrap();
        let types: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["message_type"].clone())
            .collect();
        assert!(types.contains(&serde_json::json!("service:while-running")));
        assert!(!types.contains(&serde_json::json!("service:after-stop")));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut service = TraceLoggingService::new(vec![]);
        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_running());
        service.stop();
    }

    #[test]
    fn test_from_descriptions_rejects_bad_description() {
        let error = TraceLoggingService::from_descriptions(["syslog:local0"])
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(error, TraceflowError::UnknownDestination(_)));
    }

    #[test]
    fn test_bridge_forwards_tracing_events() {
        let collector = Arc::new(CollectingDestination::new());
        let handle: Arc<dyn Destination> = collector.clone();
        add_destinations([handle.clone()]);

        let enabled = Arc::new(AtomicBool::new(true));
        let bridge = TracingBridge {
            enabled: enabled.clone(),
        };
        let subscriber = tracing_subscriber::registry().with(bridge);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(request_id = 7, "bridge:forwarded");
        });

        remove_destination(&handle);

        let forwarded: Vec<_> = collector
            .events_of_type("traceflow:tracing")
            .into_iter()
            .filter(|event| event["message"] == "bridge:forwarded")
            .collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0]["request_id"], 7);
        assert_eq!(forwarded[0]["level"], "INFO");
    }

    #[test]
    fn test_bridge_respects_enabled_flag() {
        let collector = Arc::new(CollectingDestination::new());
        let handle: Arc<dyn Destination> = collector.clone();
        add_destinations([handle.clone()]);

        let bridge = TracingBridge {
            enabled: Arc::new(AtomicBool::new(false)),
        };
        let subscriber = tracing_subscriber::registry().with(bridge);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("bridge:suppressed");
        });

        remove_destination(&handle);

        let forwarded: Vec<_> = collector
            .events_of_type("traceflow:tracing")
            .into_iter()
            .filter(|event| event["message"] == "bridge:suppressed")
            .collect();
        assert!(forwarded.is_empty());
    }
}
