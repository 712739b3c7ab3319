use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{ambient_stack, enter_scope, ContextStack, ScopeMarker, TraceMessage};
use crate::sinks::{add_destinations, remove_destination, CollectingDestination, Destination};

#[test]
fn test_scope_guard_push_pop() {
    let outer = enter_scope("trace-outer");
    assert_eq!(ambient_stack().labels(), vec!["trace-outer"]);

    {
        let _inner = enter_scope("trace-inner");
        assert_eq!(ambient_stack().labels(), vec!["trace-outer", "trace-inner"]);
    }

    assert_eq!(ambient_stack().labels(), vec!["trace-outer"]);
    drop(outer);
    assert!(ambient_stack().is_empty());
}

#[test]
fn test_scope_guard_out_of_order_drop() {
    let first = enter_scope("trace-first");
    let second = enter_scope("trace-second");

    // Dropping the outer guard first removes its marker from the middle of
    // the stack and leaves the inner scope intact.
    drop(first);
    assert_eq!(ambient_stack().labels(), vec!["trace-second"]);
    drop(second);
    assert!(ambient_stack().is_empty());
}

#[test]
fn test_stack_root_is_outermost() {
    let _outer = enter_scope("trace-root");
    let _inner = enter_scope("trace-leaf");

    let stack = ambient_stack();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.root().map(ScopeMarker::label), Some("trace-root"));
}

#[test]
fn test_stack_is_immutable_snapshot() {
    let guard = enter_scope("trace-snap");
    let captured = ambient_stack();
    drop(guard);

    // The captured stack is unaffected by later ambient mutation.
    assert_eq!(captured.labels(), vec!["trace-snap"]);
    assert!(ambient_stack().is_empty());
}

#[test]
fn test_empty_stack_default() {
    let stack = ContextStack::default();
    assert!(stack.is_empty());
    assert!(stack.root().is_none());
}

#[test]
fn test_message_carries_context_and_task_uuid() {
    let collector = Arc::new(CollectingDestination::new());
    let handle: Arc<dyn Destination> = collector.clone();
    add_destinations([handle.clone()]);

    let _scope = enter_scope("trace-msg");
    TraceMessage::new("trace_tests:attributed")
        .with_field("key", "value")
        .emit();

    remove_destination(&handle);

    let events = collector.events_of_type("trace_tests:attributed");
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["context"], serde_json::json!(["trace-msg"]));
    assert_eq!(event["key"], "value");
    assert!(event["task_uuid"].is_string());
    assert!(event["timestamp"].is_string());
}

#[test]
fn test_message_without_scope_has_empty_context() {
    let collector = Arc::new(CollectingDestination::new());
    let handle: Arc<dyn Destination> = collector.clone();
    add_destinations([handle.clone()]);

    TraceMessage::new("trace_tests:bare").emit();

    remove_destination(&handle);

    let events = collector.events_of_type("trace_tests:bare");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["context"], serde_json::json!([]));
    assert!(events[0].get("task_uuid").is_none());
}
