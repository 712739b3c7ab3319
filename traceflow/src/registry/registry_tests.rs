use pretty_assertions::assert_eq;

use super::{active_stack, register, use_coroutine_context};
use crate::trace::{enter_scope, install_stack_provider};

#[test]
fn test_register_captures_ambient_stack() {
    let _scope = enter_scope("registry-capture");
    let entry = register();
    assert_eq!(entry.snapshot().labels(), vec!["registry-capture"]);
}

#[test]
fn test_snapshot_fixed_at_registration() {
    let guard = enter_scope("registry-fixed");
    let entry = register();
    drop(guard);

    let _other = enter_scope("registry-mutated");
    assert_eq!(entry.snapshot().labels(), vec!["registry-fixed"]);
}

#[test]
fn test_active_slot_empty_by_default() {
    assert!(active_stack().is_none());
}

#[test]
fn test_activation_nests_lifo() {
    let outer_scope = enter_scope("registry-outer");
    let outer = register();
    drop(outer_scope);

    let inner_scope = enter_scope("registry-inner");
    let inner = register();
    drop(inner_scope);

    let outer_active = outer.activate();
    assert_eq!(
        active_stack().map(|s| s.labels().join("/")),
        Some("registry-outer".to_string())
    );

    {
        let _inner_active = inner.activate();
        assert_eq!(
            active_stack().map(|s| s.labels().join("/")),
            Some("registry-inner".to_string())
        );
    }

    // Dropping the inner guard restores exactly the outer coroutine.
    assert_eq!(
        active_stack().map(|s| s.labels().join("/")),
        Some("registry-outer".to_string())
    );

    drop(outer_active);
    assert!(active_stack().is_none());
}

#[test]
fn test_entry_drop_reclaims_snapshot() {
    let entry = register();
    let id = entry.id();
    assert!(super::is_registered(id));

    drop(entry);
    assert!(!super::is_registered(id));
}

#[test]
fn test_provider_installed_once() {
    use_coroutine_context();

    // The registry's provider won the slot; later installs are rejected and
    // the registry keeps answering context queries.
    assert!(!install_stack_provider(|| None));
}

#[test]
fn test_provider_preempts_ambient_while_active() {
    let snapshot_scope = enter_scope("registry-provider");
    let entry = register();
    drop(snapshot_scope);

    let _ambient = enter_scope("registry-ambient");
    let _active = entry.activate();

    // With the coroutine active, the provider answers with its snapshot
    // instead of the ambient stack.
    assert_eq!(
        crate::trace::current_stack().labels(),
        vec!["registry-provider"]
    );
}
