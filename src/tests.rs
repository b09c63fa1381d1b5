// End-to-end scenarios across bindables, hooks, blocs and persistence
use crate::bloc::{Bloc, BlocContext, BlocEvent, EventHooks};
use crate::persist::{MemoryStore, PersistentStore, make_persistent};
use crate::{Bindable, Listener, ListenerId, Shared, use_bindable};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

fn record<T: Clone + PartialEq + Send + Sync + 'static>(
    bindable: &Bindable<T>,
) -> (Arc<Mutex<Vec<T>>>, ListenerId) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = bindable.subscribe(move |v: &T| sink.lock().push(v.clone()));
    (seen, id)
}

#[test]
fn silent_set_after_notified_set() {
    let ov = Bindable::with_policy(1, false);
    let (seen, _) = record(&ov);

    ov.set(2);
    assert_eq!(ov.get(), 2);
    assert_eq!(*seen.lock(), vec![2]);

    ov.set_with(3, false);
    assert_eq!(ov.get(), 3);
    assert_eq!(*seen.lock(), vec![2]);
}

#[test]
fn equal_set_is_ignored_by_default() {
    let ov = Bindable::with_policy(0, true);
    let (seen, _) = record(&ov);

    ov.set(0);
    assert!(seen.lock().is_empty());

    ov.set(1);
    assert_eq!(*seen.lock(), vec![1]);
}

#[test]
fn repeated_equal_sets_never_fire() {
    let ov = Bindable::new("same".to_string());
    let (seen, _) = record(&ov);

    for _ in 0..5 {
        ov.set("same".to_string());
    }
    assert_eq!(ov.get(), "same");
    assert!(seen.lock().is_empty());
}

// Equal by key, distinguishable by tag
#[derive(Clone, Debug)]
struct Tagged {
    key: u32,
    tag: &'static str,
}

impl PartialEq for Tagged {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[test]
fn equal_set_does_not_replace_stored_value() {
    let ov = Bindable::new(Tagged { key: 1, tag: "old" });
    ov.set(Tagged { key: 1, tag: "new" });
    assert_eq!(ov.get().tag, "old");

    // Without the policy the value is replaced even though it compares equal
    ov.set_trigger_when_different(false);
    ov.set_with(Tagged { key: 1, tag: "new" }, false);
    assert_eq!(ov.get().tag, "new");
}

#[test]
fn proxy_scenario() {
    let source = Bindable::new(0);
    let downstream = Bindable::new(1);

    downstream.start_proxy(&source);
    assert_eq!(downstream.get(), 0);

    source.set(10);
    assert_eq!(downstream.get(), 10);

    downstream.stop_proxy();
    source.set(11);
    assert_eq!(downstream.get(), 10);
}

#[test]
fn proxies_chain() {
    let a = Bindable::new(0);
    let b = Bindable::new(0);
    let c = Bindable::new(0);
    b.start_proxy(&a);
    c.start_proxy(&b);
    let (seen, _) = record(&c);

    a.set(5);
    assert_eq!(c.get(), 5);
    assert_eq!(*seen.lock(), vec![5]);

    b.stop_proxy();
    a.set(6);
    assert_eq!(c.get(), 5);
}

#[test]
fn proxy_applies_downstream_policy() {
    let source = Bindable::with_policy(1, false);
    let downstream = Bindable::with_policy(0, true);
    downstream.start_proxy(&source);
    let (seen, _) = record(&downstream);

    // Source fires on equal values, downstream filters them
    source.set(1);
    source.set(1);
    source.set(2);
    assert_eq!(*seen.lock(), vec![2]);
}

#[test]
fn subscribe_then_unsubscribe_never_fires() {
    let ov = Bindable::with_policy(0, false);
    let (seen, id) = record(&ov);
    ov.unsubscribe(id);

    ov.set(1);
    ov.trigger();
    ov.set_with(2, true);
    assert!(seen.lock().is_empty());
}

#[test]
fn manual_trigger_announces_in_place_mutation() {
    let items = Bindable::new(Shared::new(vec!["lol".to_string(), "2".to_string()]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    items.subscribe(move |v: &Shared<Vec<String>>| sink.lock().push(v.snapshot()));

    items.with(|list| list.write()[1] = "3".to_string());
    // Same handle: an equal-value set is a no-op
    items.set(items.get());
    assert!(seen.lock().is_empty());

    items.trigger();
    assert_eq!(
        *seen.lock(),
        vec![vec!["lol".to_string(), "3".to_string()]]
    );
}

#[test]
fn trigger_order_is_reverse_of_subscription() {
    let ov = Bindable::new(0);
    let order = Arc::new(Mutex::new(Vec::new()));
    let ids: Vec<_> = (0..5)
        .map(|n| {
            let order = order.clone();
            ov.subscribe(move |_| order.lock().push(n))
        })
        .collect();
    ov.unsubscribe(ids[2]);

    ov.trigger();
    assert_eq!(*order.lock(), vec![4, 3, 1, 0]);

    order.lock().clear();
    ov.trigger();
    assert_eq!(*order.lock(), vec![4, 3, 1, 0]);
}

#[test]
fn listener_removed_mid_pass_is_skipped() {
    let ov = Bindable::new(0);
    let (seen, victim) = record(&ov);
    let remover = ov.clone();
    ov.subscribe(move |_| remover.unsubscribe(victim));

    ov.set(1);
    assert!(seen.lock().is_empty());
    assert_eq!(ov.listener_count(), 1);
}

#[test]
fn listener_removing_itself_mid_pass() {
    let ov = Bindable::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let own_id = Arc::new(Mutex::new(None::<ListenerId>));

    let handle = ov.clone();
    let calls_clone = calls.clone();
    let own_id_clone = own_id.clone();
    let id = ov.subscribe(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = *own_id_clone.lock() {
            handle.unsubscribe(id);
        }
    });
    *own_id.lock() = Some(id);
    let (seen, _) = record(&ov);

    ov.set(1);
    ov.set(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock(), vec![1, 2]);
}

#[test]
fn listener_added_mid_pass_waits_for_next_pass() {
    let ov = Bindable::new(0);
    let late_calls = Arc::new(AtomicUsize::new(0));
    let added = Arc::new(AtomicBool::new(false));

    let handle = ov.clone();
    let late_calls_clone = late_calls.clone();
    ov.subscribe(move |_| {
        if !added.swap(true, Ordering::SeqCst) {
            let late_calls = late_calls_clone.clone();
            handle.subscribe(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    ov.set(1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ov.listener_count(), 2);

    ov.set(2);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_set_from_listener() {
    let ov = Bindable::new(0);
    let (seen, _) = record(&ov);
    let clamp = ov.clone();
    ov.subscribe(move |v: &i32| {
        if *v > 10 {
            clamp.set(10);
        }
    });

    ov.set(15);
    assert_eq!(ov.get(), 10);
    // Nested pass delivers 10, then the outer pass resumes with the fresh value
    assert_eq!(*seen.lock(), vec![10, 10]);
}

#[test]
fn panicking_listener_aborts_rest_of_pass() {
    let ov = Bindable::new(0);
    let (seen, _) = record(&ov);
    let armed = Arc::new(AtomicBool::new(true));
    let armed_clone = armed.clone();
    ov.subscribe(move |_| {
        if armed_clone.swap(false, Ordering::SeqCst) {
            panic!("listener failure");
        }
    });

    let result = catch_unwind(AssertUnwindSafe(|| ov.set(1)));
    assert!(result.is_err());
    assert_eq!(ov.get(), 1);
    assert!(seen.lock().is_empty());

    // Nothing is left locked
    ov.set(2);
    assert_eq!(*seen.lock(), vec![2]);
}

#[test]
fn bind_same_listener_twice_unbinds_first_only() {
    let ov = Bindable::with_policy(0, false);
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let listener = Listener::from_fn(move |_: &i32| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    ov.bind(&listener, false);
    ov.bind(&listener, false);
    ov.unbind(&listener);

    ov.set(1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    ov.unbind(&listener);
    ov.unbind(&listener);
    ov.set(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn updates_from_another_thread() {
    let ov = Bindable::new(0u64);
    let total = Arc::new(AtomicUsize::new(0));
    let total_clone = total.clone();
    ov.subscribe(move |_| {
        total_clone.fetch_add(1, Ordering::SeqCst);
    });

    let writer = ov.clone();
    std::thread::spawn(move || {
        for n in 1..=10 {
            writer.set(n);
        }
    })
    .join()
    .unwrap();

    assert_eq!(ov.get(), 10);
    assert_eq!(total.load(Ordering::SeqCst), 10);
}

// Runs `f` on a worker and fails instead of hanging when it deadlocks
fn finishes_in_time(f: impl FnOnce() + Send + 'static) {
    let (done, finished) = mpsc::channel();
    std::thread::spawn(move || {
        f();
        let _ = done.send(());
    });
    assert!(
        finished.recv_timeout(Duration::from_secs(3)).is_ok(),
        "removing the listener did not return"
    );
}

#[test]
fn unsubscribe_drops_last_handle_of_proxied_downstream() {
    finishes_in_time(|| {
        let source = Bindable::new(0);
        let downstream = Bindable::new(1);
        downstream.start_proxy(&source);
        let id = source.subscribe(move |_| {
            let _keep = &downstream;
        });
        assert_eq!(source.listener_count(), 2);

        // Dropping the captured downstream unsubscribes its mirror from `source`
        source.unsubscribe(id);
        assert_eq!(source.listener_count(), 0);
    });
}

#[test]
fn unsubscribe_drops_last_hook_mounted_on_same_bindable() {
    finishes_in_time(|| {
        let ov = Bindable::new(0);
        let hook = use_bindable(&ov);
        let id = ov.subscribe(move |_| {
            let _keep = &hook;
        });
        assert_eq!(ov.listener_count(), 2);

        ov.unsubscribe(id);
        assert_eq!(ov.listener_count(), 0);
        ov.set(1);
    });
}

struct SettingsBloc {
    dark_mode: Bindable<bool>,
    hooks: EventHooks,
}

impl SettingsBloc {
    fn new(store: Arc<dyn PersistentStore>) -> Self {
        let dark_mode = make_persistent(&Bindable::new(false), "dark_mode", store)
            .unwrap_or_else(|_| Bindable::new(false));
        let mut hooks = EventHooks::new();
        let target = dark_mode.clone();
        hooks.hook_event("toggle_dark_mode", move |_| target.set(!target.get()));
        Self { dark_mode, hooks }
    }
}

impl Bloc for SettingsBloc {
    fn process_event(&self, event: &BlocEvent) {
        self.hooks.process_event(event);
    }
}

#[test]
fn bloc_state_flows_to_component_and_store() {
    let store = Arc::new(MemoryStore::new());
    store.set_item("dark_mode", "true".into()).unwrap();

    let context = BlocContext::builder()
        .with("settings", SettingsBloc::new(store.clone()))
        .build();
    context.wait_initialized().unwrap();

    let settings = context.get_bloc::<SettingsBloc>().unwrap();
    let hook = use_bindable(&settings.dark_mode);
    assert_eq!(hook.value(), Some(true));
    hook.take_dirty();

    context.dispatch(&BlocEvent::named("toggle_dark_mode"));
    assert!(hook.take_dirty());
    assert_eq!(hook.value(), Some(false));
    assert_eq!(store.get_item("dark_mode").unwrap().as_deref(), Some("false"));
}

#[test]
fn hook_follows_initializing_flag() {
    let context = BlocContext::builder().build();
    let hook = use_bindable(context.is_initializing());
    context.wait_initialized().unwrap();

    assert_eq!(hook.value(), Some(false));
}
