use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Events the widget runtime emits through its `on` mechanism.
pub mod events {
    pub const WIDGET_OPENED: &str = "widget_opened";
    pub const WIDGET_CLOSED: &str = "widget_closed";
}

/// Listener registered on the widget runtime. Compared by identity in
/// `off`, so keep the `Arc` around to unregister later.
pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// One-shot callback invoked once the widget reports itself loaded.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Method table of the external widget runtime.
///
/// The runtime is owned by the external script, not by this crate; the
/// manager only ever borrows a handle to it through [`SdkSlot`].
pub trait WidgetSdk: Send + Sync {
    fn open(&self);
    fn close(&self);
    fn toggle(&self);
    fn is_open(&self) -> bool;
    fn send_message(&self, text: &str, conversation_id: Option<&str>);
    fn show_greeting(&self, message: Option<&str>);
    fn hide_greeting(&self);
    fn config(&self) -> serde_json::Map<String, Value>;
    fn set_debug(&self, enabled: bool);
    fn on(&self, event: &str, callback: EventCallback);
    fn off(&self, event: &str, callback: &EventCallback);
    fn emit(&self, event: &str, data: Option<Value>);
    fn ready(&self, callback: ReadyCallback);
    fn track(&self, event_name: &str, properties: Option<Value>);
}

/// The page's global namespace slot for the widget runtime.
///
/// Externally owned and nullable: the external script installs the runtime
/// at some unspecified point after load, and the manager only reads it.
/// Clones share the slot, mirroring how every mount on one page sees the
/// same global object.
#[derive(Clone, Default)]
pub struct SdkSlot {
    inner: Arc<RwLock<Option<Arc<dyn WidgetSdk>>>>,
}

impl SdkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, sdk: Arc<dyn WidgetSdk>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(sdk);
    }

    pub fn clear(&self) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    pub fn get(&self) -> Option<Arc<dyn WidgetSdk>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.get().is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-process runtime with a real listener registry.
///
/// Stands in for the external script in tests and host-side integration
/// suites: `open`/`close` flip the open flag and emit the matching events,
/// sent messages and tracked events are recorded for assertions.
#[derive(Default)]
pub struct StubWidgetSdk {
    open: Mutex<bool>,
    debug: Mutex<bool>,
    config: Mutex<serde_json::Map<String, Value>>,
    listeners: Mutex<HashMap<String, Vec<EventCallback>>>,
    messages: Mutex<Vec<(String, Option<String>)>>,
    tracked: Mutex<Vec<(String, Option<Value>)>>,
}

impl StubWidgetSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: serde_json::Map<String, Value>) -> Self {
        let stub = Self::default();
        *lock(&stub.config) = config;
        stub
    }

    pub fn sent_messages(&self) -> Vec<(String, Option<String>)> {
        lock(&self.messages).clone()
    }

    pub fn tracked_events(&self) -> Vec<(String, Option<Value>)> {
        lock(&self.tracked).clone()
    }

    pub fn debug_enabled(&self) -> bool {
        *lock(&self.debug)
    }

    fn dispatch(&self, event: &str, data: Value) {
        // Snapshot under the lock, invoke outside it: a listener may
        // re-enter on/off/emit.
        let callbacks: Vec<EventCallback> = lock(&self.listeners)
            .get(event)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(data.clone());
        }
    }
}

impl WidgetSdk for StubWidgetSdk {
    fn open(&self) {
        *lock(&self.open) = true;
        self.dispatch(events::WIDGET_OPENED, Value::Null);
    }

    fn close(&self) {
        *lock(&self.open) = false;
        self.dispatch(events::WIDGET_CLOSED, Value::Null);
    }

    fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    fn is_open(&self) -> bool {
        *lock(&self.open)
    }

    fn send_message(&self, text: &str, conversation_id: Option<&str>) {
        lock(&self.messages).push((text.to_string(), conversation_id.map(str::to_string)));
    }

    fn show_greeting(&self, _message: Option<&str>) {}

    fn hide_greeting(&self) {}

    fn config(&self) -> serde_json::Map<String, Value> {
        lock(&self.config).clone()
    }

    fn set_debug(&self, enabled: bool) {
        *lock(&self.debug) = enabled;
    }

    fn on(&self, event: &str, callback: EventCallback) {
        lock(&self.listeners)
            .entry(event.to_string())
            .or_default()
            .push(callback);
    }

    fn off(&self, event: &str, callback: &EventCallback) {
        if let Some(callbacks) = lock(&self.listeners).get_mut(event) {
            callbacks.retain(|registered| !Arc::ptr_eq(registered, callback));
        }
    }

    fn emit(&self, event: &str, data: Option<Value>) {
        self.dispatch(event, data.unwrap_or(Value::Null));
    }

    fn ready(&self, callback: ReadyCallback) {
        // The stub is always "loaded".
        callback();
    }

    fn track(&self, event_name: &str, properties: Option<Value>) {
        lock(&self.tracked).push((event_name.to_string(), properties));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn slot_starts_empty_and_shares_installs() {
        let slot = SdkSlot::new();
        let alias = slot.clone();
        assert!(!slot.is_installed());

        slot.install(Arc::new(StubWidgetSdk::new()));
        assert!(alias.is_installed());

        alias.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn open_close_flip_state_and_emit() {
        let sdk = StubWidgetSdk::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        sdk.on(
            events::WIDGET_OPENED,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        sdk.open();
        assert!(sdk.is_open());
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        sdk.close();
        assert!(!sdk.is_open());

        sdk.toggle();
        assert!(sdk.is_open());
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn off_unregisters_by_identity() {
        let sdk = StubWidgetSdk::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let callback: EventCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sdk.on("message_received", callback.clone());
        sdk.emit("message_received", Some(serde_json::json!({"text": "hi"})));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        sdk.off("message_received", &callback);
        sdk.emit("message_received", None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn records_messages_and_tracked_events() {
        let sdk = StubWidgetSdk::new();
        sdk.send_message("hello", Some("conv-1"));
        sdk.track("signup_clicked", Some(serde_json::json!({"plan": "pro"})));

        assert_eq!(
            sdk.sent_messages(),
            vec![("hello".to_string(), Some("conv-1".to_string()))]
        );
        assert_eq!(sdk.tracked_events()[0].0, "signup_clicked");
    }

    #[test]
    fn ready_fires_immediately() {
        let sdk = StubWidgetSdk::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        sdk.ready(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
