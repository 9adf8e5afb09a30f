use crate::config::{WidgetConfig, validate_website_id};
use crate::loader::ScriptLoader;
use crate::page::Page;
use crate::script::{render_script_tag, widget_script_url};
use crate::sdk::{EventCallback, ReadyCallback, SdkSlot, WidgetSdk, events};
use kuchiki::NodeRef;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, warn};

/// Lifecycle phase of a widget mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Destroyed,
}

/// Manages one widget mount on a page: validates the configuration, injects
/// the script element exactly once, bridges the runtime's open/close events
/// into an observable state, and forwards SDK calls when a handle exists.
///
/// Every failure degrades to "widget unavailable"; nothing here is allowed
/// to take the host page down. The manager is single-threaded like the page
/// it owns; the handles it shares (slot, callbacks, open-state channel) are
/// thread-safe.
pub struct WidgetManager {
    page: Page,
    slot: SdkSlot,
    sdk: Option<Arc<dyn WidgetSdk>>,
    script: Option<NodeRef>,
    script_url: Option<String>,
    state: WidgetState,
    open_tx: watch::Sender<bool>,
    open_rx: watch::Receiver<bool>,
}

impl WidgetManager {
    /// Create a manager over a page and its runtime slot. If the external
    /// runtime is already installed, adopt it and bridge immediately.
    pub fn new(page: Page, slot: SdkSlot) -> Self {
        let (open_tx, open_rx) = watch::channel(false);
        let mut manager = Self {
            page,
            slot,
            sdk: None,
            script: None,
            script_url: None,
            state: WidgetState::Uninitialized,
            open_tx,
            open_rx,
        };
        if let Some(sdk) = manager.slot.get() {
            manager.sdk = Some(sdk);
            manager.bridge_events();
        }
        manager
    }

    /// Initialize the widget with the given configuration.
    ///
    /// Re-entrant calls are rejected with a warning, not queued. An invalid
    /// website id aborts before any document mutation. If the script is
    /// already present (another mount on this page injected it), the call
    /// adopts the installed runtime when there is one and otherwise leaves
    /// the document alone.
    pub fn initialize(&mut self, config: &WidgetConfig) {
        if matches!(self.state, WidgetState::Initializing | WidgetState::Ready) {
            warn!("widget already initialized");
            return;
        }

        if !validate_website_id(&config.website_id) {
            warn!(
                website_id = %config.website_id,
                "invalid website id format; check the id in the BubblaV dashboard"
            );
            return;
        }

        let url = widget_script_url(config.api_url.as_deref());

        if self.page.has_script_with_src(&url) {
            warn!(%url, "widget script already loaded; only one widget instance should be active");
            if let Some(sdk) = self.slot.get() {
                self.sdk = Some(sdk);
                self.bridge_events();
                self.state = WidgetState::Ready;
            }
            return;
        }

        self.state = WidgetState::Initializing;

        let tag = render_script_tag(&url, config);
        match self.page.append_script(&tag) {
            Ok(node) => {
                self.script = Some(node);
                self.script_url = Some(url);
            }
            Err(err) => {
                error!(%url, ?err, "failed to insert widget script element");
                self.state = WidgetState::Failed;
            }
        }
    }

    /// The script element's load event. Invoked by the resource-loading
    /// subsystem (see [`ScriptLoader`]); a stale call after `destroy` or a
    /// failed load is a no-op.
    pub fn on_script_load(&mut self) {
        if self.state != WidgetState::Initializing || self.script.is_none() {
            return;
        }
        self.state = WidgetState::Ready;
        match self.slot.get() {
            Some(sdk) => {
                self.sdk = Some(sdk);
                self.bridge_events();
            }
            None => {
                // Tolerated: the proxy stays inert until the runtime shows up.
                debug!("widget script loaded but no runtime was installed");
            }
        }
    }

    /// The script element's error event. The failed element is left in the
    /// document for `destroy`; the state no longer blocks a retry, though a
    /// retry against the same URL requires `destroy` first because of the
    /// presence check.
    pub fn on_script_error(&mut self) {
        if self.state != WidgetState::Initializing {
            return;
        }
        let url = self.script_url.as_deref().unwrap_or_default();
        error!(
            %url,
            "failed to load widget script; check the network connection and the configured url"
        );
        self.state = WidgetState::Failed;
    }

    /// Drive one load attempt through a loader backend and dispatch the
    /// outcome as the load or error event.
    pub async fn load_with(&mut self, loader: &dyn ScriptLoader) {
        if self.state != WidgetState::Initializing {
            return;
        }
        let Some(url) = self.script_url.clone() else {
            return;
        };
        match loader.load(&url).await {
            Ok(()) => self.on_script_load(),
            Err(err) => {
                debug!(%url, %err, "script loader reported failure");
                self.on_script_error();
            }
        }
    }

    /// Remove the script element and drop the runtime handle. Idempotent;
    /// safe before `initialize` and safe to repeat.
    pub fn destroy(&mut self) {
        if let Some(script) = self.script.take() {
            script.detach();
        }
        self.script_url = None;
        self.sdk = None;
        self.state = WidgetState::Destroyed;
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    /// Whether a runtime handle is attached. With no handle every proxy
    /// call is a silent no-op.
    pub fn has_sdk(&self) -> bool {
        self.sdk.is_some()
    }

    /// Observable open/closed state, updated through the bridged
    /// `widget_opened` / `widget_closed` events.
    pub fn open_state(&self) -> watch::Receiver<bool> {
        self.open_rx.clone()
    }

    /// The open/closed state as an async stream; yields the current value
    /// first, then every change.
    pub fn open_state_stream(&self) -> WatchStream<bool> {
        WatchStream::new(self.open_rx.clone())
    }

    fn bridge_events(&self) {
        let Some(sdk) = &self.sdk else {
            return;
        };
        let tx = self.open_tx.clone();
        sdk.on(
            events::WIDGET_OPENED,
            Arc::new(move |_| {
                let _ = tx.send_replace(true);
            }),
        );
        let tx = self.open_tx.clone();
        sdk.on(
            events::WIDGET_CLOSED,
            Arc::new(move |_| {
                let _ = tx.send_replace(false);
            }),
        );
    }

    // SDK proxy. Best-effort forwarding: the external runtime's presence is
    // outside this crate's control, so a missing handle is absorbed.

    pub fn open(&self) {
        if let Some(sdk) = &self.sdk {
            sdk.open();
        }
    }

    pub fn close(&self) {
        if let Some(sdk) = &self.sdk {
            sdk.close();
        }
    }

    pub fn toggle(&self) {
        if let Some(sdk) = &self.sdk {
            sdk.toggle();
        }
    }

    pub fn is_open(&self) -> bool {
        self.sdk.as_ref().map(|sdk| sdk.is_open()).unwrap_or(false)
    }

    pub fn send_message(&self, text: &str, conversation_id: Option<&str>) {
        if let Some(sdk) = &self.sdk {
            sdk.send_message(text, conversation_id);
        }
    }

    pub fn show_greeting(&self, message: Option<&str>) {
        if let Some(sdk) = &self.sdk {
            sdk.show_greeting(message);
        }
    }

    pub fn hide_greeting(&self) {
        if let Some(sdk) = &self.sdk {
            sdk.hide_greeting();
        }
    }

    pub fn config(&self) -> serde_json::Map<String, Value> {
        self.sdk.as_ref().map(|sdk| sdk.config()).unwrap_or_default()
    }

    pub fn set_debug(&self, enabled: bool) {
        if let Some(sdk) = &self.sdk {
            sdk.set_debug(enabled);
        }
    }

    pub fn on(&self, event: &str, callback: EventCallback) {
        if let Some(sdk) = &self.sdk {
            sdk.on(event, callback);
        }
    }

    pub fn off(&self, event: &str, callback: &EventCallback) {
        if let Some(sdk) = &self.sdk {
            sdk.off(event, callback);
        }
    }

    pub fn emit(&self, event: &str, data: Option<Value>) {
        if let Some(sdk) = &self.sdk {
            sdk.emit(event, data);
        }
    }

    pub fn ready(&self, callback: ReadyCallback) {
        if let Some(sdk) = &self.sdk {
            sdk.ready(callback);
        }
    }

    pub fn track(&self, event_name: &str, properties: Option<Value>) {
        if let Some(sdk) = &self.sdk {
            sdk.track(event_name, properties);
        }
    }
}
