//! Embed manager for the BubblaV chat widget.
//!
//! Injects the widget's bootstrap `<script>` element into a page exactly
//! once, serializes the typed configuration into the `data-*` attributes
//! the script reads, bridges the runtime's `widget_opened`/`widget_closed`
//! events into an observable open-state, and proxies the runtime SDK with
//! silent no-op fallbacks while no handle is available. A third-party embed
//! must never break the host page: every failure here degrades to "widget
//! unavailable".
//!
//! ```
//! use bubblav_embed::{Page, SdkSlot, WidgetConfig, WidgetManager};
//!
//! let page = Page::parse("<html><head></head><body></body></html>");
//! let mut widget = WidgetManager::new(page.clone(), SdkSlot::new());
//! widget.initialize(&WidgetConfig::new("abc123"));
//! assert!(page.to_html().contains("data-site-id=\"abc123\""));
//! ```

pub mod config;
pub mod loader;
pub mod manager;
pub mod page;
pub mod script;
pub mod sdk;
pub mod serve;

pub use config::{CornerPosition, WidgetConfig, validate_website_id};
pub use loader::{HttpScriptLoader, ScriptLoadError, ScriptLoader, StubScriptLoader};
pub use manager::{WidgetManager, WidgetState};
pub use page::{Page, PageError};
pub use script::{
    DEFAULT_WIDGET_URL, MARKER_ATTR, SITE_ID_ATTR, config_props, props_to_data_attributes,
    render_script_tag, widget_script_url,
};
pub use sdk::{EventCallback, ReadyCallback, SdkSlot, StubWidgetSdk, WidgetSdk, events};
pub use serve::inject_into_html;
