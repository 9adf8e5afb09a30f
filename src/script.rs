use crate::config::WidgetConfig;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default endpoint serving the widget bootstrap script.
pub const DEFAULT_WIDGET_URL: &str = "https://widget.bubblav.com/widget.js";

/// Marker attribute identifying a script element injected by this crate.
/// The document must never hold more than one script bearing it.
pub const MARKER_ATTR: &str = "data-bubblav-widget";

/// Attribute carrying the website identifier.
pub const SITE_ID_ATTR: &str = "data-site-id";

/// Resolve the script URL: a non-empty override wins, else the default.
pub fn widget_script_url(override_url: Option<&str>) -> String {
    match override_url {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => DEFAULT_WIDGET_URL.to_string(),
    }
}

/// Extract the optional configuration fields as a camelCase property map.
///
/// The site identifier travels in its own attribute and is stripped here;
/// unset options never appear.
pub fn config_props(config: &WidgetConfig) -> serde_json::Map<String, Value> {
    let mut map = match serde_json::to_value(config) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    map.remove("websiteId");
    map.retain(|_, value| !value.is_null());
    map
}

/// Translate property keys to the script's attribute naming convention:
/// `desktopPosition` becomes `data-desktop-position`, values stringified.
pub fn props_to_data_attributes(
    props: &serde_json::Map<String, Value>,
) -> BTreeMap<String, String> {
    props
        .iter()
        .map(|(key, value)| (format!("data-{}", camel_to_kebab(key)), stringify(value)))
        .collect()
}

/// Render the full `<script>` tag for this configuration.
pub fn render_script_tag(url: &str, config: &WidgetConfig) -> String {
    let mut tag = format!(
        "<script src=\"{}\" async defer {MARKER_ATTR}=\"true\" {SITE_ID_ATTR}=\"{}\"",
        escape_attr(url),
        escape_attr(&config.website_id),
    );
    for (name, value) in props_to_data_attributes(&config_props(config)) {
        tag.push_str(&format!(" {name}=\"{}\"", escape_attr(&value)));
    }
    tag.push_str("></script>");
    tag
}

fn camel_to_kebab(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CornerPosition;

    #[test]
    fn url_override_wins_when_non_empty() {
        assert_eq!(widget_script_url(None), DEFAULT_WIDGET_URL);
        assert_eq!(widget_script_url(Some("")), DEFAULT_WIDGET_URL);
        assert_eq!(widget_script_url(Some("  ")), DEFAULT_WIDGET_URL);
        assert_eq!(
            widget_script_url(Some("https://eu.bubblav.com/widget.js")),
            "https://eu.bubblav.com/widget.js"
        );
    }

    #[test]
    fn site_id_only_config_yields_no_attributes() {
        let cfg = WidgetConfig::new("abc123");
        let attrs = props_to_data_attributes(&config_props(&cfg));
        assert!(attrs.is_empty());
    }

    #[test]
    fn set_fields_translate_to_kebab_data_attributes() {
        let mut cfg = WidgetConfig::new("abc123");
        cfg.desktop_position = Some(CornerPosition::BottomLeft);
        let attrs = props_to_data_attributes(&config_props(&cfg));
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["data-desktop-position"], "bottom-left");
    }

    #[test]
    fn booleans_and_copy_stringify() {
        let mut cfg = WidgetConfig::new("abc123");
        cfg.powered_by_visible = Some(false);
        cfg.bot_name = Some("Ava".into());
        let attrs = props_to_data_attributes(&config_props(&cfg));
        assert_eq!(attrs["data-powered-by-visible"], "false");
        assert_eq!(attrs["data-bot-name"], "Ava");
    }

    #[test]
    fn rendered_tag_carries_marker_and_site_id() {
        let mut cfg = WidgetConfig::new("abc123");
        cfg.bubble_color = Some("#3b82f6".into());
        let tag = render_script_tag(DEFAULT_WIDGET_URL, &cfg);
        assert!(tag.starts_with("<script src=\"https://widget.bubblav.com/widget.js\""));
        assert!(tag.contains("async defer"));
        assert!(tag.contains("data-bubblav-widget=\"true\""));
        assert!(tag.contains("data-site-id=\"abc123\""));
        assert!(tag.contains("data-bubble-color=\"#3b82f6\""));
        assert!(tag.ends_with("></script>"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut cfg = WidgetConfig::new("abc123");
        cfg.greeting_message = Some("Hi \"there\" <b>&co</b>".into());
        let tag = render_script_tag(DEFAULT_WIDGET_URL, &cfg);
        assert!(tag.contains("data-greeting-message=\"Hi &quot;there&quot; &lt;b&gt;&amp;co&lt;/b&gt;\""));
    }
}
