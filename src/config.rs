use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Desired widget configuration, owned by the host application.
///
/// Wire names are camelCase because that is what the widget script reads
/// back from its own `data-*` attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Website identifier issued by the BubblaV dashboard.
    pub website_id: String,
    /// Overrides the default widget script endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_icon_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_position: Option<CornerPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_position: Option<CornerPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powered_by_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textbox_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_action_buttons: Option<bool>,
}

/// Screen corner the widget bubble docks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerPosition {
    BottomLeft,
    BottomRight,
}

impl WidgetConfig {
    pub fn new(website_id: impl Into<String>) -> Self {
        Self {
            website_id: website_id.into(),
            api_url: None,
            bubble_color: None,
            bubble_icon_color: None,
            desktop_position: None,
            mobile_position: None,
            powered_by_visible: None,
            bot_name: None,
            greeting_message: None,
            textbox_placeholder: None,
            show_action_buttons: None,
        }
    }

    /// Build a configuration from `BUBBLAV_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let website_id =
            std::env::var("BUBBLAV_WEBSITE_ID").context("BUBBLAV_WEBSITE_ID is not set")?;

        let desktop_position = std::env::var("BUBBLAV_DESKTOP_POSITION")
            .ok()
            .map(|v| parse_position(&v))
            .transpose()?;
        let mobile_position = std::env::var("BUBBLAV_MOBILE_POSITION")
            .ok()
            .map(|v| parse_position(&v))
            .transpose()?;

        Ok(Self {
            website_id,
            api_url: std::env::var("BUBBLAV_API_URL").ok(),
            bubble_color: std::env::var("BUBBLAV_BUBBLE_COLOR").ok(),
            bubble_icon_color: std::env::var("BUBBLAV_BUBBLE_ICON_COLOR").ok(),
            desktop_position,
            mobile_position,
            powered_by_visible: env_bool("BUBBLAV_POWERED_BY_VISIBLE"),
            bot_name: std::env::var("BUBBLAV_BOT_NAME").ok(),
            greeting_message: std::env::var("BUBBLAV_GREETING_MESSAGE").ok(),
            textbox_placeholder: std::env::var("BUBBLAV_TEXTBOX_PLACEHOLDER").ok(),
            show_action_buttons: env_bool("BUBBLAV_SHOW_ACTION_BUTTONS"),
        })
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn parse_position(value: &str) -> anyhow::Result<CornerPosition> {
    match value.trim() {
        "bottom-left" => Ok(CornerPosition::BottomLeft),
        "bottom-right" => Ok(CornerPosition::BottomRight),
        other => anyhow::bail!("unknown widget position {other:?}"),
    }
}

/// Check a website identifier against the dashboard's format contract.
///
/// Returns false instead of raising; callers must check before touching the
/// document or the network.
pub fn validate_website_id(id: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    re.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dashboard_identifiers() {
        assert!(validate_website_id("abc123"));
        assert!(validate_website_id("site-42_test"));
    }

    #[test]
    fn rejects_empty_and_odd_characters() {
        assert!(!validate_website_id(""));
        assert!(!validate_website_id("abc 123"));
        assert!(!validate_website_id("abc/123"));
        assert!(!validate_website_id("<script>"));
    }

    #[test]
    fn positions_serialize_kebab_case() {
        let json = serde_json::to_value(CornerPosition::BottomLeft).unwrap();
        assert_eq!(json, serde_json::json!("bottom-left"));
    }

    #[test]
    fn unset_options_are_skipped_on_the_wire() {
        let cfg = WidgetConfig::new("abc123");
        let value = serde_json::to_value(&cfg).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["websiteId"], serde_json::json!("abc123"));
    }
}
