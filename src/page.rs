use crate::script::MARKER_ATTR;
use kuchiki::NodeRef;
use kuchiki::traits::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("selector query {0} failed")]
    Selector(String),
    #[error("document has no <body> element")]
    MissingBody,
    #[error("rendered tag did not parse to a <script> element")]
    MalformedScriptTag,
}

/// Handle to the HTML document a widget is mounted into.
///
/// Cloning is cheap and shares the underlying document, so several managers
/// mounted on the same page observe each other's injected elements. The
/// handle is not `Send`; a page belongs to the request/render context that
/// created it.
#[derive(Clone)]
pub struct Page {
    document: NodeRef,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
        }
    }

    pub fn to_html(&self) -> String {
        self.document.to_string()
    }

    /// Whether a `<script>` with exactly this `src` is already present.
    /// Pure presence check, no network involved.
    pub fn has_script_with_src(&self, url: &str) -> bool {
        let Ok(scripts) = self.document.select("script") else {
            return false;
        };
        scripts.into_iter().any(|script| {
            script
                .attributes
                .borrow()
                .get("src")
                .is_some_and(|src| src == url)
        })
    }

    /// Number of scripts bearing the injection marker attribute.
    pub fn marked_script_count(&self) -> usize {
        self.document
            .select(&format!("script[{MARKER_ATTR}]"))
            .map(|scripts| scripts.count())
            .unwrap_or(0)
    }

    /// Parse a rendered `<script>` tag and append the element to `<body>`,
    /// returning a handle to the inserted node.
    pub fn append_script(&self, tag_html: &str) -> Result<NodeRef, PageError> {
        let body = self
            .document
            .select_first("body")
            .map_err(|_| PageError::MissingBody)?;

        let fragment = kuchiki::parse_html().one(tag_html);
        let script = fragment
            .select_first("script")
            .map_err(|_| PageError::MalformedScriptTag)?;
        let node = script.as_node().clone();
        node.detach();
        body.as_node().append(node.clone());
        Ok(node)
    }
}
