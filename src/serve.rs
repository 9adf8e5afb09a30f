use crate::config::WidgetConfig;
use crate::manager::WidgetManager;
use crate::page::Page;
use crate::sdk::SdkSlot;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::header;
use std::sync::Arc;
use tracing::error;

/// Inject the widget script element into a server-rendered HTML document.
///
/// Runs the full initialization pipeline (id validation, duplicate check,
/// attribute serialization) and returns the serialized document. On an
/// invalid configuration or a pre-existing script the input document comes
/// back without a new element — the embed never breaks the page it rides on.
pub fn inject_into_html(html: &str, config: &WidgetConfig) -> String {
    let page = Page::parse(html);
    let mut manager = WidgetManager::new(page.clone(), SdkSlot::new());
    manager.initialize(config);
    page.to_html()
}

/// Axum middleware that rewrites successful `text/html` responses to carry
/// the widget script. Everything else passes through untouched.
///
/// ```no_run
/// use axum::{Router, middleware, response::Html, routing::get};
/// use bubblav_embed::{WidgetConfig, serve::inject_widget};
/// use std::sync::Arc;
///
/// let config = Arc::new(WidgetConfig::new("abc123"));
/// let app: Router = Router::new()
///     .route("/", get(|| async { Html("<html><body></body></html>") }))
///     .layer(middleware::from_fn_with_state(config, inject_widget));
/// ```
pub async fn inject_widget(
    State(config): State<Arc<WidgetConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !response.status().is_success() || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(?err, "failed to buffer html response for widget injection");
            return Response::from_parts(parts, Body::empty());
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(html) => {
            let injected = inject_into_html(html, &config);
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(injected))
        }
        // Declared text/html but not UTF-8; leave it alone.
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"))
}
