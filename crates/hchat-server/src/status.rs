//! HTML status page served on `/` and `/v1`

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use hchat_llm::catalog;

/// Values shown on the page
pub struct StatusInfo<'a> {
    pub api_base: &'a str,
    pub port: u16,
    pub api_key: &'a str,
}

/// Hide all but the first 10 and last 4 characters of a key
///
/// Keys of 14 characters or fewer are masked completely.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render the page
pub fn render(info: &StatusInfo<'_>) -> String {
    let mut models = String::new();
    for caps in catalog::iter() {
        let provider: &str = caps.provider.into();
        let _ = write!(models, "<li><strong>{}</strong> <small>({provider})</small></li>", caps.model);
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>HChat Proxy Status</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #0f172a; color: #f8fafc; display: flex; justify-content: center; padding: 3rem 1rem; }}
.card {{ background: #1e293b; padding: 2rem; border-radius: 1rem; max-width: 520px; width: 100%; border: 1px solid #334155; }}
h1 {{ color: #38bdf8; font-size: 1.5rem; margin-top: 0; }}
dl {{ display: grid; grid-template-columns: 100px 1fr; gap: 0.75rem; }}
dt {{ color: #94a3b8; }}
dd {{ margin: 0; font-family: ui-monospace, monospace; word-break: break-all; }}
ul {{ list-style: none; padding: 0; display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem; }}
li {{ background: #334155; padding: 0.5rem; border-radius: 0.375rem; font-size: 0.8125rem; }}
a {{ color: #38bdf8; }}
</style>
</head>
<body>
<div class="card">
<h1>HChat Proxy Status</h1>
<p>Running</p>
<dl>
<dt>API Base</dt><dd>{api_base}</dd>
<dt>Proxy Port</dt><dd>{port}</dd>
<dt>API Key</dt><dd>{api_key}</dd>
</dl>
<h2>Available Models</h2>
<ul>{models}</ul>
<p>Endpoint: <a href="/v1/models">/v1/models</a> | Version: {version}</p>
</div>
</body>
</html>
"#,
        api_base = escape(info.api_base),
        port = info.port,
        api_key = escape(&mask_key(info.api_key)),
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// `GET /`, `GET /v1` and `GET /v1/`
pub fn router(info: &StatusInfo<'_>) -> Router {
    let page: Arc<str> = render(info).into();
    let handler = move || {
        let page = Arc::clone(&page);
        async move { Html(page.to_string()) }
    };

    Router::new()
        .route("/", get(handler.clone()))
        .route("/v1", get(handler.clone()))
        .route("/v1/", get(handler))
}
