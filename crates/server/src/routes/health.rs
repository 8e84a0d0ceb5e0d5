use axum::{
    Router,
    extract::Query,
    response::{Html, Json as ResponseJson},
    routing::get,
};
use serde::Deserialize;
use utils::response::StatusBody;

use crate::DeploymentImpl;

const TOKEN_STORAGE_KEY: &str = "night-king.auth.token";
const ERROR_STORAGE_KEY: &str = "night-king.auth.error";

const LANDING_PAGE: &str = "<!DOCTYPE html><html><head><title>Night-king</title></head><body>Night-king backend</body></html>";

#[derive(Debug, Default, Deserialize)]
pub struct LandingQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// Plain landing page, or, when the login handshake bounced back here with a
/// `token`/`error`, a page that stores them in browser storage and strips them
/// from the address bar.
pub async fn landing(Query(query): Query<LandingQuery>) -> Html<String> {
    let token = query.token.filter(|t| !t.is_empty());
    let error = query.error.filter(|e| !e.is_empty());
    if token.is_none() && error.is_none() {
        return Html(LANDING_PAGE.to_string());
    }
    Html(handoff_page(token.as_deref(), error.as_deref()))
}

pub async fn healthz() -> ResponseJson<StatusBody> {
    ResponseJson(StatusBody::ok())
}

/// JSON literal safe to embed inside a `<script>` element.
fn script_literal(value: Option<&str>) -> String {
    serde_json::to_string(&value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn handoff_page(token: Option<&str>, error: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="refresh" content="0;url=/">
    <title>Processing login…</title>
  </head>
  <body>
    <script>
      (() => {{
        const token = {token};
        const error = {error};
        const tokenKey = '{token_key}';
        const errorKey = '{error_key}';
        try {{
          if (token) {{
            localStorage.setItem(tokenKey, token);
          }}
          if (error) {{
            sessionStorage.setItem(errorKey, error);
          }} else {{
            sessionStorage.removeItem(errorKey);
          }}
        }} catch (storageError) {{
          console.warn('Failed to persist auth state', storageError);
        }}
        const url = new URL(window.location.href);
        url.searchParams.delete('token');
        url.searchParams.delete('error');
        window.location.replace(url.pathname + url.search + url.hash || '/');
      }})();
    </script>
  </body>
</html>"#,
        token = script_literal(token),
        error = script_literal(error),
        token_key = TOKEN_STORAGE_KEY,
        error_key = ERROR_STORAGE_KEY,
    )
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/", get(landing))
        .route("/healthz", get(healthz))
}
