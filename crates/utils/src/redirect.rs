//! Redirect target handling for the browser side of the OAuth handshake.

use url::{Url, form_urlencoded};

/// Restrict `target` to the origin of `fallback`.
///
/// Path-absolute targets are resolved against the fallback origin; absolute
/// URLs on any other origin collapse to `fallback`.
pub fn sanitize_redirect(target: Option<&str>, fallback: &str) -> String {
    let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
        return fallback.to_string();
    };
    let Ok(fallback_url) = Url::parse(fallback) else {
        return fallback.to_string();
    };

    if target.starts_with('/') {
        let host = fallback_url.host_str().unwrap_or_default();
        return match fallback_url.port() {
            Some(port) => format!("{}://{}:{}{}", fallback_url.scheme(), host, port, target),
            None => format!("{}://{}{}", fallback_url.scheme(), host, target),
        };
    }

    match Url::parse(target) {
        Ok(target_url) if target_url.origin() == fallback_url.origin() => target.to_string(),
        _ => fallback.to_string(),
    }
}

/// Merge `params` into the query of `target`, replacing keys that already exist.
pub fn redirect_with_params(target: &str, params: &[(&str, &str)]) -> String {
    let Ok(mut url) = Url::parse(target) else {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        let separator = if target.contains('?') { '&' } else { '?' };
        return format!("{target}{separator}{query}");
    };

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !params.iter().any(|(name, _)| name == key))
        .collect();
    pairs.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    url.to_string()
}
