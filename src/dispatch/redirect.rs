//! Redirect handler.
//!
//! Builds the `Location` from the route target, optionally carrying the
//! wildcard remainder and the incoming query. No I/O.

use std::collections::HashSet;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use url::{form_urlencoded, Url};

use crate::error::RouterError;
use crate::routing::{RedirectOptions, ResolvedRoute};
use crate::security::TargetError;

/// Answer a matched redirect route.
pub fn handle(
    route: &ResolvedRoute,
    opts: &RedirectOptions,
    query: Option<&str>,
) -> Result<Response, RouterError> {
    let location = build_location(route, opts, query)?;
    let status = redirect_status(opts.status_code);

    let value =
        HeaderValue::from_str(location.as_str()).map_err(|_| TargetError::Malformed)?;
    let mut response = Response::new(axum::body::Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(header::LOCATION, value);
    Ok(response)
}

/// Compute the redirect destination.
pub fn build_location(
    route: &ResolvedRoute,
    opts: &RedirectOptions,
    query: Option<&str>,
) -> Result<Url, TargetError> {
    let mut url = Url::parse(&route.record.target).map_err(|_| TargetError::Malformed)?;

    if opts.preserve_path && route.is_wildcard() && !url.cannot_be_a_base() {
        let joined = join_path(url.path(), route.wildcard_remainder());
        url.set_path(&joined);
    }

    if opts.preserve_query {
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            merge_query(&mut url, query);
        }
    }

    Ok(url)
}

/// Append `remainder` (always starting with `/`) to `base` without doubling
/// the separator.
pub(crate) fn join_path(base: &str, remainder: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    if base.is_empty() {
        remainder.to_string()
    } else {
        format!("{base}{remainder}")
    }
}

/// Copy incoming pairs whose key the target does not already define.
fn merge_query(url: &mut Url, incoming: &str) {
    let existing: HashSet<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let additions: Vec<(String, String)> = form_urlencoded::parse(incoming.as_bytes())
        .filter(|(k, _)| !existing.contains(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if additions.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (k, v) in &additions {
        pairs.append_pair(k, v);
    }
}

fn redirect_status(code: u16) -> StatusCode {
    match code {
        301 => StatusCode::MOVED_PERMANENTLY,
        302 => StatusCode::FOUND,
        307 => StatusCode::TEMPORARY_REDIRECT,
        308 => StatusCode::PERMANENT_REDIRECT,
        other => {
            tracing::warn!(status_code = other, "Unsupported redirect status, using 302");
            StatusCode::FOUND
        }
    }
}
