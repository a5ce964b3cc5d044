//! Named shortcuts that rewrite the query string before the list handler runs.

use axum::{extract::Request, http::Uri, middleware::Next, response::Response};

const TOP_FIVE_CHEAP: &str =
    "limit=5&sort=price,-ratingsAverage&fields=name,price,ratingsAverage,summary,difficulty,maxGroupSize";

/// Keeps caller filters but fixes `limit`, `sort` and `fields`.
pub fn rewrite_query(existing: Option<&str>, alias: &str) -> String {
    let alias_keys: Vec<&str> = alias
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .collect();

    existing
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !alias_keys.contains(&pair.split('=').next().unwrap_or("")))
        .chain(std::iter::once(alias))
        .collect::<Vec<_>>()
        .join("&")
}

/// `GET /api/v1/tours/top-5-cheap`
pub async fn top_five_cheap(mut req: Request, next: Next) -> Response {
    let query = rewrite_query(req.uri().query(), TOP_FIVE_CHEAP);
    let rewritten = format!("{}?{}", req.uri().path(), query);
    match rewritten.parse::<Uri>() {
        Ok(uri) => *req.uri_mut() = uri,
        Err(e) => tracing::warn!("Could not rewrite alias query {}: {}", rewritten, e),
    }
    next.run(req).await
}
