use hanzi_config::{AnyOrList, CorsConfig};
use http::{Method, header::HeaderName};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
///
/// Entries that fail to parse are skipped with a warning.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new();

    let layer = match config.origins {
        AnyOrList::Any => layer.allow_origin(AllowOrigin::any()),
        AnyOrList::List(ref origins) => layer.allow_origin(parse_all::<http::HeaderValue>("origin", origins)),
    };

    let layer = match config.methods {
        AnyOrList::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrList::List(ref methods) => layer.allow_methods(parse_all::<Method>("method", methods)),
    };

    let layer = match config.headers {
        AnyOrList::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrList::List(ref headers) => layer.allow_headers(parse_all::<HeaderName>("header", headers)),
    };

    match config.max_age_duration() {
        Some(max_age) => layer.max_age(max_age),
        None => layer,
    }
}

fn parse_all<T: std::str::FromStr>(kind: &str, values: &[String]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!("ignoring invalid CORS {kind}: {value:?}");
            }
            parsed
        })
        .collect()
}
