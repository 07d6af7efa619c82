//! Logging setup shared by the folio binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber for a server binary.
///
/// `RUST_LOG` wins over `default_filter` when set. With `log_json` every
/// event is written as one JSON object per line, for log shippers.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let output = if log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .init();
}

/// Filter enabling `level` for one crate and the HTTP trace layer,
/// e.g. `folio_api=info,tower_http=info`.
pub fn crate_filter(crate_name: &str, level: &str) -> String {
    format!("{crate_name}={level},tower_http={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_filter_includes_http_layer() {
        assert_eq!(
            crate_filter("folio_api", "debug"),
            "folio_api=debug,tower_http=debug"
        );
    }

    #[test]
    fn crate_filter_parses() {
        assert!(EnvFilter::try_new(crate_filter("folio_controller", "warn")).is_ok());
    }
}
