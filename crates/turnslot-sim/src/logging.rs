//! Tracing setup for the simulator binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter from `RUST_LOG`, or from `TURNSLOT_LOG` as a single level.
pub fn env_filter() -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter_directives(
        std::env::var("TURNSLOT_LOG").ok().as_deref(),
    ))
}

fn filter_directives(level: Option<&str>) -> String {
    let level = match level {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    };
    format!("turnslot={level},turnslot_sim={level}")
}

/// Install a stderr subscriber; `LOG_FORMAT=json` selects JSON lines.
pub fn init_tracing() {
    let filter = env_filter();
    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        assert_eq!(filter_directives(None), "turnslot=info,turnslot_sim=info");
        assert_eq!(
            filter_directives(Some("verbose")),
            "turnslot=info,turnslot_sim=info"
        );
    }

    #[test]
    fn accepts_warning_alias() {
        assert_eq!(
            filter_directives(Some("warning")),
            "turnslot=warn,turnslot_sim=warn"
        );
    }
}
