use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "fractal=info,warn";

/// Install the stderr subscriber. `RUST_LOG` wins over the default filter.
pub fn init_logging() {
    init_logging_with(DEFAULT_DIRECTIVE)
}

/// Same as [`init_logging`] with a caller-chosen fallback directive (e.g. `fractal=debug`).
pub fn init_logging_with(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // A second call (tests, embedding apps) keeps the first subscriber.
    let _ = if json_requested() {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

fn json_requested() -> bool {
    std::env::var("FRACTAL_LOG_JSON")
        .map(|value| value == "1")
        .unwrap_or(false)
}
