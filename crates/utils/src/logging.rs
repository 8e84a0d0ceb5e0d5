use tracing_subscriber::{EnvFilter, prelude::*};

const WORKSPACE_CRATES: &[&str] = &[
    "server",
    "services",
    "deployment",
    "local_deployment",
    "db",
    "utils",
];

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{krate}={default_level}"))
            .chain(["tower_http=info".to_string(), "warn".to_string()])
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(directives)
    });

    // A second init (tests, bins sharing code) is harmless.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(filter)
        .try_init();
}
