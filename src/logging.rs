use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the CLI subscriber. Log lines go to stderr so stdout only
/// carries the CSV report. `RUST_LOG` overrides the default filter.
pub fn init_logger(verbose: bool) {
    let default_directives = if verbose {
        "shipdisc=debug,info"
    } else {
        "shipdisc=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
