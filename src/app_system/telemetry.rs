/// Installs the global tracing subscriber.
///
/// `RUST_LOG` selects the filter (default `info`), e.g.
/// `RUST_LOG=deposit_desk=debug` to see every request the clients send.
pub fn setup_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .init();
}
