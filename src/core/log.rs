use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const APP_TARGET: &str = "coinfolio";

/// Level for the crate's own events. Quiet runs still surface refresh
/// failures, which are logged at `warn`/`error`.
fn app_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Installs the global subscriber. Output goes to stderr so tables on
/// stdout stay clean; `RUST_LOG` narrows dependency noise further.
pub fn init_logging(verbose: bool) {
    let level = app_level(verbose);
    // Dependencies (reqwest, hyper, fjall) stay at warn unless RUST_LOG asks otherwise
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if let Ok(directive) = format!("{APP_TARGET}={level}").parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(Targets::new().with_default(LevelFilter::TRACE).with_target(APP_TARGET, level))
        .with(env_filter)
        .init();
}
