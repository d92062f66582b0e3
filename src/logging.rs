//! Logger setup for the CLI.

use log::LevelFilter;

/// Level for the `berryscan` target given the number of `-v` flags.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize logging once.
///
/// `RUST_LOG` takes precedence when set. Otherwise other crates log at
/// `warn` and `berryscan` at the level chosen by `verbosity`. Output goes to
/// stderr so stdout can carry JSON.
pub fn init_logging(verbosity: u8) {
    let level = level_for_verbosity(verbosity);
    let default_filter = format!("warn,berryscan={}", level.as_str().to_ascii_lowercase());
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    builder.target(env_logger::Target::Stderr);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
}
