//! Logger setup

use log::LevelFilter;

/// Log level for a verbosity count; `quiet` wins over any count
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install `env_logger` as the global logger
///
/// Returns `false` if a logger was already installed, in which case the
/// existing one stays in place.
pub fn init(verbose: u8, quiet: bool) -> bool {
    env_logger::Builder::new()
        .filter_level(level_for(verbose, quiet))
        .format_timestamp(None)
        .try_init()
        .is_ok()
}
