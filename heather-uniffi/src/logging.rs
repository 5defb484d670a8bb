use env_logger::{Builder, Target};
use log::{LevelFilter, debug};

/// Installs the logger on first use. Later calls can only move the global
/// max level, since the filter is fixed once installed.
fn init_logger(level: LevelFilter) {
    let installed = Builder::new()
        .target(Target::Stdout)
        .format_timestamp_millis()
        .format_module_path(false)
        .filter_module("heather", level)
        .filter_module("heather_uniffi", level)
        .try_init()
        .is_ok();
    log::set_max_level(level);
    if !installed {
        debug!("Logger already installed, max level now {}", level);
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[uniffi::export]
pub fn set_debug_log_level() {
    init_logger(LevelFilter::Trace);
}

#[uniffi::export]
pub fn set_log_level(level: &str) -> bool {
    match parse_level(level) {
        Some(lvl) => {
            init_logger(lvl);
            true
        }
        None => false,
    }
}
