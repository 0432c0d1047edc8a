use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Falls back to built-in defaults when [`init_config`] was never called.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration
///
/// Loads `path` (or `config.toml` in the current directory) with environment
/// overrides applied. Calling it again replaces the active configuration.
pub fn init_config(path: Option<&str>) -> Result<Arc<StaticConfig>> {
    let config = Arc::new(StaticConfig::load_from(path)?);

    // 首次初始化与并发初始化都走 store，后写入者生效
    CONFIG
        .get_or_init(|| ArcSwap::new(Arc::clone(&config)))
        .store(Arc::clone(&config));

    Ok(config)
}
