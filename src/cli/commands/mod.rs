//! CLI command implementations

pub mod cache;
pub mod config;
pub mod resolve;
pub mod serve;

pub use cache::execute as cache;
pub use config::execute as config;
pub use resolve::execute as resolve;
pub use serve::execute as serve;

use crate::cache::{ResultCache, SystemClock};
use crate::config::{Config, ConfigManager};
use crate::error::GenrepoResult;
use std::sync::Arc;

/// Open the result store named by the config, or the default one
pub(crate) async fn open_result_cache(config: &Config) -> GenrepoResult<Arc<ResultCache>> {
    let path = config
        .cache
        .path
        .clone()
        .unwrap_or_else(ConfigManager::result_store_path);
    let cache = ResultCache::open(path, Arc::new(SystemClock)).await?;
    Ok(Arc::new(cache))
}
