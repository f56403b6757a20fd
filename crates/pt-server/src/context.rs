//! Shared application context.
//!
//! [`AppContext`] is cloned into every route handler via Axum state. All
//! fields are cheap to clone.

use std::sync::Arc;

use pt_core::config::Config;
use pt_db::pool::DbPool;
use pt_image::ImageNormalizer;

use crate::storage::{LocalStorage, MediaStorage};

#[derive(Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub storage: Arc<dyn MediaStorage>,
    pub normalizer: ImageNormalizer,
}

impl AppContext {
    /// Build a context that stores pictures under `config.media.root`.
    pub fn new(db: DbPool, config: Config) -> Self {
        let storage = Arc::new(LocalStorage::new(&config.media.root));
        Self::with_storage(db, config, storage)
    }

    /// Build a context over an explicit storage backend.
    pub fn with_storage(db: DbPool, config: Config, storage: Arc<dyn MediaStorage>) -> Self {
        let normalizer = ImageNormalizer::new(config.media.picture_size);
        Self {
            db,
            config: Arc::new(config),
            storage,
            normalizer,
        }
    }
}
