use std::sync::Arc;

use log::Logger;

use crate::db::Db;

/// The shared state every handler receives.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { logger, db }
    }
}
