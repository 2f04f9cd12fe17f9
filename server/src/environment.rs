use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::urls::Urls;

/// Everything a request handler needs, cloned into every route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub urls: Arc<Urls>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        urls: Arc<Urls>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            urls,
            config,
        }
    }
}

/// Fixed configuration supplied at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// The admin credential pair. Configuration, not a student row.
    pub(crate) admin_email: String,
    pub(crate) admin_password: String,
}

impl Config {
    pub fn new(admin_email: String, admin_password: String) -> Self {
        Self {
            admin_email,
            admin_password,
        }
    }
}
