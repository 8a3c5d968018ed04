//! Store connection.
//!
//! The endpoint scheme selects the engine. `ws://`, `wss://`, `http://`
//! and `https://` reach a SurrealDB server and sign in as root; `mem://`
//! runs an embedded in-process store that lives as long as the handle.

use std::fmt;

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;

/// Where the credential and session stores live.
#[derive(Clone)]
pub struct DbConfig {
    /// Endpoint URL, e.g. `ws://127.0.0.1:8000` or `mem://`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Ignored by embedded engines; a remote endpoint
    /// without them connects unauthenticated.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DbConfig {
    /// An embedded in-memory store, for local runs and tests.
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".into(),
            username: None,
            password: None,
            ..Self::default()
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.url.starts_with("mem:") || self.url == "memory"
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "auth".into(),
            username: Some("root".into()),
            password: Some("root".into()),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An open store handle. Repositories take clones of [`DbManager::client`].
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let embedded = config.is_embedded();
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            embedded,
            "Opening session store"
        );

        let db = any::connect(config.url.as_str()).await?;

        if !embedded {
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                db.signin(Root {
                    username: username.clone(),
                    password: password.clone(),
                })
                .await?;
            }
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}
