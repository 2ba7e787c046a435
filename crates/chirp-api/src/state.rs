use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::error;

use chirp_db::Database;

use crate::error::AppError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    /// Account that is granted administrator privilege when it registers.
    pub admin_username: Option<String>,
    /// Delivery channel poll interval.
    pub poll_interval: Duration,
}

/// Run a blocking store call off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::StoreUnavailable(anyhow!("blocking task failed: {}", e))
        })?
        .map_err(AppError::StoreUnavailable)
}
