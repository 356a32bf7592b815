//! Process-wide backend client.
//!
//! The first caller of [`shared`] builds the client from configuration;
//! concurrent first callers wait on the same initialization.

use crate::BackendClient;
use leadswipe_core::CoreError;
use tokio::sync::OnceCell;
use tracing::info;

static SHARED_CLIENT: OnceCell<BackendClient> = OnceCell::const_new();

pub async fn shared() -> Result<&'static BackendClient, CoreError> {
    SHARED_CLIENT
        .get_or_try_init(|| async {
            info!("Initializing shared backend client from configuration");
            BackendClient::from_env()
        })
        .await
}

/// Seeds the shared client. Fails if it was already initialized.
pub fn install(client: BackendClient) -> Result<&'static BackendClient, CoreError> {
    SHARED_CLIENT.set(client).map_err(|_| CoreError::Internal {
        message: "shared backend client is already initialized".to_string(),
    })?;
    SHARED_CLIENT.get().ok_or_else(|| CoreError::Internal {
        message: "shared backend client missing after install".to_string(),
    })
}
