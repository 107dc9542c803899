//! Matrix client creation: password login on first start, session restore
//! afterwards.

use anyhow::Context;
use log::{debug, info};
use matrix_sdk::{Client, ruma::OwnedUserId};

use crate::matrix::{UserCredentials, session::MatrixSession};

/// Display name of the bot device.
const DEVICE_NAME: &str = "tazdingo bot";

async fn build_client(user_id: &OwnedUserId, matrix_session: &MatrixSession) -> anyhow::Result<Client> {
    let client = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(matrix_session.sqlite_path(), None)
        .build()
        .await?;

    debug!("matrix client created");
    Ok(client)
}

/// Logs in with the password and persists the new session.
async fn create_session(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> anyhow::Result<Client> {
    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = build_client(&user_id, matrix_session).await?;

    client
        .matrix_auth()
        .login_username(&user_id, &user_credentials.password)
        .initial_device_display_name(DEVICE_NAME)
        .send()
        .await?;

    let user_session = client
        .matrix_auth()
        .session()
        .context("no session after login")?;
    matrix_session
        .persist_user_session(&user_session)
        .await
        .context("error persisting user session")?;

    info!("logged in as {}", user_id);
    Ok(client)
}

/// Restores the persisted session without logging in again.
async fn restore_session(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> anyhow::Result<Client> {
    info!("restoring matrix session from disk");

    let user_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let user_session = matrix_session
        .user_session()
        .context("no persisted session")?
        .clone();
    let client = build_client(&user_id, matrix_session).await?;

    client.restore_session(user_session).await?;

    info!("matrix session restored successfully");
    Ok(client)
}

/// Returns an authenticated client, restoring the persisted session when
/// there is one.
pub async fn setup_client(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> anyhow::Result<Client> {
    info!("setting up matrix client for user {}", user_credentials.user_id);

    if matrix_session.has_session() {
        restore_session(user_credentials, matrix_session).await
    } else {
        create_session(user_credentials, matrix_session).await
    }
}
