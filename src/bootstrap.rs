//! Signing key bootstrap: fetch the project's public keys and import them
//! into the local gpg keyring so the release check script can verify
//! signatures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::KeyImportError;
use crate::pipeline::invoker::{Invocation, run_command};

/// File name the downloaded keys are written to inside the temp dir.
const KEYS_FILE: &str = "sling.asc";

/// gpg binary used for the import.
const GPG: &str = "gpg";

/// Download `keys_url` into the temp dir and `gpg --import` it.
pub async fn import_keys(
    client: &reqwest::Client,
    keys_url: &str,
    timeout: Duration,
) -> Result<Invocation, KeyImportError> {
    let path = std::env::temp_dir().join(KEYS_FILE);
    download(client, keys_url, &path).await?;

    let invocation = run_command(
        GPG,
        &["--import".to_string(), path.to_string_lossy().to_string()],
        timeout,
    )
    .await;
    debug!(output = %invocation.output, "gpg import finished");
    info!(keys_url, completed = invocation.completed, "Imported signing keys");
    Ok(invocation)
}

async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<PathBuf, KeyImportError> {
    let download_err = |e: reqwest::Error| KeyImportError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let bytes = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(download_err)?
        .bytes()
        .await
        .map_err(download_err)?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|source| KeyImportError::Write {
            path: dest.to_path_buf(),
            source,
        })?;
    debug!(url, path = %dest.display(), bytes = bytes.len(), "Downloaded signing keys");
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn download_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/keys/group/sling.asc")
            .with_status(200)
            .with_body("-----BEGIN PGP PUBLIC KEY BLOCK-----")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("keys.asc");
        let client = reqwest::Client::new();
        download(&client, &format!("{}/keys/group/sling.asc", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "-----BEGIN PGP PUBLIC KEY BLOCK-----"
        );
    }

    #[tokio::test]
    async fn download_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/keys/group/sling.asc")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let err = download(
            &client,
            &format!("{}/keys/group/sling.asc", server.url()),
            &dir.path().join("keys.asc"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, KeyImportError::Download { .. }));
    }
}
