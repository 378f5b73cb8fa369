//! Artifact download and validation

use std::fs;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::environment::Arch;
use crate::install::error::InstallError;
use crate::version::semver::AppVersion;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Where to fetch a release from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub url: String,
    /// Local file name, always `Cursor-<version>-<arch>.AppImage`
    pub file_name: String,
}

impl RemoteArtifact {
    /// Build the descriptor from a URL template with `{version}` and `{arch}`
    pub fn new(url_template: &str, version: &AppVersion, arch: Arch) -> Self {
        let url = url_template
            .replace("{version}", &version.to_string())
            .replace("{arch}", arch.as_str());
        Self {
            url,
            file_name: format!("Cursor-{}-{}.AppImage", version, arch.as_str()),
        }
    }
}

/// Checks applied to a finished download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub min_bytes: u64,
    pub verify_elf: bool,
}

/// Stream `artifact` into `dest_dir`, overwriting a same-named file, and validate it.
///
/// On any failure the partial or invalid file is removed.
pub async fn download_artifact(
    client: &reqwest::Client,
    artifact: &RemoteArtifact,
    dest_dir: &Path,
    validation: Validation,
) -> Result<PathBuf, InstallError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(InstallError::io(dest_dir))?;
    let dest = dest_dir.join(&artifact.file_name);

    info!("Downloading {} to {:?}", artifact.url, dest);
    let result = match stream_to_file(client, &artifact.url, &dest).await {
        Ok(bytes) => {
            debug!("Downloaded {} bytes", bytes);
            validate_download(&dest, validation)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        warn!("Discarding {:?}: {}", dest, e);
        let _ = fs::remove_file(&dest);
    }
    result.map(|()| dest)
}

fn request_error(url: &str, error: reqwest::Error) -> InstallError {
    if error.is_timeout() {
        InstallError::TimedOut {
            url: url.to_string(),
        }
    } else {
        InstallError::Http(error)
    }
}

async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, InstallError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(InstallError::Status {
            url: url.to_string(),
            status,
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(InstallError::io(dest))?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| request_error(url, e))?;
        file.write_all(&chunk).await.map_err(InstallError::io(dest))?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await.map_err(InstallError::io(dest))?;

    Ok(downloaded)
}

/// Size, minimum-size, file-type and executable-bit checks
pub fn validate_download(path: &Path, validation: Validation) -> Result<(), InstallError> {
    let metadata = fs::metadata(path).map_err(InstallError::io(path))?;
    let size = metadata.len();

    if size == 0 {
        return Err(InstallError::EmptyDownload(path.to_path_buf()));
    }
    if size < validation.min_bytes {
        return Err(InstallError::TooSmall {
            path: path.to_path_buf(),
            size,
            min: validation.min_bytes,
        });
    }

    if validation.verify_elf {
        let mut magic = [0u8; 4];
        fs::File::open(path)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map_err(InstallError::io(path))?;
        if &magic != ELF_MAGIC {
            return Err(InstallError::NotExecutable(path.to_path_buf()));
        }
    }

    let mut permissions = metadata.permissions();
    if permissions.mode() & 0o111 == 0 {
        permissions.set_mode(0o755);
        fs::set_permissions(path, permissions).map_err(InstallError::io(path))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::download_client;
    use mockito::Server;
    use std::time::Duration;
    use tempfile::TempDir;

    fn elf_payload(len: usize) -> Vec<u8> {
        let mut payload = ELF_MAGIC.to_vec();
        payload.resize(len, 0xAB);
        payload
    }

    fn artifact(url: String) -> RemoteArtifact {
        RemoteArtifact {
            url,
            file_name: "Cursor-1.5.6-x86_64.AppImage".to_string(),
        }
    }

    const CHECKS: Validation = Validation {
        min_bytes: 1024,
        verify_elf: true,
    };

    #[test]
    fn remote_artifact_substitutes_template_placeholders() {
        let artifact = RemoteArtifact::new(
            "https://cdn.example/{arch}/Cursor-{version}-{arch}.AppImage",
            &AppVersion::new(1, 5, 6),
            Arch::Aarch64,
        );

        assert_eq!(
            artifact.url,
            "https://cdn.example/aarch64/Cursor-1.5.6-aarch64.AppImage"
        );
        assert_eq!(artifact.file_name, "Cursor-1.5.6-aarch64.AppImage");
    }

    #[tokio::test]
    async fn download_artifact_writes_executable_file() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Cursor.AppImage")
            .with_status(200)
            .with_body(elf_payload(4096))
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let path = download_artifact(
            &reqwest::Client::new(),
            &artifact(format!("{}/Cursor.AppImage", server.url())),
            dir.path(),
            CHECKS,
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(path, dir.path().join("Cursor-1.5.6-x86_64.AppImage"));
        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), 4096);
        assert_ne!(metadata.permissions().mode() & 0o111, 0);
    }

    #[tokio::test]
    async fn download_artifact_discards_file_below_minimum_size() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Cursor.AppImage")
            .with_status(200)
            .with_body(elf_payload(100))
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let result = download_artifact(
            &reqwest::Client::new(),
            &artifact(format!("{}/Cursor.AppImage", server.url())),
            dir.path(),
            CHECKS,
        )
        .await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(InstallError::TooSmall { size: 100, min: 1024, .. })
        ));
        assert!(!dir.path().join("Cursor-1.5.6-x86_64.AppImage").exists());
    }

    #[tokio::test]
    async fn download_artifact_rejects_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let result = download_artifact(
            &reqwest::Client::new(),
            &artifact(format!("{}/missing", server.url())),
            dir.path(),
            CHECKS,
        )
        .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(InstallError::Status { .. })));
        assert!(!dir.path().join("Cursor-1.5.6-x86_64.AppImage").exists());
    }

    /// Body written in `chunks` pieces of 512 bytes, `pause` apart
    async fn slow_download(
        server: &mut mockito::ServerGuard,
        chunks: usize,
        pause: Duration,
    ) -> mockito::Mock {
        server
            .mock("GET", "/slow.AppImage")
            .with_status(200)
            .with_chunked_body(move |w| {
                let payload = elf_payload(chunks * 512);
                for piece in payload.chunks(512) {
                    std::io::Write::write_all(w, piece)?;
                    std::io::Write::flush(w)?;
                    std::thread::sleep(pause);
                }
                Ok(())
            })
            .create_async()
            .await
    }

    #[tokio::test]
    async fn download_outlasting_request_timeout_completes_while_data_flows() {
        let mut server = Server::new_async().await;
        let _mock = slow_download(&mut server, 8, Duration::from_millis(200)).await;
        let dir = TempDir::new().unwrap();
        // The transfer takes ~1.6 s, longer than the connect timeout
        let client =
            download_client(Some(Duration::from_secs(1)), Some(Duration::from_secs(5))).unwrap();

        let path = download_artifact(
            &client,
            &artifact(format!("{}/slow.AppImage", server.url())),
            dir.path(),
            Validation {
                min_bytes: 1024,
                verify_elf: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 8 * 512);
    }

    #[tokio::test]
    async fn stalled_download_reports_timeout() {
        let mut server = Server::new_async().await;
        let _mock = slow_download(&mut server, 2, Duration::from_secs(1)).await;
        let dir = TempDir::new().unwrap();
        let client = download_client(None, Some(Duration::from_millis(300))).unwrap();

        let result = download_artifact(
            &client,
            &artifact(format!("{}/slow.AppImage", server.url())),
            dir.path(),
            CHECKS,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, InstallError::TimedOut { .. }));
        assert!(err.to_string().contains("timed out"));
        assert!(!dir.path().join("Cursor-1.5.6-x86_64.AppImage").exists());
    }

    #[test]
    fn validate_download_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.AppImage");
        fs::write(&path, b"").unwrap();

        assert!(matches!(
            validate_download(&path, CHECKS),
            Err(InstallError::EmptyDownload(_))
        ));
    }

    #[test]
    fn validate_download_sniffs_elf_magic_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, vec![b'<'; 2048]).unwrap();

        assert!(matches!(
            validate_download(&path, CHECKS),
            Err(InstallError::NotExecutable(_))
        ));
        assert!(
            validate_download(
                &path,
                Validation {
                    verify_elf: false,
                    ..CHECKS
                }
            )
            .is_ok()
        );
    }
}
