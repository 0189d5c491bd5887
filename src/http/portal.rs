//! Provides [`Portal`], the Factorio mod portal API client built on top of the composed
//! [`HttpClient`](super::HttpClient) stack (§6's external interface to `mods.factorio.com`).
//!
//! Every request goes through whatever `HttpClient` the caller hands in, so the cache and retry
//! decorators apply uniformly here without this module knowing they exist.

use super::{HttpClient, Method, Request};
use crate::cache::CacheStore;
use crate::error::{Error, StoreError, TransportError};
use crate::mods::Release;
use crate::progress::{CountingWriter, NullProgress, ProgressSink};
use crate::util::checksum;
use log::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempfile;
use tokio::fs;
use tokio::io::{self, AsyncReadExt, AsyncSeekExt};

/// The response shape common to every `/api/v2/mods/...` write-handshake endpoint: a one-time
/// URL the caller then posts the actual payload to.
#[derive(Debug, Deserialize)]
struct UploadHandshake {
    upload_url: String,
}

/// The mod portal's site root.
const SITE_ROOT: &str = "https://mods.factorio.com";
/// The mod portal's download root.
const DOWNLOAD_ROOT: &str = "/download/";
/// The mod portal's API root.
const API_ROOT: &str = "/api/mods";
/// The mod portal's v2 write-operation API root.
const API_V2_ROOT: &str = "/api/v2/mods";
/// The endpoint for requesting full mod information, including every release.
const FULL_ENDPOINT: &str = "full";
/// The multipart boundary used for upload requests. Fixed rather than random since there is only
/// ever one part named `file` plus one optional `changelog` field, neither of which can contain
/// this exact byte sequence in practice, and a fixed boundary keeps requests reproducible in
/// tests.
const MULTIPART_BOUNDARY: &str = "----factorix-boundary-7d9f3b";

/// A username/token pair appended as query parameters to every portal request (§4.B credential
/// masking covers both in logs).
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The portal account username.
    pub username: String,
    /// The portal API token.
    pub token: String,
}

/// A single mod's full information from the mod portal.
#[derive(Debug, Deserialize)]
pub struct PortalResult {
    name: Option<String>,
    owner: Option<String>,
    releases: Option<Vec<Release>>,
    summary: Option<String>,
    title: Option<String>,
    changelog: Option<String>,
    description: Option<String>,
    homepage: Option<String>,
}

impl PortalResult {
    /// The mod's internal name, or an empty string if the portal omitted it.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The mod's display title, or an empty string if the portal omitted it.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// The mod's published releases, newest and oldest alike, in whatever order the portal
    /// returned them.
    pub fn releases(&self) -> &[Release] {
        self.releases.as_deref().unwrap_or_default()
    }

    /// The portal account name of the mod's owner.
    pub fn owner(&self) -> &str {
        self.owner.as_deref().unwrap_or_default()
    }

    /// The mod's one-line summary, if the portal provided one.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// The mod's changelog text, if the portal provided one.
    pub fn changelog(&self) -> Option<&str> {
        self.changelog.as_deref()
    }

    /// The mod's long-form description, if the portal provided one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The mod author's homepage, if the portal provided one.
    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }
}

/// A page of results from querying multiple mods at once.
#[derive(Debug, Deserialize)]
struct ModListPage {
    pagination: Option<Pagination>,
    results: Vec<PortalResult>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    page: i32,
    page_count: i32,
}

/// The mod portal API client.
pub struct Portal {
    client: Arc<dyn HttpClient>,
    credentials: Credentials,
    /// The bearer token used for publish/upload/edit requests (§6). `None` unless a write
    /// operation is attempted, at which point its absence is reported as a configuration error
    /// rather than an authentication failure the portal itself would have to reject.
    api_key: Option<String>,
}

impl Portal {
    /// Builds a new portal client sending every request through `client`.
    pub fn new(client: Arc<dyn HttpClient>, credentials: Credentials, api_key: Option<String>) -> Self {
        Portal {
            client,
            credentials,
            api_key,
        }
    }

    fn bearer_header(&self) -> Result<String, Error> {
        self.api_key
            .as_deref()
            .map(|key| format!("Bearer {}", key))
            .ok_or_else(|| Error::Configuration("FACTORIO_API_KEY is required for portal write operations".to_string()))
    }

    fn authenticated(&self, url: url::Url) -> String {
        let mut url = url;
        url.query_pairs_mut()
            .append_pair("username", &self.credentials.username)
            .append_pair("token", &self.credentials.token);
        url.to_string()
    }

    /// Fetches full information, including every release, for a single mod.
    pub async fn fetch_mod(&self, name: &str) -> Result<PortalResult, TransportError> {
        let url = url::Url::parse(SITE_ROOT)
            .unwrap()
            .join(&format!("{}/", API_ROOT))
            .unwrap()
            .join(&format!("{}/", name))
            .unwrap()
            .join(FULL_ENDPOINT)
            .unwrap();

        debug!("Fetching mod info for '{}'", name);
        let response = self.client.execute(Request::get(self.authenticated(url))).await?;
        response
            .json()
            .map_err(|_| TransportError::Http { status: response.code })
    }

    /// Fetches full information for multiple mods at once, following pagination until every
    /// requested mod has been returned.
    pub async fn fetch_multiple_mods(&self, names: &[&str]) -> Result<Vec<PortalResult>, TransportError> {
        let mut mods = Vec::new();
        let mut page = 1;

        loop {
            let mut url = url::Url::parse(SITE_ROOT).unwrap().join(API_ROOT).unwrap();
            url.query_pairs_mut()
                .append_pair("full", "True")
                .append_pair("page_size", "max")
                .append_pair("namelist", &names.join(","))
                .append_pair("page", &page.to_string());

            debug!("Fetching mod list page {} for {} mods", page, names.len());
            let response = self.client.execute(Request::get(self.authenticated(url))).await?;
            let mut list: ModListPage = response
                .json()
                .map_err(|_| TransportError::Http { status: response.code })?;

            mods.append(&mut list.results);

            let done = mods.len() >= names.len()
                || list
                    .pagination
                    .as_ref()
                    .map(|p| p.page >= p.page_count)
                    .unwrap_or(true);
            if done {
                break;
            }

            page += 1;
        }

        Ok(mods)
    }

    /// Downloads a release's zip archive to a temp file, then copies it into `directory` under
    /// its published file name. Returns the final path and the number of bytes written. Reports
    /// no progress; see [`download_release_with_progress`](Self::download_release_with_progress)
    /// to drive a [`ProgressSink`] off the download.
    pub async fn download_release<P>(
        &self,
        name: &str,
        release: &Release,
        directory: P,
        cache: Option<&CacheStore>,
    ) -> Result<(PathBuf, usize), TransportError>
    where
        P: AsRef<Path>,
    {
        self.download_release_with_progress(name, release, directory, &NullProgress, cache)
            .await
    }

    /// Downloads a release's zip archive to a temp file, then copies it into `directory` under
    /// its published file name, reporting bytes written to `progress` as they arrive (§9).
    /// Returns the final path and the number of bytes written.
    ///
    /// When `cache` is given, it's consulted first, keyed by the release's SHA1 (§4.A's
    /// content-addressed `download` store: the archive's own checksum is already a stable,
    /// collision-resistant identifier, so there's no need to hash the body separately). A hit
    /// copies straight out of the cache without touching the network; a miss downloads and
    /// verifies as usual, then populates the cache for next time. A cache write failure is
    /// logged and otherwise ignored, since the download itself already succeeded.
    pub async fn download_release_with_progress<P>(
        &self,
        name: &str,
        release: &Release,
        directory: P,
        progress: &dyn ProgressSink,
        cache: Option<&CacheStore>,
    ) -> Result<(PathBuf, usize), TransportError>
    where
        P: AsRef<Path>,
    {
        let dest_path = directory.as_ref().join(&release.file_name);
        let cache_key = CacheStore::key_for(&release.sha1);

        if let Some(cache) = cache {
            if cache.write_to(&cache_key, &dest_path)? {
                let size = std::fs::metadata(&dest_path)
                    .map_err(|_| TransportError::Network {
                        host: dest_path.display().to_string(),
                    })?
                    .len();
                debug!("'{}' release {} served from the download cache", name, release.version);
                progress.start(size);
                progress.advance(size);
                progress.finish();
                return Ok((dest_path, size as usize));
            }
        }

        let url = url::Url::parse(SITE_ROOT)
            .unwrap()
            .join(DOWNLOAD_ROOT)
            .unwrap()
            .join(&format!("{}/", name))
            .unwrap()
            .join(&release.download_url)
            .unwrap();
        debug!("Downloading '{}' release {} from {}", name, release.version, url);

        let request = Request::get(self.authenticated(url));
        let mut temp = fs::File::from_std(tempfile().map_err(|_| TransportError::Network {
            host: "local filesystem".to_string(),
        })?);

        progress.start(0);
        {
            let mut counting = CountingWriter::new(&mut temp, progress);
            self.client.download_to_writer(request, &mut counting).await?;
        }
        progress.finish();

        let mut dest = fs::File::create(&dest_path)
            .await
            .map_err(|_| TransportError::Network {
                host: dest_path.display().to_string(),
            })?;
        temp.seek(std::io::SeekFrom::Start(0))
            .await
            .map_err(|_| TransportError::Network { host: "tempfile".to_string() })?;
        let written = io::copy(&mut temp, &mut dest)
            .await
            .map_err(|_| TransportError::Network { host: "tempfile".to_string() })?;
        dest.sync_all().await.map_err(|_| TransportError::Network {
            host: dest_path.display().to_string(),
        })?;
        drop(dest);

        let actual = checksum::sha1_file(&dest_path).map_err(|_| TransportError::Network {
            host: dest_path.display().to_string(),
        })?;
        if !actual.eq_ignore_ascii_case(&release.sha1) {
            let _ = std::fs::remove_file(&dest_path);
            return Err(StoreError::Sha1Mismatch {
                expected: release.sha1.clone(),
                actual,
            }
            .into());
        }

        if let Some(cache) = cache {
            if let Err(e) = cache.store(&cache_key, &dest_path) {
                warn!("failed to populate download cache for '{}' {}: {}", name, release.version, e);
            }
        }

        Ok((dest_path, written as usize))
    }

    /// Requests a one-time upload URL for publishing a brand new mod, per the portal's v2
    /// publish handshake. Requires `FACTORIO_API_KEY` to be configured.
    pub async fn request_publish_url(&self) -> Result<String, Error> {
        self.request_handshake_url(&format!("{}/publish", API_V2_ROOT)).await
    }

    /// Requests a one-time upload URL for publishing a new release of an existing mod.
    pub async fn request_upload_url(&self, name: &str) -> Result<String, Error> {
        self.request_handshake_url(&format!("{}/{}/upload", API_V2_ROOT, name)).await
    }

    /// Requests a one-time upload URL for editing an existing mod's metadata (description,
    /// title, tags, …). The portal's edit and upload handshakes share the same
    /// `{upload_url}` response shape and bearer-auth pattern.
    pub async fn request_edit_url(&self, name: &str) -> Result<String, Error> {
        self.request_handshake_url(&format!("{}/{}/edit", API_V2_ROOT, name)).await
    }

    async fn request_handshake_url(&self, path: &str) -> Result<String, Error> {
        let url = url::Url::parse(SITE_ROOT).unwrap().join(path).unwrap();
        let request = Request::get(url.to_string()).with_header("Authorization", self.bearer_header()?);

        let response = self.client.execute(request).await.map_err(Error::from)?;
        if !response.is_success() {
            return Err(Error::Transport(TransportError::Http { status: response.code }));
        }

        let handshake: UploadHandshake = response
            .json()
            .map_err(|_| Error::Transport(TransportError::Http { status: response.code }))?;
        Ok(handshake.upload_url)
    }

    /// Uploads a mod archive's bytes (plus an optional changelog) to a one-time `upload_url`
    /// previously obtained from [`request_publish_url`](Self::request_publish_url) or
    /// [`request_upload_url`](Self::request_upload_url), as a `multipart/form-data` body with a
    /// `file` part and, when present, a `changelog` part.
    pub async fn upload_release(&self, upload_url: &str, file_path: &Path, changelog: Option<&str>) -> Result<(), Error> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidArgument(format!("'{}' has no file name", file_path.display())))?;
        let bytes = std::fs::read(file_path)?;

        let body = build_multipart_body(file_name, &bytes, changelog);
        let request = Request::new(Method::Post, upload_url)
            .with_header("Authorization", self.bearer_header()?)
            .with_header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .with_body(body);

        let response = self.client.execute(request).await.map_err(Error::from)?;
        if !response.is_success() {
            return Err(Error::Transport(TransportError::Http { status: response.code }));
        }
        Ok(())
    }
}

/// Assembles a `multipart/form-data` body with a `file` part named by `file_name` and, when
/// `changelog` is present, a plain-text `changelog` part, using the client's fixed boundary.
fn build_multipart_body(file_name: &str, file_bytes: &[u8], changelog: Option<&str>) -> Vec<u8> {
    let mut body = Vec::with_capacity(file_bytes.len() + 512);

    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(b"\r\n");

    if let Some(changelog) = changelog {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"changelog\"\r\n\r\n");
        body.extend_from_slice(changelog.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_result_defaults_gracefully_on_missing_fields() {
        let result: PortalResult = serde_json::from_str(r#"{"name": "bob"}"#).unwrap();
        assert_eq!(result.name(), "bob");
        assert_eq!(result.title(), "");
        assert!(result.releases().is_empty());
        assert_eq!(result.owner(), "");
        assert!(result.homepage().is_none());
    }

    #[test]
    fn multipart_body_carries_file_and_changelog_parts() {
        let body = build_multipart_body("mod.zip", b"PK\x03\x04fakezip", Some("fixed a crash"));
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", MULTIPART_BOUNDARY)));
        assert!(text.contains("name=\"file\"; filename=\"mod.zip\""));
        assert!(text.contains("name=\"changelog\""));
        assert!(text.contains("fixed a crash"));
        assert!(text.trim_end().ends_with(&format!("--{}--", MULTIPART_BOUNDARY)));
    }

    #[test]
    fn multipart_body_omits_changelog_part_when_absent() {
        let body = build_multipart_body("mod.zip", b"PK\x03\x04fakezip", None);
        let text = String::from_utf8_lossy(&body);
        assert!(!text.contains("name=\"changelog\""));
    }
}
