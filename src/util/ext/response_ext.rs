//! Provides the [`ResponseExt`](ResponseExt) trait, adding convenience functions to
//! `reqwest::Response`.

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Collection of common functions used with `reqwest::Response` objects.
#[async_trait]
pub trait ResponseExt {
    /// Streams the response body to a given async writer, returning the number of bytes written.
    async fn to_writer<W>(&mut self, dest: &mut W) -> anyhow::Result<usize>
    where
        W: AsyncWrite + Unpin + Send;

    /// Returns the final path segment of the response's URL, i.e. the file name a download would
    /// naturally be saved under.
    fn url_file_name(&self) -> anyhow::Result<&str>;
}

#[async_trait]
impl ResponseExt for reqwest::Response {
    async fn to_writer<W>(&mut self, dest: &mut W) -> anyhow::Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut written = 0;
        while let Some(chunk) = self.chunk().await? {
            written += chunk.len();
            dest.write_all(&chunk).await?;
        }

        Ok(written)
    }

    fn url_file_name(&self) -> anyhow::Result<&str> {
        self.url()
            .path_segments()
            .and_then(|segments| segments.last())
            .and_then(|name| if name.is_empty() { None } else { Some(name) })
            .ok_or_else(|| {
                anyhow!(
                    "Response URL doesn't have a file name component ({})",
                    self.url().as_str()
                )
            })
    }
}
