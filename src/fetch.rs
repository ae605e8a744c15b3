use reqwest::Client;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Server returned error status {status} for {url}: {body}")]
    ServerError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where a payload (sysroot archive or source text) comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    Path(String),
}

impl Location {
    /// `http://` and `https://` are URLs, anything else is a local path
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Url(raw.to_string())
        } else {
            Location::Path(raw.to_string())
        }
    }

    /// Resolve a relative location against a base URL or directory
    pub fn resolve(base: &str, relative: &str) -> Self {
        match Location::parse(relative) {
            Location::Url(url) => Location::Url(url),
            Location::Path(path) if Path::new(&path).is_absolute() || base.is_empty() => {
                Location::Path(path)
            }
            Location::Path(path) => match Location::parse(base) {
                Location::Url(base) => {
                    Location::Url(format!("{}/{}", base.trim_end_matches('/'), path))
                }
                Location::Path(base) => {
                    Location::Path(Path::new(&base).join(path).to_string_lossy().into_owned())
                }
            },
        }
    }
}

/// Download (or read) a payload as one opaque buffer. No retries.
pub async fn fetch_bytes(client: &Client, location: &Location) -> Result<Vec<u8>, FetchError> {
    match location {
        Location::Path(path) => tokio::fs::read(path).await.map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        }),
        Location::Url(url) => {
            let response = client.get(url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(FetchError::ServerError {
                    url: url.clone(),
                    status: status.as_u16(),
                    body,
                });
            }

            Ok(response.bytes().await?.to_vec())
        }
    }
}
