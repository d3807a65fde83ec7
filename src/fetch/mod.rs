// src/fetch/mod.rs

pub mod download;

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use url::Url;

/// Where a source lives once it is readable from disk.
#[derive(Debug)]
pub enum Fetched {
    /// Downloaded copy; deleted on drop.
    Remote(NamedTempFile),
    Local(PathBuf),
}

impl Fetched {
    pub fn path(&self) -> &Path {
        match self {
            Fetched::Remote(tmp) => tmp.path(),
            Fetched::Local(path) => path,
        }
    }
}

/// What a dataset location string points at.
#[derive(Debug, PartialEq, Eq)]
pub enum Location {
    Http(Url),
    File(PathBuf),
}

impl Location {
    pub fn parse(location: &str) -> Result<Self> {
        match Url::parse(location) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Location::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(Location::File)
                    .map_err(|_| anyhow!("invalid file URL {}", location)),
                // Windows drive letters parse as a one-letter scheme.
                s if s.len() == 1 => Ok(Location::File(PathBuf::from(location))),
                other => bail!("unsupported scheme `{}` in {}", other, location),
            },
            Err(_) => Ok(Location::File(PathBuf::from(location))),
        }
    }
}

/// Make `location` readable from disk: download remote sources, use local
/// ones in place.
pub async fn fetch(client: &Client, location: &str) -> Result<Fetched> {
    match Location::parse(location)? {
        Location::Http(url) => {
            info!(url = %url, "downloading");
            Ok(Fetched::Remote(download::download_to_temp(client, &url).await?))
        }
        Location::File(path) => {
            if !path.is_file() {
                bail!("no such file: {}", path.display());
            }
            Ok(Fetched::Local(path))
        }
    }
}
