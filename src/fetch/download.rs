use anyhow::{Context, Result};
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;
use url::Url;

/// Stream `url` into a temporary file named after the last path segment.
/// The file is removed when the returned handle is dropped.
pub async fn download_to_temp(client: &Client, url: &Url) -> Result<NamedTempFile> {
    let filename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download");

    let tmp = tempfile::Builder::new()
        .prefix("taxi-ingest-")
        .suffix(&format!("-{}", filename))
        .tempfile()
        .context("creating temporary download file")?;

    let mut resp = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("GET {}", url))?;

    let mut out = File::from_std(tmp.reopen()?);
    let mut written: u64 = 0;
    while let Some(chunk) = resp
        .chunk()
        .await
        .with_context(|| format!("reading body from {}", url))?
    {
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;

    debug!(url = %url, bytes = written, path = %tmp.path().display(), "downloaded");
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn body_lands_in_a_temp_file_named_after_the_url() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/misc/taxi_zone_lookup.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("LocationID,Borough\n1,EWR\n"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/misc/taxi_zone_lookup.csv", server.uri()))?;
        let tmp = download_to_temp(&Client::new(), &url).await?;

        let name = tmp.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("taxi-ingest-"), "{}", name);
        assert!(name.ends_with("-taxi_zone_lookup.csv"), "{}", name);
        assert_eq!(std::fs::read_to_string(tmp.path())?, "LocationID,Borough\n1,EWR\n");
        Ok(())
    }

    #[tokio::test]
    async fn http_error_status_fails_the_download() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/trip-data/missing.parquet", server.uri()))?;
        let err = download_to_temp(&Client::new(), &url).await.unwrap_err();
        assert!(format!("{:#}", err).contains("404"), "{:#}", err);
        Ok(())
    }
}
