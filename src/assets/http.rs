//! Shared HTTP helpers with retry.

use anyhow::Result;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{HTTP_MAX_ATTEMPTS, http_request_timeout};
use crate::core::DiversityError;
use crate::utils::paths::absolutize_url;

/// Build the HTTP client used for registry and asset requests.
pub fn build_client() -> Client {
    Client::builder().timeout(http_request_timeout()).build().unwrap_or_else(|e| {
        debug!("Falling back to default HTTP client: {}", e);
        Client::new()
    })
}

/// GET `url` and return its body.
///
/// `404` yields `Ok(None)`. Connection errors and `5xx` responses are retried with
/// exponential backoff; other failures are returned as
/// [`DiversityError::NetworkError`].
pub async fn fetch_text(client: &Client, url: &str) -> Result<Option<String>> {
    let url = absolutize_url(url);
    let Some(response) = get_with_retry(client, &url).await? else {
        return Ok(None);
    };
    let body = response.text().await.map_err(|e| DiversityError::NetworkError {
        url: url.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(body))
}

/// Like [`fetch_text`], for binary assets.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
    let url = absolutize_url(url);
    let Some(response) = get_with_retry(client, &url).await? else {
        return Ok(None);
    };
    let body = response.bytes().await.map_err(|e| DiversityError::NetworkError {
        url: url.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(body.to_vec()))
}

async fn get_with_retry(client: &Client, url: &str) -> Result<Option<Response>> {
    let retry_strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_millis(500))
        .factor(2)
        .take(HTTP_MAX_ATTEMPTS.saturating_sub(1));

    let outcome = Retry::spawn(retry_strategy, || async move {
        let response = client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_server_error() {
            debug!("Retrying {} after HTTP {}", url, status);
            return Err(format!("HTTP {status}"));
        }
        Ok::<_, String>(response)
    })
    .await;

    let response = outcome.map_err(|reason| DiversityError::NetworkError {
        url: url.to_string(),
        reason,
    })?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => Ok(Some(response)),
        status => Err(DiversityError::NetworkError {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        }
        .into()),
    }
}
