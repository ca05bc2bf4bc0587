use crate::errors::HttpError;
use reqwest::{header::HeaderMap, Client, Method};
use serde::{de::DeserializeOwned, Serialize};

/// Create a JSON request, parse the response.
/// Throws error on any non-success status code.
pub(crate) async fn send_json<T: Serialize + ?Sized, R: DeserializeOwned>(
    client: &Client,
    method: Method,
    url: &str,
    data: Option<&T>,
    headers: HeaderMap,
) -> Result<R, HttpError> {
    let mut request = client.request(method, url).headers(headers);
    if let Some(data) = data {
        request = request.json(data);
    }
    let response = request.send().await.map_err(reqwest::Error::without_url)?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ));
    }

    Ok(response
        .json::<R>()
        .await
        .map_err(reqwest::Error::without_url)?)
}

/// Shorthand for the common `POST` with a JSON body.
pub(crate) async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: HeaderMap,
) -> Result<R, HttpError> {
    send_json(client, Method::POST, url, Some(data), headers).await
}

/// Shorthand for a `GET` without body.
pub(crate) async fn get_json<R: DeserializeOwned>(
    client: &Client,
    url: &str,
    headers: HeaderMap,
) -> Result<R, HttpError> {
    send_json::<(), R>(client, Method::GET, url, None, headers).await
}
