use reqwest::{
    header::{self, HeaderMap, HeaderValue, InvalidHeaderValue},
    Client,
};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("invalid credential header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("failed to build client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Client for a JSON API authenticated with a bearer token.
pub fn create_api_client(bearer_token: &str, timeout_secs: u64) -> Result<Client, HttpClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", bearer_token))?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);

    let builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .default_headers(headers)
        .user_agent(concat!("voxshift-checkout/", env!("CARGO_PKG_VERSION")));

    Ok(builder.build()?)
}
