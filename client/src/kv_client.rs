use anyhow::Result;
use log::debug;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::client_api::KvApi;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";
pub const KEY_STATUS_HEADER: &str = "X-Key-Status";
pub const KEY_NOT_FOUND_BODY: &str = "Key not found";

/// Error type for the key-value client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server address '{0}'")]
    InvalidAddress(String),
    #[error("Server answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

/// Client for a key-value node speaking the `/get` and `/put` protocol
pub struct HttpKvClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpKvClient {
    /// Accepts `host:port` or a full `http://host:port` URL.
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let with_scheme = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        let url = Url::parse(&with_scheme)
            .map_err(|_| ClientError::InvalidAddress(server.to_string()))?;
        if url.host_str().is_none() {
            return Err(ClientError::InvalidAddress(server.to_string()));
        }
        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }
}

/// Turns a `/get` reply into a lookup result. Older nodes do not send the
/// status header, in which case the sentinel body means "not found".
pub fn interpret_get(
    status: StatusCode,
    key_status: Option<&str>,
    body: String,
) -> Result<Option<String>, ClientError> {
    if status != StatusCode::OK {
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    match key_status {
        Some("found") => Ok(Some(body)),
        Some(_) => Ok(None),
        None if body == KEY_NOT_FOUND_BODY => Ok(None),
        None => Ok(Some(body)),
    }
}

#[async_trait::async_trait]
impl KvApi for HttpKvClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .http
            .get(self.endpoint("get"))
            .query(&[("key", key)])
            .send()
            .await
            .map_err(ClientError::from)?;
        let status = response.status();
        let key_status = response
            .headers()
            .get(KEY_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(ClientError::from)?;
        debug!("get {} -> {} ({:?})", key, status, key_status);
        Ok(interpret_get(status, key_status.as_deref(), body)?)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let response = self
            .http
            .put(self.endpoint("put"))
            .query(&[("key", key), ("value", value)])
            .send()
            .await
            .map_err(ClientError::from)?;
        let status = response.status();
        debug!("put {} -> {}", key, status);
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_adds_scheme() {
        let client = HttpKvClient::new("127.0.0.1:8080").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080");
        assert_eq!(client.endpoint("get"), "http://127.0.0.1:8080/get");

        let client = HttpKvClient::new("http://localhost:9000/").unwrap();
        assert_eq!(client.endpoint("put"), "http://localhost:9000/put");
    }

    #[test]
    fn test_new_rejects_garbage() {
        assert!(matches!(
            HttpKvClient::new("http://"),
            Err(ClientError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_interpret_found() {
        let res = interpret_get(StatusCode::OK, Some("found"), "0".into()).unwrap();
        assert_eq!(res, Some("0".to_string()));

        // a stored value that happens to equal the sentinel
        let res = interpret_get(StatusCode::OK, Some("found"), KEY_NOT_FOUND_BODY.into()).unwrap();
        assert_eq!(res, Some(KEY_NOT_FOUND_BODY.to_string()));
    }

    #[test]
    fn test_interpret_missing() {
        let res = interpret_get(StatusCode::OK, Some("missing"), KEY_NOT_FOUND_BODY.into()).unwrap();
        assert_eq!(res, None);

        let res = interpret_get(StatusCode::OK, None, KEY_NOT_FOUND_BODY.into()).unwrap();
        assert_eq!(res, None);
        let res = interpret_get(StatusCode::OK, None, "blue".into()).unwrap();
        assert_eq!(res, Some("blue".to_string()));
    }

    #[test]
    fn test_interpret_error_status() {
        let res = interpret_get(StatusCode::NOT_FOUND, None, "Page not found".into());
        match res {
            Err(ClientError::Rejected { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Page not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
