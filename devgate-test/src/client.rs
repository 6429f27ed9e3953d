//! Client for calling a devgate test server

use reqwest::{Client, Response};
use serde::Serialize;

/// Thin wrapper over `reqwest` rooted at the server URL
pub struct DevgateClient {
    base_url: String,
    client: Client,
}

impl DevgateClient {
    pub fn new(base_url: String) -> Self {
        // Redirects are asserted on, not followed
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self { base_url, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// GET with the authorizer `token` header
    pub async fn get_with_token(&self, path: &str, token: &str) -> Result<Response, ClientError> {
        Ok(self
            .client
            .get(self.url(path))
            .header("token", token)
            .send()
            .await?)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ClientError> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// POST a raw body, e.g. to exercise body parsing
    pub async fn post_raw(&self, path: &str, body: &str) -> Result<Response, ClientError> {
        Ok(self
            .client
            .post(self.url(path))
            .body(body.to_string())
            .send()
            .await?)
    }
}

/// Client errors
#[derive(Debug)]
pub enum ClientError {
    RequestError(reqwest::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::RequestError(e) => write!(f, "Request error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::RequestError(e)
    }
}
