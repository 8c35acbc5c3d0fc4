//! HTTP client implementation

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::PanelError;

const USER_AGENT: &str = concat!("test-panel/", env!("CARGO_PKG_VERSION"));

/// Thin JSON client shared by the GitHub and DockerHub integrations
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, PanelError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(PanelError::ServerError(format!("GET {}: {}: {}", url, status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request with a JSON body, optionally with a bearer token
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, PanelError> {
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("bearer {}", token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST failed: {} - {}", status, body);
            return Err(PanelError::ServerError(format!("POST {}: {}: {}", url, status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }
}
