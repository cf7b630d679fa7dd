use std::time;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header;
use tracing::debug;

use crate::error::TransportError;
use crate::identity::Credentials;

/// Signed requests against the registry's REST API.
///
/// Implementations return the response status for every response received: interpreting
/// it is up to the caller. Only requests that never got a response are errors.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// POST an instance descriptor to `/apps/{app_name}`.
    async fn post_instance(
        &self,
        app_name: &str,
        body: String,
    ) -> Result<StatusCode, TransportError>;

    /// PUT an empty heartbeat to `/apps/{app_name}/{instance_id}`.
    async fn put_heartbeat(
        &self,
        app_name: &str,
        instance_id: &str,
    ) -> Result<StatusCode, TransportError>;
}

/// `RegistryTransport` over HTTP with basic auth.
pub struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        registry_url: &str,
        credentials: Credentials,
        request_timeout: time::Duration,
    ) -> Result<Self, TransportError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent("Eureka Registration Agent")
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::new(registry_url, e))?;

        Ok(Self {
            base_url: registry_url.trim_end_matches('/').to_owned(),
            credentials,
            client,
        })
    }

    fn app_url(&self, app_name: &str) -> String {
        format!("{}/apps/{}", self.base_url, app_name)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<StatusCode, TransportError> {
        let response = request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| {
                debug!(url, error = %e, "registry request failed");
                TransportError::new(url, e)
            })?;

        Ok(response.status())
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn post_instance(
        &self,
        app_name: &str,
        body: String,
    ) -> Result<StatusCode, TransportError> {
        let url = self.app_url(app_name);
        self.send(self.client.post(&url).body(body), &url).await
    }

    async fn put_heartbeat(
        &self,
        app_name: &str,
        instance_id: &str,
    ) -> Result<StatusCode, TransportError> {
        let url = format!("{}/{}", self.app_url(app_name), instance_id);
        self.send(self.client.put(&url), &url).await
    }
}
