//! HTTP client for one dashboard.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;
use crate::types::{App, ComposeFile, Instance, InstanceRequest};

/// Request timeout used by [`Client::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the v2 API key.
const API_KEY_HEADER: &str = "api-key";

/// Dashboard API version a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    fn path(self) -> &'static str {
        match self {
            Self::V1 => "api/v1/",
            Self::V2 => "api/v2/",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// Client for the API of a single dashboard.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    site: String,
    api_url: Url,
    version: ApiVersion,
}

impl Client {
    /// Create a client for a dashboard base URL.
    ///
    /// With an API key the client uses v2, otherwise v1.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let version = if api_key.is_some() {
            ApiVersion::V2
        } else {
            ApiVersion::V1
        };

        let invalid_url = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let mut base = Url::parse(base_url).map_err(|e| invalid_url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid_url("not a hierarchical URL".to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_url = base
            .join(version.path())
            .map_err(|e| invalid_url(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key).map_err(|_| ClientError::InvalidKey)?;
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            site: base_url.to_string(),
            api_url,
            version,
        })
    }

    /// API version this client talks to.
    pub fn api_version(&self) -> ApiVersion {
        self.version
    }

    /// Dashboard base URL the client was created for.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Look up an application version. `None` if it is not registered.
    pub async fn get_app(&self, name: &str, version: &str) -> Result<Option<App>, ClientError> {
        let url = self.endpoint("get_app", &["apps", name, version])?;
        let response = self.send(self.http.get(url)).await?;
        self.optional_json(response).await
    }

    /// Register an application version (idempotent).
    pub async fn update_app(&self, name: &str, version: &str) -> Result<App, ClientError> {
        let url = self.endpoint("update_app", &["apps", name, version])?;
        let response = self.send(self.http.put(url)).await?;
        let app = self.json_or_default::<App>(response).await?;

        Ok(App {
            name: if app.name.is_empty() {
                name.to_string()
            } else {
                app.name
            },
            version: if app.version.is_empty() {
                version.to_string()
            } else {
                app.version
            },
        })
    }

    /// Replace a compose file of an application version.
    pub async fn update_compose(
        &self,
        name: &str,
        version: &str,
        file: ComposeFile,
        content: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(
            "update_compose",
            &["apps", name, version, "files", file.api_name()],
        )?;
        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(content.to_string());

        self.send(request).await?;
        Ok(())
    }

    /// Look up an instance. `None` if it does not exist.
    pub async fn get_instance(&self, name: &str) -> Result<Option<Instance>, ClientError> {
        let url = self.endpoint("get_instance", &["instances", name])?;
        let response = self.send(self.http.get(url)).await?;
        self.optional_json(response).await
    }

    /// Request that an instance is stopped and removed.
    ///
    /// Returns `false` if the instance did not exist.
    pub async fn delete_instance(&self, name: &str) -> Result<bool, ClientError> {
        let url = self.endpoint("delete_instance", &["instances", name])?;
        let response = self.send(self.http.delete(url)).await?;
        Ok(response.status() != StatusCode::NOT_FOUND)
    }

    /// Create or update an instance of an application version.
    pub async fn update_instance(
        &self,
        name: &str,
        app: &str,
        version: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Instance, ClientError> {
        let url = self.endpoint("update_instance", &["instances", name])?;
        let body = InstanceRequest {
            app,
            version,
            parameters,
            options: BTreeMap::new(),
        };

        let response = self.send(self.http.put(url).json(&body)).await?;
        let mut instance = self.json_or_default::<Instance>(response).await?;
        if instance.name.is_empty() {
            instance.name = name.to_string();
        }
        Ok(instance)
    }

    /// Build the URL of a v2 endpoint.
    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> Result<Url, ClientError> {
        if self.version != ApiVersion::V2 {
            return Err(ClientError::RequiresV2 {
                operation,
                site: self.site.clone(),
            });
        }

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl {
                url: self.site.clone(),
                reason: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request; non-success statuses other than 404 become errors.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(method = %method, url = %url, "Dashboard request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "Dashboard response");

        if status.is_success() || (status == StatusCode::NOT_FOUND && method != Method::PUT) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    async fn optional_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>, ClientError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response.text().await?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn json_or_default<T: DeserializeOwned + Default>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}
