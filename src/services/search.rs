//! Search index client
//!
//! Two flavours share one type:
//!
//! - **managed**: the host is an AWS-hosted domain (`*.es.amazonaws.com`).
//!   Credentials and region come from the AWS environment and every request
//!   is signed with SigV4 for the `es` service.
//! - **self-hosted**: any other host, reached with plain HTTP.
//!
//! From 7.x on, both announce the configured API version through the
//! Elasticsearch compatibility media type. Older clusters get plain JSON,
//! which is all they accept.

use crate::config::SearchConfig;
use crate::core::error::{ServiceError, ServiceResult};
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::SystemTime;
use url::Url;

const SERVICE: &str = "search";
const SIGNING_NAME: &str = "es";

/// Whether `host` designates an AWS-managed search domain
pub fn is_managed_host(host: &str) -> bool {
    static MANAGED_HOST: OnceLock<Regex> = OnceLock::new();
    let regex = MANAGED_HOST.get_or_init(|| {
        Regex::new(r"^(https?://)?[a-z0-9.-]+\.es\.amazonaws\.com(:\d+)?/?$").unwrap()
    });
    regex.is_match(&host.to_lowercase())
}

/// Content type to send for `api_version`
///
/// The `compatible-with` media type only exists since 7.x; 6.x clusters
/// answer it with `406 Not Acceptable`.
pub fn media_type_for(api_version: &str) -> String {
    let major = api_version
        .trim()
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok());
    match major {
        Some(major) if major >= 7 => format!(
            "application/vnd.elasticsearch+json; compatible-with={}",
            major
        ),
        _ => "application/json".to_string(),
    }
}

/// Pick the signing region: the configured one, else the ambient AWS one
fn resolve_region(configured: Option<&str>, ambient: Option<&str>) -> ServiceResult<String> {
    configured
        .or(ambient)
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::Config("no AWS region configured for the search index".to_string())
        })
}

fn require_credentials(
    credentials: Option<SharedCredentialsProvider>,
) -> ServiceResult<SharedCredentialsProvider> {
    credentials.ok_or_else(|| {
        ServiceError::Config("no AWS credentials available for the search index".to_string())
    })
}

/// Result of a search: total hit count and the matched documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<Value>,
}

impl SearchResults {
    /// Parse a search response body
    ///
    /// `hits.total` is a number before 7.x and `{ "value": n }` since.
    pub fn from_response(body: &Value) -> Self {
        let hits = &body["hits"];
        let total = hits["total"]
            .as_u64()
            .or_else(|| hits["total"]["value"].as_u64())
            .unwrap_or(0);
        let documents = hits["hits"]
            .as_array()
            .map(|hits| hits.iter().map(|hit| hit["_source"].clone()).collect())
            .unwrap_or_default();
        Self {
            total,
            hits: documents,
        }
    }
}

fn signing_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::external(SERVICE, format!("failed to sign request: {}", e))
}

struct AwsSigner {
    credentials: SharedCredentialsProvider,
    region: String,
}

/// Client of the member search index
pub struct SearchClient {
    http: reqwest::Client,
    base_url: Url,
    media_type: String,
    signer: Option<AwsSigner>,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("base_url", &self.base_url.as_str())
            .field("managed", &self.is_managed())
            .finish()
    }
}

fn parse_base_url(host: &str) -> ServiceResult<Url> {
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ServiceError::Config(format!("invalid search host '{}': {}", host, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl SearchClient {
    /// Build the client matching the configured host
    pub async fn connect(config: &SearchConfig) -> ServiceResult<Self> {
        if !is_managed_host(&config.host) {
            tracing::info!(host = %config.host, "connecting to self-hosted search index");
            return Self::self_hosted(config);
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let credentials = require_credentials(sdk_config.credentials_provider())?;
        let ambient_region = sdk_config.region().map(|r| r.to_string());
        let region = resolve_region(config.region.as_deref(), ambient_region.as_deref())?;
        Self::managed(config, credentials, region)
    }

    /// Build a client signing every request with `credentials` for `region`
    ///
    /// The host is taken as is, managed-looking or not.
    pub fn managed(
        config: &SearchConfig,
        credentials: SharedCredentialsProvider,
        region: impl Into<String>,
    ) -> ServiceResult<Self> {
        let region: String = region.into();
        let region = resolve_region(Some(region.as_str()), None)?;
        tracing::info!(host = %config.host, region = %region, "connecting to managed search index");
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parse_base_url(&config.host)?,
            media_type: media_type_for(&config.api_version),
            signer: Some(AwsSigner {
                credentials,
                region,
            }),
        })
    }

    /// Build an unsigned client, whatever the host
    pub fn self_hosted(config: &SearchConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parse_base_url(&config.host)?,
            media_type: media_type_for(&config.api_version),
            signer: None,
        })
    }

    /// Whether requests are signed for a managed domain
    pub fn is_managed(&self) -> bool {
        self.signer.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Run a query DSL `body` against `index`
    pub async fn search(&self, index: &str, body: &Value) -> ServiceResult<SearchResults> {
        let response = self
            .send(Method::POST, &format!("{}/_search", index), Some(body))
            .await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            return Err(ServiceError::external(
                SERVICE,
                format!("search on {} failed with {}: {}", index, status, payload),
            ));
        }
        Ok(SearchResults::from_response(&payload))
    }

    /// Fetch one document by id, `None` if the index does not hold it
    pub async fn get_document(&self, index: &str, id: &str) -> ServiceResult<Option<Value>> {
        let response = self
            .send(Method::GET, &format!("{}/_doc/{}", index, id), None)
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::external(
                SERVICE,
                format!("fetching {}/{} failed with {}: {}", index, id, status, body),
            ));
        }

        let payload: Value = response.json().await?;
        Ok(payload.get("_source").cloned())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ServiceResult<reqwest::Response> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ServiceError::BadRequest(format!("invalid index path '{}': {}", path, e)))?;

        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, &self.media_type);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ServiceError::Internal(format!("failed to encode query: {}", e)))?;
            builder = builder.header(CONTENT_TYPE, &self.media_type).body(bytes);
        }
        let mut request = builder.build()?;

        if let Some(signer) = &self.signer {
            self.sign(signer, &mut request).await?;
        }

        tracing::debug!(method = %request.method(), url = %request.url(), "search request");
        Ok(self.http.execute(request).await?)
    }

    async fn sign(&self, signer: &AwsSigner, request: &mut reqwest::Request) -> ServiceResult<()> {
        let credentials = signer
            .credentials
            .provide_credentials()
            .await
            .map_err(signing_error)?;
        let identity = credentials.into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&signer.region)
            .name(SIGNING_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(signing_error)?
            .into();

        let headers: Vec<(String, String)> = request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .unwrap_or_default();

        let signable = SignableRequest::new(
            request.method().as_str(),
            request.url().as_str(),
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(body),
        )
        .map_err(signing_error)?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(signing_error)?
            .into_parts();

        for (name, value) in instructions.headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(signing_error)?;
            let value = HeaderValue::from_str(value).map_err(signing_error)?;
            request.headers_mut().insert(name, value);
        }
        Ok(())
    }
}
