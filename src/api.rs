//! Qernal platform API client.
//!
//! Blocking HTTPS/JSON calls for the operations the CLI needs:
//! - `connect`: OAuth2 client-credentials exchange against the hydra host
//! - `list_organisations`: cheapest authenticated call, used to verify a credential
//! - `project_id_by_name`, `fetch_dek`, `create_secret`, `list_logs`

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::credential::Credential;
use crate::logs::LogRecord;

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("qernal-cli/", env!("CARGO_PKG_VERSION"));

/// Errors from the platform API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credential rejected (401 Unauthorized)
    #[error("Invalid or expired credential: the platform returned 401 Unauthorized")]
    Unauthorized,

    /// Credential lacks access (403 Forbidden)
    #[error("Credential lacks required permissions: the platform returned 403 Forbidden")]
    Forbidden,

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or other HTTP error
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response
    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

/// Response from the OAuth2 token endpoint (only fields we care about).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Paginated list envelope; only the first page is read.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// An organisation the credential can see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: String,
}

/// A project's data encryption key descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dek {
    /// Base64 X25519 public key
    pub public_key: String,
    pub revision: i64,
}

#[derive(Debug, Deserialize)]
struct DekPayload {
    public: String,
}

#[derive(Debug, Deserialize)]
struct DekResponse {
    payload: DekPayload,
    revision: i64,
}

/// Kind of secret being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    Environment,
    Registry,
    Certificate,
}

impl SecretType {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "environment" => Some(SecretType::Environment),
            "registry" => Some(SecretType::Registry),
            "certificate" => Some(SecretType::Certificate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::Environment => "environment",
            SecretType::Registry => "registry",
            SecretType::Certificate => "certificate",
        }
    }
}

/// Type-specific secret payload. Sealed fields carry base64 ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SecretPayload {
    Environment {
        environment_value: String,
    },
    Registry {
        registry: String,
        registry_value: String,
    },
    Certificate {
        certificate: String,
        certificate_value: String,
    },
}

impl SecretPayload {
    pub fn secret_type(&self) -> SecretType {
        match self {
            SecretPayload::Environment { .. } => SecretType::Environment,
            SecretPayload::Registry { .. } => SecretType::Registry,
            SecretPayload::Certificate { .. } => SecretType::Certificate,
        }
    }
}

/// Request body for secret creation.
#[derive(Debug, Clone, Serialize)]
pub struct SecretBody {
    pub name: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub payload: SecretPayload,
    /// Encryption reference, `keys/dek/<revision>`
    pub encryption: String,
}

impl SecretBody {
    pub fn new(name: &str, payload: SecretPayload, encryption: String) -> Self {
        Self {
            name: name.to_uppercase(),
            secret_type: payload.secret_type(),
            payload,
            encryption,
        }
    }
}

/// Metadata of a created secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretMeta {
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

/// Authenticated client for the platform API.
pub struct ApiClient {
    agent: ureq::Agent,
    base: String,
    access_token: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Exchange `credential` for an access token and build a client.
    pub fn connect(settings: &Settings, credential: &Credential) -> Result<Self, ApiError> {
        let agent = build_agent(settings.timeout);
        let url = format!("{}/oauth2/token", settings.hydra_host.trim_end_matches('/'));
        let basic = BASE64.encode(format!(
            "{}:{}",
            credential.client_id(),
            credential.client_secret()
        ));

        tracing::debug!(
            url = %url,
            client_id = %credential.client_id(),
            "exchanging credential for access token"
        );
        let response = agent
            .post(&url)
            .set("Authorization", &format!("Basic {}", basic))
            .set("User-Agent", USER_AGENT)
            .send_form(&[("grant_type", "client_credentials")]);

        let token: TokenResponse = match response {
            Ok(resp) => resp
                .into_json()
                .map_err(|e| ApiError::Parse(e.to_string()))?,
            // hydra answers a bad client with 400/401 invalid_client
            Err(ureq::Error::Status(400, _)) => return Err(ApiError::Unauthorized),
            Err(e) => return Err(map_error(e)),
        };

        Ok(Self {
            agent,
            base: settings.api_base(),
            access_token: token.access_token,
        })
    }

    /// Build a client around an existing access token.
    pub fn with_access_token(settings: &Settings, access_token: impl Into<String>) -> Self {
        Self {
            agent: build_agent(settings.timeout),
            base: settings.api_base(),
            access_token: access_token.into(),
        }
    }

    /// List visible organisations (first page).
    pub fn list_organisations(&self) -> Result<Vec<Organisation>, ApiError> {
        let list: ListResponse<Organisation> = self.get_json("/organisations", &[])?;
        Ok(list.data)
    }

    /// Resolve a project name to its id.
    pub fn project_id_by_name(&self, name: &str) -> Result<String, ApiError> {
        let list: ListResponse<Project> = self.get_json("/projects", &[("f_name", name)])?;
        list.data
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| ApiError::NotFound(format!("unable to find project with name {}", name)))
    }

    /// Fetch the project's current DEK. Never cached.
    pub fn fetch_dek(&self, project_id: &str) -> Result<Dek, ApiError> {
        let resp: DekResponse =
            self.get_json(&format!("/projects/{}/secrets/dek", project_id), &[])?;
        Ok(Dek {
            public_key: resp.payload.public,
            revision: resp.revision,
        })
    }

    /// Create a secret in a project.
    pub fn create_secret(
        &self,
        project_id: &str,
        body: &SecretBody,
    ) -> Result<SecretMeta, ApiError> {
        let url = format!("{}/projects/{}/secrets", self.base, project_id);
        tracing::debug!(url = %url, name = %body.name, "creating secret");
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("User-Agent", USER_AGENT)
            .send_json(body);

        match response {
            Ok(resp) => resp.into_json().map_err(|e| ApiError::Parse(e.to_string())),
            Err(e) => Err(map_error(e)),
        }
    }

    /// Current log window for a function, oldest first.
    pub fn list_logs(
        &self,
        project_id: &str,
        function_id: &str,
    ) -> Result<Vec<LogRecord>, ApiError> {
        let list: ListResponse<LogRecord> = self.get_json(
            "/logs",
            &[("f_project", project_id), ("f_function", function_id)],
        )?;
        let mut records = list.data;
        // the endpoint returns newest first
        records.reverse();
        Ok(records)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        tracing::debug!(url = %url, "GET");
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT);
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(resp) => resp.into_json().map_err(|e| ApiError::Parse(e.to_string())),
            Err(e) => Err(map_error(e)),
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn map_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(401, _) => ApiError::Unauthorized,
        ureq::Error::Status(403, _) => ApiError::Forbidden,
        ureq::Error::Status(404, resp) => ApiError::NotFound(resp.get_url().to_string()),
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ApiError::Http(format!("HTTP {}: {}", code, body))
        }
        e => ApiError::Http(e.to_string()),
    }
}
