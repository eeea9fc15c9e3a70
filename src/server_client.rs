use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth;
use crate::config::Config;
use crate::message::{MessageType, ServerMessage};
use crate::types::{ServerResponse, VersionResponse};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("null message")]
    NullMessage,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Server(String),
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Sends one envelope to the wallet server.
///
/// A transport-level success resolves with the parsed envelope verbatim, even
/// when its `error` field is populated.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    async fn send(&self, message: &ServerMessage) -> Result<ServerResponse<Value>, ClientError>;
}

#[derive(Debug, Clone, Default)]
struct Endpoint {
    url: String,
    authorization: Option<String>,
}

pub struct HttpServerClient {
    client: Client,
    endpoint: RwLock<Endpoint>,
}

impl HttpServerClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: RwLock::new(Endpoint {
                url: config.server_url.clone(),
                authorization: config.authorization_header(),
            }),
        })
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, ClientError> {
        let config = Config {
            server_url: url.into(),
            ..Config::default()
        };
        Self::new(&config)
    }

    pub fn server_url(&self) -> String {
        self.endpoint().url
    }

    pub fn configure_server_url(&self, url: impl Into<String>) {
        let url = url.into();
        debug!(%url, "configure server url");
        self.write_endpoint(|endpoint| endpoint.url = url);
    }

    /// Raw `Authorization` header value. An empty string disables the header.
    pub fn configure_authorization_header(&self, header: impl Into<String>) {
        let header = header.into();
        debug!("configure authorization header");
        self.write_endpoint(|endpoint| {
            endpoint.authorization = Some(header).filter(|h| !h.is_empty());
        });
    }

    pub fn configure_authorization_header_from_user_password(&self, user: &str, password: &str) {
        debug!(user, "configure authorization header");
        let header = auth::basic_auth_header(user, password);
        self.write_endpoint(|endpoint| endpoint.authorization = Some(header));
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_endpoint(&self, f: impl FnOnce(&mut Endpoint)) {
        let mut guard = self.endpoint.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

#[async_trait]
impl ServerTransport for HttpServerClient {
    async fn send(&self, message: &ServerMessage) -> Result<ServerResponse<Value>, ClientError> {
        if message.is_empty() {
            return Err(ClientError::NullMessage);
        }

        let endpoint = self.endpoint();
        let mut request = self.client.post(&endpoint.url).json(message);
        if let Some(authorization) = endpoint.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            debug!(method = %message.method, %status, "server rejected request");
            return Err(ClientError::Server(body));
        }

        Ok(resp.json().await?)
    }
}

/// Send `message` and reinterpret the envelope's result as `T`.
pub async fn request<T: DeserializeOwned>(
    client: &dyn ServerTransport,
    message: ServerMessage,
) -> Result<ServerResponse<T>, ClientError> {
    let response = client.send(&message).await?;
    Ok(response.decode()?)
}

pub async fn get_version(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<VersionResponse>, ClientError> {
    debug!("GetVersion()");
    request(client, ServerMessage::new(MessageType::GetVersion)).await
}

/// Result is `"failure"` or absent depending on server version.
pub async fn zip_data_dir(
    client: &dyn ServerTransport,
    path: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(path, "ZipDataDir()");
    request(
        client,
        ServerMessage::with_params(MessageType::ZipDataDir, vec![json!(path)]),
    )
    .await
}
