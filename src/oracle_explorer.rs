use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::observable::Observable;

/// Lets a proxy route a request to the selected explorer.
pub const HOST_OVERRIDE_HEADER: &str = "host-override";

#[derive(thiserror::Error, Debug)]
pub enum OracleExplorerError {
    #[error("oracle name must be set to {0}")]
    MissingOracleName(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExplorerPreset {
    pub value: &'static str,
    pub name: &'static str,
    pub host: &'static str,
}

pub const ORACLE_EXPLORERS: [ExplorerPreset; 2] = [
    ExplorerPreset {
        value: "test",
        name: "Suredbits Test Oracle Explorer",
        host: "test.oracle.suredbits.com",
    },
    ExplorerPreset {
        value: "prod",
        name: "Suredbits Production Oracle Explorer",
        host: "oracle.suredbits.com",
    },
];

pub fn explorer_preset(value: &str) -> Option<ExplorerPreset> {
    ORACLE_EXPLORERS.iter().copied().find(|e| e.value == value)
}

/// An oracle event as held by the local oracle server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleEvent {
    pub event_name: String,
    #[serde(rename = "announcementTLV")]
    pub announcement_tlv: String,
    #[serde(rename = "announcementTLVsha256")]
    pub announcement_tlv_sha256: String,
    #[serde(default)]
    pub attestations: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleAnnouncement {
    #[serde(rename = "announcementTLVsha256")]
    pub announcement_tlv_sha256: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub oracle_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleNameResponse {
    pub oracle_name: String,
}

/// Client for the oracle explorer REST API.
///
/// Tracks the oracle name in use, whether the explorer already knows it, and
/// the locally stored name that is used until the explorer has one.
#[derive(Clone)]
pub struct OracleExplorer {
    http: Client,
    url: Arc<str>,
    explorer: Observable<ExplorerPreset>,
    oracle_name: Observable<String>,
    server_oracle_name: Observable<bool>,
    stored_oracle_name: Observable<Option<String>>,
}

impl OracleExplorer {
    pub fn new(config: &Config) -> Result<Self, OracleExplorerError> {
        let preset = explorer_preset(&config.oracle_explorer).unwrap_or_else(|| {
            warn!(value = %config.oracle_explorer, "unknown oracle explorer, using default");
            ORACLE_EXPLORERS[0]
        });
        Ok(Self {
            http: Client::builder().build()?,
            url: config.oracle_explorer_url.trim_end_matches('/').into(),
            explorer: Observable::new(preset),
            oracle_name: Observable::default(),
            server_oracle_name: Observable::default(),
            stored_oracle_name: Observable::default(),
        })
    }

    /// Seed the locally stored oracle name, as persisted by a previous run.
    pub fn with_stored_oracle_name(self, name: Option<String>) -> Self {
        self.stored_oracle_name.publish(name);
        self
    }

    pub fn explorer(&self) -> ExplorerPreset {
        *self.explorer.current()
    }

    pub fn explorer_stream(&self) -> WatchStream<Arc<ExplorerPreset>> {
        self.explorer.stream()
    }

    /// Switch presets by value. Unknown values leave the selection unchanged.
    pub fn set_oracle_explorer(&self, value: &str) -> Option<ExplorerPreset> {
        let preset = explorer_preset(value)?;
        debug!(value, host = preset.host, "set oracle explorer");
        self.explorer.publish(preset);
        Some(preset)
    }

    pub fn oracle_name(&self) -> String {
        self.oracle_name.current().as_ref().clone()
    }

    pub fn oracle_name_stream(&self) -> WatchStream<Arc<String>> {
        self.oracle_name.stream()
    }

    pub fn server_oracle_name(&self) -> bool {
        *self.server_oracle_name.current()
    }

    pub fn stored_oracle_name(&self) -> Option<String> {
        self.stored_oracle_name.current().as_ref().clone()
    }

    pub async fn list_announcements(&self) -> Result<Vec<OracleAnnouncement>, OracleExplorerError> {
        debug!("listAnnouncements()");
        self.fetch(self.get("/announcements")).await
    }

    pub async fn get_announcement(
        &self,
        announcement_hash: &str,
    ) -> Result<OracleAnnouncement, OracleExplorerError> {
        debug!(announcement_hash, "getAnnouncement()");
        self.fetch(self.get(&format!("/announcements/{announcement_hash}")))
            .await
    }

    /// Publish `event`'s announcement under the current oracle name. Returns
    /// the announcement hash.
    pub async fn create_announcement(
        &self,
        event: &OracleEvent,
    ) -> Result<String, OracleExplorerError> {
        let oracle_name = self.require_oracle_name("create announcements")?;
        debug!(event_name = %event.event_name, %oracle_name, "createAnnouncement()");
        let form = [
            ("oracleAnnouncementV0", event.announcement_tlv.as_str()),
            ("description", event.event_name.as_str()),
            ("oracleName", oracle_name.as_str()),
        ];
        self.fetch(self.post("/announcements").form(&form)).await
    }

    pub async fn create_attestations(
        &self,
        event: &OracleEvent,
    ) -> Result<Value, OracleExplorerError> {
        self.require_oracle_name("create attestations")?;
        debug!(announcement_hash = %event.announcement_tlv_sha256, "createAttestations()");
        let form = [("attestations", event.attestations.as_deref().unwrap_or_default())];
        let path = format!("/announcements/{}/attestations", event.announcement_tlv_sha256);
        self.fetch(self.post(&path).form(&form)).await
    }

    /// `None` when the explorer has no name registered for `pubkey`.
    pub async fn get_oracle_name(
        &self,
        pubkey: &str,
    ) -> Result<Option<OracleNameResponse>, OracleExplorerError> {
        debug!(pubkey, "getOracleName()");
        let resp = self.get(&format!("/oracle/{pubkey}")).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Option<OracleNameResponse> = resp.error_for_status()?.json().await?;
        Ok(body)
    }

    /// Resolve the oracle name to use. The explorer's name wins and replaces
    /// the stored one; otherwise the stored name is used.
    pub async fn get_local_oracle_name(
        &self,
        pubkey: &str,
    ) -> Result<Option<OracleNameResponse>, OracleExplorerError> {
        let result = self.get_oracle_name(pubkey).await?;
        let stored = self.stored_oracle_name();

        match (&result, stored) {
            (Some(server), stored) => {
                self.oracle_name.publish(server.oracle_name.clone());
                self.server_oracle_name.publish(true);
                if let Some(stored) = stored.filter(|s| *s != server.oracle_name) {
                    error!(
                        stored = %stored,
                        server = %server.oracle_name,
                        "local oracle name does not match oracle explorer"
                    );
                    self.stored_oracle_name
                        .publish(Some(server.oracle_name.clone()));
                }
            }
            (None, Some(stored)) => {
                self.oracle_name.publish(stored);
                self.server_oracle_name.publish(false);
            }
            (None, None) => {
                warn!(pubkey, "no oracle name found");
                self.oracle_name.publish(String::new());
                self.server_oracle_name.publish(false);
            }
        }
        Ok(result)
    }

    /// Store `name` locally. Refused once the explorer knows a name, unless
    /// `force` is set. An empty name is ignored.
    pub fn set_oracle_name(&self, name: &str, force: bool) -> bool {
        if self.server_oracle_name() && !force {
            error!("cannot change oracle name once set on oracle explorer");
            return false;
        }
        if name.is_empty() {
            return false;
        }
        self.stored_oracle_name.publish(Some(name.to_string()));
        self.oracle_name.publish(name.to_string());
        true
    }

    fn require_oracle_name(&self, action: &'static str) -> Result<String, OracleExplorerError> {
        let name = self.oracle_name();
        if name.is_empty() {
            return Err(OracleExplorerError::MissingOracleName(action));
        }
        Ok(name)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{path}", self.url))
            .header(HOST_OVERRIDE_HEADER, self.explorer().host)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{path}", self.url))
            .header(HOST_OVERRIDE_HEADER, self.explorer().host)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, OracleExplorerError> {
        Ok(request.send().await?.error_for_status()?.json().await?)
    }
}
