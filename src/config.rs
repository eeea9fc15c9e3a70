use anyhow::Context;

use crate::auth;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_url: String,
    pub authorization: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub offline_polling_ms: u64,
    pub oracle_explorer_url: String,
    pub oracle_explorer: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9999/".into(),
            authorization: None,
            user: None,
            password: None,
            offline_polling_ms: 5000,
            oracle_explorer_url: "https://test.oracle.suredbits.com/v2".into(),
            oracle_explorer: "test".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let server_url = std::env::var("WALLET_SERVER_URL").unwrap_or(defaults.server_url);
        let authorization = std::env::var("WALLET_SERVER_AUTHORIZATION").ok();
        let user = std::env::var("WALLET_SERVER_USER").ok();
        let password = std::env::var("WALLET_SERVER_PASSWORD").ok();
        let offline_polling_ms = std::env::var("OFFLINE_POLLING_MS")
            .unwrap_or_else(|_| defaults.offline_polling_ms.to_string())
            .parse()
            .context("OFFLINE_POLLING_MS must be a number")?;
        let oracle_explorer_url =
            std::env::var("ORACLE_EXPLORER_URL").unwrap_or(defaults.oracle_explorer_url);
        let oracle_explorer =
            std::env::var("ORACLE_EXPLORER").unwrap_or(defaults.oracle_explorer);

        if password.is_some() && user.is_none() {
            anyhow::bail!("WALLET_SERVER_PASSWORD is set but WALLET_SERVER_USER is not");
        }

        Ok(Self {
            server_url,
            authorization,
            user,
            password,
            offline_polling_ms,
            oracle_explorer_url,
            oracle_explorer,
        })
    }

    /// Header sent with every wallet server request. A raw header wins over
    /// user/password credentials.
    pub fn authorization_header(&self) -> Option<String> {
        if let Some(header) = self.authorization.as_ref().filter(|h| !h.is_empty()) {
            return Some(header.clone());
        }
        self.user
            .as_deref()
            .map(|user| auth::basic_auth_header(user, self.password.as_deref().unwrap_or("")))
    }
}
