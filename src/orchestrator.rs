use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info};

use crate::address::AddressCache;
use crate::config::Config;
use crate::contact::ContactCache;
use crate::dlc::DlcCache;
use crate::observable::{Observable, Subscription};
use crate::offer::OfferCache;
use crate::poller::{polling_loop, OFFLINE_POLLING_TIME};
use crate::server_client::{ClientError, HttpServerClient, ServerTransport};
use crate::state::{WalletState, WalletStateStore};
use crate::types::{ServerResponse, VersionResponse};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum InitPhase {
    #[default]
    Idle,
    WaitingForBackend,
    LoadingAggregate,
    LoadingDomains,
    Ready,
    Failed(String),
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("loading wallet state failed: {0}")]
    Aggregate(#[source] ClientError),
    #[error("loading wallet services failed: {0}")]
    Domains(#[source] ClientError),
}

/// Everything a UI needs: the shared client, the aggregate store and the
/// four domain caches, plus the startup phase.
#[derive(Clone)]
pub struct WalletContext {
    client: Arc<dyn ServerTransport>,
    state: WalletStateStore,
    addresses: AddressCache,
    contacts: ContactCache,
    dlcs: DlcCache,
    offers: OfferCache,
    phase: Observable<InitPhase>,
    poll_delay: Duration,
}

impl WalletContext {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            state: WalletStateStore::new(client.clone()),
            addresses: AddressCache::new(client.clone()),
            contacts: ContactCache::new(client.clone()),
            dlcs: DlcCache::new(client.clone()),
            offers: OfferCache::new(client.clone()),
            client,
            phase: Observable::default(),
            poll_delay: OFFLINE_POLLING_TIME,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = HttpServerClient::new(config).context("failed to build wallet server client")?;
        Ok(Self::new(Arc::new(client))
            .with_poll_delay(Duration::from_millis(config.offline_polling_ms)))
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn client(&self) -> &dyn ServerTransport {
        self.client.as_ref()
    }

    pub fn state(&self) -> &WalletStateStore {
        &self.state
    }

    pub fn addresses(&self) -> &AddressCache {
        &self.addresses
    }

    pub fn contacts(&self) -> &ContactCache {
        &self.contacts
    }

    pub fn dlcs(&self) -> &DlcCache {
        &self.dlcs
    }

    pub fn offers(&self) -> &OfferCache {
        &self.offers
    }

    pub fn phase(&self) -> InitPhase {
        self.phase.current().as_ref().clone()
    }

    pub fn phase_stream(&self) -> WatchStream<Arc<InitPhase>> {
        self.phase.stream()
    }

    pub fn observe_phase<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&InitPhase) + Send + Sync + 'static,
    {
        self.phase.observe(listener)
    }

    pub fn services_initialized(&self) -> bool {
        self.addresses.initialized()
            && self.contacts.initialized()
            && self.dlcs.initialized()
            && self.offers.initialized()
    }

    /// Block until the server answers a version query, retrying forever.
    pub async fn wait_for_server(&self) -> ServerResponse<Value> {
        let resp = polling_loop(self.client(), None, self.poll_delay).await;
        if let Ok(ServerResponse {
            result: Some(version),
            ..
        }) = resp.clone().decode::<VersionResponse>()
        {
            self.state.set_version(&version);
        }
        resp
    }

    pub async fn initialize_wallet_state(&self) -> Result<Arc<WalletState>, ClientError> {
        self.state.refresh().await
    }

    pub async fn initialize_services(&self) -> Result<(), ClientError> {
        tokio::try_join!(
            self.addresses.initialize(),
            self.contacts.initialize(),
            self.dlcs.initialize(),
            self.offers.initialize(),
        )?;
        Ok(())
    }

    /// Wait for the server, then load the aggregate state, then every domain
    /// cache. A failure after the server is reachable ends in
    /// [`InitPhase::Failed`]; nothing is retried.
    pub async fn wait_for_server_and_initialize_all(&self) -> Result<Arc<WalletState>, InitError> {
        self.set_phase(InitPhase::WaitingForBackend);
        self.wait_for_server().await;

        self.set_phase(InitPhase::LoadingAggregate);
        let state = match self.initialize_wallet_state().await {
            Ok(state) => state,
            Err(e) => return Err(self.fail(InitError::Aggregate(e))),
        };

        self.set_phase(InitPhase::LoadingDomains);
        if let Err(e) = self.initialize_services().await {
            return Err(self.fail(InitError::Domains(e)));
        }

        self.set_phase(InitPhase::Ready);
        Ok(state)
    }

    pub fn uninitialize_all(&self) {
        self.addresses.uninitialize();
        self.contacts.uninitialize();
        self.dlcs.uninitialize();
        self.offers.uninitialize();
        self.state.clear();
        self.set_phase(InitPhase::Idle);
    }

    fn set_phase(&self, phase: InitPhase) {
        info!(?phase, "initialization phase");
        self.phase.publish(phase);
    }

    fn fail(&self, err: InitError) -> InitError {
        error!(error = %err, "initialization failed");
        self.phase.publish(InitPhase::Failed(err.to_string()));
        err
    }
}
