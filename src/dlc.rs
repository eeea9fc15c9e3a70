use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::contact::{dlc_contact_add, dlc_contact_remove};
use crate::join::join_fail_fast;
use crate::message::{MessageType, ServerMessage};
use crate::observable::Observable;
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{ContractInfo, DlcContract, ServerResponse};

/// Decoded contract info keyed by dlcId.
pub type ContractInfoMap = HashMap<String, ContractInfo>;

/// DLC list plus a decode cache of each contract's contract-info blob.
///
/// A dlcId is decoded at most once until the cache is re-initialized. Decode
/// batches are fail-fast: one transport error aborts the whole load.
#[derive(Clone)]
pub struct DlcCache {
    client: Arc<dyn ServerTransport>,
    initialized: Observable<bool>,
    dlcs: Observable<Vec<DlcContract>>,
    contract_infos: Observable<ContractInfoMap>,
    decode_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DlcCache {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            client,
            initialized: Observable::default(),
            dlcs: Observable::default(),
            contract_infos: Observable::default(),
            decode_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn initialized(&self) -> bool {
        *self.initialized.current()
    }

    pub fn initialized_stream(&self) -> WatchStream<Arc<bool>> {
        self.initialized.stream()
    }

    pub fn dlcs(&self) -> Arc<Vec<DlcContract>> {
        self.dlcs.current()
    }

    pub fn dlcs_stream(&self) -> WatchStream<Arc<Vec<DlcContract>>> {
        self.dlcs.stream()
    }

    pub fn contract_infos(&self) -> Arc<ContractInfoMap> {
        self.contract_infos.current()
    }

    pub fn contract_infos_stream(&self) -> WatchStream<Arc<ContractInfoMap>> {
        self.contract_infos.stream()
    }

    pub fn dlc(&self, dlc_id: &str) -> Option<DlcContract> {
        self.dlcs().iter().find(|d| d.dlc_id == dlc_id).cloned()
    }

    pub fn contract_info(&self, dlc_id: &str) -> Option<ContractInfo> {
        self.contract_infos().get(dlc_id).cloned()
    }

    /// Reload every contract and decode each one's contract info afresh.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        self.contract_infos.publish(HashMap::new());
        let dlcs = self.load_dlcs().await?;
        debug!(
            dlcs = dlcs.len(),
            contract_infos = self.contract_infos().len(),
            "DLCs.initialize()"
        );
        Ok(())
    }

    pub fn uninitialize(&self) {
        self.initialized.publish(false);
        self.dlcs.publish(Vec::new());
        self.contract_infos.publish(HashMap::new());
        self.decode_locks.clear();
    }

    /// Fetch the full list, publish it and decode every contract info.
    pub async fn load_dlcs(&self) -> Result<Arc<Vec<DlcContract>>, ClientError> {
        let resp = get_dlcs(self.client.as_ref(), None).await?;
        if let Some(error) = &resp.error {
            warn!(%error, "getdlcs returned an error");
        }
        self.dlcs.publish(resp.result.unwrap_or_default());
        let dlcs = self.dlcs();
        self.load_contract_infos(&dlcs).await?;
        Ok(dlcs)
    }

    /// Decode all of `dlcs` concurrently, then mark the cache ready.
    pub async fn load_contract_infos(
        &self,
        dlcs: &[DlcContract],
    ) -> Result<Arc<ContractInfoMap>, ClientError> {
        if !dlcs.is_empty() {
            join_fail_fast(dlcs.iter().map(|dlc| self.load_contract_info(dlc))).await?;
        }
        self.initialized.publish(true);
        Ok(self.contract_infos())
    }

    /// Decode `dlc`'s contract info unless it is already cached. Returns the
    /// newly decoded value, or `None` when nothing was decoded.
    pub async fn load_contract_info(
        &self,
        dlc: &DlcContract,
    ) -> Result<Option<ContractInfo>, ClientError> {
        self.with_decode_lock(&dlc.dlc_id, || async {
            if self.contract_infos().contains_key(&dlc.dlc_id) {
                debug!(dlc_id = %dlc.dlc_id, "contract info already cached");
                return Ok(None);
            }

            let resp = decode_contract_info(self.client.as_ref(), &dlc.contract_info).await?;
            match resp.result {
                Some(info) => {
                    self.contract_infos.update(|infos| {
                        infos.insert(dlc.dlc_id.clone(), info.clone());
                    });
                    Ok(Some(info))
                }
                None => {
                    warn!(dlc_id = %dlc.dlc_id, error = ?resp.error, "contract info not decoded");
                    Ok(None)
                }
            }
        })
        .await
    }

    /// Fetch one contract and reconcile it into the list.
    pub async fn refresh_dlc(&self, dlc_id: &str) -> Result<Option<DlcContract>, ClientError> {
        let resp = get_dlc(self.client.as_ref(), dlc_id).await?;
        match resp.result {
            Some(dlc) => {
                self.replace_dlc(dlc.clone()).await?;
                Ok(Some(dlc))
            }
            None => Ok(None),
        }
    }

    /// Replace the entry with the same dlcId in place. An unknown contract is
    /// appended and its contract info decoded before returning.
    pub async fn replace_dlc(&self, dlc: DlcContract) -> Result<(), ClientError> {
        let appended = self.dlcs.update(|dlcs| {
            match dlcs.iter().position(|d| d.dlc_id == dlc.dlc_id) {
                Some(index) => {
                    dlcs[index] = dlc.clone();
                    false
                }
                None => {
                    dlcs.push(dlc.clone());
                    true
                }
            }
        });
        debug!(dlc_id = %dlc.dlc_id, appended, "replace dlc");

        if appended {
            self.load_contract_info(&dlc).await?;
        }
        Ok(())
    }

    /// Drop the contract and its decoded info. Unknown ids are ignored.
    pub fn remove_dlc(&self, dlc_id: &str) {
        if self.dlcs().iter().any(|d| d.dlc_id == dlc_id) {
            self.dlcs.update(|dlcs| dlcs.retain(|d| d.dlc_id != dlc_id));
        }
        if self.contract_infos().contains_key(dlc_id) {
            self.contract_infos.update(|infos| {
                infos.remove(dlc_id);
            });
        }
    }

    /// Cancel on the server and drop the contract once the server confirms.
    pub async fn cancel(&self, dlc_id: &str) -> Result<ServerResponse<String>, ClientError> {
        let resp = cancel_dlc(self.client.as_ref(), dlc_id).await?;
        if resp.result.is_some() {
            self.remove_dlc(dlc_id);
        }
        Ok(resp)
    }

    /// Attach a contact to a contract; the cached `peer` follows on success.
    pub async fn add_contact(
        &self,
        dlc_id: &str,
        address: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        let resp = dlc_contact_add(self.client.as_ref(), dlc_id, address).await?;
        if let Some(error) = &resp.error {
            warn!(dlc_id, %error, "dlc-contact-add failed");
        } else if resp.result.is_some() {
            self.set_peer(dlc_id, Some(address.to_string()));
        }
        Ok(resp)
    }

    pub async fn remove_contact(&self, dlc_id: &str) -> Result<ServerResponse<String>, ClientError> {
        let resp = dlc_contact_remove(self.client.as_ref(), dlc_id).await?;
        if let Some(error) = &resp.error {
            warn!(dlc_id, %error, "dlc-contact-remove failed");
        } else if resp.result.is_some() {
            self.set_peer(dlc_id, None);
        }
        Ok(resp)
    }

    fn set_peer(&self, dlc_id: &str, peer: Option<String>) {
        self.dlcs.update(|dlcs| {
            if let Some(dlc) = dlcs.iter_mut().find(|d| d.dlc_id == dlc_id) {
                dlc.peer = peer;
            }
        });
    }

    async fn with_decode_lock<F, Fut, T>(&self, dlc_id: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self
            .decode_locks
            .entry(dlc_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let _guard = lock.lock().await;
        f().await
    }
}

/// With `contact_address`, only contracts with that peer are returned.
pub async fn get_dlcs(
    client: &dyn ServerTransport,
    contact_address: Option<&str>,
) -> Result<ServerResponse<Vec<DlcContract>>, ClientError> {
    debug!(?contact_address, "GetDLCs()");
    let params = contact_address.map(|a| vec![json!(a)]).unwrap_or_default();
    request(client, ServerMessage::with_params(MessageType::GetDlcs, params)).await
}

pub async fn get_dlc(
    client: &dyn ServerTransport,
    dlc_id: &str,
) -> Result<ServerResponse<DlcContract>, ClientError> {
    debug!(dlc_id, "GetDLC()");
    request(client, ServerMessage::with_params(MessageType::GetDlc, vec![json!(dlc_id)])).await
}

/// Result reads like `Success`.
pub async fn cancel_dlc(
    client: &dyn ServerTransport,
    dlc_id: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(dlc_id, "CancelDLC()");
    request(client, ServerMessage::with_params(MessageType::CancelDlc, vec![json!(dlc_id)])).await
}

pub async fn decode_contract_info(
    client: &dyn ServerTransport,
    contract_info_hex: &str,
) -> Result<ServerResponse<ContractInfo>, ClientError> {
    debug!("DecodeContractInfo()");
    request(
        client,
        ServerMessage::with_params(MessageType::DecodeContractInfo, vec![json!(contract_info_hex)]),
    )
    .await
}
