use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::message::{MessageType, ServerMessage};
use crate::observable::Observable;
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{AddressLabels, FundedAddress, ServerResponse};

pub type AddressLabelMap = HashMap<String, Vec<String>>;

/// Funded addresses, unused addresses and address labels.
///
/// Every facet is refetched and replaced wholesale; there is no merging.
#[derive(Clone)]
pub struct AddressCache {
    client: Arc<dyn ServerTransport>,
    initialized: Observable<bool>,
    funded_addresses: Observable<Vec<FundedAddress>>,
    unfunded_addresses: Observable<Vec<String>>,
    address_label_map: Observable<AddressLabelMap>,
}

impl AddressCache {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            client,
            initialized: Observable::default(),
            funded_addresses: Observable::default(),
            unfunded_addresses: Observable::default(),
            address_label_map: Observable::default(),
        }
    }

    pub fn initialized(&self) -> bool {
        *self.initialized.current()
    }

    pub fn initialized_stream(&self) -> WatchStream<Arc<bool>> {
        self.initialized.stream()
    }

    pub fn funded_addresses(&self) -> Arc<Vec<FundedAddress>> {
        self.funded_addresses.current()
    }

    pub fn funded_addresses_stream(&self) -> WatchStream<Arc<Vec<FundedAddress>>> {
        self.funded_addresses.stream()
    }

    pub fn unfunded_addresses(&self) -> Arc<Vec<String>> {
        self.unfunded_addresses.current()
    }

    pub fn unfunded_addresses_stream(&self) -> WatchStream<Arc<Vec<String>>> {
        self.unfunded_addresses.stream()
    }

    pub fn address_label_map(&self) -> Arc<AddressLabelMap> {
        self.address_label_map.current()
    }

    pub fn address_label_map_stream(&self) -> WatchStream<Arc<AddressLabelMap>> {
        self.address_label_map.stream()
    }

    pub async fn initialize(&self) -> Result<(), ClientError> {
        tokio::try_join!(
            self.refresh_funded_addresses(),
            self.refresh_unfunded_addresses(),
            self.refresh_address_labels(),
        )?;
        debug!(
            funded = self.funded_addresses().len(),
            unfunded = self.unfunded_addresses().len(),
            labelled = self.address_label_map().len(),
            "Addresses.initialize()"
        );
        self.initialized.publish(true);
        Ok(())
    }

    pub fn uninitialize(&self) {
        self.initialized.publish(false);
        self.funded_addresses.publish(Vec::new());
        self.unfunded_addresses.publish(Vec::new());
        self.address_label_map.publish(HashMap::new());
    }

    pub async fn refresh_funded_addresses(&self) -> Result<Arc<Vec<FundedAddress>>, ClientError> {
        let resp = get_funded_addresses(self.client.as_ref()).await?;
        self.funded_addresses.publish(resp.result.unwrap_or_default());
        Ok(self.funded_addresses())
    }

    pub async fn refresh_unfunded_addresses(&self) -> Result<Arc<Vec<String>>, ClientError> {
        let resp = get_unused_addresses(self.client.as_ref()).await?;
        self.unfunded_addresses.publish(resp.result.unwrap_or_default());
        Ok(self.unfunded_addresses())
    }

    pub async fn refresh_address_labels(&self) -> Result<Arc<AddressLabelMap>, ClientError> {
        let resp = get_address_labels(self.client.as_ref()).await?;
        let map = resp
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|a| (a.address, a.labels))
            .collect();
        self.address_label_map.publish(map);
        Ok(self.address_label_map())
    }

    /// Replace every label on `address` with `label`.
    pub async fn update_address_label(
        &self,
        address: &str,
        label: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        drop_address_labels(self.client.as_ref(), address).await?;
        let resp = label_address(self.client.as_ref(), address, label).await?;
        if resp.result.is_some() {
            self.address_label_map.update(|map| {
                map.insert(address.to_string(), vec![label.to_string()]);
            });
        }
        Ok(resp)
    }
}

pub async fn get_new_address(
    client: &dyn ServerTransport,
    label: Option<&str>,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(?label, "GetNewAddress()");
    let params = label.map(|l| vec![json!(l)]).unwrap_or_default();
    request(
        client,
        ServerMessage::with_params(MessageType::GetNewAddress, params),
    )
    .await
}

/// Result reads like `Added label 'x' to <address>`.
pub async fn label_address(
    client: &dyn ServerTransport,
    address: &str,
    label: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(address, label, "LabelAddress()");
    request(
        client,
        ServerMessage::with_params(MessageType::LabelAddress, vec![json!(address), json!(label)]),
    )
    .await
}

pub async fn drop_address_label(
    client: &dyn ServerTransport,
    address: &str,
    label: &str,
) -> Result<ServerResponse<serde_json::Value>, ClientError> {
    debug!(address, label, "DropAddressLabel()");
    request(
        client,
        ServerMessage::with_params(
            MessageType::DropAddressLabel,
            vec![json!(address), json!(label)],
        ),
    )
    .await
}

pub async fn get_address_labels(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<AddressLabels>>, ClientError> {
    debug!("GetAddressLabels()");
    request(client, ServerMessage::new(MessageType::GetAddressLabels)).await
}

/// Result reads like `1 label dropped`.
pub async fn drop_address_labels(
    client: &dyn ServerTransport,
    address: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(address, "DropAddressLabels()");
    request(
        client,
        ServerMessage::with_params(MessageType::DropAddressLabels, vec![json!(address)]),
    )
    .await
}

pub async fn get_addresses(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<String>>, ClientError> {
    debug!("GetAddresses()");
    request(client, ServerMessage::new(MessageType::GetAddresses)).await
}

pub async fn get_spent_addresses(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<String>>, ClientError> {
    debug!("GetSpentAddresses()");
    request(client, ServerMessage::new(MessageType::GetSpentAddresses)).await
}

pub async fn get_funded_addresses(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<FundedAddress>>, ClientError> {
    debug!("GetFundedAddresses()");
    request(client, ServerMessage::new(MessageType::GetFundedAddresses)).await
}

pub async fn get_unused_addresses(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<String>>, ClientError> {
    debug!("GetUnusedAddresses()");
    request(client, ServerMessage::new(MessageType::GetUnusedAddresses)).await
}
