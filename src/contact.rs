use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::json;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::message::{MessageType, ServerMessage};
use crate::observable::Observable;
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{Contact, ServerResponse};

/// Outcome of the last reachability check against a contact's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCheck {
    /// `None` while a check is still running.
    pub success: Option<bool>,
    /// Unix time in milliseconds.
    pub time: u64,
}

pub type ConnectionCheckMap = HashMap<String, ConnectionCheck>;

/// Contact list cache.
///
/// Adding or removing a contact only talks to the server; callers refresh the
/// list with [`ContactCache::initialize`] when they want it reflected.
#[derive(Clone)]
pub struct ContactCache {
    client: Arc<dyn ServerTransport>,
    initialized: Observable<bool>,
    contacts: Observable<Vec<Contact>>,
    connection_check: Observable<ConnectionCheckMap>,
}

impl ContactCache {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            client,
            initialized: Observable::default(),
            contacts: Observable::default(),
            connection_check: Observable::default(),
        }
    }

    pub fn initialized(&self) -> bool {
        *self.initialized.current()
    }

    pub fn initialized_stream(&self) -> WatchStream<Arc<bool>> {
        self.initialized.stream()
    }

    pub fn contacts(&self) -> Arc<Vec<Contact>> {
        self.contacts.current()
    }

    pub fn contacts_stream(&self) -> WatchStream<Arc<Vec<Contact>>> {
        self.contacts.stream()
    }

    pub fn connection_check(&self) -> Arc<ConnectionCheckMap> {
        self.connection_check.current()
    }

    pub fn connection_check_stream(&self) -> WatchStream<Arc<ConnectionCheckMap>> {
        self.connection_check.stream()
    }

    pub async fn initialize(&self) -> Result<(), ClientError> {
        let resp = contact_list(self.client.as_ref()).await?;
        self.contacts.publish(resp.result.unwrap_or_default());
        debug!(contacts = self.contacts().len(), "Contacts.initialize()");
        self.initialized.publish(true);
        Ok(())
    }

    pub fn uninitialize(&self) {
        self.initialized.publish(false);
        self.contacts.publish(Vec::new());
        self.connection_check.publish(HashMap::new());
    }

    pub fn record_connection_check(&self, address: &str, success: Option<bool>) {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.connection_check.update(|checks| {
            checks.insert(address.to_string(), ConnectionCheck { success, time });
        });
    }

    pub async fn add_contact(
        &self,
        alias: &str,
        address: &str,
        memo: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        contact_add(self.client.as_ref(), alias, address, memo).await
    }

    pub async fn remove_contact(&self, address: &str) -> Result<ServerResponse<String>, ClientError> {
        contact_remove(self.client.as_ref(), address).await
    }
}

pub async fn contact_list(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<Contact>>, ClientError> {
    debug!("ContactList()");
    request(client, ServerMessage::new(MessageType::ContactsList)).await
}

/// Result is `"ok"` on success.
pub async fn contact_add(
    client: &dyn ServerTransport,
    alias: &str,
    address: &str,
    memo: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(alias, address, memo, "ContactAdd()");
    request(
        client,
        ServerMessage::with_params(
            MessageType::ContactAdd,
            vec![json!(alias), json!(address), json!(memo)],
        ),
    )
    .await
}

pub async fn contact_remove(
    client: &dyn ServerTransport,
    address: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(address, "ContactRemove()");
    request(
        client,
        ServerMessage::with_params(MessageType::ContactRemove, vec![json!(address)]),
    )
    .await
}

pub async fn dlc_contact_add(
    client: &dyn ServerTransport,
    dlc_id: &str,
    address: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(dlc_id, address, "DLCContactAdd()");
    request(
        client,
        ServerMessage::with_params(MessageType::DlcContactAdd, vec![json!(dlc_id), json!(address)]),
    )
    .await
}

pub async fn dlc_contact_remove(
    client: &dyn ServerTransport,
    dlc_id: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(dlc_id, "DLCContactRemove()");
    request(
        client,
        ServerMessage::with_params(MessageType::DlcContactRemove, vec![json!(dlc_id)]),
    )
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{app_error, ok, MockTransport};

    fn contacts_json() -> serde_json::Value {
        json!([
            { "alias": "alice", "address": "alice.onion:2862", "memo": "" },
            { "alias": "bob", "address": "bob.onion:2862", "memo": "coffee bets" },
        ])
    }

    #[tokio::test]
    async fn initialize_loads_contacts_in_order() {
        let mock = MockTransport::new(|_| ok(contacts_json()));
        let cache = ContactCache::new(mock);

        cache.initialize().await.unwrap();

        assert!(cache.initialized());
        let contacts = cache.contacts();
        let aliases: Vec<&str> = contacts.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn missing_list_clears_contacts() {
        let cache = ContactCache::new(MockTransport::new(|_| app_error("no wallet")));

        cache.initialize().await.unwrap();

        assert!(cache.initialized());
        assert!(cache.contacts().is_empty());
    }

    #[tokio::test]
    async fn add_does_not_touch_cache() {
        let mock = MockTransport::new(|m| match m.method.as_str() {
            "contacts-list" => ok(contacts_json()),
            "contact-add" => ok(json!("ok")),
            other => panic!("unexpected method {other}"),
        });
        let cache = ContactCache::new(mock.clone());
        cache.initialize().await.unwrap();

        let resp = cache
            .add_contact("carol", "carol.onion:2862", "")
            .await
            .unwrap();

        assert_eq!(resp.result.as_deref(), Some("ok"));
        assert_eq!(cache.contacts().len(), 2);
        assert_eq!(mock.count(MessageType::ContactAdd), 1);
    }

    #[tokio::test]
    async fn uninitialize_resets_state() {
        let cache = ContactCache::new(MockTransport::new(|_| ok(contacts_json())));
        cache.initialize().await.unwrap();
        cache.record_connection_check("alice.onion:2862", Some(true));

        cache.uninitialize();

        assert!(!cache.initialized());
        assert!(cache.contacts().is_empty());
        assert!(cache.connection_check().is_empty());
    }

    #[test]
    fn connection_check_is_recorded_per_address() {
        let cache = ContactCache::new(MockTransport::new(|_| ok(json!(null))));

        cache.record_connection_check("alice.onion:2862", None);
        cache.record_connection_check("alice.onion:2862", Some(false));

        let checks = cache.connection_check();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks["alice.onion:2862"].success, Some(false));
    }
}
