use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::join::join_tolerant;
use crate::message::{MessageType, ServerMessage};
use crate::observable::Observable;
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{IncomingOffer, Offer, OfferWithHex, ServerResponse};

/// Incoming offers and their decoded form, keyed by offer hash.
///
/// Both collections live in one value so a removal drops the list entry and
/// the decoded entry in a single publication.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OfferBook {
    pub offers: Vec<IncomingOffer>,
    pub decoded: HashMap<String, OfferWithHex>,
}

impl OfferBook {
    pub fn contains(&self, hash: &str) -> bool {
        self.offers.iter().any(|o| o.hash == hash) || self.decoded.contains_key(hash)
    }

    fn hash_by_temporary_contract_id(&self, temporary_contract_id: &str) -> Option<String> {
        self.decoded
            .iter()
            .find(|(_, decoded)| decoded.offer.temporary_contract_id == temporary_contract_id)
            .map(|(hash, _)| hash.clone())
    }
}

#[derive(Clone)]
pub struct OfferCache {
    client: Arc<dyn ServerTransport>,
    initialized: Observable<bool>,
    book: Observable<OfferBook>,
}

impl OfferCache {
    pub fn new(client: Arc<dyn ServerTransport>) -> Self {
        Self {
            client,
            initialized: Observable::default(),
            book: Observable::default(),
        }
    }

    pub fn initialized(&self) -> bool {
        *self.initialized.current()
    }

    pub fn initialized_stream(&self) -> WatchStream<Arc<bool>> {
        self.initialized.stream()
    }

    pub fn book(&self) -> Arc<OfferBook> {
        self.book.current()
    }

    pub fn book_stream(&self) -> WatchStream<Arc<OfferBook>> {
        self.book.stream()
    }

    pub fn offers(&self) -> Vec<IncomingOffer> {
        self.book().offers.clone()
    }

    pub fn decoded_offers(&self) -> HashMap<String, OfferWithHex> {
        self.book().decoded.clone()
    }

    pub fn decoded_offer(&self, hash: &str) -> Option<OfferWithHex> {
        self.book().decoded.get(hash).cloned()
    }

    /// Reload the offer list and decode every offer. Offers that fail to
    /// decode are left out of the decoded map.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        let resp = offer_list(self.client.as_ref()).await?;
        let offers = resp.result.unwrap_or_default();
        self.book.publish(OfferBook {
            offers: offers.clone(),
            decoded: HashMap::new(),
        });

        let results = join_tolerant(
            offers
                .iter()
                .map(|offer| try_decode(self.client.as_ref(), &offer.offer_tlv)),
        )
        .await;

        let decoded: HashMap<String, OfferWithHex> = offers
            .iter()
            .zip(results)
            .filter_map(|(offer, decoded)| Some((offer.hash.clone(), decoded.flatten()?)))
            .collect();
        debug!(offers = offers.len(), decoded = decoded.len(), "Offers.initialize()");

        self.book.update(|book| book.decoded = decoded);
        self.initialized.publish(true);
        Ok(())
    }

    pub fn uninitialize(&self) {
        self.initialized.publish(false);
        self.book.publish(OfferBook::default());
    }

    /// List `offer` right away; its decoded form is added by the returned
    /// task once the server answers. An offer already listed under the same
    /// hash is replaced in place, and `None` is returned when that hash is
    /// already decoded.
    pub fn incoming_offer_received(&self, offer: IncomingOffer) -> Option<JoinHandle<()>> {
        let decoded = self.book.update(|book| {
            match book.offers.iter().position(|o| o.hash == offer.hash) {
                Some(index) => book.offers[index] = offer.clone(),
                None => book.offers.push(offer.clone()),
            }
            book.decoded.contains_key(&offer.hash)
        });
        debug!(hash = %offer.hash, decoded, "incoming offer received");
        if decoded {
            return None;
        }

        let cache = self.clone();
        Some(tokio::spawn(async move {
            let Some(decoded) = decode_incoming(cache.client.as_ref(), &offer.offer_tlv).await
            else {
                return;
            };
            cache.book.update(|book| {
                if book.offers.iter().any(|o| o.hash == offer.hash) {
                    book.decoded.insert(offer.hash.clone(), decoded);
                }
            });
        }))
    }

    /// Drop the offer and its decoded entry. Unknown hashes are ignored.
    pub fn incoming_offer_removed(&self, hash: &str) {
        if !self.book().contains(hash) {
            return;
        }
        self.book.update(|book| {
            book.offers.retain(|o| o.hash != hash);
            book.decoded.remove(hash);
        });
    }

    /// Remove on the server, then locally by the hash the server reports.
    pub async fn remove_incoming_offer(
        &self,
        hash: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        let resp = offer_remove(self.client.as_ref(), hash).await?;
        if let Some(removed) = &resp.result {
            self.incoming_offer_removed(removed);
        }
        Ok(resp)
    }

    /// `Ok(None)` when no decoded offer carries `temporary_contract_id`.
    pub async fn remove_incoming_offer_by_temporary_contract_id(
        &self,
        temporary_contract_id: &str,
    ) -> Result<Option<ServerResponse<String>>, ClientError> {
        let Some(hash) = self.book().hash_by_temporary_contract_id(temporary_contract_id) else {
            debug!(temporary_contract_id, "no offer for temporary contract id");
            return Ok(None);
        };
        self.remove_incoming_offer(&hash).await.map(Some)
    }

    /// Result is the new offer's hash.
    pub async fn add_incoming_offer(
        &self,
        offer_tlv: &str,
        peer: &str,
        message: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        offer_add(self.client.as_ref(), offer_tlv, peer, message).await
    }

    /// `offer_tlv_or_temp_id` is either a hex offer TLV or the temporary
    /// contract id of an offer known to the server.
    pub async fn send_incoming_offer(
        &self,
        offer_tlv_or_temp_id: &str,
        peer: &str,
        message: &str,
    ) -> Result<ServerResponse<String>, ClientError> {
        offer_send(self.client.as_ref(), offer_tlv_or_temp_id, peer, message).await
    }
}

async fn try_decode(
    client: &dyn ServerTransport,
    offer_tlv: &str,
) -> Result<Option<OfferWithHex>, ClientError> {
    let resp = decode_offer(client, offer_tlv).await?;
    if let Some(error) = &resp.error {
        warn!(%error, "offer not decoded");
    }
    Ok(resp.result.map(|offer| OfferWithHex {
        offer,
        hex: offer_tlv.to_string(),
    }))
}

/// Any failure, transport or otherwise, maps to `None`.
async fn decode_incoming(client: &dyn ServerTransport, offer_tlv: &str) -> Option<OfferWithHex> {
    match try_decode(client, offer_tlv).await {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "offer decode failed");
            None
        }
    }
}

pub async fn offer_list(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<IncomingOffer>>, ClientError> {
    debug!("OfferList()");
    request(client, ServerMessage::new(MessageType::OffersList)).await
}

pub async fn offer_add(
    client: &dyn ServerTransport,
    offer_tlv: &str,
    peer: &str,
    message: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(peer, message, "OfferAdd()");
    request(
        client,
        ServerMessage::with_params(
            MessageType::OfferAdd,
            vec![json!(offer_tlv), json!(peer), json!(message)],
        ),
    )
    .await
}

pub async fn offer_remove(
    client: &dyn ServerTransport,
    hash: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(hash, "OfferRemove()");
    request(
        client,
        ServerMessage::with_params(MessageType::OfferRemove, vec![json!(hash)]),
    )
    .await
}

pub async fn offer_send(
    client: &dyn ServerTransport,
    offer_tlv_or_temp_id: &str,
    peer: &str,
    message: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(peer, message, "OfferSend()");
    request(
        client,
        ServerMessage::with_params(
            MessageType::OfferSend,
            vec![json!(offer_tlv_or_temp_id), json!(peer), json!(message)],
        ),
    )
    .await
}

pub async fn decode_offer(
    client: &dyn ServerTransport,
    offer_hex: &str,
) -> Result<ServerResponse<Offer>, ClientError> {
    debug!("DecodeOffer()");
    request(
        client,
        ServerMessage::with_params(MessageType::DecodeOffer, vec![json!(offer_hex)]),
    )
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::testing::{app_error, first_param, ok, unreachable_backend, MockTransport, Reply};

    fn incoming_json(hash: &str) -> Value {
        json!({
            "hash": hash,
            "receivedAt": 1_700_000_000,
            "peer": "bob.onion:2862",
            "message": "",
            "offerTLV": format!("tlv-{hash}"),
        })
    }

    fn incoming(hash: &str) -> IncomingOffer {
        serde_json::from_value(incoming_json(hash)).unwrap()
    }

    fn wallet(m: &ServerMessage) -> Reply {
        match m.method.as_str() {
            "offers-list" => ok(json!([incoming_json("h1"), incoming_json("h2"), incoming_json("h3")])),
            "decodeoffer" => {
                let tlv = first_param(m).unwrap_or_default();
                let hash = tlv.trim_start_matches("tlv-");
                ok(json!({ "temporaryContractId": format!("tmp-{hash}"), "feeRate": 5 }))
            }
            "offer-remove" => ok(json!(first_param(m))),
            "offer-add" => ok(json!("h9")),
            "offer-send" => ok(json!("tmp-h9")),
            other => panic!("unexpected method {other}"),
        }
    }

    #[tokio::test]
    async fn initialize_decodes_every_offer() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());

        cache.initialize().await.unwrap();

        assert!(cache.initialized());
        assert_eq!(cache.offers().len(), 3);
        let decoded = cache.decoded_offer("h2").unwrap();
        assert_eq!(decoded.offer.temporary_contract_id, "tmp-h2");
        assert_eq!(decoded.hex, "tlv-h2");
        assert_eq!(mock.count(MessageType::DecodeOffer), 3);
    }

    #[tokio::test]
    async fn unparseable_offer_does_not_abort_batch() {
        let mock = MockTransport::new(|m| match (m.method.as_str(), first_param(m)) {
            ("decodeoffer", Some("tlv-h2")) => ok(json!("not an offer")),
            _ => wallet(m),
        });
        let cache = OfferCache::new(mock);

        cache.initialize().await.unwrap();

        assert!(cache.initialized());
        assert_eq!(cache.offers().len(), 3);
        let decoded = cache.decoded_offers();
        assert_eq!(decoded.len(), 2);
        assert!(!decoded.contains_key("h2"));
    }

    #[tokio::test]
    async fn decode_transport_and_server_errors_are_contained() {
        let mock = MockTransport::new(|m| match (m.method.as_str(), first_param(m)) {
            ("decodeoffer", Some("tlv-h1")) => unreachable_backend(),
            ("decodeoffer", Some("tlv-h3")) => app_error("bad offer"),
            _ => wallet(m),
        });
        let cache = OfferCache::new(mock);

        cache.initialize().await.unwrap();

        assert_eq!(cache.decoded_offers().keys().collect::<Vec<_>>(), vec!["h2"]);
    }

    #[tokio::test]
    async fn list_failure_fails_initialize() {
        let cache = OfferCache::new(MockTransport::new(|_| unreachable_backend()));

        assert!(cache.initialize().await.is_err());
        assert!(!cache.initialized());
    }

    #[tokio::test]
    async fn received_offer_is_listed_before_it_is_decoded() {
        let cache = OfferCache::new(MockTransport::new(wallet));

        let decoding = cache.incoming_offer_received(incoming("h7")).unwrap();

        assert_eq!(cache.offers().len(), 1);
        assert!(cache.decoded_offer("h7").is_none());

        decoding.await.unwrap();
        assert_eq!(
            cache.decoded_offer("h7").map(|d| d.offer.temporary_contract_id),
            Some("tmp-h7".to_string())
        );
    }

    #[tokio::test]
    async fn repeated_offer_is_not_duplicated_or_decoded_again() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());
        cache.initialize().await.unwrap();

        let decoding = cache.incoming_offer_received(incoming("h1"));

        assert!(decoding.is_none());
        assert_eq!(cache.offers().len(), 3);
        assert_eq!(cache.offers().iter().filter(|o| o.hash == "h1").count(), 1);
        assert_eq!(mock.count_with(MessageType::DecodeOffer, "tlv-h1"), 1);
    }

    #[tokio::test]
    async fn offer_received_twice_before_decoding_is_listed_once() {
        let cache = OfferCache::new(MockTransport::new(wallet));

        let first = cache.incoming_offer_received(incoming("h7")).unwrap();
        let second = cache.incoming_offer_received(incoming("h7")).unwrap();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(cache.offers().len(), 1);
        assert_eq!(cache.decoded_offers().len(), 1);
    }

    #[tokio::test]
    async fn removed_offer_drops_both_entries() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());
        cache.initialize().await.unwrap();

        let resp = cache.remove_incoming_offer("h1").await.unwrap();

        assert_eq!(resp.result.as_deref(), Some("h1"));
        assert_eq!(cache.offers().len(), 2);
        assert!(cache.decoded_offer("h1").is_none());
        assert_eq!(mock.count_with(MessageType::OfferRemove, "h1"), 1);
    }

    #[tokio::test]
    async fn removing_unknown_hash_is_noop() {
        let cache = OfferCache::new(MockTransport::new(wallet));
        cache.initialize().await.unwrap();
        let before = cache.book();

        cache.incoming_offer_removed("nope");

        assert_eq!(cache.offers().len(), 3);
        assert_eq!(cache.decoded_offers().len(), 3);
        assert!(Arc::ptr_eq(&before, &cache.book()));
    }

    #[tokio::test]
    async fn removes_by_temporary_contract_id() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());
        cache.initialize().await.unwrap();

        let resp = cache
            .remove_incoming_offer_by_temporary_contract_id("tmp-h3")
            .await
            .unwrap();

        assert!(resp.is_some());
        assert!(!cache.book().contains("h3"));
        assert_eq!(mock.count_with(MessageType::OfferRemove, "h3"), 1);
    }

    #[tokio::test]
    async fn unknown_temporary_contract_id_sends_nothing() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());
        cache.initialize().await.unwrap();

        let resp = cache
            .remove_incoming_offer_by_temporary_contract_id("tmp-zz")
            .await
            .unwrap();

        assert!(resp.is_none());
        assert_eq!(mock.count(MessageType::OfferRemove), 0);
        assert_eq!(cache.offers().len(), 3);
    }

    #[tokio::test]
    async fn add_and_send_pass_arguments_in_order() {
        let mock = MockTransport::new(wallet);
        let cache = OfferCache::new(mock.clone());

        cache
            .add_incoming_offer("a71a00", "bob.onion:2862", "hi")
            .await
            .unwrap();
        cache
            .send_incoming_offer("tmp-h9", "bob.onion:2862", "hi")
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].params, vec![json!("a71a00"), json!("bob.onion:2862"), json!("hi")]);
        assert_eq!(calls[1].method, "offer-send");
    }

    #[tokio::test]
    async fn uninitialize_clears_book() {
        let cache = OfferCache::new(MockTransport::new(wallet));
        cache.initialize().await.unwrap();

        cache.uninitialize();

        assert!(!cache.initialized());
        assert_eq!(*cache.book(), OfferBook::default());
    }
}
