use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response envelope returned by the wallet server.
///
/// A well-formed response populates exactly one of `result` or `error`. The
/// client never interprets `error`; it is handed to the caller as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Default for ServerResponse<T> {
    fn default() -> Self {
        Self {
            result: None,
            error: None,
        }
    }
}

impl<T> ServerResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl ServerResponse<Value> {
    /// Reinterpret the raw `result` as `T`. A JSON `null` result maps to `None`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ServerResponse<T>, serde_json::Error> {
        let result = match self.result {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value)?),
        };
        Ok(ServerResponse {
            result,
            error: self.error,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Node information returned by `getinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoResponse {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub tor_started: Option<bool>,
    #[serde(default)]
    pub syncing: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedAddress {
    pub address: String,
    /// Balance in satoshis.
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLabels {
    pub address: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Reference to one transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: String,
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub alias: String,
    pub address: String,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlcContract {
    pub dlc_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    /// Hex encoded contract info TLV.
    pub contract_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded form of a contract info TLV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    #[serde(default)]
    pub total_collateral: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingOffer {
    pub hash: String,
    #[serde(default)]
    pub received_at: Option<u64>,
    #[serde(default)]
    pub peer: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "offerTLV")]
    pub offer_tlv: String,
}

/// Decoded DLC offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub temporary_contract_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferWithHex {
    pub offer: Offer,
    pub hex: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_maps_null_result_to_none() {
        let raw = ServerResponse::ok(Value::Null);
        let typed: ServerResponse<String> = raw.decode().expect("decode");
        assert_eq!(typed.result, None);
        assert_eq!(typed.error, None);
    }

    #[test]
    fn decode_keeps_error_field() {
        let raw: ServerResponse<Value> =
            serde_json::from_value(json!({ "result": null, "error": "wallet locked" })).unwrap();
        let typed: ServerResponse<Vec<Contact>> = raw.decode().unwrap();
        assert!(typed.is_error());
        assert_eq!(typed.error.as_deref(), Some("wallet locked"));
    }

    #[test]
    fn dlc_contract_keeps_unknown_fields() {
        let dlc: DlcContract = serde_json::from_value(json!({
            "dlcId": "abc",
            "state": "Offered",
            "contractInfo": "fdd82e",
            "isInitiator": true,
        }))
        .unwrap();
        assert_eq!(dlc.dlc_id, "abc");
        assert_eq!(dlc.peer, None);
        assert_eq!(dlc.extra.get("isInitiator"), Some(&json!(true)));
    }

    #[test]
    fn incoming_offer_uses_wire_names() {
        let offer: IncomingOffer = serde_json::from_value(json!({
            "hash": "h1",
            "receivedAt": 1700000000,
            "peer": "peer.onion:2862",
            "message": "hi",
            "offerTLV": "a71a00",
        }))
        .unwrap();
        assert_eq!(offer.offer_tlv, "a71a00");
        assert_eq!(offer.received_at, Some(1_700_000_000));
    }
}
