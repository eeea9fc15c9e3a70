//! Wallet, chain and DLC lifecycle calls with no cache behind them. Each one
//! sends a single envelope and hands the typed response back unchanged.
//!
//! Structured results the client never inspects come back as raw JSON.

use serde_json::{json, Value};
use tracing::debug;

use crate::message::{MessageType, ServerMessage};
use crate::server_client::{request, ClientError, ServerTransport};
use crate::types::{Outpoint, ServerResponse};

fn call(method: MessageType, params: Vec<Value>) -> ServerMessage {
    ServerMessage::with_params(method, params)
}

/// `destination` is sent only when given; the server picks one otherwise.
fn from_file(path: &str, destination: Option<&str>) -> Vec<Value> {
    let mut params = vec![json!(path)];
    if let Some(destination) = destination {
        params.push(json!(destination));
    }
    params
}

// Chain and node

pub async fn get_block_count(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<u64>, ClientError> {
    debug!("GetBlockCount()");
    request(client, ServerMessage::new(MessageType::GetBlockCount)).await
}

pub async fn get_filter_count(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<u64>, ClientError> {
    debug!("GetFilterCount()");
    request(client, ServerMessage::new(MessageType::GetFilterCount)).await
}

pub async fn get_filter_header_count(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<u64>, ClientError> {
    debug!("GetFilterHeaderCount()");
    request(client, ServerMessage::new(MessageType::GetFilterHeaderCount)).await
}

pub async fn get_block_header(
    client: &dyn ServerTransport,
    block_hash: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(block_hash, "GetBlockHeader()");
    request(client, call(MessageType::GetBlockHeader, vec![json!(block_hash)])).await
}

pub async fn get_peers(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<String>, ClientError> {
    debug!("GetPeers()");
    request(client, ServerMessage::new(MessageType::GetPeers)).await
}

/// Shuts the wallet server down.
pub async fn stop(client: &dyn ServerTransport) -> Result<ServerResponse<String>, ClientError> {
    debug!("Stop()");
    request(client, ServerMessage::new(MessageType::Stop)).await
}

// Wallet info and balances

pub async fn is_empty(client: &dyn ServerTransport) -> Result<ServerResponse<bool>, ClientError> {
    debug!("IsEmpty()");
    request(client, ServerMessage::new(MessageType::IsEmpty)).await
}

pub async fn wallet_info(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("WalletInfo()");
    request(client, ServerMessage::new(MessageType::WalletInfo)).await
}

pub async fn get_balance(
    client: &dyn ServerTransport,
    in_sats: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(in_sats, "GetBalance()");
    request(client, call(MessageType::GetBalance, vec![json!(in_sats)])).await
}

pub async fn get_confirmed_balance(
    client: &dyn ServerTransport,
    in_sats: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(in_sats, "GetConfirmedBalance()");
    request(client, call(MessageType::GetConfirmedBalance, vec![json!(in_sats)])).await
}

pub async fn get_unconfirmed_balance(
    client: &dyn ServerTransport,
    in_sats: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(in_sats, "GetUnconfirmedBalance()");
    request(client, call(MessageType::GetUnconfirmedBalance, vec![json!(in_sats)])).await
}

pub async fn get_balances(
    client: &dyn ServerTransport,
    in_sats: bool,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(in_sats, "GetBalances()");
    request(client, call(MessageType::GetBalances, vec![json!(in_sats)])).await
}

pub async fn get_transaction(
    client: &dyn ServerTransport,
    txid: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(txid, "GetTransaction()");
    request(client, call(MessageType::GetTransaction, vec![json!(txid)])).await
}

/// With `unlock` set the outpoints are released, otherwise reserved.
pub async fn lock_unspent(
    client: &dyn ServerTransport,
    unlock: bool,
    outpoints: &[Outpoint],
) -> Result<ServerResponse<bool>, ClientError> {
    debug!(unlock, outpoints = outpoints.len(), "LockUnspent()");
    request(
        client,
        call(MessageType::LockUnspent, vec![json!(unlock), json!(outpoints)]),
    )
    .await
}

// DLC lifecycle

/// Result is the hex contract info TLV.
pub async fn create_contract_info(
    client: &dyn ServerTransport,
    announcement_tlv: &str,
    total_collateral: u64,
    payouts: Value,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(total_collateral, "CreateContractInfo()");
    request(
        client,
        call(
            MessageType::CreateContractInfo,
            vec![json!(announcement_tlv), json!(total_collateral), payouts],
        ),
    )
    .await
}

/// The contract locktime is always sent as null so the server leaves it unset.
pub async fn create_dlc_offer(
    client: &dyn ServerTransport,
    contract_info_tlv: &str,
    collateral: u64,
    fee_rate: f64,
    refund_locktime: u64,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(collateral, fee_rate, refund_locktime, "CreateDLCOffer()");
    request(
        client,
        call(
            MessageType::CreateDlcOffer,
            vec![
                json!(contract_info_tlv),
                json!(collateral),
                json!(fee_rate),
                Value::Null,
                json!(refund_locktime),
            ],
        ),
    )
    .await
}

pub async fn get_dlc_offer(
    client: &dyn ServerTransport,
    temporary_contract_id: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(temporary_contract_id, "GetDLCOffer()");
    request(
        client,
        call(MessageType::GetDlcOffer, vec![json!(temporary_contract_id)]),
    )
    .await
}

pub async fn accept_dlc_offer(
    client: &dyn ServerTransport,
    offer_hex: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!("AcceptDLCOffer()");
    request(client, call(MessageType::AcceptDlcOffer, vec![json!(offer_hex)])).await
}

pub async fn accept_dlc_offer_from_file(
    client: &dyn ServerTransport,
    path: &str,
    destination: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(path, ?destination, "AcceptDLCOfferFromFile()");
    request(
        client,
        call(MessageType::AcceptDlcOfferFromFile, from_file(path, destination)),
    )
    .await
}

pub async fn sign_dlc(
    client: &dyn ServerTransport,
    accept_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("SignDLC()");
    request(client, call(MessageType::SignDlc, vec![json!(accept_hex)])).await
}

pub async fn sign_dlc_from_file(
    client: &dyn ServerTransport,
    path: &str,
    destination: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(path, ?destination, "SignDLCFromFile()");
    request(
        client,
        call(MessageType::SignDlcFromFile, from_file(path, destination)),
    )
    .await
}

pub async fn add_dlc_sigs(
    client: &dyn ServerTransport,
    sigs_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("AddDLCSigs()");
    request(client, call(MessageType::AddDlcSigs, vec![json!(sigs_hex)])).await
}

pub async fn add_dlc_sigs_from_file(
    client: &dyn ServerTransport,
    path: &str,
    destination: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(path, ?destination, "AddDLCSigsFromFile()");
    request(
        client,
        call(MessageType::AddDlcSigsFromFile, from_file(path, destination)),
    )
    .await
}

pub async fn add_dlc_sigs_and_broadcast(
    client: &dyn ServerTransport,
    sigs_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("AddDLCSigsAndBroadcast()");
    request(
        client,
        call(MessageType::AddDlcSigsAndBroadcast, vec![json!(sigs_hex)]),
    )
    .await
}

pub async fn add_dlc_sigs_and_broadcast_from_file(
    client: &dyn ServerTransport,
    path: &str,
    destination: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(path, ?destination, "AddDLCSigsAndBroadcastFromFile()");
    request(
        client,
        call(
            MessageType::AddDlcSigsAndBroadcastFromFile,
            from_file(path, destination),
        ),
    )
    .await
}

pub async fn get_dlc_funding_tx(
    client: &dyn ServerTransport,
    contract_id: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(contract_id, "GetDLCFundingTx()");
    request(client, call(MessageType::GetDlcFundingTx, vec![json!(contract_id)])).await
}

pub async fn broadcast_dlc_funding_tx(
    client: &dyn ServerTransport,
    contract_id: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(contract_id, "BroadcastDLCFundingTx()");
    request(
        client,
        call(MessageType::BroadcastDlcFundingTx, vec![json!(contract_id)]),
    )
    .await
}

/// Result is the closing txid, or the raw transaction with `no_broadcast`.
pub async fn execute_dlc(
    client: &dyn ServerTransport,
    contract_id: &str,
    oracle_sigs: &[String],
    no_broadcast: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(contract_id, sigs = oracle_sigs.len(), no_broadcast, "ExecuteDLC()");
    request(
        client,
        call(
            MessageType::ExecuteDlc,
            vec![json!(contract_id), json!(oracle_sigs), json!(no_broadcast)],
        ),
    )
    .await
}

pub async fn execute_dlc_refund(
    client: &dyn ServerTransport,
    contract_id: &str,
    no_broadcast: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(contract_id, no_broadcast, "ExecuteDLCRefund()");
    request(
        client,
        call(
            MessageType::ExecuteDlcRefund,
            vec![json!(contract_id), json!(no_broadcast)],
        ),
    )
    .await
}

// Sending and fee bumps

/// Result is the txid, or the raw transaction with `no_broadcast`.
pub async fn send_to_address(
    client: &dyn ServerTransport,
    address: &str,
    bitcoins: f64,
    sats_per_vbyte: f64,
    no_broadcast: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(address, bitcoins, sats_per_vbyte, no_broadcast, "SendToAddress()");
    request(
        client,
        call(
            MessageType::SendToAddress,
            vec![
                json!(address),
                json!(bitcoins),
                json!(sats_per_vbyte),
                json!(no_broadcast),
            ],
        ),
    )
    .await
}

pub async fn send_from_outpoints(
    client: &dyn ServerTransport,
    outpoints: &[Outpoint],
    bitcoins: f64,
    sats_per_vbyte: f64,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(outpoints = outpoints.len(), bitcoins, sats_per_vbyte, "SendFromOutpoints()");
    request(
        client,
        call(
            MessageType::SendFromOutpoints,
            vec![json!(outpoints), json!(bitcoins), json!(sats_per_vbyte)],
        ),
    )
    .await
}

/// Send the whole balance to `address`.
pub async fn sweep_wallet(
    client: &dyn ServerTransport,
    address: &str,
    sats_per_vbyte: f64,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(address, sats_per_vbyte, "SweepWallet()");
    request(
        client,
        call(
            MessageType::SweepWallet,
            vec![json!(address), json!(sats_per_vbyte)],
        ),
    )
    .await
}

pub async fn send_with_algo(
    client: &dyn ServerTransport,
    address: &str,
    bitcoins: f64,
    sats_per_vbyte: f64,
    algo: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(address, bitcoins, sats_per_vbyte, algo, "SendWithAlgo()");
    request(
        client,
        call(
            MessageType::SendWithAlgo,
            vec![json!(address), json!(bitcoins), json!(sats_per_vbyte), json!(algo)],
        ),
    )
    .await
}

pub async fn sign_psbt(
    client: &dyn ServerTransport,
    psbt: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("SignPSBT()");
    request(client, call(MessageType::SignPsbt, vec![json!(psbt)])).await
}

pub async fn op_return_commit(
    client: &dyn ServerTransport,
    message: &str,
    hash_message: bool,
    sats_per_vbyte: f64,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(hash_message, sats_per_vbyte, "OpReturnCommit()");
    request(
        client,
        call(
            MessageType::OpReturnCommit,
            vec![json!(message), json!(hash_message), json!(sats_per_vbyte)],
        ),
    )
    .await
}

pub async fn bump_fee_rbf(
    client: &dyn ServerTransport,
    txid: &str,
    sats_per_vbyte: f64,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(txid, sats_per_vbyte, "BumpFeeRBF()");
    request(
        client,
        call(MessageType::BumpFeeRbf, vec![json!(txid), json!(sats_per_vbyte)]),
    )
    .await
}

pub async fn bump_fee_cpfp(
    client: &dyn ServerTransport,
    txid: &str,
    sats_per_vbyte: f64,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(txid, sats_per_vbyte, "BumpFeeCPFP()");
    request(
        client,
        call(MessageType::BumpFeeCpfp, vec![json!(txid), json!(sats_per_vbyte)]),
    )
    .await
}

/// Unset bounds go out as null and fall back to the server's defaults.
pub async fn rescan(
    client: &dyn ServerTransport,
    batch_size: Option<u32>,
    start: Option<u32>,
    end: Option<u32>,
    force: bool,
    ignore_creation_time: bool,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(?batch_size, ?start, ?end, force, ignore_creation_time, "Rescan()");
    request(
        client,
        call(
            MessageType::Rescan,
            vec![
                json!(batch_size),
                json!(start),
                json!(end),
                json!(force),
                json!(ignore_creation_time),
            ],
        ),
    )
    .await
}

pub async fn send_raw_transaction(
    client: &dyn ServerTransport,
    tx_hex: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!("SendRawTransaction()");
    request(client, call(MessageType::SendRawTransaction, vec![json!(tx_hex)])).await
}

// UTXOs and accounts

pub async fn get_utxos(client: &dyn ServerTransport) -> Result<ServerResponse<Value>, ClientError> {
    debug!("GetUTXOs()");
    request(client, ServerMessage::new(MessageType::GetUtxos)).await
}

pub async fn list_reserved_utxos(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("ListReservedUTXOs()");
    request(client, ServerMessage::new(MessageType::ListReservedUtxos)).await
}

/// Extended public keys, one per account.
pub async fn get_accounts(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Vec<String>>, ClientError> {
    debug!("GetAccounts()");
    request(client, ServerMessage::new(MessageType::GetAccounts)).await
}

pub async fn get_address_info(
    client: &dyn ServerTransport,
    address: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(address, "GetAddressInfo()");
    request(client, call(MessageType::GetAddressInfo, vec![json!(address)])).await
}

pub async fn create_new_account(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("CreateNewAccount()");
    request(client, ServerMessage::new(MessageType::CreateNewAccount)).await
}

pub async fn get_dlc_wallet_accounting(
    client: &dyn ServerTransport,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("GetDLCWalletAccounting()");
    request(client, ServerMessage::new(MessageType::GetDlcWalletAccounting)).await
}

// Wallet management. A missing wallet name or passphrase goes out as null.

pub async fn import_seed(
    client: &dyn ServerTransport,
    wallet_name: &str,
    mnemonic: &str,
    passphrase: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(wallet_name, "ImportSeed()");
    request(
        client,
        call(
            MessageType::ImportSeed,
            vec![json!(wallet_name), json!(mnemonic), json!(passphrase)],
        ),
    )
    .await
}

pub async fn import_xprv(
    client: &dyn ServerTransport,
    wallet_name: &str,
    xprv: &str,
    passphrase: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(wallet_name, "ImportXprv()");
    request(
        client,
        call(
            MessageType::ImportXprv,
            vec![json!(wallet_name), json!(xprv), json!(passphrase)],
        ),
    )
    .await
}

pub async fn load_wallet(
    client: &dyn ServerTransport,
    wallet_name: Option<&str>,
    passphrase: Option<&str>,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(?wallet_name, "LoadWallet()");
    request(
        client,
        call(MessageType::LoadWallet, vec![json!(wallet_name), json!(passphrase)]),
    )
    .await
}

/// Result is the mnemonic, one word per entry.
pub async fn export_seed(
    client: &dyn ServerTransport,
    wallet_name: Option<&str>,
    passphrase: Option<&str>,
) -> Result<ServerResponse<Vec<String>>, ClientError> {
    debug!(?wallet_name, "ExportSeed()");
    request(
        client,
        call(MessageType::ExportSeed, vec![json!(wallet_name), json!(passphrase)]),
    )
    .await
}

pub async fn get_seed_backup_time(
    client: &dyn ServerTransport,
    wallet_name: Option<&str>,
    passphrase: Option<&str>,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!(?wallet_name, "GetSeedBackupTime()");
    request(
        client,
        call(
            MessageType::GetSeedBackupTime,
            vec![json!(wallet_name), json!(passphrase)],
        ),
    )
    .await
}

/// `path` is on the server's filesystem.
pub async fn backup_wallet(
    client: &dyn ServerTransport,
    path: &str,
) -> Result<ServerResponse<String>, ClientError> {
    debug!(path, "BackupWallet()");
    request(client, call(MessageType::BackupWallet, vec![json!(path)])).await
}

// Decoders

pub async fn decode_sign(
    client: &dyn ServerTransport,
    sign_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("DecodeSign()");
    request(client, call(MessageType::DecodeSign, vec![json!(sign_hex)])).await
}

pub async fn decode_accept(
    client: &dyn ServerTransport,
    accept_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("DecodeAccept()");
    request(client, call(MessageType::DecodeAccept, vec![json!(accept_hex)])).await
}

pub async fn decode_announcement(
    client: &dyn ServerTransport,
    announcement_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("DecodeAnnouncement()");
    request(
        client,
        call(MessageType::DecodeAnnouncement, vec![json!(announcement_hex)]),
    )
    .await
}

pub async fn decode_attestments(
    client: &dyn ServerTransport,
    attestment_hex: &str,
) -> Result<ServerResponse<Value>, ClientError> {
    debug!("DecodeAttestments()");
    request(
        client,
        call(MessageType::DecodeAttestments, vec![json!(attestment_hex)]),
    )
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{app_error, ok, unreachable_backend, MockTransport};

    fn last_params(mock: &MockTransport) -> Vec<Value> {
        mock.calls().pop().map(|m| m.params).unwrap_or_default()
    }

    #[tokio::test]
    async fn dlc_offer_leaves_locktime_unset() {
        let mock = MockTransport::new(|_| ok(json!("a71a00")));

        let resp = create_dlc_offer(mock.as_ref(), "fdd82e", 50_000, 3.5, 800_000)
            .await
            .unwrap();

        assert_eq!(resp.result.as_deref(), Some("a71a00"));
        assert_eq!(mock.count(MessageType::CreateDlcOffer), 1);
        assert_eq!(
            last_params(&mock),
            vec![json!("fdd82e"), json!(50_000), json!(3.5), Value::Null, json!(800_000)]
        );
    }

    #[tokio::test]
    async fn file_destination_is_sent_only_when_given() {
        let mock = MockTransport::new(|_| ok(json!("ok")));

        accept_dlc_offer_from_file(mock.as_ref(), "/tmp/offer", None)
            .await
            .unwrap();
        assert_eq!(last_params(&mock), vec![json!("/tmp/offer")]);

        sign_dlc_from_file(mock.as_ref(), "/tmp/accept", Some("/tmp/sign"))
            .await
            .unwrap();
        assert_eq!(last_params(&mock), vec![json!("/tmp/accept"), json!("/tmp/sign")]);

        add_dlc_sigs_and_broadcast_from_file(mock.as_ref(), "/tmp/sign", None)
            .await
            .unwrap();
        let calls = mock.calls();
        assert_eq!(calls[2].method, "adddlcsigsandbroadcastfromfile");
        assert_eq!(calls[2].params, vec![json!("/tmp/sign")]);
    }

    #[tokio::test]
    async fn missing_wallet_name_and_passphrase_are_null() {
        let mock = MockTransport::new(|_| ok(json!("loaded")));

        load_wallet(mock.as_ref(), None, None).await.unwrap();
        assert_eq!(last_params(&mock), vec![Value::Null, Value::Null]);

        import_seed(mock.as_ref(), "hot", "abandon ability", None)
            .await
            .unwrap();
        assert_eq!(
            last_params(&mock),
            vec![json!("hot"), json!("abandon ability"), Value::Null]
        );
    }

    #[tokio::test]
    async fn send_to_address_keeps_argument_order() {
        let mock = MockTransport::new(|_| ok(json!("txid")));

        send_to_address(mock.as_ref(), "bcrt1qxyz", 0.5, 2.0, true)
            .await
            .unwrap();

        assert_eq!(
            last_params(&mock),
            vec![json!("bcrt1qxyz"), json!(0.5), json!(2.0), json!(true)]
        );
    }

    #[tokio::test]
    async fn sweep_wallet_sends_address_and_fee_rate() {
        let mock = MockTransport::new(|_| ok(json!("txid")));

        sweep_wallet(mock.as_ref(), "bcrt1qxyz", 4.0).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].method, "sweepwallet");
        assert_eq!(calls[0].params, vec![json!("bcrt1qxyz"), json!(4.0)]);
    }

    #[tokio::test]
    async fn execute_dlc_sends_signatures_as_list() {
        let mock = MockTransport::new(|_| ok(json!("closing-tx")));
        let sigs = vec!["sig1".to_string(), "sig2".to_string()];

        execute_dlc(mock.as_ref(), "cid", &sigs, false).await.unwrap();

        assert_eq!(
            last_params(&mock),
            vec![json!("cid"), json!(["sig1", "sig2"]), json!(false)]
        );
    }

    #[tokio::test]
    async fn rescan_sends_unset_bounds_as_null() {
        let mock = MockTransport::new(|_| ok(json!("Rescan started.")));

        rescan(mock.as_ref(), None, Some(100), None, true, false)
            .await
            .unwrap();

        assert_eq!(
            last_params(&mock),
            vec![Value::Null, json!(100), Value::Null, json!(true), json!(false)]
        );
    }

    #[tokio::test]
    async fn outpoints_are_sent_as_objects() {
        let mock = MockTransport::new(|_| ok(json!(true)));
        let outpoints = vec![Outpoint {
            txid: "ab".repeat(32),
            vout: 1,
        }];

        let resp = lock_unspent(mock.as_ref(), false, &outpoints).await.unwrap();

        assert_eq!(resp.result, Some(true));
        assert_eq!(
            last_params(&mock),
            vec![json!(false), json!([{ "txid": "ab".repeat(32), "vout": 1 }])]
        );
    }

    #[tokio::test]
    async fn counts_and_errors_pass_through() {
        let mock = MockTransport::new(|m| match m.method.as_str() {
            "getblockcount" => ok(json!(812_000)),
            "getbalance" => app_error("wallet not loaded"),
            _ => unreachable_backend(),
        });

        let height = get_block_count(mock.as_ref()).await.unwrap();
        assert_eq!(height.result, Some(812_000));

        let balance = get_balance(mock.as_ref(), true).await.unwrap();
        assert_eq!(balance.result, None);
        assert_eq!(balance.error.as_deref(), Some("wallet not loaded"));

        assert!(get_peers(mock.as_ref()).await.is_err());
    }
}
