use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend methods this client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    GetVersion,
    ZipDataDir,
    GetInfo,
    GetDlcHostAddress,
    EstimateFee,
    GetNewAddress,
    LabelAddress,
    DropAddressLabel,
    GetAddressLabels,
    DropAddressLabels,
    GetAddresses,
    GetSpentAddresses,
    GetFundedAddresses,
    GetUnusedAddresses,
    ContactsList,
    ContactAdd,
    ContactRemove,
    DlcContactAdd,
    DlcContactRemove,
    GetDlcs,
    GetDlc,
    CancelDlc,
    DecodeContractInfo,
    DecodeOffer,
    OffersList,
    OfferAdd,
    OfferRemove,
    OfferSend,
    GetBlockCount,
    GetFilterCount,
    GetFilterHeaderCount,
    GetBlockHeader,
    GetPeers,
    Stop,
    IsEmpty,
    WalletInfo,
    GetBalance,
    GetConfirmedBalance,
    GetUnconfirmedBalance,
    GetBalances,
    GetTransaction,
    LockUnspent,
    CreateContractInfo,
    CreateDlcOffer,
    GetDlcOffer,
    AcceptDlcOffer,
    AcceptDlcOfferFromFile,
    SignDlc,
    SignDlcFromFile,
    AddDlcSigs,
    AddDlcSigsFromFile,
    AddDlcSigsAndBroadcast,
    AddDlcSigsAndBroadcastFromFile,
    GetDlcFundingTx,
    BroadcastDlcFundingTx,
    ExecuteDlc,
    ExecuteDlcRefund,
    SendToAddress,
    SendFromOutpoints,
    SweepWallet,
    SendWithAlgo,
    SignPsbt,
    OpReturnCommit,
    BumpFeeRbf,
    BumpFeeCpfp,
    Rescan,
    GetUtxos,
    ListReservedUtxos,
    GetAccounts,
    GetAddressInfo,
    CreateNewAccount,
    ImportSeed,
    ImportXprv,
    LoadWallet,
    ExportSeed,
    GetSeedBackupTime,
    SendRawTransaction,
    GetDlcWalletAccounting,
    BackupWallet,
    DecodeSign,
    DecodeAccept,
    DecodeAnnouncement,
    DecodeAttestments,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::GetVersion => "getversion",
            MessageType::ZipDataDir => "zipdatadir",
            MessageType::GetInfo => "getinfo",
            MessageType::GetDlcHostAddress => "getdlchostaddress",
            MessageType::EstimateFee => "estimatefee",
            MessageType::GetNewAddress => "getnewaddress",
            MessageType::LabelAddress => "labeladdress",
            MessageType::DropAddressLabel => "dropaddresslabel",
            MessageType::GetAddressLabels => "getaddresslabels",
            MessageType::DropAddressLabels => "dropaddresslabels",
            MessageType::GetAddresses => "getaddresses",
            MessageType::GetSpentAddresses => "getspentaddresses",
            MessageType::GetFundedAddresses => "getfundedaddresses",
            MessageType::GetUnusedAddresses => "getunusedaddresses",
            MessageType::ContactsList => "contacts-list",
            MessageType::ContactAdd => "contact-add",
            MessageType::ContactRemove => "contact-remove",
            MessageType::DlcContactAdd => "dlc-contact-add",
            MessageType::DlcContactRemove => "dlc-contact-remove",
            MessageType::GetDlcs => "getdlcs",
            MessageType::GetDlc => "getdlc",
            MessageType::CancelDlc => "canceldlc",
            MessageType::DecodeContractInfo => "decodecontractinfo",
            MessageType::DecodeOffer => "decodeoffer",
            MessageType::OffersList => "offers-list",
            MessageType::OfferAdd => "offer-add",
            MessageType::OfferRemove => "offer-remove",
            MessageType::OfferSend => "offer-send",
            MessageType::GetBlockCount => "getblockcount",
            MessageType::GetFilterCount => "getfiltercount",
            MessageType::GetFilterHeaderCount => "getfilterheadercount",
            MessageType::GetBlockHeader => "getblockheader",
            MessageType::GetPeers => "getpeers",
            MessageType::Stop => "stop",
            MessageType::IsEmpty => "isempty",
            MessageType::WalletInfo => "walletinfo",
            MessageType::GetBalance => "getbalance",
            MessageType::GetConfirmedBalance => "getconfirmedbalance",
            MessageType::GetUnconfirmedBalance => "getunconfirmedbalance",
            MessageType::GetBalances => "getbalances",
            MessageType::GetTransaction => "gettransaction",
            MessageType::LockUnspent => "lockunspent",
            MessageType::CreateContractInfo => "createcontractinfo",
            MessageType::CreateDlcOffer => "createdlcoffer",
            MessageType::GetDlcOffer => "getdlcoffer",
            MessageType::AcceptDlcOffer => "acceptdlcoffer",
            MessageType::AcceptDlcOfferFromFile => "acceptdlcofferfromfile",
            MessageType::SignDlc => "signdlc",
            MessageType::SignDlcFromFile => "signdlcfromfile",
            MessageType::AddDlcSigs => "adddlcsigs",
            MessageType::AddDlcSigsFromFile => "adddlcsigsfromfile",
            MessageType::AddDlcSigsAndBroadcast => "adddlcsigsandbroadcast",
            MessageType::AddDlcSigsAndBroadcastFromFile => "adddlcsigsandbroadcastfromfile",
            MessageType::GetDlcFundingTx => "getdlcfundingtx",
            MessageType::BroadcastDlcFundingTx => "broadcastdlcfundingtx",
            MessageType::ExecuteDlc => "executedlc",
            MessageType::ExecuteDlcRefund => "executedlcrefund",
            MessageType::SendToAddress => "sendtoaddress",
            MessageType::SendFromOutpoints => "sendfromoutpoints",
            MessageType::SweepWallet => "sweepwallet",
            MessageType::SendWithAlgo => "sendwithalgo",
            MessageType::SignPsbt => "signpsbt",
            MessageType::OpReturnCommit => "opreturncommit",
            MessageType::BumpFeeRbf => "bumpfeerbf",
            MessageType::BumpFeeCpfp => "bumpfeecpfp",
            MessageType::Rescan => "rescan",
            MessageType::GetUtxos => "getutxos",
            MessageType::ListReservedUtxos => "listreservedutxos",
            MessageType::GetAccounts => "getaccounts",
            MessageType::GetAddressInfo => "getaddressinfo",
            MessageType::CreateNewAccount => "createnewaccount",
            MessageType::ImportSeed => "importseed",
            MessageType::ImportXprv => "importxprv",
            MessageType::LoadWallet => "loadwallet",
            MessageType::ExportSeed => "exportseed",
            MessageType::GetSeedBackupTime => "getseedbackuptime",
            MessageType::SendRawTransaction => "sendrawtransaction",
            MessageType::GetDlcWalletAccounting => "getdlcwalletaccounting",
            MessageType::BackupWallet => "backupwallet",
            MessageType::DecodeSign => "decodesign",
            MessageType::DecodeAccept => "decodeaccept",
            MessageType::DecodeAnnouncement => "decodeannouncement",
            MessageType::DecodeAttestments => "decodeattestments",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request envelope: a method name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl ServerMessage {
    pub fn new(method: MessageType) -> Self {
        Self::raw(method.as_str(), Vec::new())
    }

    pub fn with_params(method: MessageType, params: Vec<Value>) -> Self {
        Self::raw(method.as_str(), params)
    }

    /// Build an envelope for a method outside [`MessageType`].
    pub fn raw(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// An envelope without a method carries nothing the server can act on.
    pub fn is_empty(&self) -> bool {
        self.method.trim().is_empty()
    }
}
