//! Transaction model, canonical encoding and atomic groups
//!
//! The canonical encoding is msgpack with the algod wire names (`snd`,
//! `fv`, `apar`, ...) as map keys in lexicographic order and zero values
//! omitted. Transaction and group identifiers are SHA-512/256 hashes over
//! domain-separated encodings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::io::Cursor;

use crate::address::Address;
use crate::{AlgoXzenError, Result};

/// Protocol byte limits for asset parameters and notes
pub const MAX_UNIT_NAME_BYTES: usize = 8;
pub const MAX_ASSET_NAME_BYTES: usize = 32;
pub const MAX_ASSET_URL_BYTES: usize = 96;
pub const MAX_NOTE_BYTES: usize = 1024;
pub const MAX_GROUP_SIZE: usize = 16;
/// Rounds a transaction stays valid after the params fetch
pub const VALIDITY_WINDOW: u64 = 1000;

const TX_DOMAIN: &[u8] = b"TX";
const GROUP_DOMAIN: &[u8] = b"TG";

/// Network-supplied parameters shared by every transaction built from one fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Per-byte fee suggested by the node
    pub fee: u64,
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 genesis hash
    pub genesis_hash: String,
}

impl SuggestedParams {
    /// Flat fee applied to each transaction.
    ///
    /// Group members must carry identical fee fields, so the fee does not
    /// depend on encoded size.
    pub fn flat_fee(&self) -> u64 {
        self.fee.max(self.min_fee)
    }
}

/// 32-byte group identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId([u8; 32]);

impl GroupId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.to_base64())
    }
}

impl Serialize for GroupId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(raw).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("group id must be 32 bytes"))?;
        Ok(Self(arr))
    }
}

/// Base32 (no padding) transaction identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_hash(hash: &[u8]) -> Self {
        Self(BASE32_NOPAD.encode(hash))
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte strings travel as msgpack `bin`, not as arrays of integers
struct Bin<'a>(&'a [u8]);

impl Serialize for Bin<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_bytes(self.0)
    }
}

mod bin {
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(value)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                out.push(b);
            }
            Ok(out)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        d.deserialize_bytes(BytesVisitor)
    }
}

mod bin32 {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let bytes = super::bin::deserialize(d)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::invalid_length(len, &"32 bytes"))
    }
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Asset creation parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: String,
    pub metadata_hash: Vec<u8>,
    pub manager: Address,
    pub reserve: Address,
    pub freeze: Address,
    pub clawback: Address,
}

impl AssetParams {
    /// Single-unit, indivisible asset with every role held by `creator`.
    ///
    /// Names and URL are truncated to their byte limits.
    pub fn unique(
        creator: &Address,
        unit_name: &str,
        asset_name: &str,
        url: &str,
        metadata_hash: [u8; 32],
    ) -> Self {
        Self {
            total: 1,
            decimals: 0,
            default_frozen: false,
            unit_name: truncate_bytes(unit_name, MAX_UNIT_NAME_BYTES).to_string(),
            asset_name: truncate_bytes(asset_name, MAX_ASSET_NAME_BYTES).to_string(),
            url: truncate_bytes(url, MAX_ASSET_URL_BYTES).to_string(),
            metadata_hash: metadata_hash.to_vec(),
            manager: creator.clone(),
            reserve: creator.clone(),
            freeze: creator.clone(),
            clawback: creator.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit_name.len() > MAX_UNIT_NAME_BYTES {
            return Err(AlgoXzenError::invalid_input("Unit name exceeds 8 bytes"));
        }
        if self.asset_name.len() > MAX_ASSET_NAME_BYTES {
            return Err(AlgoXzenError::invalid_input("Asset name exceeds 32 bytes"));
        }
        if self.url.len() > MAX_ASSET_URL_BYTES {
            return Err(AlgoXzenError::invalid_input("Asset URL exceeds 96 bytes"));
        }
        if self.metadata_hash.len() != 32 {
            return Err(AlgoXzenError::invalid_input(
                "Asset metadata hash must be 32 bytes",
            ));
        }
        Ok(())
    }
}

/// Transaction body by type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionKind {
    Payment { receiver: Address, amount: u64 },
    AssetCreate { params: AssetParams },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 genesis hash
    pub genesis_hash: String,
    pub group: Option<GroupId>,
    pub note: Option<Vec<u8>>,
    pub kind: TransactionKind,
}

/// Asset parameters under their wire names, in canonical key order
#[derive(Default, Serialize, Deserialize)]
struct WireAssetParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "bin")]
    am: Vec<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    an: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    au: String,
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    c: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default")]
    dc: u32,
    #[serde(default, skip_serializing_if = "is_default")]
    df: bool,
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    f: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    m: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    r: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default")]
    t: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    un: String,
}

impl From<&AssetParams> for WireAssetParams {
    fn from(p: &AssetParams) -> Self {
        Self {
            am: p.metadata_hash.clone(),
            an: p.asset_name.clone(),
            au: p.url.clone(),
            c: *p.clawback.public_key(),
            dc: p.decimals,
            df: p.default_frozen,
            f: *p.freeze.public_key(),
            m: *p.manager.public_key(),
            r: *p.reserve.public_key(),
            t: p.total,
            un: p.unit_name.clone(),
        }
    }
}

impl From<WireAssetParams> for AssetParams {
    fn from(w: WireAssetParams) -> Self {
        Self {
            total: w.t,
            decimals: w.dc,
            default_frozen: w.df,
            unit_name: w.un,
            asset_name: w.an,
            url: w.au,
            metadata_hash: w.am,
            manager: Address::from_public_key(w.m),
            reserve: Address::from_public_key(w.r),
            freeze: Address::from_public_key(w.f),
            clawback: Address::from_public_key(w.c),
        }
    }
}

/// Transaction under its wire names.
///
/// Keys are declared in lexicographic order and zero values are omitted,
/// which together with `to_vec_named` gives the canonical msgpack form.
#[derive(Default, Serialize, Deserialize)]
struct WireTxn {
    #[serde(default, skip_serializing_if = "is_default")]
    amt: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apar: Option<WireAssetParams>,
    #[serde(default, skip_serializing_if = "is_default")]
    fee: u64,
    #[serde(default, skip_serializing_if = "is_default")]
    fv: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    gen: String,
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    gh: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    grp: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default")]
    lv: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "bin")]
    note: Vec<u8>,
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    rcv: [u8; 32],
    #[serde(default, skip_serializing_if = "is_default", with = "bin32")]
    snd: [u8; 32],
    #[serde(rename = "type")]
    tx_type: String,
}

impl TryFrom<&Transaction> for WireTxn {
    type Error = AlgoXzenError;

    fn try_from(txn: &Transaction) -> Result<Self> {
        let gh: [u8; 32] = BASE64
            .decode(&txn.genesis_hash)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| AlgoXzenError::invalid_input("Genesis hash must be 32 base64 bytes"))?;
        let mut wire = WireTxn {
            fee: txn.fee,
            fv: txn.first_valid,
            gen: txn.genesis_id.clone(),
            gh,
            grp: txn.group.map(|g| g.0).unwrap_or_default(),
            lv: txn.last_valid,
            note: txn.note.clone().unwrap_or_default(),
            snd: *txn.sender.public_key(),
            ..Default::default()
        };
        match &txn.kind {
            TransactionKind::Payment { receiver, amount } => {
                wire.tx_type = "pay".into();
                wire.rcv = *receiver.public_key();
                wire.amt = *amount;
            }
            TransactionKind::AssetCreate { params } => {
                wire.tx_type = "acfg".into();
                wire.apar = Some(params.into());
            }
        }
        Ok(wire)
    }
}

impl TryFrom<WireTxn> for Transaction {
    type Error = AlgoXzenError;

    fn try_from(wire: WireTxn) -> Result<Self> {
        let kind = match wire.tx_type.as_str() {
            "pay" => TransactionKind::Payment {
                receiver: Address::from_public_key(wire.rcv),
                amount: wire.amt,
            },
            "acfg" => {
                let params = wire.apar.ok_or_else(|| {
                    AlgoXzenError::invalid_input("Asset config transaction without params")
                })?;
                TransactionKind::AssetCreate {
                    params: params.into(),
                }
            }
            other => {
                return Err(AlgoXzenError::invalid_input(format!(
                    "Unsupported transaction type {:?}",
                    other
                )))
            }
        };
        Ok(Self {
            sender: Address::from_public_key(wire.snd),
            fee: wire.fee,
            first_valid: wire.fv,
            last_valid: wire.lv,
            genesis_id: wire.gen,
            genesis_hash: BASE64.encode(wire.gh),
            group: (!is_default(&wire.grp)).then_some(GroupId(wire.grp)),
            note: (!wire.note.is_empty()).then_some(wire.note),
            kind,
        })
    }
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        WireTxn::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(s)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let wire = WireTxn::deserialize(d)?;
        Transaction::try_from(wire).map_err(serde::de::Error::custom)
    }
}

impl Transaction {
    fn with_params(
        params: &SuggestedParams,
        sender: &Address,
        note: Option<Vec<u8>>,
        kind: TransactionKind,
    ) -> Result<Self> {
        if let Some(ref n) = note {
            if n.len() > MAX_NOTE_BYTES {
                return Err(AlgoXzenError::invalid_input(format!(
                    "Note is {} bytes, limit is {}",
                    n.len(),
                    MAX_NOTE_BYTES
                )));
            }
        }
        let note = note.filter(|n| !n.is_empty());
        Ok(Self {
            sender: sender.clone(),
            fee: params.flat_fee(),
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash.clone(),
            group: None,
            note,
            kind,
        })
    }

    pub fn payment(
        params: &SuggestedParams,
        sender: &Address,
        receiver: &Address,
        amount: u64,
        note: Option<Vec<u8>>,
    ) -> Result<Self> {
        Self::with_params(
            params,
            sender,
            note,
            TransactionKind::Payment {
                receiver: receiver.clone(),
                amount,
            },
        )
    }

    pub fn asset_create(
        params: &SuggestedParams,
        sender: &Address,
        asset: AssetParams,
        note: Option<Vec<u8>>,
    ) -> Result<Self> {
        asset.validate()?;
        Self::with_params(
            params,
            sender,
            note,
            TransactionKind::AssetCreate { params: asset },
        )
    }

    /// Canonical msgpack bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn encode_base64(&self) -> Result<String> {
        Ok(BASE64.encode(self.encode()?))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn decode_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64.decode(encoded.trim())?;
        Self::decode(&bytes)
    }

    fn id_hash(&self) -> Result<[u8; 32]> {
        let mut hasher = Sha512_256::new();
        hasher.update(TX_DOMAIN);
        hasher.update(self.encode()?);
        let mut result = [0u8; 32];
        result.copy_from_slice(&hasher.finalize());
        Ok(result)
    }

    pub fn id(&self) -> Result<TransactionId> {
        Ok(TransactionId::from_hash(&self.id_hash()?))
    }

    /// True when `other` was built from the same params fetch
    pub fn shares_params_with(&self, other: &Transaction) -> bool {
        self.fee == other.fee
            && self.first_valid == other.first_valid
            && self.last_valid == other.last_valid
            && self.genesis_id == other.genesis_id
            && self.genesis_hash == other.genesis_hash
    }

    pub fn is_asset_create(&self) -> bool {
        matches!(self.kind, TransactionKind::AssetCreate { .. })
    }
}

#[derive(Serialize)]
struct WireGroup<'a> {
    txlist: Vec<Bin<'a>>,
}

/// Compute the group id over the un-grouped transactions
pub fn compute_group_id(txns: &[Transaction]) -> Result<GroupId> {
    if txns.is_empty() || txns.len() > MAX_GROUP_SIZE {
        return Err(AlgoXzenError::invalid_input(format!(
            "A group holds 1 to {} transactions, got {}",
            MAX_GROUP_SIZE,
            txns.len()
        )));
    }
    let hashes = txns
        .iter()
        .map(|txn| {
            let mut ungrouped = txn.clone();
            ungrouped.group = None;
            ungrouped.id_hash()
        })
        .collect::<Result<Vec<_>>>()?;
    let tx_list: Vec<Bin<'_>> = hashes.iter().map(|h| Bin(h)).collect();
    let encoded = rmp_serde::to_vec_named(&WireGroup { txlist: tx_list })?;

    let mut hasher = Sha512_256::new();
    hasher.update(GROUP_DOMAIN);
    hasher.update(encoded);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hasher.finalize());
    Ok(GroupId(result))
}

/// Ordered transactions sharing one group id; committed or rejected together
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionGroup {
    group_id: GroupId,
    txns: Vec<Transaction>,
}

impl TransactionGroup {
    /// Assign a shared group id to `txns`.
    ///
    /// Every member must carry the fee, validity window and genesis fields of
    /// a single params fetch.
    pub fn new(mut txns: Vec<Transaction>) -> Result<Self> {
        if let Some(first) = txns.first() {
            if !txns.iter().all(|t| t.shares_params_with(first)) {
                return Err(AlgoXzenError::invalid_input(
                    "Group transactions must share suggested params",
                ));
            }
        }
        let group_id = compute_group_id(&txns)?;
        for txn in &mut txns {
            txn.group = Some(group_id);
        }
        Ok(Self { group_id, txns })
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txns
    }

    pub fn len(&self) -> usize {
        self.txns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    pub fn ids(&self) -> Result<Vec<TransactionId>> {
        self.txns.iter().map(Transaction::id).collect()
    }
}

/// A transaction together with the wallet's signature over its encoding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(with = "bin")]
    pub sig: Vec<u8>,
    pub txn: Transaction,
}

impl SignedTransaction {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }
}

/// Body submitted to `POST /v2/transactions`: the signed transactions'
/// msgpack encodings, back to back
pub fn encode_signed_group(signed: &[SignedTransaction]) -> Result<Vec<u8>> {
    if signed.is_empty() {
        return Err(AlgoXzenError::invalid_input("Nothing to submit"));
    }
    let mut body = Vec::new();
    for stxn in signed {
        body.extend(stxn.encode()?);
    }
    Ok(body)
}

/// Split a submission body back into its signed transactions
pub fn decode_signed_group(body: &[u8]) -> Result<Vec<SignedTransaction>> {
    let mut cursor = Cursor::new(body);
    let mut signed = Vec::new();
    while (cursor.position() as usize) < body.len() {
        signed.push(rmp_serde::from_read(&mut cursor)?);
    }
    if signed.is_empty() {
        return Err(AlgoXzenError::invalid_input("Nothing to submit"));
    }
    Ok(signed)
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
