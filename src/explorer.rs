//! Block explorer links and indexer search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{is_base32_char, Address};
use crate::config::AlgoXzenConfig;
use crate::node::read_json;
use crate::{AlgoXzenError, Result};

const SEARCH_LIMIT: u32 = 10;
const BASE32_TXID_LEN: usize = 52;

/// Deep links into a block explorer
#[derive(Clone, Debug)]
pub struct ExplorerLinks {
    base: String,
}

impl ExplorerLinks {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AlgoXzenConfig) -> Self {
        Self::new(&config.explorer_url)
    }

    pub fn transaction(&self, txid: &str) -> String {
        format!("{}/tx/{}", self.base, txid)
    }

    pub fn asset(&self, asset_id: u64) -> String {
        format!("{}/asset/{}", self.base, asset_id)
    }
}

/// What a free-text search refers to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchQuery {
    Account(Address),
    Transaction(String),
    Recent,
}

impl SearchQuery {
    pub fn classify(query: &str) -> Result<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AlgoXzenError::invalid_input("Please enter a search query"));
        }
        if Address::is_valid(query) {
            return Ok(Self::Account(query.parse()?));
        }
        if query.len() == BASE32_TXID_LEN && query.bytes().all(is_base32_char) {
            return Ok(Self::Transaction(query.to_string()));
        }
        Ok(Self::Recent)
    }

    fn path(&self) -> String {
        match self {
            Self::Account(addr) => {
                format!("/v2/accounts/{}/transactions?limit={}", addr, SEARCH_LIMIT)
            }
            Self::Transaction(id) => format!("/v2/transactions/{}", id),
            Self::Recent => format!("/v2/transactions?limit={}", SEARCH_LIMIT),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentRecord {
    #[serde(default)]
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct IndexerTransaction {
    id: String,
    #[serde(default)]
    tx_type: Option<String>,
    #[serde(default)]
    payment_transaction: Option<PaymentRecord>,
    #[serde(default)]
    round_time: Option<i64>,
    sender: String,
    #[serde(default)]
    confirmed_round: Option<u64>,
}

/// Indexer replies carry either a list or a single record
#[derive(Debug, Deserialize)]
struct IndexerResponse {
    #[serde(default)]
    transactions: Vec<IndexerTransaction>,
    #[serde(default)]
    transaction: Option<IndexerTransaction>,
}

/// One row of search results
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub tx_id: String,
    pub tx_type: String,
    /// Microalgos; zero for non-payments
    pub amount: u64,
    pub round_time: Option<DateTime<Utc>>,
    pub sender: String,
    pub confirmed_round: Option<u64>,
}

impl From<IndexerTransaction> for TransactionSummary {
    fn from(tx: IndexerTransaction) -> Self {
        Self {
            tx_id: tx.id,
            tx_type: tx.tx_type.unwrap_or_else(|| "unknown".to_string()),
            amount: tx.payment_transaction.map(|p| p.amount).unwrap_or(0),
            round_time: tx
                .round_time
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            sender: tx.sender,
            confirmed_round: tx.confirmed_round,
        }
    }
}

/// Render results as CSV (`TxID,Type,Amount,Date,Address,Round`)
pub fn summaries_to_csv(rows: &[TransactionSummary]) -> String {
    let mut out = String::from("TxID,Type,Amount,Date,Address,Round\n");
    for row in rows {
        let date = row
            .round_time
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let round = row.confirmed_round.map(|r| r.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            row.tx_id, row.tx_type, row.amount, date, row.sender, round
        ));
    }
    out
}

#[derive(Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AlgoXzenConfig) -> Self {
        Self::new(&config.indexer_url)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<TransactionSummary>> {
        let query = SearchQuery::classify(query)?;
        log::debug!("Indexer search: {:?}", query);

        let resp = self
            .http
            .get(format!("{}{}", self.base_url, query.path()))
            .send()
            .await?;
        let body: IndexerResponse = read_json(resp, "Indexer search").await?;

        let mut records = body.transactions;
        records.extend(body.transaction);
        log::info!("Indexer search returned {} transactions", records.len());
        Ok(records.into_iter().map(TransactionSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn test_links() {
        let links = ExplorerLinks::new("https://testnet.explorer.perawallet.app/");
        assert_eq!(
            links.transaction("ABC"),
            "https://testnet.explorer.perawallet.app/tx/ABC"
        );
        assert_eq!(
            links.asset(42),
            "https://testnet.explorer.perawallet.app/asset/42"
        );
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            SearchQuery::classify(ALICE).unwrap(),
            SearchQuery::Account(_)
        ));
        assert!(matches!(
            SearchQuery::classify(&"Q".repeat(52)).unwrap(),
            SearchQuery::Transaction(_)
        ));
        assert_eq!(
            SearchQuery::classify(&"ab".repeat(32)).unwrap(),
            SearchQuery::Recent
        );
        // right shape, wrong checksum
        let bad_sum = format!("{}AAAA", &ALICE[..54]);
        assert_eq!(SearchQuery::classify(&bad_sum).unwrap(), SearchQuery::Recent);
        assert_eq!(SearchQuery::classify("payments").unwrap(), SearchQuery::Recent);
        assert!(SearchQuery::classify("   ").is_err());
    }

    #[test]
    fn test_summary_mapping() {
        let body: IndexerResponse = serde_json::from_str(
            r#"{"transaction":{"id":"T1","tx-type":"pay","payment-transaction":{"amount":5},
                "round-time":1700000000,"sender":"S","confirmed-round":9}}"#,
        )
        .unwrap();
        let summary = TransactionSummary::from(body.transaction.unwrap());
        assert_eq!(summary.amount, 5);
        assert_eq!(summary.confirmed_round, Some(9));
        assert_eq!(
            summary.round_time.unwrap().format("%Y-%m-%d").to_string(),
            "2023-11-14"
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["round_time"], "2023-11-14T22:13:20Z");
        assert_eq!(json["confirmed_round"], 9);

        let csv = summaries_to_csv(&[summary]);
        assert_eq!(
            csv,
            "TxID,Type,Amount,Date,Address,Round\nT1,pay,5,2023-11-14,S,9\n"
        );
    }
}
