//! Dashboard data model
//!
//! Mirrors the JSON the dashboard server publishes over the socket and the
//! REST API. Every collection and optional field defaults, so a partial
//! payload still decodes. Collections also accept an explicit `null`.

pub mod mock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Full dashboard snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    #[serde(default)]
    pub portfolio: Portfolio,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategies: Vec<Strategy>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chains: Vec<ChainStatus>,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(default)]
    pub total_value: String,
    #[serde(default)]
    pub total_change: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: Vec<Asset>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub distribution: Vec<ChainHolding>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub change: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl Asset {
    /// Held amount, treating an empty string as absent
    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref().filter(|a| !a.is_empty())
    }
}

/// Share of the portfolio held on one chain
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainHolding {
    #[serde(default)]
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub percentage: f64,
}

impl ChainHolding {
    /// Percentage clamped to 0..=100 for gauges
    pub fn ratio(&self) -> f64 {
        (self.percentage / 100.0).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub next_execution: String,
    #[serde(default)]
    pub performance: String,
    #[serde(default)]
    pub invested: String,
    #[serde(default)]
    pub current_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

impl Strategy {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    pub fn is_paused(&self) -> bool {
        self.status.eq_ignore_ascii_case("paused")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn label(self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub status: TxStatus,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl Transaction {
    /// Hash shortened to `0x1a2b...ef12` for table rows
    pub fn short_hash(&self) -> String {
        let hash = self.hash.as_str();
        if hash.len() <= 14 || !hash.is_ascii() {
            return hash.to_string();
        }
        format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
    }

    /// Case-insensitive match against hash, type, token and chain
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.hash, &self.kind, &self.token, &self.chain]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Aggregate figures shown on the overview cards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_portfolio: String,
    #[serde(default)]
    pub active_strategies: u32,
    #[serde(default, rename = "volume24h")]
    pub volume_24h: String,
    #[serde(default)]
    pub gas_optimized: String,
    #[serde(default)]
    pub total_transactions: u64,
    #[serde(default)]
    pub success_rate: String,
    #[serde(default)]
    pub avg_gas_price: String,
}

/// Health of one tracked chain
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_checked: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

/// Page of transactions returned by `GET /transactions`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// Human-readable age such as "2 mins ago"
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => plural(secs / 60, "min"),
        3600..=86_399 => plural(secs / 3600, "hour"),
        _ => plural(secs / 86_400, "day"),
    }
}
