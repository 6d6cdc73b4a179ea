//! Live dashboard feed
//!
//! The dashboard server pushes JSON envelopes of the form `{type, data}`.
//! Full snapshots replace the state; partial updates overwrite a single field
//! of the snapshot already held.

pub mod socket;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DashboardData, Portfolio, Strategy, Transaction};

pub use socket::{FeedEvent, FeedHandle};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to parse feed message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("websocket handshake timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
}

/// Wire envelope shared by inbound and outbound messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    InitialData(DashboardData),
    DataUpdate(DashboardData),
    PortfolioUpdate(Portfolio),
    StrategiesUpdate(Vec<Strategy>),
    TransactionsUpdate(Vec<Transaction>),
    /// Type the dashboard does not handle
    Unknown(String),
}

impl FeedMessage {
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, FeedError> {
        let Envelope { kind, data } = envelope;
        let message = match kind.as_str() {
            "initial_data" => FeedMessage::InitialData(serde_json::from_value(data)?),
            "data_update" => FeedMessage::DataUpdate(serde_json::from_value(data)?),
            "portfolio_update" => FeedMessage::PortfolioUpdate(serde_json::from_value(data)?),
            "strategies_update" => FeedMessage::StrategiesUpdate(serde_json::from_value(data)?),
            "transactions_update" => {
                FeedMessage::TransactionsUpdate(serde_json::from_value(data)?)
            }
            _ => FeedMessage::Unknown(kind),
        };
        Ok(message)
    }
}

/// Requests the dashboard server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetPortfolio,
    GetStrategies,
    GetTransactions,
    PauseStrategy(u64),
    ResumeStrategy(u64),
}

impl Command {
    pub fn envelope(self) -> Envelope {
        match self {
            Command::GetPortfolio => Envelope::new("get_portfolio", serde_json::Value::Null),
            Command::GetStrategies => Envelope::new("get_strategies", serde_json::Value::Null),
            Command::GetTransactions => {
                Envelope::new("get_transactions", serde_json::Value::Null)
            }
            Command::PauseStrategy(id) => Envelope::new("pause_strategy", id.into()),
            Command::ResumeStrategy(id) => Envelope::new("resume_strategy", id.into()),
        }
    }
}

/// Dashboard snapshot as seen by the UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    data: Option<DashboardData>,
}

impl DashboardState {
    pub fn new(data: Option<DashboardData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> Option<&DashboardData> {
        self.data.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Replace the whole snapshot (used for HTTP refreshes too)
    pub fn replace(&mut self, data: DashboardData) {
        self.data = Some(data);
    }

    /// Apply an inbound message. Returns true if the state changed.
    ///
    /// Partial updates are dropped until a full snapshot has arrived.
    pub fn apply(&mut self, message: FeedMessage) -> bool {
        match message {
            FeedMessage::InitialData(data) | FeedMessage::DataUpdate(data) => {
                self.data = Some(data);
                true
            }
            FeedMessage::PortfolioUpdate(portfolio) => match self.data.as_mut() {
                Some(data) => {
                    data.portfolio = portfolio;
                    true
                }
                None => false,
            },
            FeedMessage::StrategiesUpdate(strategies) => match self.data.as_mut() {
                Some(data) => {
                    data.strategies = strategies;
                    true
                }
                None => false,
            },
            FeedMessage::TransactionsUpdate(transactions) => match self.data.as_mut() {
                Some(data) => {
                    data.transactions = transactions;
                    true
                }
                None => false,
            },
            FeedMessage::Unknown(kind) => {
                tracing::debug!("Ignoring feed message of type {}", kind);
                false
            }
        }
    }
}
