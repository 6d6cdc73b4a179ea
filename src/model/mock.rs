//! Built-in snapshot used in offline mode

use chrono::{Duration, Utc};

use super::{
    Asset, ChainHolding, ChainStatus, DashboardData, Portfolio, Stats, Strategy, Transaction,
    TxStatus,
};

fn asset(symbol: &str, amount: Option<&str>, value: &str, change: &str) -> Asset {
    Asset {
        symbol: symbol.to_string(),
        amount: amount.map(str::to_string),
        value: value.to_string(),
        change: change.to_string(),
        address: None,
        chain_id: Some(195),
    }
}

fn holding(chain_id: u64, name: &str, value: &str, percentage: f64) -> ChainHolding {
    ChainHolding {
        chain_id,
        name: name.to_string(),
        value: value.to_string(),
        percentage,
    }
}

#[allow(clippy::too_many_arguments)]
fn strategy(
    id: u64,
    name: &str,
    kind: &str,
    status: &str,
    next: &str,
    performance: &str,
    invested: &str,
    current: &str,
) -> Strategy {
    Strategy {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        status: status.to_string(),
        next_execution: next.to_string(),
        performance: performance.to_string(),
        invested: invested.to_string(),
        current_value: current.to_string(),
        last_execution: None,
    }
}

fn tx(hash: &str, kind: &str, amount: &str, token: &str, status: TxStatus, mins_ago: i64, chain: &str) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        kind: kind.to_string(),
        amount: amount.to_string(),
        token: token.to_string(),
        status,
        timestamp: Utc::now() - Duration::minutes(mins_ago),
        chain: chain.to_string(),
        ..Default::default()
    }
}

fn chain(chain_id: u64, name: &str) -> ChainStatus {
    ChainStatus {
        chain_id,
        name: name.to_string(),
        status: "active".to_string(),
        is_active: true,
        last_checked: Utc::now(),
        last_block: None,
        gas_price: None,
    }
}

pub fn dashboard() -> DashboardData {
    DashboardData {
        portfolio: Portfolio {
            total_value: "$25,420.50".to_string(),
            total_change: "+12.5%".to_string(),
            assets: vec![
                asset("ETH", Some("8.5"), "$20,400.00", "+5.2%"),
                asset("USDC", None, "$3,000.00", "+0.1%"),
                asset("OKB", Some("125"), "$2,020.50", "+8.7%"),
            ],
            distribution: vec![
                holding(195, "X Layer", "$18,250.30", 72.0),
                holding(1, "Ethereum", "$4,120.10", 16.0),
                holding(137, "Polygon", "$2,050.10", 8.0),
                holding(42161, "Arbitrum", "$1,000.00", 4.0),
            ],
        },
        strategies: vec![
            strategy(1, "ETH DCA Strategy", "DCA", "active", "23 mins", "+15.3%", "$2,400", "$2,767"),
            strategy(2, "Grid Trading Bot", "Grid", "active", "12 mins", "+8.7%", "$5,000", "$5,435"),
            strategy(3, "Portfolio Rebalancer", "Rebalance", "paused", "Paused", "+3.2%", "$10,000", "$10,320"),
        ],
        transactions: vec![
            tx("0x1a2b3c4d5e6f7890abcdef1234567890abcdef12", "DCA Buy", "0.1", "ETH", TxStatus::Completed, 2, "X Layer"),
            tx("0x2b3c4d5e6f7890abcdef1234567890abcdef123a", "Grid Order", "500", "USDC", TxStatus::Pending, 5, "X Layer"),
            tx("0x3c4d5e6f7890abcdef1234567890abcdef123a2b", "Rebalance", "1.2", "ETH", TxStatus::Completed, 60, "Polygon"),
        ],
        stats: Stats {
            total_portfolio: "$25,420.50".to_string(),
            active_strategies: 2,
            volume_24h: "$8,420".to_string(),
            gas_optimized: "$127".to_string(),
            total_transactions: 1247,
            success_rate: "98.3%".to_string(),
            avg_gas_price: "12 gwei".to_string(),
        },
        chains: vec![
            chain(195, "X Layer Testnet"),
            chain(1, "Ethereum"),
            chain(137, "Polygon"),
        ],
        last_updated: Utc::now(),
    }
}
