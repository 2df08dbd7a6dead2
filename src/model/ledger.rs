use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Currency, PayoutMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Invest,
    Divest,
    Dividend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Invest => "invest",
            TransactionType::Divest => "divest",
            TransactionType::Dividend => "dividend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionKind {
    #[serde(rename_all = "camelCase")]
    Invest { tokens_received: Decimal },
    #[serde(rename_all = "camelCase")]
    Divest {
        tokens_redeemed: Decimal,
        payout_currency: Currency,
        net_proceeds: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Dividend {
        distribution_id: String,
        dividend_rate: Decimal,
        reinvestment_amount: Decimal,
        cash_amount: Decimal,
    },
}

/// A ledger entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub price: Decimal,
    pub fee: Decimal,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn tx_type(&self) -> TransactionType {
        match self.kind {
            TransactionKind::Invest { .. } => TransactionType::Invest,
            TransactionKind::Divest { .. } => TransactionType::Divest,
            TransactionKind::Dividend { .. } => TransactionType::Dividend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDividend {
    pub distribution_id: String,
    pub user_id: String,
    pub tokens_held: Decimal,
    pub total_earned: Decimal,
    pub reinvested_amount: Decimal,
    pub cash_amount: Decimal,
    pub payout_method: PayoutMethod,
    pub processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

pub fn initial_wallet_balances() -> BTreeMap<Currency, Decimal> {
    BTreeMap::from([
        (Currency::Usdc, dec!(5000.00)),
        (Currency::Eth, dec!(2.5)),
        (Currency::Btc, dec!(0.1)),
        (Currency::Usdt, dec!(3200.00)),
    ])
}

pub fn initial_share_balance() -> Decimal {
    dec!(1250.50)
}

fn fixture_time(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// Seed ledger, newest first.
pub fn initial_transactions(user_id: &str) -> Vec<Transaction> {
    vec![
        Transaction {
            id: "tx_001".to_string(),
            amount: dec!(1000),
            currency: Currency::Usdc,
            price: dec!(120.50),
            fee: Decimal::ZERO,
            status: TransactionStatus::Completed,
            hash: Some("0x1234567890abcdef1234567890abcdef12345678901234567890abcdef123456".to_string()),
            timestamp: fixture_time(3, 15, 10, 30),
            user_id: user_id.to_string(),
            kind: TransactionKind::Invest { tokens_received: dec!(8.30) },
        },
        Transaction {
            id: "tx_002".to_string(),
            amount: dec!(125.50),
            currency: Currency::Usdc,
            price: dec!(125.67),
            fee: Decimal::ZERO,
            status: TransactionStatus::Completed,
            hash: None,
            timestamp: fixture_time(3, 1, 9, 0),
            user_id: user_id.to_string(),
            kind: TransactionKind::Dividend {
                distribution_id: "div_002".to_string(),
                dividend_rate: dec!(0.85),
                reinvestment_amount: dec!(87.85),
                cash_amount: dec!(37.65),
            },
        },
        Transaction {
            id: "tx_003".to_string(),
            amount: dec!(500),
            currency: Currency::Eth,
            price: dec!(118.75),
            fee: Decimal::ZERO,
            status: TransactionStatus::Completed,
            hash: Some("0x2345678901bcdef12345678901bcdef123456789012345678901bcdef1234567".to_string()),
            timestamp: fixture_time(2, 20, 14, 15),
            user_id: user_id.to_string(),
            kind: TransactionKind::Invest { tokens_received: dec!(4.21) },
        },
    ]
}

pub fn initial_dividend_history(user_id: &str) -> Vec<UserDividend> {
    let entry = |id: &str, held: Decimal, earned: Decimal, reinvested: Decimal, cash: Decimal| UserDividend {
        distribution_id: id.to_string(),
        user_id: user_id.to_string(),
        tokens_held: held,
        total_earned: earned,
        reinvested_amount: reinvested,
        cash_amount: cash,
        payout_method: PayoutMethod::Mixed,
        processed: true,
    };

    vec![
        entry("div_001", dec!(1200), dec!(102.00), dec!(71.40), dec!(30.60)),
        entry("div_002", dec!(1250), dec!(115.00), dec!(80.50), dec!(34.50)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_json_carries_type_tag() {
        let tx = &initial_transactions("user_123")[0];
        let json = serde_json::to_value(tx).unwrap();

        assert_eq!(json["type"], "invest");
        assert_eq!(json["currency"], "USDC");
        assert_eq!(json["userId"], "user_123");
        assert!(json.get("tokensReceived").is_some());
    }

    #[test]
    fn test_fixture_ledger_is_newest_first() {
        let txs = initial_transactions("user_123");
        assert!(txs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}
