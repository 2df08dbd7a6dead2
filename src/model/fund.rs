use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundData {
    #[serde(rename = "totalAUM")]
    pub total_aum: Decimal,
    pub share_price: Decimal,
    pub total_supply: Decimal,
    pub daily_change: f64,
    pub monthly_change: f64,
    pub yearly_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
    pub symbol: String,
    /// Target weight in percent.
    pub allocation: Decimal,
    pub value: Decimal,
    pub change_24h: f64,
    pub pegged_token: String,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeggedToken {
    pub symbol: String,
    pub name: String,
    pub ratio: Decimal,
    pub total_supply: Decimal,
    pub backing_asset: String,
    pub contract_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    Scheduled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendDistribution {
    pub id: String,
    pub period: String,
    pub rate_per_token: Decimal,
    pub total_amount: Decimal,
    pub distribution_date: DateTime<Utc>,
    pub eligible_tokens: Decimal,
    pub status: DistributionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub tesseract: f64,
    pub btc: f64,
    pub eth: f64,
    pub volume: f64,
}

/// Point-in-time copy of every fund-level aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSnapshot {
    #[serde(flatten)]
    pub data: FundData,
    pub assets: Vec<Asset>,
    pub pegged_tokens: Vec<PeggedToken>,
    pub dividend_distributions: Vec<DividendDistribution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformancePeriod {
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl PerformancePeriod {
    pub fn days(&self) -> Option<i64> {
        match self {
            PerformancePeriod::Week => Some(7),
            PerformancePeriod::Month => Some(30),
            PerformancePeriod::Quarter => Some(90),
            PerformancePeriod::Year => Some(365),
            PerformancePeriod::All => None,
        }
    }
}

/// Mock spot prices used to express a user's slice of each asset in units.
pub fn reference_price(symbol: &str) -> Decimal {
    match symbol {
        "BTC" => dec!(51200),
        "ETH" => dec!(3100),
        "SOL" => dec!(95),
        "AVAX" => dec!(32),
        _ => Decimal::ONE,
    }
}

pub fn initial_fund_data() -> FundData {
    FundData {
        total_aum: dec!(2850066),
        share_price: dec!(125.67),
        total_supply: dec!(100000),
        daily_change: 8.3,
        monthly_change: 24.5,
        yearly_change: 87.2,
    }
}

pub fn initial_assets() -> Vec<Asset> {
    let asset = |name: &str, symbol: &str, allocation: Decimal, value: Decimal, change_24h: f64, pegged: &str, contract: Option<&str>| Asset {
        name: name.to_string(),
        symbol: symbol.to_string(),
        allocation,
        value,
        change_24h,
        pegged_token: pegged.to_string(),
        contract_address: contract.map(str::to_string),
    };

    vec![
        asset("Bitcoin", "BTC", dec!(45), dec!(1283750), 5.2, "pBTC", Some("0x1234567890abcdef1234567890abcdef12345678")),
        asset("Ethereum", "ETH", dec!(25), dec!(712100), 7.8, "pETH", Some("0x2345678901bcdef12345678901bcdef123456789")),
        asset("Solana", "SOL", dec!(15), dec!(427108), -2.1, "pSOL", Some("0x3456789012cdef123456789012cdef1234567890")),
        asset("Avalanche", "AVAX", dec!(10), dec!(284739), 12.4, "pAVAX", Some("0x456789013def1234567890123def12345678901")),
        asset("Other Assets", "OTHER", dec!(5), dec!(142369), 3.6, "Various", None),
    ]
}

pub fn initial_pegged_tokens() -> Vec<PeggedToken> {
    let token = |symbol: &str, name: &str, supply: Decimal, backing: &str, contract: &str| PeggedToken {
        symbol: symbol.to_string(),
        name: name.to_string(),
        ratio: Decimal::ONE,
        total_supply: supply,
        backing_asset: backing.to_string(),
        contract_address: contract.to_string(),
    };

    vec![
        token("pBTC", "Pegged Bitcoin", dec!(28.5), "BTC", "0x567890124ef123456789012345ef123456789012"),
        token("pETH", "Pegged Ethereum", dec!(245.8), "ETH", "0x6789012345f1234567890123456f1234567890123"),
        token("pSOL", "Pegged Solana", dec!(1250.0), "SOL", "0x789012346f123456789012346f12345678901234"),
        token("pAVAX", "Pegged Avalanche", dec!(890.3), "AVAX", "0x8901234567f12345678901234567f123456789012"),
    ]
}

pub fn initial_distributions() -> Vec<DividendDistribution> {
    let distribution = |id: &str, period: &str, rate: Decimal, total: Decimal, month: u32, status| DividendDistribution {
        id: id.to_string(),
        period: period.to_string(),
        rate_per_token: rate,
        total_amount: total,
        distribution_date: Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).single().unwrap_or_default(),
        eligible_tokens: dec!(100000),
        status,
    };

    vec![
        distribution("div_001", "2024-01", dec!(0.85), dec!(85000), 2, DistributionStatus::Completed),
        distribution("div_002", "2024-02", dec!(0.92), dec!(92000), 3, DistributionStatus::Completed),
        distribution("div_003", "2024-03", dec!(0.78), dec!(78000), 4, DistributionStatus::Scheduled),
    ]
}

pub fn initial_performance() -> Vec<PerformancePoint> {
    let point = |m: u32, d: u32, tesseract: f64, btc: f64, eth: f64, volume: f64| PerformancePoint {
        date: NaiveDate::from_ymd_opt(2024, m, d).unwrap_or_default(),
        tesseract,
        btc,
        eth,
        volume,
    };

    vec![
        point(1, 1, 98.5, 42000.0, 2500.0, 125000.0),
        point(1, 15, 105.2, 44500.0, 2650.0, 142000.0),
        point(2, 1, 112.8, 46200.0, 2750.0, 156000.0),
        point(2, 15, 118.4, 48900.0, 2920.0, 167000.0),
        point(3, 1, 125.67, 51200.0, 3100.0, 178000.0),
    ]
}
