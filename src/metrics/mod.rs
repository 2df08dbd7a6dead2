use crate::model::*;
use rust_decimal::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceDeltas {
    pub tesseract_return: f64,
    pub btc_return: f64,
    pub eth_return: f64,
    pub volume_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssetPosition {
    pub symbol: String,
    pub name: String,
    pub allocation: Decimal,
    pub user_value: Decimal,
    pub user_tokens: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPerformance {
    pub total_invested: Decimal,
    pub current_value: Decimal,
    pub profit: Decimal,
    pub return_percent: f64,
}

pub fn nav_per_share(data: &FundData) -> Decimal {
    if data.total_supply > Decimal::ZERO {
        data.total_aum / data.total_supply
    } else {
        Decimal::ZERO
    }
}

pub fn market_cap(data: &FundData) -> Decimal {
    data.share_price * data.total_supply
}

pub fn total_asset_value(assets: &[Asset]) -> Decimal {
    assets.iter().map(|asset| asset.value).sum()
}

pub fn allocation_total(assets: &[Asset]) -> Decimal {
    assets.iter().map(|asset| asset.allocation).sum()
}

fn percent_change(latest: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (latest - previous) / previous * 100.0
    }
}

/// Returns between the last two points of the performance history.
pub fn performance_deltas(points: &[PerformancePoint]) -> Option<PerformanceDeltas> {
    let [.., previous, latest] = points else {
        return None;
    };

    Some(PerformanceDeltas {
        tesseract_return: percent_change(latest.tesseract, previous.tesseract),
        btc_return: percent_change(latest.btc, previous.btc),
        eth_return: percent_change(latest.eth, previous.eth),
        volume_change: percent_change(latest.volume, previous.volume),
    })
}

/// The user's look-through exposure to each fund asset.
pub fn portfolio_allocation(assets: &[Asset], share_balance: Decimal, total_supply: Decimal) -> Vec<UserAssetPosition> {
    if total_supply <= Decimal::ZERO {
        return Vec::new();
    }

    let user_share = share_balance / total_supply;

    assets
        .iter()
        .map(|asset| {
            let user_value = asset.value * user_share;
            UserAssetPosition {
                symbol: asset.symbol.clone(),
                name: asset.name.clone(),
                allocation: asset.allocation,
                user_value,
                user_tokens: user_value / reference_price(&asset.symbol),
            }
        })
        .collect()
}

pub fn investment_performance(transactions: &[Transaction], current_value: Decimal) -> InvestmentPerformance {
    let total_invested = transactions
        .iter()
        .filter(|tx| tx.tx_type() == TransactionType::Invest)
        .map(|tx| tx.amount)
        .sum::<Decimal>();

    if total_invested == Decimal::ZERO {
        return InvestmentPerformance::default();
    }

    let profit = current_value - total_invested;
    let return_percent = (profit / total_invested * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0);

    InvestmentPerformance {
        total_invested,
        current_value,
        profit,
        return_percent,
    }
}

/// Splits a dividend into `(reinvested, cash)` by reinvestment percentage.
pub fn dividend_split(amount: Decimal, reinvestment_percentage: u8) -> (Decimal, Decimal) {
    let reinvest = amount * Decimal::from(reinvestment_percentage.min(100)) / Decimal::ONE_HUNDRED;
    (reinvest, amount - reinvest)
}

pub fn total_profit_24h(bots: &[TradingBot]) -> Decimal {
    bots.iter().map(|bot| bot.profit_24h).sum()
}

pub fn total_profit_all_time(bots: &[TradingBot]) -> Decimal {
    bots.iter().map(|bot| bot.profit_total).sum()
}

pub fn total_trades_24h(bots: &[TradingBot]) -> u32 {
    bots.iter().map(|bot| bot.trades_24h).sum()
}

pub fn average_win_rate(bots: &[TradingBot]) -> f64 {
    if bots.is_empty() {
        return 0.0;
    }
    bots.iter().map(|bot| bot.win_rate).sum::<f64>() / bots.len() as f64
}

pub fn profitability_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let profitable = trades.iter().filter(|t| t.profit > Decimal::ZERO).count();
    profitable as f64 / trades.len() as f64 * 100.0
}

pub fn aggregated_bot_stats(bots: &[TradingBot], trades: &[Trade], period: StatsPeriod) -> AggregatedBotStats {
    let multiplier = period.multiplier();

    AggregatedBotStats {
        total_profit: total_profit_24h(bots) * Decimal::from(multiplier),
        total_trades: total_trades_24h(bots) * multiplier,
        average_win_rate: average_win_rate(bots),
        active_bots: bots.iter().filter(|b| b.status == BotStatus::Active).count(),
        total_bots: bots.len(),
        profitability_rate: profitability_rate(trades),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nav_per_share() {
        let mut data = initial_fund_data();
        data.total_aum = dec!(2500000);
        data.total_supply = dec!(100000);
        assert_eq!(nav_per_share(&data), dec!(25));

        data.total_supply = Decimal::ZERO;
        assert_eq!(nav_per_share(&data), Decimal::ZERO);
    }

    #[test]
    fn test_performance_deltas_use_last_two_points() {
        let deltas = performance_deltas(&initial_performance()).unwrap();
        let expected = (125.67 - 118.4) / 118.4 * 100.0;
        assert!((deltas.tesseract_return - expected).abs() < 1e-9);
        assert!(deltas.volume_change > 0.0);

        assert!(performance_deltas(&initial_performance()[..1]).is_none());
    }

    #[test]
    fn test_dividend_split() {
        assert_eq!(dividend_split(dec!(100), 70), (dec!(70), dec!(30)));
        assert_eq!(dividend_split(dec!(100), 0), (dec!(0), dec!(100)));
    }

    #[test]
    fn test_portfolio_allocation_scales_by_share() {
        let positions = portfolio_allocation(&initial_assets(), dec!(1000), dec!(100000));
        let btc = positions.iter().find(|p| p.symbol == "BTC").unwrap();

        assert_eq!(btc.user_value, dec!(12837.50));
        assert_eq!(btc.user_tokens, dec!(12837.50) / dec!(51200));
    }

    #[test]
    fn test_bot_aggregates() {
        let bots = initial_bots();
        let trades = initial_trades();

        assert_eq!(total_trades_24h(&bots), 74);
        assert_eq!(total_profit_24h(&bots), dec!(776.17));

        let weekly = aggregated_bot_stats(&bots, &trades, StatsPeriod::Week);
        assert_eq!(weekly.total_trades, 74 * 7);
        assert_eq!(weekly.active_bots, 3);
        assert!((weekly.profitability_rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_investment_performance_without_investments() {
        assert_eq!(investment_performance(&[], dec!(100)), InvestmentPerformance::default());
    }
}
