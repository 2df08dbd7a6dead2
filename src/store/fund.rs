use chrono::Duration;
use log::{debug, info, warn};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{BusyFlag, Environment};
use crate::api::Action;
use crate::error::{StoreError, StoreResult};
use crate::metrics::{self, PerformanceDeltas};
use crate::model::*;
use crate::sim::random::perturb;

const ALLOCATION_TOLERANCE: Decimal = dec!(0.01);

struct FundState {
    data: FundData,
    assets: Vec<Asset>,
    pegged_tokens: Vec<PeggedToken>,
    distributions: Vec<DividendDistribution>,
    performance: Vec<PerformancePoint>,
}

/// Owns fund-level aggregates. Independent of every other store.
pub struct FundStore {
    state: RwLock<FundState>,
    busy: BusyFlag,
    env: Environment,
}

impl FundStore {
    pub fn new(env: Environment) -> Self {
        Self {
            state: RwLock::new(FundState {
                data: initial_fund_data(),
                assets: initial_assets(),
                pegged_tokens: initial_pegged_tokens(),
                distributions: initial_distributions(),
                performance: initial_performance(),
            }),
            busy: BusyFlag::default(),
            env,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    pub async fn snapshot(&self) -> FundSnapshot {
        let state = self.state.read().await;
        FundSnapshot {
            data: state.data.clone(),
            assets: state.assets.clone(),
            pegged_tokens: state.pegged_tokens.clone(),
            dividend_distributions: state.distributions.clone(),
        }
    }

    pub async fn share_price(&self) -> Decimal {
        self.state.read().await.data.share_price
    }

    pub async fn total_supply(&self) -> Decimal {
        self.state.read().await.data.total_supply
    }

    pub async fn assets(&self) -> Vec<Asset> {
        self.state.read().await.assets.clone()
    }

    pub async fn nav_per_share(&self) -> Decimal {
        metrics::nav_per_share(&self.state.read().await.data)
    }

    pub async fn total_market_cap(&self) -> Decimal {
        metrics::market_cap(&self.state.read().await.data)
    }

    pub async fn performance_metrics(&self) -> Option<PerformanceDeltas> {
        metrics::performance_deltas(&self.state.read().await.performance)
    }

    pub async fn performance_data(&self, period: PerformancePeriod) -> Vec<PerformancePoint> {
        let state = self.state.read().await;
        let (Some(days), Some(latest)) = (period.days(), state.performance.last()) else {
            return state.performance.clone();
        };

        let cutoff = latest.date - Duration::days(days);
        state
            .performance
            .iter()
            .filter(|p| p.date >= cutoff)
            .cloned()
            .collect()
    }

    pub async fn next_dividend(&self) -> Option<DividendDistribution> {
        self.state
            .read()
            .await
            .distributions
            .iter()
            .find(|d| d.status == DistributionStatus::Scheduled)
            .cloned()
    }

    pub async fn last_dividend(&self) -> Option<DividendDistribution> {
        self.state
            .read()
            .await
            .distributions
            .iter()
            .filter(|d| d.status == DistributionStatus::Completed)
            .max_by_key(|d| d.distribution_date)
            .cloned()
    }

    pub async fn distribution(&self, distribution_id: &str) -> Option<DividendDistribution> {
        self.state
            .read()
            .await
            .distributions
            .iter()
            .find(|d| d.id == distribution_id)
            .cloned()
    }

    pub async fn asset_by_symbol(&self, symbol: &str) -> Option<Asset> {
        self.state.read().await.assets.iter().find(|a| a.symbol == symbol).cloned()
    }

    pub async fn pegged_token_by_symbol(&self, symbol: &str) -> Option<PeggedToken> {
        self.state
            .read()
            .await
            .pegged_tokens
            .iter()
            .find(|t| t.symbol == symbol)
            .cloned()
    }

    pub async fn load_fund_data(&self) -> StoreResult<()> {
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::LoadFundData).await;
        self.update_prices().await;
        Ok(())
    }

    pub async fn refresh(&self) -> StoreResult<()> {
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::RefreshPrices).await;
        self.update_prices().await;
        Ok(())
    }

    async fn update_prices(&self) {
        let random = &self.env.random;
        let mut state = self.state.write().await;

        let price_variation = random.symmetric(0.01);
        state.data.share_price = perturb(state.data.share_price, price_variation).round_dp(6);
        state.data.daily_change = random.symmetric(10.0);

        for asset in state.assets.iter_mut() {
            let variation = random.symmetric(0.02);
            asset.change_24h = variation * 100.0;
            asset.value = perturb(asset.value, variation).round_dp(2);
        }

        state.data.total_aum = metrics::total_asset_value(&state.assets);

        debug!(
            "📈 Prices updated - share: {:.2}, AUM: ${:.1}M",
            state.data.share_price,
            state.data.total_aum.to_f64().unwrap_or(0.0) / 1_000_000.0
        );
    }

    pub async fn rebalance(&self, allocations: HashMap<String, Decimal>) -> StoreResult<()> {
        self.validate_allocations(&allocations).await?;

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::Rebalance).await;

        // Re-validate against the asset list as it stands after the round trip.
        let mut state = self.state.write().await;
        let total = projected_allocation_total(&state.assets, &allocations)?;
        if (total - Decimal::ONE_HUNDRED).abs() > ALLOCATION_TOLERANCE {
            return Err(StoreError::InvalidAllocation(total));
        }

        let aum = state.data.total_aum;
        for asset in state.assets.iter_mut() {
            if let Some(&allocation) = allocations.get(&asset.symbol) {
                asset.allocation = allocation;
            }
            asset.value = aum * asset.allocation / Decimal::ONE_HUNDRED;
        }
        state.data.total_aum = metrics::total_asset_value(&state.assets);

        info!("⚖️ Portfolio rebalanced across {} assets", allocations.len());
        Ok(())
    }

    async fn validate_allocations(&self, allocations: &HashMap<String, Decimal>) -> StoreResult<()> {
        let state = self.state.read().await;
        let total = projected_allocation_total(&state.assets, allocations)?;
        if (total - Decimal::ONE_HUNDRED).abs() > ALLOCATION_TOLERANCE {
            warn!("⚖️ Rejected rebalance totalling {}%", total);
            return Err(StoreError::InvalidAllocation(total));
        }
        Ok(())
    }

    pub async fn process_dividend(&self, distribution_id: &str) -> StoreResult<DividendDistribution> {
        if self.distribution(distribution_id).await.is_none() {
            return Err(StoreError::DistributionNotFound(distribution_id.to_string()));
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::ProcessDividend).await;

        let now = self.env.clock.now();
        let mut state = self.state.write().await;
        let distribution = state
            .distributions
            .iter_mut()
            .find(|d| d.id == distribution_id)
            .ok_or_else(|| StoreError::DistributionNotFound(distribution_id.to_string()))?;

        if distribution.status == DistributionStatus::Scheduled {
            distribution.status = DistributionStatus::Completed;
            distribution.distribution_date = now;
            info!("💸 Distribution {} completed", distribution_id);
        } else {
            debug!("💸 Distribution {} already completed", distribution_id);
        }

        Ok(distribution.clone())
    }

    pub async fn mint_pegged_tokens(&self, asset: &str, amount: Decimal) -> StoreResult<PeggedToken> {
        if amount <= Decimal::ZERO {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::MintPeggedTokens).await;

        let mut state = self.state.write().await;
        let token = state
            .pegged_tokens
            .iter_mut()
            .find(|t| t.backing_asset == asset)
            .ok_or_else(|| StoreError::UnknownAsset(asset.to_string()))?;
        token.total_supply = token
            .total_supply
            .checked_add(amount)
            .ok_or(StoreError::InvalidAmount(amount))?;

        info!("🪙 Minted {} {}", amount, token.symbol);
        Ok(token.clone())
    }
}

/// Allocation total after applying `allocations` over the current weights.
fn projected_allocation_total(assets: &[Asset], allocations: &HashMap<String, Decimal>) -> StoreResult<Decimal> {
    if let Some(unknown) = allocations.keys().find(|symbol| !assets.iter().any(|a| &a.symbol == *symbol)) {
        return Err(StoreError::UnknownAsset(unknown.clone()));
    }
    if let Some(out_of_range) = allocations
        .values()
        .find(|v| **v < Decimal::ZERO || **v > Decimal::ONE_HUNDRED)
    {
        return Err(StoreError::InvalidAllocation(*out_of_range));
    }

    assets
        .iter()
        .map(|a| allocations.get(&a.symbol).copied().unwrap_or(a.allocation))
        .try_fold(Decimal::ZERO, |total, allocation| {
            total
                .checked_add(allocation)
                .ok_or(StoreError::InvalidAllocation(allocation))
        })
}
