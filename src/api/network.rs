use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every store action that pretends to talk to a wallet, chain or backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ConnectWallet,
    DisconnectWallet,
    UpdatePreferences,
    SwitchNetwork,
    LoadFundData,
    RefreshPrices,
    Rebalance,
    MintPeggedTokens,
    ProcessDividend,
    LoadUserData,
    Invest,
    Divest,
    ClaimDividend,
    RefreshBalances,
    LoadTradingData,
    StartBot,
    PauseBot,
    StopBot,
    ConfigureBot,
    CreateBot,
    DeleteBot,
}

/// Simulated round trip for a store action. Stores await this between
/// validating input and committing state, which is the window in which their
/// busy flag is observable.
#[async_trait]
pub trait Network: Send + Sync {
    async fn round_trip(&self, action: Action);
}

/// Completes immediately.
#[derive(Debug, Default, Clone)]
pub struct InstantNetwork;

#[async_trait]
impl Network for InstantNetwork {
    async fn round_trip(&self, _action: Action) {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySettings {
    pub wallet_ms: u64,
    pub preferences_ms: u64,
    pub fund_ms: u64,
    pub transaction_ms: u64,
    pub dividend_ms: u64,
    pub bot_ms: u64,
}

impl Default for LatencySettings {
    fn default() -> Self {
        Self {
            wallet_ms: 2000,
            preferences_ms: 1000,
            fund_ms: 500,
            transaction_ms: 3000,
            dividend_ms: 2000,
            bot_ms: 1500,
        }
    }
}

impl LatencySettings {
    pub fn zero() -> Self {
        Self {
            wallet_ms: 0,
            preferences_ms: 0,
            fund_ms: 0,
            transaction_ms: 0,
            dividend_ms: 0,
            bot_ms: 0,
        }
    }

    pub fn delay_for(&self, action: Action) -> Duration {
        let ms = match action {
            Action::ConnectWallet | Action::DisconnectWallet | Action::SwitchNetwork => self.wallet_ms,
            Action::UpdatePreferences | Action::LoadUserData | Action::RefreshBalances => self.preferences_ms,
            Action::LoadFundData | Action::RefreshPrices | Action::Rebalance | Action::MintPeggedTokens => self.fund_ms,
            Action::Invest | Action::Divest => self.transaction_ms,
            Action::ClaimDividend | Action::ProcessDividend => self.dividend_ms,
            Action::LoadTradingData
            | Action::StartBot
            | Action::PauseBot
            | Action::StopBot
            | Action::ConfigureBot
            | Action::CreateBot
            | Action::DeleteBot => self.bot_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Sleeps for a configured per-action latency.
#[derive(Debug, Clone, Default)]
pub struct SimulatedNetwork {
    latency: LatencySettings,
}

impl SimulatedNetwork {
    pub fn new(latency: LatencySettings) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Network for SimulatedNetwork {
    async fn round_trip(&self, action: Action) {
        let delay = self.latency.delay_for(action);
        debug!("⏳ Simulating {:?} ({}ms)", action, delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grouping() {
        let latency = LatencySettings::default();
        assert_eq!(latency.delay_for(Action::Invest), Duration::from_millis(3000));
        assert_eq!(latency.delay_for(Action::PauseBot), Duration::from_millis(1500));
        assert_eq!(LatencySettings::zero().delay_for(Action::ConnectWallet), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_network_sleeps() {
        let network = SimulatedNetwork::new(LatencySettings::default());
        let started = tokio::time::Instant::now();
        network.round_trip(Action::RefreshPrices).await;
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
