use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BusyFlag, Environment};
use crate::api::Action;
use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::model::*;
use crate::sim::random::to_decimal;

const TRADE_LEDGER_CAP: usize = 1000;
const TRADE_LEDGER_KEEP: usize = 500;
const RECENT_TRADES: usize = 20;

struct TradingState {
    bots: Vec<TradingBot>,
    /// Newest first.
    trades: Vec<Trade>,
}

/// Owns the bot roster and the trade ledger. Independent of every other store.
pub struct TradingBotStore {
    state: RwLock<TradingState>,
    busy: BusyFlag,
    env: Environment,
}

impl TradingBotStore {
    pub fn new(env: Environment) -> Self {
        Self {
            state: RwLock::new(TradingState {
                bots: initial_bots(),
                trades: initial_trades(),
            }),
            busy: BusyFlag::default(),
            env,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    pub async fn bots(&self) -> Vec<TradingBot> {
        self.state.read().await.bots.clone()
    }

    pub async fn bot(&self, bot_id: &str) -> Option<TradingBot> {
        self.state.read().await.bots.iter().find(|b| b.id == bot_id).cloned()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.state.read().await.trades.clone()
    }

    pub async fn trades_by_bot(&self, bot_id: &str) -> Vec<Trade> {
        self.state
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.bot_id == bot_id)
            .cloned()
            .collect()
    }

    pub async fn active_bots(&self) -> Vec<TradingBot> {
        self.state
            .read()
            .await
            .bots
            .iter()
            .filter(|b| b.status == BotStatus::Active)
            .cloned()
            .collect()
    }

    pub async fn total_profit_24h(&self) -> Decimal {
        metrics::total_profit_24h(&self.state.read().await.bots)
    }

    pub async fn total_profit_all_time(&self) -> Decimal {
        metrics::total_profit_all_time(&self.state.read().await.bots)
    }

    pub async fn total_trades_24h(&self) -> u32 {
        metrics::total_trades_24h(&self.state.read().await.bots)
    }

    pub async fn average_win_rate(&self) -> f64 {
        metrics::average_win_rate(&self.state.read().await.bots)
    }

    /// Highest 24h profit; the earliest bot wins a tie.
    pub async fn best_performing_bot(&self) -> Option<TradingBot> {
        let state = self.state.read().await;
        state
            .bots
            .iter()
            .fold(None::<&TradingBot>, |best, bot| match best {
                Some(b) if bot.profit_24h <= b.profit_24h => Some(b),
                _ => Some(bot),
            })
            .cloned()
    }

    pub async fn recent_trades(&self) -> Vec<Trade> {
        let mut trades = self.trades().await;
        trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        trades.truncate(RECENT_TRADES);
        trades
    }

    pub async fn profitable_trades(&self) -> Vec<Trade> {
        self.state
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.profit > Decimal::ZERO)
            .cloned()
            .collect()
    }

    pub async fn profitability_rate(&self) -> f64 {
        metrics::profitability_rate(&self.state.read().await.trades)
    }

    pub async fn aggregated_stats(&self, period: StatsPeriod) -> AggregatedBotStats {
        let state = self.state.read().await;
        metrics::aggregated_bot_stats(&state.bots, &state.trades, period)
    }

    pub async fn load_trading_data(&self) -> StoreResult<()> {
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::LoadTradingData).await;
        self.update_bot_metrics().await;
        Ok(())
    }

    pub async fn start_bot(&self, bot_id: &str) -> StoreResult<TradingBot> {
        self.transition(bot_id, BotAction::Start).await
    }

    pub async fn pause_bot(&self, bot_id: &str) -> StoreResult<TradingBot> {
        self.transition(bot_id, BotAction::Pause).await
    }

    pub async fn stop_bot(&self, bot_id: &str) -> StoreResult<TradingBot> {
        self.transition(bot_id, BotAction::Stop).await
    }

    async fn transition(&self, bot_id: &str, action: BotAction) -> StoreResult<TradingBot> {
        {
            let state = self.state.read().await;
            next_status(&state.bots, bot_id, action)?;
        }

        let _busy = self.busy.begin();
        let network_action = match action {
            BotAction::Start => Action::StartBot,
            BotAction::Pause => Action::PauseBot,
            BotAction::Stop => Action::StopBot,
        };
        self.env.network.round_trip(network_action).await;

        let now = self.env.clock.now();
        let mut state = self.state.write().await;
        // The bot may have been deleted or moved on while the call was in flight.
        let next = next_status(&state.bots, bot_id, action)?;
        let bot = state
            .bots
            .iter_mut()
            .find(|b| b.id == bot_id)
            .ok_or_else(|| StoreError::BotNotFound(bot_id.to_string()))?;

        let previous = bot.status;
        bot.status = next;
        if action == BotAction::Start {
            bot.last_trade_at = Some(now);
        }

        info!("🤖 {} ({}): {} -> {}", bot.name, bot_id, previous, next);
        Ok(bot.clone())
    }

    pub async fn configure_bot(&self, bot_id: &str, parameters: HashMap<String, serde_json::Value>) -> StoreResult<TradingBot> {
        if self.bot(bot_id).await.is_none() {
            return Err(StoreError::BotNotFound(bot_id.to_string()));
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::ConfigureBot).await;

        let mut state = self.state.write().await;
        let bot = state
            .bots
            .iter_mut()
            .find(|b| b.id == bot_id)
            .ok_or_else(|| StoreError::BotNotFound(bot_id.to_string()))?;

        let changed = parameters.len();
        bot.parameters.extend(parameters);

        info!("🛠️ Updated {} setting(s) for {}", changed, bot.name);
        Ok(bot.clone())
    }

    pub async fn create_bot(&self, config: BotConfig) -> StoreResult<TradingBot> {
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::CreateBot).await;

        let bot = TradingBot {
            id: format!("bot_{}", Uuid::new_v4().simple()),
            name: config.name,
            strategy: config.strategy,
            status: BotStatus::Stopped,
            profit_24h: Decimal::ZERO,
            profit_total: Decimal::ZERO,
            trades_24h: 0,
            trades_total: 0,
            win_rate: 0.0,
            max_drawdown: 0.0,
            created_at: self.env.clock.now(),
            last_trade_at: None,
            parameters: config.parameters,
        };

        self.state.write().await.bots.push(bot.clone());

        info!("🤖 Created bot {} ({})", bot.name, bot.id);
        Ok(bot)
    }

    pub async fn delete_bot(&self, bot_id: &str) -> StoreResult<()> {
        if self.bot(bot_id).await.is_none() {
            return Err(StoreError::BotNotFound(bot_id.to_string()));
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::DeleteBot).await;

        let mut state = self.state.write().await;
        let before = state.bots.len();
        state.bots.retain(|b| b.id != bot_id);
        if state.bots.len() == before {
            return Err(StoreError::BotNotFound(bot_id.to_string()));
        }

        let trades_before = state.trades.len();
        state.trades.retain(|t| t.bot_id != bot_id);

        info!(
            "🗑️ Deleted bot {} and {} trade(s)",
            bot_id,
            trades_before - state.trades.len()
        );
        Ok(())
    }

    /// One tick of mock market activity for every active bot.
    pub async fn update_bot_metrics(&self) {
        let random = &self.env.random;
        let now = self.env.clock.now();
        let mut state = self.state.write().await;

        for bot in state.bots.iter_mut().filter(|b| b.status == BotStatus::Active) {
            let profit_variation = to_decimal(random.symmetric(25.0)).round_dp(2);
            bot.profit_24h += profit_variation;
            bot.profit_total += profit_variation.max(Decimal::ZERO);

            if random.chance(0.3) {
                let new_trades = random.below(3) + 1;
                bot.trades_24h += new_trades;
                bot.trades_total += new_trades;
                bot.last_trade_at = Some(now);
            }

            let win_rate_change = random.symmetric(1.0);
            bot.win_rate = (bot.win_rate + win_rate_change).clamp(0.0, 100.0);
        }

        debug!(
            "🤖 Bot metrics updated - 24h profit: {}",
            metrics::total_profit_24h(&state.bots)
        );
    }

    /// Appends a simulated fill for an active bot to the front of the ledger.
    pub async fn record_trade(&self, bot_id: &str) -> StoreResult<Trade> {
        let random = &self.env.random;
        let mut state = self.state.write().await;

        match state.bots.iter().find(|b| b.id == bot_id) {
            None => return Err(StoreError::BotNotFound(bot_id.to_string())),
            Some(bot) if bot.status != BotStatus::Active => {
                warn!("🤖 Refusing to record a trade for {} bot {}", bot.status, bot_id);
                return Err(StoreError::BotNotActive(bot_id.to_string()));
            }
            Some(_) => {}
        }

        let pair = TRADE_PAIRS[random.below(TRADE_PAIRS.len() as u32) as usize];
        let side = if random.below(2) == 0 { TradeSide::Buy } else { TradeSide::Sell };
        let trade = Trade {
            id: format!("trade_{}", Uuid::new_v4().simple()),
            bot_id: bot_id.to_string(),
            pair: pair.to_string(),
            side,
            amount: to_decimal(random.next_f64() * 10.0).round_dp(4),
            price: to_decimal(random.next_f64() * 50_000.0 + 1_000.0).round_dp(2),
            profit: to_decimal((random.next_f64() - 0.3) * 100.0).round_dp(2),
            timestamp: self.env.clock.now(),
            status: TradeStatus::Completed,
        };

        state.trades.insert(0, trade.clone());
        if state.trades.len() > TRADE_LEDGER_CAP {
            state.trades.truncate(TRADE_LEDGER_KEEP);
            debug!("🤖 Trade ledger trimmed to {}", TRADE_LEDGER_KEEP);
        }

        Ok(trade)
    }
}

fn next_status(bots: &[TradingBot], bot_id: &str, action: BotAction) -> StoreResult<BotStatus> {
    let bot = bots
        .iter()
        .find(|b| b.id == bot_id)
        .ok_or_else(|| StoreError::BotNotFound(bot_id.to_string()))?;

    bot.status.apply(action).ok_or(StoreError::InvalidBotTransition {
        bot_id: bot_id.to_string(),
        action: action.as_str(),
        status: bot.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ScriptedRandom;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn store() -> TradingBotStore {
        TradingBotStore::new(Environment::in_memory())
    }

    fn scripted(values: Vec<f64>) -> TradingBotStore {
        TradingBotStore::new(Environment {
            random: Arc::new(ScriptedRandom::new(values)),
            ..Environment::in_memory()
        })
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let store = store();

        let bot = store.pause_bot("bot_001").await.unwrap();
        assert_eq!(bot.status, BotStatus::Paused);

        let bot = store.start_bot("bot_001").await.unwrap();
        assert_eq!(bot.status, BotStatus::Active);

        let bot = store.stop_bot("bot_003").await.unwrap();
        assert_eq!(bot.status, BotStatus::Stopped);

        let bot = store.start_bot("bot_003").await.unwrap();
        assert_eq!(bot.status, BotStatus::Active);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_forbidden_transitions_are_rejected() {
        let store = store();

        let result = store.start_bot("bot_001").await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidBotTransition { action: "start", status: BotStatus::Active, .. })
        ));

        store.stop_bot("bot_002").await.unwrap();
        assert!(matches!(store.pause_bot("bot_002").await, Err(StoreError::InvalidBotTransition { .. })));
        assert_eq!(store.bot("bot_002").await.unwrap().status, BotStatus::Stopped);
    }

    #[tokio::test]
    async fn test_unknown_bot() {
        let store = store();

        assert!(matches!(store.start_bot("bot_999").await, Err(StoreError::BotNotFound(_))));
        assert!(matches!(store.pause_bot("bot_999").await, Err(StoreError::BotNotFound(_))));
        assert!(matches!(store.stop_bot("bot_999").await, Err(StoreError::BotNotFound(_))));
        assert!(matches!(store.delete_bot("bot_999").await, Err(StoreError::BotNotFound(_))));
        assert!(matches!(
            store.configure_bot("bot_999", HashMap::new()).await,
            Err(StoreError::BotNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_bot_starts_stopped_and_zeroed() {
        let store = store();
        let bot = store
            .create_bot(BotConfig {
                name: "Grid Runner".to_string(),
                strategy: "Range-bound grid".to_string(),
                parameters: HashMap::new(),
            })
            .await
            .unwrap();

        assert_eq!(bot.status, BotStatus::Stopped);
        assert_eq!(bot.profit_total, Decimal::ZERO);
        assert_eq!(bot.trades_total, 0);
        assert!(bot.last_trade_at.is_none());
        assert_eq!(store.bots().await.len(), 5);

        let started = store.start_bot(&bot.id).await.unwrap();
        assert_eq!(started.status, BotStatus::Active);
        assert!(started.last_trade_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_bot_cascades_trades() {
        let store = store();
        assert_eq!(store.trades_by_bot("bot_001").await.len(), 2);

        store.delete_bot("bot_001").await.unwrap();

        assert!(store.bot("bot_001").await.is_none());
        assert!(store.trades_by_bot("bot_001").await.is_empty());
        assert_eq!(store.trades().await.len(), 3);
    }

    #[tokio::test]
    async fn test_configure_bot_merges_parameters() {
        let store = store();
        let params = HashMap::from([("spread".to_string(), serde_json::json!(0.4))]);

        let bot = store.configure_bot("bot_002", params).await.unwrap();
        assert_eq!(bot.parameters["spread"], serde_json::json!(0.4));
    }

    #[tokio::test]
    async fn test_update_metrics_touches_active_bots_only() {
        // bot_001: +25 profit, trade roll hits, 3 new trades, +1 win rate.
        let store = scripted(vec![1.0, 0.0, 0.99, 1.0]);
        let paused_before = store.bot("bot_003").await.unwrap();

        store.update_bot_metrics().await;

        let bot = store.bot("bot_001").await.unwrap();
        assert_eq!(bot.profit_24h, dec!(309.52));
        assert_eq!(bot.profit_total, dec!(12872.30));
        assert_eq!(bot.trades_24h, 26);
        assert_eq!(bot.trades_total, 1850);
        assert!((bot.win_rate - 74.2).abs() < 1e-9);

        assert_eq!(store.bot("bot_003").await.unwrap(), paused_before);
        assert_eq!(store.bot("bot_002").await.unwrap().trades_total, 892);
    }

    #[tokio::test]
    async fn test_losses_do_not_reduce_lifetime_profit() {
        let store = scripted(vec![0.0]);
        store.update_bot_metrics().await;

        let bot = store.bot("bot_001").await.unwrap();
        assert_eq!(bot.profit_24h, dec!(259.52));
        assert_eq!(bot.profit_total, dec!(12847.30));
    }

    #[tokio::test]
    async fn test_record_trade_requires_active_bot() {
        let store = store();

        assert!(matches!(store.record_trade("bot_003").await, Err(StoreError::BotNotActive(_))));

        let trade = store.record_trade("bot_002").await.unwrap();
        assert_eq!(store.trades().await[0].id, trade.id);
        assert_eq!(trade.status, TradeStatus::Completed);
        assert!(TRADE_PAIRS.contains(&trade.pair.as_str()));
    }

    #[tokio::test]
    async fn test_trade_ledger_is_capped() {
        let store = store();
        for _ in 0..995 {
            store.record_trade("bot_004").await.unwrap();
        }
        assert_eq!(store.trades().await.len(), 1000);

        store.record_trade("bot_004").await.unwrap();
        assert_eq!(store.trades().await.len(), TRADE_LEDGER_KEEP);
    }

    #[tokio::test]
    async fn test_aggregates() {
        let store = store();

        assert_eq!(store.total_profit_24h().await, dec!(776.17));
        assert_eq!(store.total_trades_24h().await, 74);
        assert_eq!(store.active_bots().await.len(), 3);
        assert_eq!(store.best_performing_bot().await.unwrap().id, "bot_004");
        assert_eq!(store.profitable_trades().await.len(), 3);
        assert!((store.profitability_rate().await - 60.0).abs() < 1e-9);

        let week = store.aggregated_stats(StatsPeriod::Week).await;
        assert_eq!(week.total_profit, dec!(5433.19));
        assert_eq!(week.total_trades, 518);
        assert_eq!(week.total_bots, 4);
        assert_eq!(week.active_bots, 3);
    }

    #[tokio::test]
    async fn test_recent_trades_newest_first() {
        let store = store();
        let recent = store.recent_trades().await;
        assert_eq!(recent[0].id, "trade_005");
        assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_while_transition_in_flight() {
        let store = Arc::new(TradingBotStore::new(Environment {
            network: Arc::new(crate::api::SimulatedNetwork::new(crate::api::LatencySettings::default())),
            ..Environment::in_memory()
        }));

        let handle = tokio::spawn({
            let store = store.clone();
            async move { store.pause_bot("bot_004").await }
        });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert!(store.is_loading());
        assert_eq!(store.bot("bot_004").await.unwrap().status, BotStatus::Active);

        handle.await.unwrap().unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.bot("bot_004").await.unwrap().status, BotStatus::Paused);
    }
}
