use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use super::{BusyFlag, Environment, FundStore, SessionStore};
use crate::api::Action;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::metrics::{self, InvestmentPerformance, UserAssetPosition};
use crate::model::*;
use crate::sim::random::perturb;

const RECENT_TRANSACTIONS: usize = 10;
const SEED_USER_ID: &str = "user_123";

struct PositionState {
    /// Wallet address the balances belong to; `None` until a user signs in.
    owner: Option<String>,
    share_balance: Decimal,
    wallet_balances: BTreeMap<Currency, Decimal>,
    /// Newest first.
    transactions: Vec<Transaction>,
    dividend_history: Vec<UserDividend>,
}

/// Owns the authenticated user's balances and ledgers. Reads identity from the
/// session store and pricing from the fund store, never writes to either.
pub struct UserPositionStore {
    state: RwLock<PositionState>,
    busy: BusyFlag,
    session: Arc<SessionStore>,
    fund: Arc<FundStore>,
    exit_fee: Decimal,
    env: Environment,
}

impl UserPositionStore {
    pub fn new(config: &Config, env: Environment, session: Arc<SessionStore>, fund: Arc<FundStore>) -> Self {
        Self {
            state: RwLock::new(PositionState {
                owner: None,
                share_balance: initial_share_balance(),
                wallet_balances: initial_wallet_balances(),
                transactions: initial_transactions(SEED_USER_ID),
                dividend_history: initial_dividend_history(SEED_USER_ID),
            }),
            busy: BusyFlag::default(),
            session,
            fund,
            exit_fee: config.exit_fee(),
            env,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    async fn require_user(&self) -> StoreResult<User> {
        let session = self.session.snapshot().await;
        match session.user {
            Some(user) if session.is_authenticated() => {
                self.adopt_owner(&user).await;
                Ok(user)
            }
            _ => Err(StoreError::NotAuthenticated),
        }
    }

    /// Binds the balances to the signed-in wallet. The first wallet takes over
    /// the seed position; a different wallet afterwards gets a fresh one.
    async fn sync_owner(&self) {
        if let Some(user) = self.session.user().await {
            self.adopt_owner(&user).await;
        }
    }

    async fn adopt_owner(&self, user: &User) {
        if self.state.read().await.owner.as_deref() == Some(user.address.as_str()) {
            return;
        }

        let mut state = self.state.write().await;
        match state.owner.replace(user.address.clone()) {
            None => debug!("👤 Position bound to {}", user.address),
            Some(previous) if previous != user.address => {
                info!("👤 Wallet changed from {} to {}, reseeding position", previous, user.address);
                state.share_balance = initial_share_balance();
                state.wallet_balances = initial_wallet_balances();
                state.transactions = initial_transactions(&user.id);
                state.dividend_history = initial_dividend_history(&user.id);
            }
            Some(_) => {}
        }
    }

    async fn read_state(&self) -> RwLockReadGuard<'_, PositionState> {
        self.sync_owner().await;
        self.state.read().await
    }

    fn tx_hash(&self) -> String {
        format!("0x{}", self.env.random.hex_string(64))
    }

    pub async fn share_balance(&self) -> Decimal {
        self.read_state().await.share_balance
    }

    pub async fn wallet_balances(&self) -> BTreeMap<Currency, Decimal> {
        self.read_state().await.wallet_balances.clone()
    }

    pub async fn balance_in(&self, currency: Currency) -> Decimal {
        let state = self.read_state().await;
        match currency {
            Currency::Tsrt => state.share_balance,
            other => state.wallet_balances.get(&other).copied().unwrap_or(Decimal::ZERO),
        }
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.read_state().await.transactions.clone()
    }

    pub async fn dividend_history(&self) -> Vec<UserDividend> {
        self.read_state().await.dividend_history.clone()
    }

    pub async fn total_portfolio_value(&self) -> Decimal {
        let shares = self.share_balance().await;
        shares * self.fund.share_price().await
    }

    pub async fn portfolio_allocation(&self) -> Vec<UserAssetPosition> {
        if !self.session.is_authenticated().await {
            return Vec::new();
        }

        let shares = self.share_balance().await;
        let assets = self.fund.assets().await;
        let supply = self.fund.total_supply().await;
        metrics::portfolio_allocation(&assets, shares, supply)
    }

    pub async fn total_dividends_earned(&self) -> Decimal {
        self.read_state()
            .await
            .dividend_history
            .iter()
            .map(|d| d.total_earned)
            .sum()
    }

    pub async fn estimated_next_dividend(&self) -> Decimal {
        match self.fund.next_dividend().await {
            Some(next) => self.share_balance().await * next.rate_per_token,
            None => Decimal::ZERO,
        }
    }

    pub async fn recent_transactions(&self) -> Vec<Transaction> {
        self.transaction_history(None, Some(RECENT_TRANSACTIONS)).await
    }

    pub async fn investment_performance(&self) -> InvestmentPerformance {
        let current_value = self.total_portfolio_value().await;
        let state = self.read_state().await;
        metrics::investment_performance(&state.transactions, current_value)
    }

    pub async fn transaction_history(&self, tx_type: Option<TransactionType>, limit: Option<usize>) -> Vec<Transaction> {
        let mut history: Vec<Transaction> = self
            .read_state()
            .await
            .transactions
            .iter()
            .filter(|tx| tx_type.map_or(true, |t| tx.tx_type() == t))
            .cloned()
            .collect();

        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        history
    }

    pub async fn load_user_data(&self) -> StoreResult<()> {
        if !self.session.is_authenticated().await {
            return Ok(());
        }

        self.sync_owner().await;
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::LoadUserData).await;
        info!("👤 User data loaded");
        Ok(())
    }

    pub async fn invest(&self, amount: Decimal, currency: Currency) -> StoreResult<Transaction> {
        let user = self.require_user().await?;
        if amount <= Decimal::ZERO {
            return Err(StoreError::InvalidAmount(amount));
        }
        if !currency.is_wallet_currency() {
            return Err(StoreError::UnsupportedCurrency(currency.to_string()));
        }
        self.check_wallet_balance(currency, amount).await?;

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::Invest).await;

        let price = self.fund.share_price().await;
        if price <= Decimal::ZERO {
            error!("❌ Investment aborted: share price is {}", price);
            return Err(StoreError::ActionFailed("Investment transaction failed"));
        }
        let tokens_received = amount / price;

        let transaction = Transaction {
            id: format!("tx_{}", Uuid::new_v4()),
            amount,
            currency,
            price,
            fee: Decimal::ZERO,
            status: TransactionStatus::Completed,
            hash: Some(self.tx_hash()),
            timestamp: self.env.clock.now(),
            user_id: user.id,
            kind: TransactionKind::Invest { tokens_received },
        };

        {
            let mut state = self.state.write().await;
            let balance = state.wallet_balances.entry(currency).or_insert(Decimal::ZERO);
            if *balance < amount {
                let available = *balance;
                warn!("💰 Investment of {} {} lost a race for funds", amount, currency);
                return Err(StoreError::InsufficientBalance {
                    currency,
                    requested: amount,
                    available,
                });
            }
            *balance -= amount;
            state.share_balance += tokens_received;
            state.transactions.insert(0, transaction.clone());
        }

        info!("💰 Invested {} {} for {:.4} TSRT @ {}", amount, currency, tokens_received, price);
        Ok(transaction)
    }

    async fn check_wallet_balance(&self, currency: Currency, amount: Decimal) -> StoreResult<()> {
        let available = self.balance_in(currency).await;
        if available < amount {
            warn!("💰 Insufficient {}: requested {}, available {}", currency, amount, available);
            return Err(StoreError::InsufficientBalance {
                currency,
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub async fn divest(&self, token_amount: Decimal, payout_currency: Currency) -> StoreResult<Transaction> {
        let user = self.require_user().await?;
        if token_amount <= Decimal::ZERO {
            return Err(StoreError::InvalidAmount(token_amount));
        }
        if !payout_currency.is_wallet_currency() {
            return Err(StoreError::UnsupportedCurrency(payout_currency.to_string()));
        }
        self.check_wallet_balance(Currency::Tsrt, token_amount).await?;

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::Divest).await;

        let price = self.fund.share_price().await;
        let gross = token_amount * price;
        let fee = gross * self.exit_fee;
        let net_proceeds = gross * (Decimal::ONE - self.exit_fee);

        let transaction = Transaction {
            id: format!("tx_{}", Uuid::new_v4()),
            amount: token_amount,
            currency: Currency::Tsrt,
            price,
            fee,
            status: TransactionStatus::Completed,
            hash: Some(self.tx_hash()),
            timestamp: self.env.clock.now(),
            user_id: user.id,
            kind: TransactionKind::Divest {
                tokens_redeemed: token_amount,
                payout_currency,
                net_proceeds,
            },
        };

        {
            let mut state = self.state.write().await;
            if state.share_balance < token_amount {
                return Err(StoreError::InsufficientBalance {
                    currency: Currency::Tsrt,
                    requested: token_amount,
                    available: state.share_balance,
                });
            }
            state.share_balance -= token_amount;
            *state.wallet_balances.entry(payout_currency).or_insert(Decimal::ZERO) += net_proceeds;
            state.transactions.insert(0, transaction.clone());
        }

        info!("🏦 Divested {} TSRT for {} {} (fee {})", token_amount, net_proceeds, payout_currency, fee);
        Ok(transaction)
    }

    pub async fn claim_dividend(&self, distribution_id: &str) -> StoreResult<UserDividend> {
        self.require_user().await?;

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::ClaimDividend).await;

        let distribution = self
            .fund
            .distribution(distribution_id)
            .await
            .ok_or_else(|| StoreError::DistributionNotFound(distribution_id.to_string()))?;
        // Identity and preferences as of completion, not as of the click.
        let user = self.require_user().await?;
        let reinvest_pct = user.preferences.reinvestment_percentage;
        let payout_method = user.preferences.dividend_payout;
        let price = self.fund.share_price().await;

        let mut state = self.state.write().await;
        let tokens_held = state.share_balance;
        let dividend = tokens_held * distribution.rate_per_token;
        let (reinvested, cash) = metrics::dividend_split(dividend, reinvest_pct);

        let transaction = Transaction {
            id: format!("tx_{}", Uuid::new_v4()),
            amount: dividend,
            currency: Currency::Usdc,
            price,
            fee: Decimal::ZERO,
            status: TransactionStatus::Completed,
            hash: None,
            timestamp: self.env.clock.now(),
            user_id: user.id.clone(),
            kind: TransactionKind::Dividend {
                distribution_id: distribution_id.to_string(),
                dividend_rate: distribution.rate_per_token,
                reinvestment_amount: reinvested,
                cash_amount: cash,
            },
        };

        if reinvested > Decimal::ZERO && price > Decimal::ZERO {
            state.share_balance += reinvested / price;
        }
        if cash > Decimal::ZERO {
            *state.wallet_balances.entry(Currency::Usdc).or_insert(Decimal::ZERO) += cash;
        }
        state.transactions.insert(0, transaction);

        let entry = match state
            .dividend_history
            .iter_mut()
            .find(|d| d.distribution_id == distribution_id)
        {
            Some(existing) => {
                existing.tokens_held = tokens_held;
                existing.total_earned = dividend;
                existing.reinvested_amount = reinvested;
                existing.cash_amount = cash;
                existing.payout_method = payout_method;
                existing.processed = true;
                existing.clone()
            }
            None => {
                let entry = UserDividend {
                    distribution_id: distribution_id.to_string(),
                    user_id: user.id,
                    tokens_held,
                    total_earned: dividend,
                    reinvested_amount: reinvested,
                    cash_amount: cash,
                    payout_method,
                    processed: true,
                };
                state.dividend_history.push(entry.clone());
                entry
            }
        };

        info!(
            "💎 Claimed {} from {} ({} reinvested, {} cash)",
            dividend, distribution_id, reinvested, cash
        );
        Ok(entry)
    }

    pub async fn update_dividend_preferences(&self, payout_method: PayoutMethod, reinvestment_percentage: u8) -> StoreResult<Preferences> {
        self.require_user().await?;

        let _busy = self.busy.begin();
        self.session
            .update_preferences(PreferencesUpdate {
                dividend_payout: Some(payout_method),
                reinvestment_percentage: Some(reinvestment_percentage),
                notifications: None,
            })
            .await
    }

    pub async fn refresh_balances(&self) -> StoreResult<()> {
        if !self.session.is_authenticated().await {
            return Ok(());
        }

        self.sync_owner().await;
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::RefreshBalances).await;

        let mut state = self.state.write().await;
        for balance in state.wallet_balances.values_mut() {
            let variation = self.env.random.symmetric(0.005);
            *balance = perturb(*balance, variation).round_dp(8);
        }
        Ok(())
    }

    pub async fn export_transactions(&self, format: ExportFormat) -> StoreResult<String> {
        let state = self.read_state().await;
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&state.transactions).map_err(|e| {
                error!("❌ Transaction export failed: {}", e);
                StoreError::ActionFailed("Failed to export transactions")
            }),
            ExportFormat::Csv => Ok(transactions_to_csv(&state.transactions)),
        }
    }
}

fn transactions_to_csv(transactions: &[Transaction]) -> String {
    let headers = ["Date", "Type", "Amount", "Currency", "Price", "Fee", "Status", "Hash"];
    let mut rows = vec![headers.iter().map(|h| h.to_string()).collect::<Vec<_>>()];

    for tx in transactions {
        rows.push(vec![
            tx.timestamp.to_rfc3339(),
            tx.tx_type().as_str().to_string(),
            tx.amount.to_string(),
            tx.currency.to_string(),
            tx.price.to_string(),
            tx.fee.to_string(),
            tx.status.as_str().to_string(),
            tx.hash.clone().unwrap_or_default(),
        ]);
    }

    rows.iter()
        .map(|row| row.iter().map(|field| format!("\"{}\"", field)).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Fixture {
        session: Arc<SessionStore>,
        fund: Arc<FundStore>,
        positions: UserPositionStore,
    }

    fn fixture() -> Fixture {
        let config = Config::without_latency();
        let env = Environment::in_memory();
        let session = Arc::new(SessionStore::new(&config, env.clone()));
        let fund = Arc::new(FundStore::new(env.clone()));
        let positions = UserPositionStore::new(&config, env, session.clone(), fund.clone());
        Fixture { session, fund, positions }
    }

    async fn connected() -> Fixture {
        let f = fixture();
        f.session.connect(WalletProvider::Metamask).await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_actions_require_authentication() {
        let f = fixture();

        assert!(matches!(f.positions.invest(dec!(10), Currency::Usdc).await, Err(StoreError::NotAuthenticated)));
        assert!(matches!(f.positions.divest(dec!(1), Currency::Usdc).await, Err(StoreError::NotAuthenticated)));
        assert!(matches!(f.positions.claim_dividend("div_001").await, Err(StoreError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_invest_moves_exact_amounts() {
        let f = connected().await;
        let price = f.fund.share_price().await;
        let usdc_before = f.positions.balance_in(Currency::Usdc).await;
        let shares_before = f.positions.share_balance().await;

        let tx = f.positions.invest(dec!(1000), Currency::Usdc).await.unwrap();

        assert_eq!(f.positions.balance_in(Currency::Usdc).await, usdc_before - dec!(1000));
        assert_eq!(f.positions.share_balance().await, shares_before + dec!(1000) / price);
        assert_eq!(tx.tx_type(), TransactionType::Invest);
        assert_eq!(tx.fee, Decimal::ZERO);
        assert_eq!(f.positions.transactions().await[0].id, tx.id);
        assert!(!f.positions.is_loading());
    }

    #[tokio::test]
    async fn test_invest_insufficient_balance() {
        let f = connected().await;
        let result = f.positions.invest(dec!(3), Currency::Eth).await;

        match result {
            Err(StoreError::InsufficientBalance { currency, requested, available }) => {
                assert_eq!(currency, Currency::Eth);
                assert_eq!(requested, dec!(3));
                assert_eq!(available, dec!(2.5));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }
        assert_eq!(f.positions.balance_in(Currency::Eth).await, dec!(2.5));
        assert_eq!(f.positions.transactions().await.len(), 3);
    }

    #[tokio::test]
    async fn test_invest_rejects_share_token_and_non_positive_amounts() {
        let f = connected().await;
        assert!(matches!(f.positions.invest(dec!(1), Currency::Tsrt).await, Err(StoreError::UnsupportedCurrency(_))));
        assert!(matches!(f.positions.invest(dec!(0), Currency::Usdc).await, Err(StoreError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_divest_applies_exit_fee() {
        let f = connected().await;
        let price = f.fund.share_price().await;
        let usdt_before = f.positions.balance_in(Currency::Usdt).await;

        let tx = f.positions.divest(dec!(100), Currency::Usdt).await.unwrap();

        let expected = dec!(100) * price * (Decimal::ONE - dec!(0.005));
        assert_eq!(f.positions.balance_in(Currency::Usdt).await, usdt_before + expected);
        assert_eq!(f.positions.share_balance().await, dec!(1150.50));
        assert_eq!(tx.fee, dec!(100) * price * dec!(0.005));
        assert!(tx.fee >= Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_divest_insufficient_shares() {
        let f = connected().await;
        let result = f.positions.divest(dec!(5000), Currency::Usdc).await;
        assert!(matches!(result, Err(StoreError::InsufficientBalance { currency: Currency::Tsrt, .. })));
        assert_eq!(f.positions.share_balance().await, dec!(1250.50));
    }

    #[tokio::test]
    async fn test_claim_dividend_splits_by_preference() {
        let f = connected().await;
        let price = f.fund.share_price().await;
        let usdc_before = f.positions.balance_in(Currency::Usdc).await;

        let entry = f.positions.claim_dividend("div_003").await.unwrap();

        let dividend = dec!(1250.50) * dec!(0.78);
        assert_eq!(entry.total_earned, dividend);
        assert_eq!(entry.reinvested_amount, dividend * dec!(70) / dec!(100));
        assert_eq!(entry.cash_amount, dividend - entry.reinvested_amount);
        assert_eq!(f.positions.balance_in(Currency::Usdc).await, usdc_before + entry.cash_amount);
        assert_eq!(
            f.positions.share_balance().await,
            dec!(1250.50) + entry.reinvested_amount / price
        );
        assert_eq!(f.positions.transactions().await[0].tx_type(), TransactionType::Dividend);
    }

    #[tokio::test]
    async fn test_reclaim_updates_ledger_entry() {
        let f = connected().await;

        f.positions.claim_dividend("div_003").await.unwrap();
        let second = f.positions.claim_dividend("div_003").await.unwrap();

        let history = f.positions.dividend_history().await;
        let entries: Vec<_> = history.iter().filter(|d| d.distribution_id == "div_003").collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], &second);
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_claim_existing_seed_entry_is_updated() {
        let f = connected().await;
        f.positions.claim_dividend("div_001").await.unwrap();

        let history = f.positions.dividend_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].total_earned, dec!(1250.50) * dec!(0.85));
    }

    #[tokio::test]
    async fn test_claim_unknown_distribution() {
        let f = connected().await;
        let result = f.positions.claim_dividend("div_404").await;
        assert!(matches!(result, Err(StoreError::DistributionNotFound(_))));
        assert!(!f.positions.is_loading());
    }

    #[tokio::test]
    async fn test_update_dividend_preferences_flows_into_claims() {
        let f = connected().await;
        f.positions
            .update_dividend_preferences(PayoutMethod::Cash, 0)
            .await
            .unwrap();

        let entry = f.positions.claim_dividend("div_002").await.unwrap();
        assert_eq!(entry.reinvested_amount, Decimal::ZERO);
        assert_eq!(entry.payout_method, PayoutMethod::Cash);
        assert_eq!(f.positions.share_balance().await, dec!(1250.50));
    }

    #[tokio::test]
    async fn test_portfolio_allocation_empty_when_signed_out() {
        let f = fixture();
        assert!(f.positions.portfolio_allocation().await.is_empty());

        f.session.connect(WalletProvider::Metamask).await.unwrap();
        assert_eq!(f.positions.portfolio_allocation().await.len(), 5);
    }

    #[tokio::test]
    async fn test_derived_getters() {
        let f = connected().await;

        assert_eq!(f.positions.total_portfolio_value().await, dec!(1250.50) * dec!(125.67));
        assert_eq!(f.positions.total_dividends_earned().await, dec!(217.00));
        assert_eq!(f.positions.estimated_next_dividend().await, dec!(1250.50) * dec!(0.78));
        assert_eq!(f.positions.investment_performance().await.total_invested, dec!(1500));
    }

    #[tokio::test]
    async fn test_transaction_history_filter_and_limit() {
        let f = connected().await;
        f.positions.invest(dec!(10), Currency::Usdc).await.unwrap();

        let invests = f.positions.transaction_history(Some(TransactionType::Invest), None).await;
        assert_eq!(invests.len(), 3);
        assert!(invests.iter().all(|tx| tx.tx_type() == TransactionType::Invest));

        let latest = f.positions.transaction_history(None, Some(1)).await;
        assert_eq!(latest[0].amount, dec!(10));
    }

    #[tokio::test]
    async fn test_csv_export() {
        let f = connected().await;
        let csv = f.positions.export_transactions(ExportFormat::Csv).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "\"Date\",\"Type\",\"Amount\",\"Currency\",\"Price\",\"Fee\",\"Status\",\"Hash\"");
        assert!(lines[2].contains("\"dividend\""));
        assert!(lines[2].ends_with(",\"\""));
    }

    #[tokio::test]
    async fn test_wallet_switch_reseeds_position() {
        let f = connected().await;
        f.positions.invest(dec!(1000), Currency::Usdc).await.unwrap();
        assert_eq!(f.positions.balance_in(Currency::Usdc).await, dec!(4000));

        f.session.disconnect().await.unwrap();
        f.session.connect(WalletProvider::Metamask).await.unwrap();
        assert_eq!(f.positions.balance_in(Currency::Usdc).await, dec!(4000));

        f.session.disconnect().await.unwrap();
        f.session.connect(WalletProvider::Coinbase).await.unwrap();
        let user = f.session.user().await.unwrap();

        assert_eq!(f.positions.balance_in(Currency::Usdc).await, dec!(5000));
        assert_eq!(f.positions.share_balance().await, dec!(1250.50));
        let transactions = f.positions.transactions().await;
        assert_eq!(transactions.len(), 3);
        assert!(transactions.iter().all(|tx| tx.user_id == user.id));
        assert!(f
            .positions
            .dividend_history()
            .await
            .iter()
            .all(|d| d.user_id == user.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_invests_resolve_against_completion_snapshot() {
        let config = Config::default();
        let env = Environment {
            network: Arc::new(crate::api::SimulatedNetwork::new(config.latency.clone())),
            ..Environment::in_memory()
        };
        let session = Arc::new(SessionStore::new(&config, env.clone()));
        let fund = Arc::new(FundStore::new(env.clone()));
        let positions = Arc::new(UserPositionStore::new(&config, env, session.clone(), fund));
        session.connect(WalletProvider::Metamask).await.unwrap();

        // Both pass the up-front check against 5000 USDC; only one can settle.
        let first = tokio::spawn({
            let positions = positions.clone();
            async move { positions.invest(dec!(3000), Currency::Usdc).await }
        });
        let second = tokio::spawn({
            let positions = positions.clone();
            async move { positions.invest(dec!(3000), Currency::Usdc).await }
        });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert!(positions.is_loading());

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(positions.balance_in(Currency::Usdc).await, dec!(2000));
        assert!(!positions.is_loading());
    }
}
