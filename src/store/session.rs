use chrono::{Duration, TimeZone, Utc};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{BusyFlag, Environment};
use crate::api::Action;
use crate::config::{Config, MAX_SESSION_AGE_HOURS};
use crate::error::{StoreError, StoreResult};
use crate::model::*;
use crate::storage::{self, PersistedConnection, StorageError, USER_PREFERENCES_KEY, WALLET_CONNECTION_KEY};

/// Owns wallet connection and user identity.
pub struct SessionStore {
    state: RwLock<Session>,
    busy: BusyFlag,
    connecting: AtomicBool,
    max_age: Duration,
    default_reinvestment: u8,
    env: Environment,
}

/// Clears the connecting latch however `connect` exits.
struct ConnectingLatch<'a>(&'a AtomicBool);

impl Drop for ConnectingLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionStore {
    pub fn new(config: &Config, env: Environment) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            busy: BusyFlag::default(),
            connecting: AtomicBool::new(false),
            max_age: Duration::hours(config.session_max_age_hours.clamp(1, MAX_SESSION_AGE_HOURS)),
            default_reinvestment: config.default_reinvestment_percentage,
            env,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn is_manager(&self) -> bool {
        self.state.read().await.is_manager()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn wallet_connection(&self) -> Option<WalletConnection> {
        self.state.read().await.wallet_connection.clone()
    }

    pub async fn user_address(&self) -> String {
        self.state
            .read()
            .await
            .wallet_connection
            .as_ref()
            .map(|w| w.address.clone())
            .unwrap_or_default()
    }

    pub async fn user_role(&self) -> Role {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|u| u.role)
            .unwrap_or(Role::Investor)
    }

    pub async fn preferences(&self) -> Option<Preferences> {
        self.state.read().await.user.as_ref().map(|u| u.preferences.clone())
    }

    fn default_preferences(&self) -> Preferences {
        Preferences::with_reinvestment(self.default_reinvestment)
    }

    fn generate_mock_address(&self, provider: WalletProvider) -> String {
        format!("{}{}", provider.address_prefix(), self.env.random.hex_string(32))
    }

    pub async fn connect(&self, provider: WalletProvider) -> StoreResult<WalletConnection> {
        if self
            .connecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("🔌 Connect via {} rejected: a connection is already in progress", provider);
            return Err(StoreError::Connection("a connection is already in progress".to_string()));
        }
        let _latch = ConnectingLatch(&self.connecting);
        let _busy = self.busy.begin();

        info!("🔌 Connecting wallet via {}", provider);
        self.env.network.round_trip(Action::ConnectWallet).await;

        let address = self.generate_mock_address(provider);
        let now = self.env.clock.now();

        let record = PersistedConnection {
            address: address.clone(),
            provider,
            timestamp: now.timestamp_millis(),
        };
        if let Err(e) = storage::write_json(self.env.storage.as_ref(), WALLET_CONNECTION_KEY, &record) {
            error!("❌ Failed to persist wallet connection: {}", e);
            return Err(StoreError::ActionFailed("Failed to connect wallet. Please try again."));
        }

        let connection = WalletConnection {
            address: address.clone(),
            chain_id: DEFAULT_CHAIN_ID,
            provider,
            is_connected: true,
        };
        let user = User::mock(
            format!("user_{}", now.timestamp_millis()),
            &address,
            now,
            self.default_preferences(),
        );

        {
            let mut state = self.state.write().await;
            state.wallet_connection = Some(connection.clone());
            state.user = Some(user);
        }

        info!("✅ Wallet {} connected as {}", address, Role::for_address(&address));
        Ok(connection)
    }

    pub async fn disconnect(&self) -> StoreResult<()> {
        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::DisconnectWallet).await;

        self.state.write().await.clear();

        let removed = self
            .env
            .storage
            .remove_item(WALLET_CONNECTION_KEY)
            .and_then(|_| self.env.storage.remove_item(USER_PREFERENCES_KEY));
        if let Err(e) = removed {
            error!("❌ Failed to clear persisted session: {}", e);
            return Err(StoreError::ActionFailed("Failed to disconnect wallet"));
        }

        info!("👋 Wallet disconnected");
        Ok(())
    }

    /// Rebuilds the session from local storage. Returns whether a session was
    /// restored. Expired or unreadable records are removed and never surfaced.
    pub async fn restore_session(&self) -> bool {
        let record = match storage::read_json::<PersistedConnection>(self.env.storage.as_ref(), WALLET_CONNECTION_KEY) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("💾 No persisted wallet connection");
                return false;
            }
            Err(e) => {
                warn!("💾 Discarding persisted wallet connection: {}", e);
                self.discard(WALLET_CONNECTION_KEY);
                return false;
            }
        };

        let now = self.env.clock.now();
        let Some(connected_at) = Utc.timestamp_millis_opt(record.timestamp).single() else {
            warn!("💾 Discarding wallet connection with invalid timestamp {}", record.timestamp);
            self.discard(WALLET_CONNECTION_KEY);
            return false;
        };

        if now - connected_at > self.max_age {
            info!("⌛ Persisted session for {} expired, clearing", record.address);
            self.discard(WALLET_CONNECTION_KEY);
            return false;
        }

        let preferences = self.restore_preferences();

        let connection = WalletConnection {
            address: record.address.clone(),
            chain_id: DEFAULT_CHAIN_ID,
            provider: record.provider,
            is_connected: true,
        };
        let user = User::mock(
            format!("user_{}", record.address),
            &record.address,
            connected_at,
            preferences,
        );

        {
            let mut state = self.state.write().await;
            state.wallet_connection = Some(connection);
            state.user = Some(user);
        }

        info!("🔁 Restored session for {}", record.address);
        true
    }

    fn restore_preferences(&self) -> Preferences {
        match storage::read_json::<Preferences>(self.env.storage.as_ref(), USER_PREFERENCES_KEY) {
            Ok(Some(prefs)) if prefs.reinvestment_percentage <= 100 => prefs,
            Ok(Some(_)) | Err(StorageError::PersistedStateCorrupt { .. }) => {
                warn!("💾 Discarding unreadable user preferences");
                self.discard(USER_PREFERENCES_KEY);
                self.default_preferences()
            }
            Ok(None) => self.default_preferences(),
            Err(e) => {
                warn!("💾 Could not read user preferences: {}", e);
                self.default_preferences()
            }
        }
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.env.storage.remove_item(key) {
            warn!("💾 Failed to remove '{}': {}", key, e);
        }
    }

    pub async fn update_preferences(&self, update: PreferencesUpdate) -> StoreResult<Preferences> {
        if self.state.read().await.user.is_none() {
            return Err(StoreError::NotAuthenticated);
        }
        if let Some(pct) = update.reinvestment_percentage {
            if pct > 100 {
                warn!("⚙️ Rejected reinvestment percentage {}", pct);
                return Err(StoreError::InvalidPreferences(format!(
                    "reinvestment percentage must be at most 100, got {}",
                    pct
                )));
            }
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::UpdatePreferences).await;

        let preferences = {
            let mut state = self.state.write().await;
            let user = state.user.as_mut().ok_or(StoreError::NotAuthenticated)?;
            user.preferences.apply(&update);
            user.preferences.clone()
        };

        if let Err(e) = storage::write_json(self.env.storage.as_ref(), USER_PREFERENCES_KEY, &preferences) {
            error!("❌ Failed to persist preferences: {}", e);
            return Err(StoreError::ActionFailed("Failed to update preferences"));
        }

        info!("⚙️ Preferences updated (reinvest {}%)", preferences.reinvestment_percentage);
        Ok(preferences)
    }

    pub async fn switch_network(&self, chain_id: u64) -> StoreResult<()> {
        if self.state.read().await.wallet_connection.is_none() {
            return Err(StoreError::WalletNotConnected);
        }

        let _busy = self.busy.begin();
        self.env.network.round_trip(Action::SwitchNetwork).await;

        let mut state = self.state.write().await;
        let wallet = state.wallet_connection.as_mut().ok_or(StoreError::WalletNotConnected)?;
        wallet.chain_id = chain_id;

        info!("🌐 Switched to chain {}", chain_id);
        Ok(())
    }
}
