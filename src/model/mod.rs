pub mod bot;
pub mod fund;
pub mod ledger;

pub use bot::*;
pub use fund::*;
pub use ledger::*;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CHAIN_ID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletProvider {
    Metamask,
    WalletConnect,
    Coinbase,
}

impl WalletProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletProvider::Metamask => "metamask",
            WalletProvider::WalletConnect => "walletconnect",
            WalletProvider::Coinbase => "coinbase",
        }
    }

    pub fn address_prefix(&self) -> &'static str {
        match self {
            WalletProvider::Metamask => "0x1234",
            WalletProvider::WalletConnect => "0x5678",
            WalletProvider::Coinbase => "0x9abc",
        }
    }
}

impl fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metamask" => Ok(WalletProvider::Metamask),
            "walletconnect" => Ok(WalletProvider::WalletConnect),
            "coinbase" => Ok(WalletProvider::Coinbase),
            other => Err(format!("unknown wallet type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Investor,
    Manager,
}

impl Role {
    /// Mock role assignment: addresses ending in `1` belong to fund managers.
    pub fn for_address(address: &str) -> Self {
        if address.ends_with('1') {
            Role::Manager
        } else {
            Role::Investor
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Investor => f.write_str("investor"),
            Role::Manager => f.write_str("manager"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMethod {
    Reinvest,
    Cash,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email: bool,
    pub browser: bool,
    pub dividends: bool,
    pub transactions: bool,
    pub price_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            browser: true,
            dividends: true,
            transactions: true,
            price_alerts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub dividend_payout: PayoutMethod,
    pub reinvestment_percentage: u8,
    pub notifications: NotificationSettings,
}

impl Preferences {
    pub fn with_reinvestment(reinvestment_percentage: u8) -> Self {
        Self {
            dividend_payout: PayoutMethod::Reinvest,
            reinvestment_percentage,
            notifications: NotificationSettings::default(),
        }
    }

    pub fn apply(&mut self, update: &PreferencesUpdate) {
        if let Some(method) = update.dividend_payout {
            self.dividend_payout = method;
        }
        if let Some(pct) = update.reinvestment_percentage {
            self.reinvestment_percentage = pct;
        }
        if let Some(ref notifications) = update.notifications {
            self.notifications = notifications.clone();
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self::with_reinvestment(70)
    }
}

/// Partial preferences update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_payout: Option<PayoutMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinvestment_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub address: String,
    pub role: Role,
    pub balance: Decimal,
    pub joined_at: DateTime<Utc>,
    pub preferences: Preferences,
}

impl User {
    pub fn mock(id: String, address: &str, joined_at: DateTime<Utc>, preferences: Preferences) -> Self {
        Self {
            id,
            address: address.to_string(),
            role: Role::for_address(address),
            balance: dec!(1250.50),
            joined_at,
            preferences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnection {
    pub address: String,
    pub chain_id: u64,
    pub provider: WalletProvider,
    pub is_connected: bool,
}

/// In-memory session. Both halves are optional so that a half-torn-down
/// session is representable; only a complete one counts as authenticated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub wallet_connection: Option<WalletConnection>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
            && self
                .wallet_connection
                .as_ref()
                .map(|w| w.is_connected)
                .unwrap_or(false)
    }

    pub fn is_manager(&self) -> bool {
        self.user.as_ref().map(|u| u.role == Role::Manager).unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.wallet_connection = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdc,
    Usdt,
    Eth,
    Btc,
    /// The fund's own share token.
    Tsrt,
}

impl Currency {
    pub const WALLET: [Currency; 4] = [Currency::Usdc, Currency::Eth, Currency::Btc, Currency::Usdt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usdc => "USDC",
            Currency::Usdt => "USDT",
            Currency::Eth => "ETH",
            Currency::Btc => "BTC",
            Currency::Tsrt => "TSRT",
        }
    }

    pub fn is_wallet_currency(&self) -> bool {
        !matches!(self, Currency::Tsrt)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USDC" => Ok(Currency::Usdc),
            "USDT" => Ok(Currency::Usdt),
            "ETH" => Ok(Currency::Eth),
            "BTC" => Ok(Currency::Btc),
            "TSRT" => Ok(Currency::Tsrt),
            other => Err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(is_connected: bool) -> WalletConnection {
        WalletConnection {
            address: "0x1234abc".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            provider: WalletProvider::Metamask,
            is_connected,
        }
    }

    fn user() -> User {
        User::mock("user_1".to_string(), "0x1234abc", Utc::now(), Preferences::default())
    }

    #[test]
    fn test_authenticated_requires_user_and_connected_wallet() {
        let cases = [
            (None, None, false),
            (Some(user()), None, false),
            (None, Some(wallet(true)), false),
            (Some(user()), Some(wallet(false)), false),
            (Some(user()), Some(wallet(true)), true),
        ];

        for (user, wallet_connection, expected) in cases {
            let session = Session { user, wallet_connection };
            assert_eq!(session.is_authenticated(), expected);
        }
    }

    #[test]
    fn test_role_from_address_suffix() {
        assert_eq!(Role::for_address("0x12340001"), Role::Manager);
        assert_eq!(Role::for_address("0x12340002"), Role::Investor);
    }

    #[test]
    fn test_preferences_partial_update() {
        let mut prefs = Preferences::default();
        prefs.apply(&PreferencesUpdate {
            reinvestment_percentage: Some(40),
            ..Default::default()
        });

        assert_eq!(prefs.reinvestment_percentage, 40);
        assert_eq!(prefs.dividend_payout, PayoutMethod::Reinvest);
        assert!(prefs.notifications.email);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("usdc".parse::<Currency>(), Ok(Currency::Usdc));
        assert_eq!("TSRT".parse::<Currency>(), Ok(Currency::Tsrt));
        assert!("DOGE".parse::<Currency>().is_err());
        assert!(!Currency::Tsrt.is_wallet_currency());
    }
}
