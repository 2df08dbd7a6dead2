use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{BotStatus, Currency};

/// User-facing failures raised by store actions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Wallet connection failed: {0}")]
    Connection(String),

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("No wallet connected")]
    WalletNotConnected,

    #[error("Insufficient {currency} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        currency: Currency,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Bot not found: {0}")]
    BotNotFound(String),

    #[error("Cannot {action} bot {bot_id} while it is {status}")]
    InvalidBotTransition {
        bot_id: String,
        action: &'static str,
        status: BotStatus,
    },

    #[error("Bot {0} is not active")]
    BotNotActive(String),

    #[error("Distribution not found: {0}")]
    DistributionNotFound(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Allocations must total 100%, got {0}%")]
    InvalidAllocation(Decimal),

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("{0}")]
    ActionFailed(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;
