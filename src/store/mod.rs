pub mod fund;
pub mod position;
pub mod session;
pub mod trading;

pub use fund::FundStore;
pub use position::UserPositionStore;
pub use session::SessionStore;
pub use trading::TradingBotStore;

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::{InstantNetwork, Network, SimulatedNetwork};
use crate::config::Config;
use crate::router::NavigationGuard;
use crate::sim::{Clock, RandomSource, ScriptedRandom, SeededRandom, SystemClock, ThreadRandom};
use crate::storage::{FileStorage, LocalStorage, MemoryStorage};

/// Observable "action in flight" flag. Counts overlapping actions so the flag
/// stays raised until the last one finishes.
#[derive(Debug, Default)]
pub struct BusyFlag {
    in_flight: AtomicUsize,
}

impl BusyFlag {
    pub fn begin(&self) -> BusyGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        BusyGuard { flag: self }
    }

    pub fn is_set(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Side-effecting collaborators shared by every store.
#[derive(Clone)]
pub struct Environment {
    pub storage: Arc<dyn LocalStorage>,
    pub network: Arc<dyn Network>,
    pub random: Arc<dyn RandomSource>,
    pub clock: Arc<dyn Clock>,
}

impl Environment {
    pub fn from_config(config: &Config) -> Self {
        let random: Arc<dyn RandomSource> = match config.rng_seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };

        Self {
            storage: Arc::new(FileStorage::new(&config.storage_path)),
            network: Arc::new(SimulatedNetwork::new(config.latency.clone())),
            random,
            clock: Arc::new(SystemClock),
        }
    }

    /// In-memory storage, no latency, and draws that leave every mock
    /// perturbation at zero.
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            network: Arc::new(InstantNetwork),
            random: Arc::new(ScriptedRandom::constant(0.5)),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Every store, constructed once with its dependencies wired explicitly.
pub struct Dashboard {
    pub session: Arc<SessionStore>,
    pub fund: Arc<FundStore>,
    pub positions: Arc<UserPositionStore>,
    pub trading: Arc<TradingBotStore>,
    pub guard: NavigationGuard,
}

impl Dashboard {
    pub fn new(config: &Config, env: Environment) -> Self {
        let session = Arc::new(SessionStore::new(config, env.clone()));
        let fund = Arc::new(FundStore::new(env.clone()));
        let positions = Arc::new(UserPositionStore::new(config, env.clone(), session.clone(), fund.clone()));
        let trading = Arc::new(TradingBotStore::new(env));
        let guard = NavigationGuard::new(session.clone());

        info!("🧩 Dashboard stores initialised");

        Self {
            session,
            fund,
            positions,
            trading,
            guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_flag_tracks_overlapping_guards() {
        let flag = BusyFlag::default();
        assert!(!flag.is_set());

        let first = flag.begin();
        let second = flag.begin();
        drop(first);
        assert!(flag.is_set());

        drop(second);
        assert!(!flag.is_set());
    }
}
