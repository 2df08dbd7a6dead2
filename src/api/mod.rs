pub mod network;

pub use network::{Action, InstantNetwork, LatencySettings, Network, SimulatedNetwork};
