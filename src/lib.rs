pub mod address;

pub mod advisory;

pub mod config;

pub mod contracts;

pub mod controller;

pub mod deployment;

pub mod forms;

pub mod keystore;

pub mod provider;

pub mod session;

pub mod simulated;

pub mod stats;

pub mod units;

pub mod test_helpers;

pub use address::Address;
pub use controller::{
    Action,
    ActionError,
    AppSnapshot,
    GameController,
};
pub use provider::WalletProvider;
pub use simulated::SimulatedChain;
pub use units::U256;
