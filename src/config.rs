use crate::{
    address::Address,
    units::{
        self,
        DEFAULT_TOKENS_PER_ETH,
        U256,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::Path,
    time::Duration,
};

/// `0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d`, the game machine used when
/// no deployment record or override is available.
pub const DEFAULT_GAME_CONTRACT: Address = Address::new([
    0x5a, 0xcd, 0x86, 0xcd, 0xbf, 0x49, 0xcb, 0x55, 0x51, 0xa4, 0x79, 0x0f, 0xdb, 0xce,
    0x14, 0xd1, 0xec, 0x78, 0xc1, 0x6d,
]);

/// Unit `placeBet` and its approval expect for the bet amount. Which one a
/// deployed contract wants is a property of that deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetUnits {
    /// Human amount times 10^18.
    #[default]
    Scaled,
    /// Whole tokens, 0 to 10000, passed unscaled.
    Raw,
}

/// Allowance granted before a token-consuming call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ApprovalPolicy {
    /// Exactly the amount about to be moved.
    #[default]
    Exact,
    /// A standing allowance of `tokens` whole DGT, raised to the amount
    /// being moved when that is larger.
    Fixed { tokens: u64 },
}

impl ApprovalPolicy {
    pub fn allowance_for(&self, amount: U256) -> U256 {
        match self {
            ApprovalPolicy::Exact => amount,
            ApprovalPolicy::Fixed { tokens } => units::tokens(*tokens).max(amount),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    #[default]
    Exponential,
}

/// How long to keep re-reading a balance that did not move after a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay_ms: 1_500,
            max_delay_ms: 6_000,
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms;
        let millis = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => base.saturating_mul(1u64 << attempt.min(16)),
        };
        Duration::from_millis(millis.min(self.max_delay_ms))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub game_address: Address,
    pub confirmation_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub stale_read: RetryPolicy,
    pub approval: ApprovalPolicy,
    pub bet_units: BetUnits,
    pub tokens_per_eth: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            game_address: DEFAULT_GAME_CONTRACT,
            confirmation_timeout_ms: 120_000,
            read_timeout_ms: 15_000,
            stale_read: RetryPolicy::default(),
            approval: ApprovalPolicy::default(),
            bet_units: BetUnits::default(),
            tokens_per_eth: DEFAULT_TOKENS_PER_ETH,
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .wrap_err_with(|| format!("Failed to read client config {}", path.display()))?;
        serde_json::from_slice(&data)
            .wrap_err_with(|| format!("Failed to parse client config {}", path.display()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn default_game_contract__matches_published_address() {
        assert_eq!(
            "0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d",
            DEFAULT_GAME_CONTRACT.to_string()
        );
    }

    #[test]
    fn client_config__fills_missing_fields_with_defaults() {
        // given
        let json = r#"{ "bet_units": "raw", "approval": { "kind": "fixed", "tokens": 1000000 } }"#;

        // when
        let config: ClientConfig = serde_json::from_str(json).unwrap();

        // then
        assert_eq!(BetUnits::Raw, config.bet_units);
        assert_eq!(ApprovalPolicy::Fixed { tokens: 1_000_000 }, config.approval);
        assert_eq!(DEFAULT_GAME_CONTRACT, config.game_address);
        assert_eq!(1, config.stale_read.max_retries);
    }

    #[test]
    fn delay_for__doubles_until_capped() {
        // given
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay_ms: 100,
            max_delay_ms: 350,
            backoff: Backoff::Exponential,
        };

        // when
        let delays: Vec<u128> = (0..4).map(|n| policy.delay_for(n).as_millis()).collect();

        // then
        assert_eq!(vec![100, 200, 350, 350], delays);
    }

    #[test]
    fn allowance_for__never_grants_less_than_the_amount() {
        let policy = ApprovalPolicy::Fixed { tokens: 10 };
        assert_eq!(units::tokens(10), policy.allowance_for(units::tokens(3)));
        assert_eq!(units::tokens(30), policy.allowance_for(units::tokens(30)));
        assert_eq!(
            units::tokens(3),
            ApprovalPolicy::Exact.allowance_for(units::tokens(3))
        );
    }
}
