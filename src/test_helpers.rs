use crate::{
    address::Address,
    config::{
        Backoff,
        ClientConfig,
        RetryPolicy,
    },
    controller::GameController,
    provider::{
        ContractCall,
        Receipt,
        TransactionRequest,
        WalletProvider,
    },
    simulated::{
        SimulatedChain,
        SimulatedChainConfig,
        dev_account,
    },
    stats::MACHINE_COUNT,
    units::{
        self,
        U256,
    },
};
use std::{
    sync::Arc,
    time::Duration,
};

/// A simulated chain with two funded players and a controller wired to it
/// with short timeouts.
pub struct TestContext {
    chain: SimulatedChain,
    alice: Address,
    bob: Address,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_targets([5_000, 5_000, 5_000])
    }

    pub fn with_targets(targets: [u64; MACHINE_COUNT]) -> Self {
        Self::with_chain_config(SimulatedChainConfig {
            targets: Some(targets),
            ..SimulatedChainConfig::default()
        })
    }

    pub fn with_chain_config(config: SimulatedChainConfig) -> Self {
        let alice = dev_account(1);
        let bob = dev_account(2);
        let chain = SimulatedChain::new(SimulatedChainConfig {
            accounts: vec![(alice, units::ether(10)), (bob, units::ether(10))],
            ..config
        });
        Self { chain, alice, bob }
    }

    pub fn chain(&self) -> &SimulatedChain {
        &self.chain
    }

    pub fn alice(&self) -> Address {
        self.alice
    }

    pub fn bob(&self) -> Address {
        self.bob
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            game_address: self.chain.game_address(),
            confirmation_timeout_ms: 500,
            read_timeout_ms: 500,
            stale_read: RetryPolicy {
                max_retries: 2,
                initial_delay_ms: 5,
                max_delay_ms: 20,
                backoff: Backoff::Exponential,
            },
            ..ClientConfig::default()
        }
    }

    pub fn controller(&self) -> GameController {
        self.controller_with(self.client_config())
    }

    pub fn controller_with(&self, config: ClientConfig) -> GameController {
        let provider: Arc<dyn WalletProvider> = Arc::new(self.chain.clone());
        GameController::new(Some(provider), config)
    }

    /// Controller that has already gone through connect.
    pub async fn connected_controller(&self) -> GameController {
        let mut controller = self.controller();
        controller.init().await;
        controller
            .perform(crate::Action::Connect)
            .await
            .unwrap();
        controller
    }

    pub fn give_tokens(&self, to: Address, whole: u64) {
        self.chain.mint_tokens(to, units::tokens(whole));
    }

    pub fn token_balance(&self, owner: Address) -> U256 {
        self.chain.token_balance(owner)
    }

    /// Seats `player` on `machine` (0-based) with a bet placed outside the
    /// controller.
    pub async fn seat_player(&self, player: Address, machine: u64, whole: u64) -> Receipt {
        let game = self.chain.game_address();
        let amount = units::tokens(whole);
        self.give_tokens(player, whole);
        self.chain
            .transact(TransactionRequest {
                from: player,
                to: self.chain.token_address(),
                value: U256::ZERO,
                call: ContractCall::Approve {
                    spender: game,
                    amount,
                },
            })
            .await
            .unwrap();
        self.chain
            .transact(TransactionRequest {
                from: player,
                to: game,
                value: U256::ZERO,
                call: ContractCall::PlaceBet { machine, amount },
            })
            .await
            .unwrap()
    }

    pub fn short_timeout(&self) -> Duration {
        Duration::from_millis(self.client_config().confirmation_timeout_ms)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
