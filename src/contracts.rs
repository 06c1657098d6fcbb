//! Typed handles over the two contracts the client talks to.

use crate::{
    address::Address,
    provider::{
        ContractCall,
        ProviderError,
        Receipt,
        TransactionRequest,
        TxHash,
        WalletProvider,
    },
    units::{
        self,
        U256,
    },
};
use std::sync::Arc;
use tracing::debug;

/// The account transactions are sent from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signer {
    address: Address,
}

impl Signer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// A submitted transaction that has not been confirmed yet.
pub struct PendingTransaction {
    hash: TxHash,
    call: &'static str,
    provider: Arc<dyn WalletProvider>,
}

impl PendingTransaction {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn call(&self) -> &'static str {
        self.call
    }

    /// Waits for inclusion; a failed receipt becomes an error.
    pub async fn wait(self) -> Result<Receipt, ProviderError> {
        let receipt = self.provider.wait_for_receipt(self.hash).await?;
        if !receipt.success {
            return Err(ProviderError::TransactionFailed {
                hash: self.hash,
                reason: receipt
                    .revert_reason
                    .unwrap_or_else(|| String::from("execution reverted")),
            });
        }
        Ok(receipt)
    }
}

#[derive(Clone)]
struct Binding {
    address: Address,
    signer: Signer,
    provider: Arc<dyn WalletProvider>,
}

impl Binding {
    async fn read_uint(&self, call: ContractCall) -> Result<U256, ProviderError> {
        let name = call.name();
        self.provider.read(self.address, call).await?.into_uint(name)
    }

    async fn read_u64(&self, call: ContractCall) -> Result<u64, ProviderError> {
        let name = call.name();
        let value = self.read_uint(call).await?;
        units::to_u64(value).ok_or(ProviderError::UnexpectedOutput { call: name })
    }

    async fn transact(
        &self,
        call: ContractCall,
        value: U256,
    ) -> Result<PendingTransaction, ProviderError> {
        let name = call.name();
        let hash = self
            .provider
            .send(TransactionRequest {
                from: self.signer.address(),
                to: self.address,
                value,
                call,
            })
            .await?;
        debug!(call = name, %hash, "transaction submitted");
        Ok(PendingTransaction {
            hash,
            call: name,
            provider: self.provider.clone(),
        })
    }
}

#[derive(Clone)]
pub struct GameMachine {
    binding: Binding,
}

impl GameMachine {
    pub fn new(address: Address, signer: Signer, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            binding: Binding {
                address,
                signer,
                provider,
            },
        }
    }

    pub fn address(&self) -> Address {
        self.binding.address
    }

    pub async fn game_token(&self) -> Result<Address, ProviderError> {
        let call = ContractCall::GameToken;
        let name = call.name();
        self.binding
            .provider
            .read(self.binding.address, call)
            .await?
            .into_address(name)
    }

    /// 1-based machine the player is seated on, 0 when none.
    pub async fn current_machine(&self, player: Address) -> Result<u64, ProviderError> {
        self.binding
            .read_u64(ContractCall::GetCurrentMachine { player })
            .await
    }

    pub async fn machine_player_count(&self, machine: u64) -> Result<u64, ProviderError> {
        self.binding
            .read_u64(ContractCall::GetMachinePlayerCount { machine })
            .await
    }

    pub async fn buy_tokens(&self, value: U256) -> Result<PendingTransaction, ProviderError> {
        self.binding.transact(ContractCall::BuyTokens, value).await
    }

    pub async fn sell_tokens(
        &self,
        amount: U256,
    ) -> Result<PendingTransaction, ProviderError> {
        self.binding
            .transact(ContractCall::SellTokens { amount }, U256::ZERO)
            .await
    }

    pub async fn place_bet(
        &self,
        machine: u64,
        amount: U256,
    ) -> Result<PendingTransaction, ProviderError> {
        self.binding
            .transact(ContractCall::PlaceBet { machine, amount }, U256::ZERO)
            .await
    }
}

#[derive(Clone)]
pub struct GameToken {
    binding: Binding,
}

impl GameToken {
    pub fn new(address: Address, signer: Signer, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            binding: Binding {
                address,
                signer,
                provider,
            },
        }
    }

    pub fn address(&self) -> Address {
        self.binding.address
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, ProviderError> {
        self.binding
            .read_uint(ContractCall::BalanceOf { owner })
            .await
    }

    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<PendingTransaction, ProviderError> {
        self.binding
            .transact(ContractCall::Approve { spender, amount }, U256::ZERO)
            .await
    }
}

#[derive(Clone)]
pub struct Contracts {
    pub game: GameMachine,
    pub token: GameToken,
}

/// Binds the game machine, asks it for its token, and binds that with the
/// same signer.
pub async fn bind_contracts(
    provider: Arc<dyn WalletProvider>,
    game_address: Address,
    signer: Signer,
) -> Result<Contracts, ProviderError> {
    let game = GameMachine::new(game_address, signer, provider.clone());
    let token_address = game.game_token().await?;
    debug!(game = %game_address, token = %token_address, "contracts bound");
    let token = GameToken::new(token_address, signer, provider);
    Ok(Contracts { game, token })
}
