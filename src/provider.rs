use crate::{
    address::Address,
    units::U256,
};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;

pub type ChainId = u64;

/// Chain the provider is currently pointed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
}

impl Network {
    pub fn new(chain_id: ChainId, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
        }
    }

    /// Providers report development chains as `"unknown"`.
    pub fn label(&self) -> String {
        if self.name == "unknown" {
            String::from("Local Network")
        } else {
            self.name.clone()
        }
    }
}

/// Notifications pushed by the provider. Either one invalidates every
/// contract handle bound so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// Entry points consumed on the game machine and token contracts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    GameToken,
    GetCurrentMachine { player: Address },
    GetMachinePlayerCount { machine: u64 },
    BuyTokens,
    SellTokens { amount: U256 },
    PlaceBet { machine: u64, amount: U256 },
    BalanceOf { owner: Address },
    Approve { spender: Address, amount: U256 },
}

impl ContractCall {
    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::GameToken => "gameToken",
            ContractCall::GetCurrentMachine { .. } => "getCurrentMachine",
            ContractCall::GetMachinePlayerCount { .. } => "getMachinePlayerCount",
            ContractCall::BuyTokens => "buyTokens",
            ContractCall::SellTokens { .. } => "sellTokens",
            ContractCall::PlaceBet { .. } => "placeBet",
            ContractCall::BalanceOf { .. } => "balanceOf",
            ContractCall::Approve { .. } => "approve",
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(
            self,
            ContractCall::GameToken
                | ContractCall::GetCurrentMachine { .. }
                | ContractCall::GetMachinePlayerCount { .. }
                | ContractCall::BalanceOf { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutput {
    Uint(U256),
    Address(Address),
}

impl CallOutput {
    pub fn into_uint(self, call: &'static str) -> Result<U256, ProviderError> {
        match self {
            CallOutput::Uint(value) => Ok(value),
            CallOutput::Address(_) => Err(ProviderError::UnexpectedOutput { call }),
        }
    }

    pub fn into_address(self, call: &'static str) -> Result<Address, ProviderError> {
        match self {
            CallOutput::Address(address) => Ok(address),
            CallOutput::Uint(_) => Err(ProviderError::UnexpectedOutput { call }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub call: ContractCall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Decoded logs the client knows how to trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEvent {
    Approval {
        owner: Address,
        spender: Address,
        amount: U256,
    },
    TokensPurchased {
        buyer: Address,
        eth_amount: U256,
        token_amount: U256,
    },
    TokensSold {
        seller: Address,
        token_amount: U256,
        eth_amount: U256,
    },
    BetPlaced {
        player: Address,
        machine: u64,
        amount: U256,
    },
    MachineWon {
        winner: Address,
        machine: u64,
        prize: U256,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub revert_reason: Option<String>,
    pub events: Vec<LogEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("authorization denied: {0}")]
    NotAuthorized(String),
    #[error("provider returned no accounts")]
    NoAccounts,
    #[error("{call} reverted: {reason}")]
    Reverted { call: &'static str, reason: String },
    #[error("transaction {hash} failed: {reason}")]
    TransactionFailed { hash: TxHash, reason: String },
    #[error("{call} returned an unexpected value")]
    UnexpectedOutput { call: &'static str },
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
    #[error("provider request failed: {0}")]
    Transport(String),
}

/// The injected wallet: account access, chain reads, transaction submission
/// and change notifications. Signing happens behind this boundary.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized for this client, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Prompts the user to authorize account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    async fn network(&self) -> Result<Network, ProviderError>;

    async fn read(&self, to: Address, call: ContractCall) -> Result<CallOutput, ProviderError>;

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, ProviderError>;

    /// Resolves once the transaction is included. Has no deadline of its own.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ProviderError>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
