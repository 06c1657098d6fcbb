//! In-process chain that plays the game machine and token contracts.
//!
//! Transactions are checked when submitted (a failing check surfaces the way
//! a failed gas estimate would) and applied when their receipt is awaited,
//! so a call that depends on an unconfirmed approval is rejected.

use crate::{
    address::Address,
    config::BetUnits,
    provider::{
        CallOutput,
        ChainId,
        ContractCall,
        LogEvent,
        Network,
        ProviderError,
        ProviderEvent,
        Receipt,
        TransactionRequest,
        TxHash,
        WalletProvider,
    },
    stats::{
        MACHINE_COUNT,
        MAX_PLAYERS_PER_MACHINE,
    },
    units::{
        self,
        MAX_BET_TOKENS,
        U256,
    },
};
use async_trait::async_trait;
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};
use tokio::{
    sync::broadcast,
    time,
};
use tracing::{
    debug,
    info,
};

pub const DEFAULT_CHAIN_ID: ChainId = 1337;
const TARGET_RANGE_TOKENS: (u64, u64) = (1_000, 20_000);
const GAME_TOKEN_RESERVE: u64 = 1_000_000;
const EVENT_CAPACITY: usize = 16;

/// Deterministic dev account `index`.
pub fn dev_account(index: u32) -> Address {
    derive_address(&format!("dapps-game dev account {index}"))
}

fn derive_address(seed: &str) -> Address {
    let digest = Sha256::digest(seed.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    Address::new(bytes)
}

#[derive(Clone, Debug)]
pub struct SimulatedChainConfig {
    pub chain_id: ChainId,
    pub network_name: String,
    pub game_address: Address,
    /// Wallet accounts with their starting ETH, in wei. The first is selected.
    pub accounts: Vec<(Address, U256)>,
    /// Accounts start out authorized, as if connected in an earlier session.
    pub pre_authorized: bool,
    pub tokens_per_eth: u64,
    pub bet_units: BetUnits,
    /// Hidden targets in whole DGT; random when unset.
    pub targets: Option<[u64; MACHINE_COUNT]>,
    pub seed: u64,
    pub confirmation_delay: Duration,
    pub game_eth_reserve: U256,
}

impl Default for SimulatedChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            network_name: String::from("unknown"),
            game_address: crate::config::DEFAULT_GAME_CONTRACT,
            accounts: vec![(dev_account(0), units::ether(100))],
            pre_authorized: false,
            tokens_per_eth: units::DEFAULT_TOKENS_PER_ETH,
            bet_units: BetUnits::Scaled,
            targets: None,
            seed: 7,
            confirmation_delay: Duration::ZERO,
            game_eth_reserve: units::ether(100),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Machine {
    target: U256,
    pot: U256,
    players: Vec<Address>,
}

#[derive(Clone, Debug, Default)]
struct StaleReads {
    remaining: u32,
    balances: HashMap<Address, U256>,
}

enum Confirmation {
    Pending(TransactionRequest),
    Mined(Receipt),
}

struct ChainState {
    network: Network,
    wallet_accounts: Vec<Address>,
    authorized: bool,
    reject_authorization: bool,
    game_address: Address,
    token_address: Address,
    tokens_per_eth: U256,
    bet_units: BetUnits,
    eth_balances: HashMap<Address, U256>,
    token_balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    machines: [Machine; MACHINE_COUNT],
    seats: HashMap<Address, u64>,
    transactions: HashMap<TxHash, Confirmation>,
    submitted: Vec<TransactionRequest>,
    block_number: u64,
    nonce: u64,
    stale: StaleReads,
    stale_reads_per_write: u32,
    hang_confirmations: bool,
    injected_failures: HashMap<&'static str, String>,
    rng: StdRng,
}

/// A chain plus wallet in one process. Cloning shares the same state.
#[derive(Clone)]
pub struct SimulatedChain {
    state: Arc<Mutex<ChainState>>,
    events: broadcast::Sender<ProviderEvent>,
    confirmation_delay: Duration,
}

impl SimulatedChain {
    pub fn new(config: SimulatedChainConfig) -> Self {
        let SimulatedChainConfig {
            chain_id,
            network_name,
            game_address,
            accounts,
            pre_authorized,
            tokens_per_eth,
            bet_units,
            targets,
            seed,
            confirmation_delay,
            game_eth_reserve,
        } = config;

        let token_address = derive_address(&format!("dapps-game token for {game_address}"));
        let mut rng = StdRng::seed_from_u64(seed);
        let machines = std::array::from_fn(|slot| Machine {
            target: match targets {
                Some(targets) => units::tokens(targets[slot]),
                None => random_target(&mut rng),
            },
            ..Machine::default()
        });

        let mut eth_balances: HashMap<Address, U256> =
            accounts.iter().copied().collect();
        eth_balances.insert(game_address, game_eth_reserve);
        let mut token_balances = HashMap::new();
        token_balances.insert(game_address, units::tokens(GAME_TOKEN_RESERVE));

        let state = ChainState {
            network: Network::new(chain_id, network_name),
            wallet_accounts: accounts.iter().map(|(address, _)| *address).collect(),
            authorized: pre_authorized,
            reject_authorization: false,
            game_address,
            token_address,
            tokens_per_eth: U256::from(tokens_per_eth),
            bet_units,
            eth_balances,
            token_balances,
            allowances: HashMap::new(),
            machines,
            seats: HashMap::new(),
            transactions: HashMap::new(),
            submitted: Vec::new(),
            block_number: 1,
            nonce: 0,
            stale: StaleReads::default(),
            stale_reads_per_write: 0,
            hang_confirmations: false,
            injected_failures: HashMap::new(),
            rng,
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(game = %game_address, token = %token_address, "simulated chain started");
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            confirmation_delay,
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn game_address(&self) -> Address {
        self.state().game_address
    }

    pub fn token_address(&self) -> Address {
        self.state().token_address
    }

    pub fn selected_account(&self) -> Option<Address> {
        self.state().wallet_accounts.first().copied()
    }

    /// Selects `account` in the wallet (adding it if new) and notifies
    /// subscribers.
    pub fn switch_account(&self, account: Address) {
        let accounts = {
            let mut state = self.state();
            state.wallet_accounts.retain(|existing| *existing != account);
            state.wallet_accounts.insert(0, account);
            state.eth_balances.entry(account).or_insert(U256::ZERO);
            if state.authorized {
                vec![account]
            } else {
                Vec::new()
            }
        };
        let _ = self.events.send(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn switch_chain(&self, chain_id: ChainId, name: impl Into<String>) {
        self.state().network = Network::new(chain_id, name);
        let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
    }

    pub fn set_reject_authorization(&self, reject: bool) {
        self.state().reject_authorization = reject;
    }

    /// After every confirmed transaction, the next `count` balance reads
    /// return the balance from before it.
    pub fn set_stale_reads(&self, count: u32) {
        self.state().stale_reads_per_write = count;
    }

    /// Receipts never arrive while set.
    pub fn set_hang_confirmations(&self, hang: bool) {
        self.state().hang_confirmations = hang;
    }

    /// The next read or submission of `call` (its ABI name) fails with `reason`.
    pub fn fail_next(&self, call: &'static str, reason: impl Into<String>) {
        self.state().injected_failures.insert(call, reason.into());
    }

    pub fn set_target(&self, machine: usize, whole_tokens: u64) {
        if let Some(m) = self.state().machines.get_mut(machine) {
            m.target = units::tokens(whole_tokens);
        }
    }

    pub fn mint_tokens(&self, to: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.token_balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    pub fn fund_eth(&self, to: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.eth_balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    pub fn token_balance(&self, owner: Address) -> U256 {
        token_balance(&self.state(), owner)
    }

    pub fn eth_balance(&self, owner: Address) -> U256 {
        self.state()
            .eth_balances
            .get(&owner)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// 1-based machine `player` is seated on, 0 when none.
    pub fn seat(&self, player: Address) -> u64 {
        self.state().seats.get(&player).copied().unwrap_or(0)
    }

    pub fn player_count(&self, machine: usize) -> usize {
        self.state()
            .machines
            .get(machine)
            .map(|m| m.players.len())
            .unwrap_or(0)
    }

    pub fn pot(&self, machine: usize) -> U256 {
        self.state()
            .machines
            .get(machine)
            .map(|m| m.pot)
            .unwrap_or(U256::ZERO)
    }

    /// Every transaction accepted for submission, in order.
    pub fn submitted_transactions(&self) -> Vec<TransactionRequest> {
        self.state().submitted.clone()
    }

    /// Submits and confirms a transaction for any account, bypassing wallet
    /// authorization. Lets tests act as other players.
    pub async fn transact(&self, tx: TransactionRequest) -> Result<Receipt, ProviderError> {
        let hash = self.submit(tx, false)?;
        self.confirm(hash)
    }

    fn submit(
        &self,
        tx: TransactionRequest,
        require_authorization: bool,
    ) -> Result<TxHash, ProviderError> {
        let mut state = self.state();
        if let Some(reason) = state.injected_failures.remove(tx.call.name()) {
            return Err(ProviderError::Reverted {
                call: tx.call.name(),
                reason,
            });
        }
        if require_authorization
            && (!state.authorized || state.wallet_accounts.first() != Some(&tx.from))
        {
            return Err(ProviderError::NotAuthorized(format!(
                "{} is not authorized to send transactions",
                tx.from
            )));
        }
        if tx.call.is_view() {
            return Err(ProviderError::Reverted {
                call: tx.call.name(),
                reason: String::from("view functions cannot be sent as transactions"),
            });
        }

        // Dry run against a scratch copy to reject failing calls up front.
        let mut scratch = state.ledger_copy();
        if let Err(reason) = scratch.execute(&tx) {
            return Err(ProviderError::Reverted {
                call: tx.call.name(),
                reason,
            });
        }

        state.nonce += 1;
        let hash = tx_hash(state.nonce, &tx);
        debug!(%hash, call = tx.call.name(), from = %tx.from, "simulated transaction accepted");
        state.submitted.push(tx.clone());
        state.transactions.insert(hash, Confirmation::Pending(tx));
        Ok(hash)
    }

    fn confirm(&self, hash: TxHash) -> Result<Receipt, ProviderError> {
        let mut state = self.state();
        let pending = match state.transactions.remove(&hash) {
            Some(Confirmation::Pending(tx)) => tx,
            Some(Confirmation::Mined(receipt)) => {
                state
                    .transactions
                    .insert(hash, Confirmation::Mined(receipt.clone()));
                return Ok(receipt);
            }
            None => return Err(ProviderError::UnknownTransaction(hash)),
        };

        let before = state.token_balances.clone();
        state.block_number += 1;
        let block_number = state.block_number;
        let receipt = match state.execute(&pending) {
            Ok(events) => {
                if state.stale_reads_per_write > 0 {
                    state.stale = StaleReads {
                        remaining: state.stale_reads_per_write,
                        balances: before,
                    };
                }
                Receipt {
                    hash,
                    block_number,
                    success: true,
                    revert_reason: None,
                    events,
                }
            }
            Err(reason) => Receipt {
                hash,
                block_number,
                success: false,
                revert_reason: Some(reason),
                events: Vec::new(),
            },
        };
        state
            .transactions
            .insert(hash, Confirmation::Mined(receipt.clone()));
        Ok(receipt)
    }
}

#[async_trait]
impl WalletProvider for SimulatedChain {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let state = self.state();
        if state.authorized {
            Ok(state.wallet_accounts.first().copied().into_iter().collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state();
        if state.reject_authorization {
            return Err(ProviderError::NotAuthorized(String::from(
                "User rejected the request.",
            )));
        }
        let selected = state
            .wallet_accounts
            .first()
            .copied()
            .ok_or(ProviderError::NoAccounts)?;
        state.authorized = true;
        Ok(vec![selected])
    }

    async fn network(&self) -> Result<Network, ProviderError> {
        Ok(self.state().network.clone())
    }

    async fn read(&self, to: Address, call: ContractCall) -> Result<CallOutput, ProviderError> {
        let mut state = self.state();
        if let Some(reason) = state.injected_failures.remove(call.name()) {
            return Err(ProviderError::Transport(reason));
        }
        state.read(to, &call).map_err(|reason| ProviderError::Reverted {
            call: call.name(),
            reason,
        })
    }

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, ProviderError> {
        self.submit(tx, true)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ProviderError> {
        let hang = self.state().hang_confirmations;
        if hang {
            futures::future::pending::<()>().await;
        }
        if !self.confirmation_delay.is_zero() {
            time::sleep(self.confirmation_delay).await;
        }
        self.confirm(hash)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn random_target(rng: &mut StdRng) -> U256 {
    let (low, high) = TARGET_RANGE_TOKENS;
    units::tokens(rng.random_range(low..=high))
}

fn tx_hash(nonce: u64, tx: &TransactionRequest) -> TxHash {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(tx.from.as_bytes());
    hasher.update(tx.to.as_bytes());
    hasher.update(format!("{:?}", tx.call).as_bytes());
    TxHash(hasher.finalize().into())
}

fn token_balance(state: &ChainState, owner: Address) -> U256 {
    state
        .token_balances
        .get(&owner)
        .copied()
        .unwrap_or(U256::ZERO)
}

impl ChainState {
    /// Copy of everything `execute` touches, for dry runs.
    fn ledger_copy(&self) -> ChainState {
        ChainState {
            network: self.network.clone(),
            wallet_accounts: self.wallet_accounts.clone(),
            authorized: self.authorized,
            reject_authorization: self.reject_authorization,
            game_address: self.game_address,
            token_address: self.token_address,
            tokens_per_eth: self.tokens_per_eth,
            bet_units: self.bet_units,
            eth_balances: self.eth_balances.clone(),
            token_balances: self.token_balances.clone(),
            allowances: self.allowances.clone(),
            machines: self.machines.clone(),
            seats: self.seats.clone(),
            transactions: HashMap::new(),
            submitted: Vec::new(),
            block_number: self.block_number,
            nonce: self.nonce,
            stale: StaleReads::default(),
            stale_reads_per_write: 0,
            hang_confirmations: false,
            injected_failures: HashMap::new(),
            rng: self.rng.clone(),
        }
    }

    fn read(&mut self, to: Address, call: &ContractCall) -> Result<CallOutput, String> {
        match call {
            ContractCall::GameToken => {
                self.expect_contract(to, self.game_address)?;
                Ok(CallOutput::Address(self.token_address))
            }
            ContractCall::GetCurrentMachine { player } => {
                self.expect_contract(to, self.game_address)?;
                let seat = self.seats.get(player).copied().unwrap_or(0);
                Ok(CallOutput::Uint(U256::from(seat)))
            }
            ContractCall::GetMachinePlayerCount { machine } => {
                self.expect_contract(to, self.game_address)?;
                let machine = self.machine(*machine)?;
                Ok(CallOutput::Uint(U256::from(machine.players.len() as u64)))
            }
            ContractCall::BalanceOf { owner } => {
                self.expect_contract(to, self.token_address)?;
                if self.stale.remaining > 0 {
                    self.stale.remaining -= 1;
                    let previous = self.stale.balances.get(owner).copied();
                    return Ok(CallOutput::Uint(previous.unwrap_or(U256::ZERO)));
                }
                Ok(CallOutput::Uint(token_balance(self, *owner)))
            }
            other => Err(format!("{} is not a view function", other.name())),
        }
    }

    fn expect_contract(&self, to: Address, expected: Address) -> Result<(), String> {
        if to == expected {
            Ok(())
        } else {
            Err(format!("no such function on contract {to}"))
        }
    }

    fn machine(&self, index: u64) -> Result<&Machine, String> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.machines.get(i))
            .ok_or_else(|| String::from("Invalid machine index"))
    }

    fn execute(&mut self, tx: &TransactionRequest) -> Result<Vec<LogEvent>, String> {
        let from = tx.from;
        match &tx.call {
            ContractCall::BuyTokens => {
                self.expect_contract(tx.to, self.game_address)?;
                if tx.value == U256::ZERO {
                    return Err(String::from("Must send ETH to buy tokens"));
                }
                self.move_eth(from, self.game_address, tx.value)?;
                let token_amount = tx
                    .value
                    .checked_mul(self.tokens_per_eth)
                    .ok_or_else(|| String::from("token amount overflow"))?;
                self.mint(from, token_amount);
                Ok(vec![LogEvent::TokensPurchased {
                    buyer: from,
                    eth_amount: tx.value,
                    token_amount,
                }])
            }
            ContractCall::SellTokens { amount } => {
                self.expect_contract(tx.to, self.game_address)?;
                if *amount == U256::ZERO {
                    return Err(String::from("Amount must be greater than 0"));
                }
                let eth_amount = *amount / self.tokens_per_eth;
                let reserve = self
                    .eth_balances
                    .get(&self.game_address)
                    .copied()
                    .unwrap_or(U256::ZERO);
                if reserve < eth_amount {
                    return Err(String::from("Contract has insufficient ETH"));
                }
                self.transfer_from(from, self.game_address, *amount)?;
                self.move_eth(self.game_address, from, eth_amount)?;
                Ok(vec![LogEvent::TokensSold {
                    seller: from,
                    token_amount: *amount,
                    eth_amount,
                }])
            }
            ContractCall::PlaceBet { machine, amount } => {
                self.expect_contract(tx.to, self.game_address)?;
                self.place_bet(from, *machine, *amount)
            }
            ContractCall::Approve { spender, amount } => {
                self.expect_contract(tx.to, self.token_address)?;
                self.allowances.insert((from, *spender), *amount);
                Ok(vec![LogEvent::Approval {
                    owner: from,
                    spender: *spender,
                    amount: *amount,
                }])
            }
            other => Err(format!("{} is not a transaction", other.name())),
        }
    }

    fn place_bet(
        &mut self,
        player: Address,
        machine: u64,
        amount: U256,
    ) -> Result<Vec<LogEvent>, String> {
        self.machine(machine)?;
        let index = machine as usize;
        let (limit, token_amount) = match self.bet_units {
            BetUnits::Scaled => (units::tokens(MAX_BET_TOKENS), amount),
            BetUnits::Raw => (
                U256::from(MAX_BET_TOKENS),
                amount.saturating_mul(units::one_token()),
            ),
        };
        if amount > limit {
            return Err(String::from("Bet amount must be between 0 and 10000"));
        }

        let seat = self.seats.get(&player).copied().unwrap_or(0);
        if seat != 0 && seat != machine + 1 {
            return Err(String::from("Player is already playing on another machine"));
        }
        let seated_here = self.machines[index].players.contains(&player);
        if !seated_here && self.machines[index].players.len() as u64 >= MAX_PLAYERS_PER_MACHINE
        {
            return Err(String::from("Machine is full"));
        }

        self.transfer_from(player, self.game_address, token_amount)?;
        let slot = &mut self.machines[index];
        slot.pot = slot.pot.saturating_add(token_amount);
        if !seated_here {
            slot.players.push(player);
        }
        self.seats.insert(player, machine + 1);

        let mut events = vec![LogEvent::BetPlaced {
            player,
            machine,
            amount: token_amount,
        }];

        if self.machines[index].pot >= self.machines[index].target {
            let prize = self.machines[index].target;
            if token_balance(self, self.game_address) < prize {
                self.mint(self.game_address, prize);
            }
            self.move_tokens(self.game_address, player, prize)?;
            let players = std::mem::take(&mut self.machines[index].players);
            for seated in players {
                self.seats.remove(&seated);
            }
            let next_target = random_target(&mut self.rng);
            self.machines[index].pot = U256::ZERO;
            self.machines[index].target = next_target;
            events.push(LogEvent::MachineWon {
                winner: player,
                machine,
                prize,
            });
        }
        Ok(events)
    }

    fn mint(&mut self, to: Address, amount: U256) {
        let balance = self.token_balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: U256) -> Result<(), String> {
        let available = token_balance(self, from);
        if available < amount {
            return Err(String::from("ERC20: transfer amount exceeds balance"));
        }
        self.token_balances.insert(from, available - amount);
        self.mint(to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), String> {
        let allowance = self
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO);
        if allowance < amount {
            return Err(String::from("ERC20: insufficient allowance"));
        }
        self.move_tokens(owner, spender, amount)?;
        self.allowances.insert((owner, spender), allowance - amount);
        Ok(())
    }

    fn move_eth(&mut self, from: Address, to: Address, amount: U256) -> Result<(), String> {
        let available = self.eth_balances.get(&from).copied().unwrap_or(U256::ZERO);
        if available < amount {
            return Err(String::from("insufficient funds for transfer"));
        }
        self.eth_balances.insert(from, available - amount);
        let balance = self.eth_balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn chain_with_targets(targets: [u64; MACHINE_COUNT]) -> SimulatedChain {
        SimulatedChain::new(SimulatedChainConfig {
            targets: Some(targets),
            pre_authorized: true,
            ..SimulatedChainConfig::default()
        })
    }

    fn bet(from: Address, game: Address, machine: u64, amount: U256) -> TransactionRequest {
        TransactionRequest {
            from,
            to: game,
            value: U256::ZERO,
            call: ContractCall::PlaceBet { machine, amount },
        }
    }

    fn approve(from: Address, token: Address, spender: Address, amount: U256) -> TransactionRequest {
        TransactionRequest {
            from,
            to: token,
            value: U256::ZERO,
            call: ContractCall::Approve { spender, amount },
        }
    }

    #[tokio::test]
    async fn place_bet__pays_target_and_resets_machine_when_reached() {
        // given
        let chain = chain_with_targets([300, 5_000, 5_000]);
        let player = dev_account(0);
        let game = chain.game_address();
        chain.mint_tokens(player, units::tokens(500));
        chain
            .transact(approve(player, chain.token_address(), game, units::tokens(300)))
            .await
            .unwrap();

        // when
        let receipt = chain
            .transact(bet(player, game, 0, units::tokens(300)))
            .await
            .unwrap();

        // then
        assert!(receipt.events.iter().any(|event| matches!(
            event,
            LogEvent::MachineWon { machine: 0, .. }
        )));
        assert_eq!(units::tokens(500), chain.token_balance(player));
        assert_eq!(0, chain.seat(player));
        assert_eq!(0, chain.player_count(0));
        assert_eq!(U256::ZERO, chain.pot(0));
    }

    #[tokio::test]
    async fn place_bet__rejects_second_machine_while_seated() {
        // given
        let chain = chain_with_targets([5_000, 5_000, 5_000]);
        let player = dev_account(0);
        let game = chain.game_address();
        chain.mint_tokens(player, units::tokens(500));
        chain
            .transact(approve(player, chain.token_address(), game, units::tokens(500)))
            .await
            .unwrap();
        chain
            .transact(bet(player, game, 1, units::tokens(100)))
            .await
            .unwrap();

        // when
        let result = chain.transact(bet(player, game, 0, units::tokens(100))).await;

        // then
        assert!(matches!(result, Err(ProviderError::Reverted { .. })));
        assert_eq!(2, chain.seat(player));
    }

    #[tokio::test]
    async fn place_bet__rejects_eleventh_player() {
        // given
        let chain = chain_with_targets([1_000_000, 5_000, 5_000]);
        let game = chain.game_address();
        let token = chain.token_address();
        for i in 0..MAX_PLAYERS_PER_MACHINE as u32 {
            let player = dev_account(100 + i);
            chain.mint_tokens(player, units::tokens(1));
            chain
                .transact(approve(player, token, game, units::tokens(1)))
                .await
                .unwrap();
            chain
                .transact(bet(player, game, 0, units::tokens(1)))
                .await
                .unwrap();
        }
        let late = dev_account(200);
        chain.mint_tokens(late, units::tokens(1));
        chain
            .transact(approve(late, token, game, units::tokens(1)))
            .await
            .unwrap();

        // when
        let result = chain.transact(bet(late, game, 0, units::tokens(1))).await;

        // then
        assert_eq!(
            Err(ProviderError::Reverted {
                call: "placeBet",
                reason: String::from("Machine is full"),
            }),
            result
        );
    }

    #[tokio::test]
    async fn send__rejects_calls_that_need_an_unconfirmed_approval() {
        // given
        let chain = chain_with_targets([5_000, 5_000, 5_000]);
        let player = dev_account(0);
        let game = chain.game_address();
        chain.mint_tokens(player, units::tokens(50));
        let _approval = chain
            .send(approve(player, chain.token_address(), game, units::tokens(50)))
            .await
            .unwrap();

        // when
        let result = chain
            .send(TransactionRequest {
                from: player,
                to: game,
                value: U256::ZERO,
                call: ContractCall::SellTokens {
                    amount: units::tokens(50),
                },
            })
            .await;

        // then
        assert!(matches!(
            result,
            Err(ProviderError::Reverted { call: "sellTokens", .. })
        ));
    }

    #[tokio::test]
    async fn accounts__are_empty_until_authorized() {
        // given
        let chain = SimulatedChain::new(SimulatedChainConfig::default());

        // when
        let before = chain.accounts().await.unwrap();
        let granted = chain.request_accounts().await.unwrap();
        let after = chain.accounts().await.unwrap();

        // then
        assert!(before.is_empty());
        assert_eq!(vec![dev_account(0)], granted);
        assert_eq!(granted, after);
    }
}
