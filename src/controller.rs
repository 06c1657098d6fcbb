//! Session controller: the single owner of everything the client knows about
//! the wallet, the contracts, and the player's forms.
//!
//! Every user action runs through [`GameController::perform`], which holds
//! the pending-action flag for its duration and turns the outcome into an
//! [`Advisory`]. Provider notifications go through
//! [`GameController::handle_provider_event`], which drops all derived state
//! and bootstraps again instead of patching it.

use crate::{
    address::Address,
    advisory::Advisory,
    config::{
        BetUnits,
        ClientConfig,
    },
    contracts::{
        PendingTransaction,
        Signer,
        bind_contracts,
    },
    forms::{
        self,
        FormInputs,
        InputEdit,
        InputField,
    },
    provider::{
        LogEvent,
        ProviderError,
        ProviderEvent,
        Receipt,
        TxHash,
        WalletProvider,
    },
    session::{
        Session,
        SessionPhase,
        SessionState,
    },
    stats::{
        MachineSlot,
        MachineStats,
        occupied_elsewhere,
    },
    units::{
        self,
        MAX_BET_TOKENS,
        U256,
        UnitsError,
    },
};
use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        broadcast,
        mpsc,
    },
    time,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const INSTALL_PROVIDER_MESSAGE: &str = "Please install a wallet provider to use this dApp!";
pub const BUSY_MESSAGE: &str = "Another action is still in progress.";
const SUBMITTED_MESSAGE: &str = "Transaction submitted. Waiting for confirmation...";
const APPROVING_MESSAGE: &str = "Approving token transfer. Please wait...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Connect,
    BuyTokens,
    SellTokens,
    PlaceBet,
    Refresh,
}

impl Action {
    fn failure_context(self) -> &'static str {
        match self {
            Action::Connect => "Error connecting wallet",
            Action::BuyTokens => "Error buying tokens",
            Action::SellTokens => "Error selling tokens",
            Action::PlaceBet => "Error placing bet",
            Action::Refresh => "Error refreshing",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Connect,
    Buy,
    Sell,
    Bet { machine: MachineSlot },
    Refresh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionStatus {
    Validating,
    AwaitingApproval,
    AwaitingConfirmation,
    Refreshing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ActionKind,
    /// The amount as typed, for display.
    pub amount: String,
    pub status: ActionStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Freshness {
    #[default]
    Unknown,
    Fresh,
    /// Read after a write but still equal to the pre-write value.
    Stale,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenBalance {
    pub raw: U256,
    pub freshness: Freshness,
}

impl TokenBalance {
    fn fresh(raw: U256) -> Self {
        Self {
            raw,
            freshness: Freshness::Fresh,
        }
    }

    pub fn display(&self) -> String {
        units::format_tokens(self.raw)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no wallet provider is available")]
    NoProvider,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("another action is still in progress")]
    Busy,
    #[error(transparent)]
    InvalidAmount(#[from] UnitsError),
    #[error("amount must be greater than 0")]
    AmountNotPositive,
    #[error("bet amount must not exceed {max} DGT")]
    BetTooLarge { max: u64 },
    #[error("insufficient token balance")]
    InsufficientBalance { balance: U256, requested: U256 },
    #[error("already seated on machine {machine}")]
    AlreadySeated { machine: u64 },
    #[error("this game machine only accepts bets in whole tokens")]
    FractionalRawBet,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("transaction {hash} was not confirmed within {after:?}")]
    ConfirmationTimedOut { hash: TxHash, after: Duration },
    #[error("{call} did not answer within {after:?}")]
    RequestTimedOut { call: &'static str, after: Duration },
}

impl ActionError {
    /// What the player sees for this error when it ends `context`.
    pub fn advisory(&self, context: &str) -> Advisory {
        match self {
            ActionError::NoProvider => Advisory::warning(INSTALL_PROVIDER_MESSAGE),
            ActionError::NotConnected => Advisory::warning("Please connect your wallet first."),
            ActionError::Busy => Advisory::info(BUSY_MESSAGE),
            ActionError::AlreadySeated { machine } => {
                Advisory::warning(format!("You are already playing on Machine {machine}!"))
            }
            ActionError::InsufficientBalance { balance, requested } => {
                Advisory::danger(format!(
                    "Insufficient token balance. You have {} DGT but tried to bet {} DGT.",
                    units::format_tokens(*balance),
                    units::format_tokens(*requested)
                ))
            }
            other => Advisory::danger(format!("{context}: {other}")),
        }
    }
}

/// Everything the UI draws, copied out of the controller.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub phase: SessionPhase,
    pub wallet_available: bool,
    pub account: Option<Address>,
    pub network: Option<String>,
    pub game_address: Address,
    pub balance: TokenBalance,
    pub bet_ceiling: U256,
    pub machines: MachineStats,
    pub current_machine: u64,
    pub inputs: FormInputs,
    pub buy_preview: String,
    pub sell_preview: String,
    pub bet_submittable: bool,
    pub pending: Option<PendingAction>,
    pub advisory: Option<Advisory>,
}

pub struct GameController {
    provider: Option<Arc<dyn WalletProvider>>,
    config: ClientConfig,
    state: SessionState,
    network_label: Option<String>,
    balance: TokenBalance,
    machines: MachineStats,
    current_machine: u64,
    inputs: FormInputs,
    pending: Option<PendingAction>,
    advisory: Option<Advisory>,
    updates: Option<mpsc::UnboundedSender<AppSnapshot>>,
}

impl GameController {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, config: ClientConfig) -> Self {
        Self {
            provider,
            config,
            state: SessionState::Disconnected,
            network_label: None,
            balance: TokenBalance::default(),
            machines: MachineStats::default(),
            current_machine: 0,
            inputs: FormInputs::default(),
            pending: None,
            advisory: None,
            updates: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn balance(&self) -> TokenBalance {
        self.balance
    }

    pub fn machines(&self) -> &MachineStats {
        &self.machines
    }

    pub fn current_machine(&self) -> u64 {
        self.current_machine
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    pub fn network_label(&self) -> Option<&str> {
        self.network_label.as_deref()
    }

    /// Provider notifications, or `None` without a provider.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|provider| provider.subscribe())
    }

    /// Progress snapshots published while an action is running.
    pub fn attach_updates(&mut self, sender: mpsc::UnboundedSender<AppSnapshot>) {
        self.updates = Some(sender);
    }

    pub fn edit_input(&mut self, field: InputField, edit: InputEdit) {
        self.inputs.apply(field, edit);
    }

    pub fn select_machine(&mut self, slot: MachineSlot) {
        self.inputs.selected_machine = slot;
    }

    pub fn dismiss_advisory(&mut self) {
        self.advisory = None;
    }

    pub fn set_advisory(&mut self, advisory: Advisory) {
        self.advisory = Some(advisory);
    }

    /// Startup bootstrap: network label, silently authorized accounts, and
    /// the initial balance and machine reads.
    pub async fn init(&mut self) {
        let Some(provider) = self.provider.clone() else {
            warn!("no wallet provider configured");
            self.state = SessionState::Disconnected;
            self.advisory = Some(Advisory::warning(INSTALL_PROVIDER_MESSAGE));
            return;
        };
        if let Err(err) = self.bootstrap(provider).await {
            error!(error = %err, "failed to initialize");
            self.state = SessionState::Disconnected;
            self.advisory = Some(Advisory::danger(format!("Error initializing app: {err}")));
        }
        self.publish();
    }

    async fn bootstrap(&mut self, provider: Arc<dyn WalletProvider>) -> Result<(), ActionError> {
        let network = self.request("eth_chainId", provider.network()).await?;
        info!(chain_id = network.chain_id, name = %network.name, "provider network");
        self.network_label = Some(network.label());

        let accounts = self.request("eth_accounts", provider.accounts()).await?;
        match accounts.first() {
            Some(&account) => {
                self.state = SessionState::Connecting;
                self.bind(provider, account, network.label()).await?;
                self.refresh_all().await;
            }
            None => {
                debug!("no authorized accounts");
                self.state = SessionState::Disconnected;
            }
        }
        Ok(())
    }

    /// Account or chain changed: nothing bound so far can be trusted.
    pub async fn handle_provider_event(&mut self, event: ProviderEvent) {
        info!(?event, "provider changed, resetting session");
        self.reset();
        self.init().await;
    }

    fn reset(&mut self) {
        self.state = SessionState::Rebinding;
        self.network_label = None;
        self.balance = TokenBalance::default();
        self.machines = MachineStats::default();
        self.current_machine = 0;
        self.inputs = FormInputs::default();
        self.pending = None;
        self.advisory = None;
        self.publish();
    }

    pub async fn perform(&mut self, action: Action) -> Result<(), ActionError> {
        if self.pending.is_some() {
            self.advisory = Some(ActionError::Busy.advisory(action.failure_context()));
            return Err(ActionError::Busy);
        }
        let (kind, amount) = match action {
            Action::Connect => (ActionKind::Connect, String::new()),
            Action::BuyTokens => (ActionKind::Buy, self.inputs.eth_amount.clone()),
            Action::SellTokens => (ActionKind::Sell, self.inputs.sell_amount.clone()),
            Action::PlaceBet => (
                ActionKind::Bet {
                    machine: self.inputs.selected_machine,
                },
                self.inputs.bet_amount.clone(),
            ),
            Action::Refresh => (ActionKind::Refresh, String::new()),
        };
        info!(?kind, %amount, "action started");
        self.pending = Some(PendingAction {
            kind,
            amount,
            status: ActionStatus::Validating,
        });
        self.advisory = None;
        self.publish();

        let result = match action {
            Action::Connect => self.connect().await,
            Action::BuyTokens => self.buy_tokens().await,
            Action::SellTokens => self.sell_tokens().await,
            Action::PlaceBet => self.place_bet().await,
            Action::Refresh => self.refresh().await,
        };

        self.pending = None;
        let outcome = match result {
            Ok(advisory) => {
                info!(?kind, "action finished");
                self.advisory = advisory;
                Ok(())
            }
            Err(err) => {
                warn!(?kind, error = %err, "action failed");
                if matches!(self.state, SessionState::Connecting) {
                    self.state = SessionState::Disconnected;
                }
                self.advisory = Some(err.advisory(action.failure_context()));
                Err(err)
            }
        };
        self.publish();
        outcome
    }

    /// A failed attempt puts back whatever session was bound before it.
    async fn connect(&mut self) -> Result<Option<Advisory>, ActionError> {
        let provider = self.provider.clone().ok_or(ActionError::NoProvider)?;
        let previous = std::mem::replace(&mut self.state, SessionState::Connecting);
        self.publish();

        match self.authorize_and_bind(provider).await {
            Ok(()) => Ok(None),
            Err(err) => {
                if let SessionState::Connected(session) = &previous {
                    debug!(account = %session.account, "connect failed, keeping bound session");
                }
                self.state = previous;
                Err(err)
            }
        }
    }

    async fn authorize_and_bind(
        &mut self,
        provider: Arc<dyn WalletProvider>,
    ) -> Result<(), ActionError> {
        let accounts = self
            .request_with(
                "eth_requestAccounts",
                self.config.confirmation_timeout(),
                provider.request_accounts(),
            )
            .await?;
        let account = accounts.first().copied().ok_or(ProviderError::NoAccounts)?;
        let network = self.request("eth_chainId", provider.network()).await?;
        self.bind(provider, account, network.label()).await?;
        self.network_label = Some(network.label());
        self.refresh_all().await;
        Ok(())
    }

    async fn bind(
        &mut self,
        provider: Arc<dyn WalletProvider>,
        account: Address,
        network: String,
    ) -> Result<(), ActionError> {
        let contracts = self
            .request(
                "gameToken",
                bind_contracts(provider, self.config.game_address, Signer::new(account)),
            )
            .await?;
        info!(%account, %network, token = %contracts.token.address(), "session bound");
        self.state = SessionState::Connected(Session {
            account,
            network,
            contracts,
        });
        Ok(())
    }

    fn session(&self) -> Result<Session, ActionError> {
        if self.provider.is_none() {
            return Err(ActionError::NoProvider);
        }
        self.state.session().cloned().ok_or(ActionError::NotConnected)
    }

    async fn refresh_all(&mut self) {
        self.refresh_balance().await;
        self.refresh_machine_stats().await;
    }

    async fn refresh(&mut self) -> Result<Option<Advisory>, ActionError> {
        self.session()?;
        self.refresh_all().await;
        Ok(None)
    }

    /// Re-reads the balance; a failed read keeps the cached value.
    pub async fn refresh_balance(&mut self) {
        let Ok(session) = self.session() else {
            return;
        };
        match self.fetch_balance(&session).await {
            Ok(balance) => self.balance = TokenBalance::fresh(balance),
            Err(err) => warn!(error = %err, "failed to refresh token balance"),
        }
    }

    async fn fetch_balance(&self, session: &Session) -> Result<U256, ActionError> {
        self.request("balanceOf", session.contracts.token.balance_of(session.account))
            .await
    }

    /// Each slot keeps its previous value when its own read fails.
    pub async fn refresh_machine_stats(&mut self) {
        let Ok(session) = self.session() else {
            return;
        };
        for slot in MachineSlot::all() {
            let read = self
                .request(
                    "getMachinePlayerCount",
                    session.contracts.game.machine_player_count(slot.index() as u64),
                )
                .await;
            match read {
                Ok(count) => self.machines[slot.index()].player_count = count,
                Err(err) => warn!(%slot, error = %err, "failed to read player count"),
            }
        }
        match self
            .request(
                "getCurrentMachine",
                session.contracts.game.current_machine(session.account),
            )
            .await
        {
            Ok(current) => self.current_machine = current,
            Err(err) => warn!(error = %err, "failed to read current machine"),
        }
        self.derive_occupancy();
    }

    fn derive_occupancy(&mut self) {
        for slot in MachineSlot::all() {
            self.machines[slot.index()].occupied_elsewhere =
                occupied_elsewhere(slot, self.current_machine);
        }
    }

    async fn buy_tokens(&mut self) -> Result<Option<Advisory>, ActionError> {
        let session = self.session()?;
        let value = units::parse_ether(&self.inputs.eth_amount)?;
        if value == U256::ZERO {
            return Err(ActionError::AmountNotPositive);
        }
        let previous = self.balance.raw;

        let tx = self.submit(session.contracts.game.buy_tokens(value)).await?;
        self.progress(ActionStatus::AwaitingConfirmation, SUBMITTED_MESSAGE);
        self.confirm(tx).await?;

        self.inputs.clear(InputField::EthAmount);
        let advisory = self
            .settle_balance(&session, previous, "Tokens purchased successfully!")
            .await;
        Ok(Some(advisory))
    }

    async fn sell_tokens(&mut self) -> Result<Option<Advisory>, ActionError> {
        let session = self.session()?;
        let amount = units::parse_tokens(&self.inputs.sell_amount)?;
        if amount == U256::ZERO {
            return Err(ActionError::AmountNotPositive);
        }
        let previous = self.balance.raw;

        self.approve(&session, amount).await?;

        let tx = self.submit(session.contracts.game.sell_tokens(amount)).await?;
        self.progress(ActionStatus::AwaitingConfirmation, SUBMITTED_MESSAGE);
        self.confirm(tx).await?;

        self.inputs.clear(InputField::SellAmount);
        let advisory = self
            .settle_balance(&session, previous, "Tokens sold successfully!")
            .await;
        Ok(Some(advisory))
    }

    async fn place_bet(&mut self) -> Result<Option<Advisory>, ActionError> {
        let session = self.session()?;
        let slot = self.inputs.selected_machine;
        let requested = units::parse_tokens(&self.inputs.bet_amount)?;
        if requested == U256::ZERO {
            return Err(ActionError::AmountNotPositive);
        }
        if requested > units::tokens(MAX_BET_TOKENS) {
            return Err(ActionError::BetTooLarge {
                max: MAX_BET_TOKENS,
            });
        }

        let current = self
            .request(
                "getCurrentMachine",
                session.contracts.game.current_machine(session.account),
            )
            .await?;
        self.current_machine = current;
        self.derive_occupancy();
        if occupied_elsewhere(slot, current) {
            return Err(ActionError::AlreadySeated { machine: current });
        }

        if requested > self.balance.raw {
            return Err(ActionError::InsufficientBalance {
                balance: self.balance.raw,
                requested,
            });
        }

        let bet_amount = match self.config.bet_units {
            BetUnits::Scaled => requested,
            BetUnits::Raw => {
                let whole = requested / units::one_token();
                if whole * units::one_token() != requested {
                    return Err(ActionError::FractionalRawBet);
                }
                whole
            }
        };
        let previous = self.balance.raw;

        self.approve(&session, requested).await?;

        let tx = self
            .submit(session.contracts.game.place_bet(slot.index() as u64, bet_amount))
            .await?;
        self.progress(ActionStatus::AwaitingConfirmation, SUBMITTED_MESSAGE);
        let receipt = self.confirm(tx).await?;
        if receipt
            .events
            .iter()
            .any(|event| matches!(event, LogEvent::MachineWon { winner, .. } if *winner == session.account))
        {
            info!(%slot, "bet resolved the machine in the player's favour");
        }

        self.inputs.clear(InputField::BetAmount);
        let advisory = self
            .settle_balance(&session, previous, "Bet placed successfully! Check if you won!")
            .await;
        self.refresh_machine_stats().await;
        Ok(Some(advisory))
    }

    /// Approves the game contract to move `amount` base units, per the
    /// configured approval policy, and waits for it.
    async fn approve(&mut self, session: &Session, amount: U256) -> Result<(), ActionError> {
        let allowance = self.config.approval.allowance_for(amount);
        self.progress(ActionStatus::AwaitingApproval, APPROVING_MESSAGE);
        let approval = self
            .submit(
                session
                    .contracts
                    .token
                    .approve(session.contracts.game.address(), allowance),
            )
            .await?;
        self.confirm(approval).await?;
        Ok(())
    }

    /// Reads the balance after a write, retrying while it still equals
    /// `previous`. Gives up with a warning rather than hiding the mismatch.
    async fn settle_balance(
        &mut self,
        session: &Session,
        previous: U256,
        success: &str,
    ) -> Advisory {
        self.progress(ActionStatus::Refreshing, success);
        let policy = self.config.stale_read.clone();
        let mut attempt = 0;
        loop {
            match self.fetch_balance(session).await {
                Ok(balance) if balance != previous => {
                    self.balance = TokenBalance::fresh(balance);
                    return Advisory::success(success);
                }
                Ok(balance) => {
                    debug!(attempt, "balance unchanged after write");
                    self.balance = TokenBalance {
                        raw: balance,
                        freshness: Freshness::Stale,
                    };
                }
                Err(err) => {
                    warn!(attempt, error = %err, "failed to read balance after write");
                    self.balance.freshness = Freshness::Stale;
                }
            }
            if attempt >= policy.max_retries {
                warn!(retries = attempt, "balance still stale after write");
                return Advisory::warning(format!(
                    "{success} Your balance may not be updated yet; press r to refresh."
                ));
            }
            time::sleep(policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }

    fn progress(&mut self, status: ActionStatus, message: &str) {
        if let Some(pending) = self.pending.as_mut() {
            pending.status = status;
        }
        self.advisory = Some(Advisory::info(message));
        self.publish();
    }

    fn publish(&self) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(self.build_snapshot());
        }
    }

    async fn request<T>(
        &self,
        call: &'static str,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ActionError> {
        self.request_with(call, self.config.read_timeout(), request)
            .await
    }

    async fn request_with<T>(
        &self,
        call: &'static str,
        after: Duration,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ActionError> {
        match time::timeout(after, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ActionError::RequestTimedOut { call, after }),
        }
    }

    async fn submit(
        &self,
        submission: impl Future<Output = Result<PendingTransaction, ProviderError>>,
    ) -> Result<PendingTransaction, ActionError> {
        let tx = self
            .request_with("eth_sendTransaction", self.config.confirmation_timeout(), submission)
            .await?;
        info!(hash = %tx.hash(), call = tx.call(), "transaction submitted");
        Ok(tx)
    }

    async fn confirm(&self, tx: PendingTransaction) -> Result<Receipt, ActionError> {
        let hash = tx.hash();
        let call = tx.call();
        let after = self.config.confirmation_timeout();
        let receipt = match time::timeout(after, tx.wait()).await {
            Ok(receipt) => receipt?,
            Err(_) => {
                warn!(%hash, call, "confirmation timed out");
                return Err(ActionError::ConfirmationTimedOut { hash, after });
            }
        };
        info!(%hash, call, block = receipt.block_number, "transaction confirmed");
        for event in &receipt.events {
            trace_event(event);
        }
        Ok(receipt)
    }

    pub fn build_snapshot(&self) -> AppSnapshot {
        let connected = matches!(self.state, SessionState::Connected(_));
        let bet_ceiling = forms::bet_ceiling(self.balance.raw);
        let slot = self.inputs.selected_machine;
        let bet_in_range = units::parse_tokens(&self.inputs.bet_amount)
            .map(|amount| amount > U256::ZERO && amount <= bet_ceiling)
            .unwrap_or(false);
        AppSnapshot {
            phase: self.state.phase(),
            wallet_available: self.provider.is_some(),
            account: self.state.account(),
            network: self.network_label.clone(),
            game_address: self.config.game_address,
            balance: self.balance,
            bet_ceiling,
            machines: self.machines,
            current_machine: self.current_machine,
            inputs: self.inputs.clone(),
            buy_preview: forms::buy_preview(&self.inputs.eth_amount, self.config.tokens_per_eth),
            sell_preview: forms::sell_preview(&self.inputs.sell_amount, self.config.tokens_per_eth),
            bet_submittable: connected
                && self.pending.is_none()
                && bet_in_range
                && !self.machines[slot.index()].occupied_elsewhere,
            pending: self.pending.clone(),
            advisory: self.advisory.clone(),
        }
    }
}

fn trace_event(event: &LogEvent) {
    match event {
        LogEvent::Approval {
            owner,
            spender,
            amount,
        } => debug!(%owner, %spender, amount = %units::format_tokens(*amount), "Approval"),
        LogEvent::TokensPurchased {
            buyer,
            eth_amount,
            token_amount,
        } => info!(
            %buyer,
            eth = %units::format_ether(*eth_amount),
            tokens = %units::format_tokens(*token_amount),
            "TokensPurchased"
        ),
        LogEvent::TokensSold {
            seller,
            token_amount,
            eth_amount,
        } => info!(
            %seller,
            tokens = %units::format_tokens(*token_amount),
            eth = %units::format_ether(*eth_amount),
            "TokensSold"
        ),
        LogEvent::BetPlaced {
            player,
            machine,
            amount,
        } => info!(%player, machine, amount = %units::format_tokens(*amount), "BetPlaced"),
        LogEvent::MachineWon {
            winner,
            machine,
            prize,
        } => info!(%winner, machine, prize = %units::format_tokens(*prize), "MachineWon"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::advisory::Severity;

    #[test]
    fn advisory__formats_insufficient_balance_in_tokens() {
        // given
        let err = ActionError::InsufficientBalance {
            balance: units::tokens(5),
            requested: units::tokens(12),
        };

        // when
        let advisory = err.advisory("Error placing bet");

        // then
        assert_eq!(Severity::Danger, advisory.severity);
        assert_eq!(
            "Insufficient token balance. You have 5.0 DGT but tried to bet 12.0 DGT.",
            advisory.message
        );
    }

    #[test]
    fn advisory__prefixes_provider_errors_with_context() {
        // given
        let err = ActionError::Provider(ProviderError::NotAuthorized(String::from(
            "User rejected the request.",
        )));

        // when
        let advisory = err.advisory("Error connecting wallet");

        // then
        assert_eq!(
            "Error connecting wallet: authorization denied: User rejected the request.",
            advisory.message
        );
    }

    #[tokio::test]
    async fn init__warns_when_no_provider_is_available() {
        // given
        let mut controller = GameController::new(None, ClientConfig::default());

        // when
        controller.init().await;
        let result = controller.perform(Action::BuyTokens).await;

        // then
        assert_eq!(
            Some(&Advisory::warning(INSTALL_PROVIDER_MESSAGE)),
            controller.advisory()
        );
        assert!(matches!(result, Err(ActionError::NoProvider)));
        assert_eq!(SessionPhase::Disconnected, controller.phase());
    }

    #[test]
    fn build_snapshot__disables_bet_on_flagged_machine() {
        // given
        let mut controller = GameController::new(None, ClientConfig::default());
        controller.current_machine = 2;
        controller.derive_occupancy();
        controller.balance = TokenBalance::fresh(units::tokens(50));
        controller.inputs.bet_amount = String::from("10");

        // when
        let snapshot = controller.build_snapshot();

        // then
        assert!(snapshot.machines[0].occupied_elsewhere);
        assert!(!snapshot.machines[1].occupied_elsewhere);
        assert!(!snapshot.bet_submittable);
        assert_eq!(units::tokens(50), snapshot.bet_ceiling);
    }
}
