use crate::ui::{
    self,
    UserEvent,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use dapps_game::{
    Action,
    Address,
    AppSnapshot,
    GameController,
    SimulatedChain,
    WalletProvider,
    advisory::Advisory,
    config::ClientConfig,
    controller::BUSY_MESSAGE,
    deployment::{
        self,
        DeploymentEnv,
        DeploymentStore,
    },
    keystore,
    provider::ProviderEvent,
    simulated::{
        DEFAULT_CHAIN_ID,
        SimulatedChainConfig,
        dev_account,
    },
    units,
};
use std::{
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::{
    broadcast::{
        self,
        error::RecvError,
    },
    mpsc,
};
use tracing::{
    debug,
    info,
    warn,
};

/// ETH given to the player's account when the simulated chain starts.
const SIMULATED_STARTING_ETH: u64 = 100;

#[derive(Clone, Debug)]
pub enum WalletConfig {
    /// No provider; wallet-gated actions stay disabled.
    None,
    /// In-process chain whose wallet holds a deterministic dev account.
    Simulated,
    /// In-process chain whose wallet holds the account of an unlocked keystore.
    SimulatedKeystore { name: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub wallet: WalletConfig,
    pub env: Option<DeploymentEnv>,
    pub game_address: Option<Address>,
    pub config_path: Option<PathBuf>,
}

type ProviderEvents = Option<broadcast::Receiver<ProviderEvent>>;
type SnapshotReceiver = mpsc::UnboundedReceiver<AppSnapshot>;

/// File config, then the latest deployment record for `env`, then the
/// `--game-address` override.
fn resolve_client_config(config: &AppConfig) -> Result<ClientConfig> {
    let mut client_config = match &config.config_path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(env) = config.env {
        let store = DeploymentStore::new(env)?;
        match store.latest()? {
            Some(record) => {
                info!(%env, game = %record.game_contract, "using recorded deployment");
                record.apply_to(&mut client_config);
            }
            None => debug!(%env, path = %store.path().display(), "no deployment recorded"),
        }
    }
    if let Some(address) = config.game_address {
        client_config.game_address = address;
    }
    Ok(client_config)
}

fn build_provider(
    config: &AppConfig,
    client_config: &ClientConfig,
) -> Result<Option<Arc<dyn WalletProvider>>> {
    let account = match &config.wallet {
        WalletConfig::None => return Ok(None),
        WalletConfig::Simulated => dev_account(0),
        WalletConfig::SimulatedKeystore { name, dir } => {
            let descriptor = keystore::find_keystore(dir, name)?;
            keystore::unlock_keystore(&descriptor)?.address
        }
    };
    let chain = SimulatedChain::new(SimulatedChainConfig {
        game_address: client_config.game_address,
        accounts: vec![(account, units::ether(SIMULATED_STARTING_ETH))],
        bet_units: client_config.bet_units,
        tokens_per_eth: client_config.tokens_per_eth,
        ..SimulatedChainConfig::default()
    });

    if config.env == Some(DeploymentEnv::Local) {
        let store = DeploymentStore::new(DeploymentEnv::Local)?;
        if store.latest()?.is_none() {
            deployment::record_deployment(
                DeploymentEnv::Local,
                chain.game_address(),
                DEFAULT_CHAIN_ID,
                client_config.bet_units,
            )
            .wrap_err("Failed to record simulated deployment")?;
        }
    }
    Ok(Some(Arc::new(chain)))
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let client_config = resolve_client_config(&config)?;
    // Keystore passwords are prompted for before the terminal goes raw.
    let provider = build_provider(&config, &client_config)?;
    let mut controller = GameController::new(provider, client_config);
    let (tx, mut updates) = mpsc::unbounded_channel();
    controller.attach_updates(tx);
    let mut ui_state = ui::UiState::default();

    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state, &mut updates).await;
    ui::terminal_exit()?;
    res
}

enum Step {
    Quit,
    Provider(ProviderEvent),
    User(UserEvent),
}

enum InFlight<T> {
    Done(T),
    Progress(AppSnapshot),
    Preempted(ProviderEvent),
    User(UserEvent),
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

async fn run_loop(
    controller: &mut GameController,
    ui_state: &mut ui::UiState,
    updates: &mut SnapshotReceiver,
) -> Result<()> {
    let mut input = ui::spawn_input_reader();
    let mut provider_events = controller.subscribe();
    controller.init().await;
    drain(updates);
    ui::draw(ui_state, &controller.build_snapshot())?;

    loop {
        let step = tokio::select! {
            _ = tokio::signal::ctrl_c() => Step::Quit,
            event = next_provider_event(&mut provider_events) => Step::Provider(event),
            ev = ui::next_event(ui_state, &mut input) => Step::User(ev?),
        };
        match step {
            Step::Quit => break,
            Step::Provider(event) => controller.handle_provider_event(event).await,
            Step::User(ev) => {
                let action = match ev {
                    UserEvent::Quit => break,
                    UserEvent::Redraw => None,
                    UserEvent::Connect => Some(Action::Connect),
                    UserEvent::BuyTokens => Some(Action::BuyTokens),
                    UserEvent::SellTokens => Some(Action::SellTokens),
                    UserEvent::PlaceBet => Some(Action::PlaceBet),
                    UserEvent::Refresh => Some(Action::Refresh),
                    UserEvent::DismissAdvisory => {
                        controller.dismiss_advisory();
                        None
                    }
                    UserEvent::Edit(field, edit) => {
                        controller.edit_input(field, edit);
                        None
                    }
                    UserEvent::SelectMachine(slot) => {
                        controller.select_machine(slot);
                        None
                    }
                };
                if let Some(action) = action {
                    let flow = run_action(
                        controller,
                        ui_state,
                        &mut input,
                        &mut provider_events,
                        updates,
                        action,
                    )
                    .await?;
                    if flow == Flow::Quit {
                        break;
                    }
                }
            }
        }
        drain(updates);
        ui::draw(ui_state, &controller.build_snapshot())?;
    }
    Ok(())
}

/// Drives one action while still listening to the provider and the
/// keyboard. A provider event abandons the action and resets the session.
async fn run_action(
    controller: &mut GameController,
    ui_state: &mut ui::UiState,
    input: &mut ui::InputEventReceiver,
    provider_events: &mut ProviderEvents,
    updates: &mut SnapshotReceiver,
    action: Action,
) -> Result<Flow> {
    let mut last_snapshot = controller.build_snapshot();
    let preempted = {
        let action_future = controller.perform(action);
        tokio::pin!(action_future);
        loop {
            let step = tokio::select! {
                result = &mut action_future => InFlight::Done(result),
                Some(snapshot) = updates.recv() => InFlight::Progress(snapshot),
                event = next_provider_event(provider_events) => InFlight::Preempted(event),
                ev = ui::next_event(ui_state, input) => InFlight::User(ev?),
            };
            match step {
                InFlight::Done(result) => {
                    if let Err(err) = result {
                        debug!(?action, error = %err, "action ended with error");
                    }
                    break None;
                }
                InFlight::Progress(snapshot) => {
                    last_snapshot = snapshot;
                    ui::draw(ui_state, &last_snapshot)?;
                }
                InFlight::Preempted(event) => {
                    warn!(?action, "provider changed while action was in flight");
                    break Some(event);
                }
                InFlight::User(UserEvent::Quit) => return Ok(Flow::Quit),
                InFlight::User(
                    UserEvent::Connect
                    | UserEvent::BuyTokens
                    | UserEvent::SellTokens
                    | UserEvent::PlaceBet
                    | UserEvent::Refresh,
                ) => {
                    last_snapshot.advisory = Some(Advisory::info(BUSY_MESSAGE));
                    ui::draw(ui_state, &last_snapshot)?;
                }
                InFlight::User(_) => ui::draw(ui_state, &last_snapshot)?,
            }
        }
    };
    if let Some(event) = preempted {
        controller.handle_provider_event(event).await;
    }
    Ok(Flow::Continue)
}

async fn next_provider_event(events: &mut ProviderEvents) -> ProviderEvent {
    loop {
        let Some(receiver) = events.as_mut() else {
            return futures::future::pending().await;
        };
        match receiver.recv().await {
            Ok(event) => return event,
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed provider events"),
            Err(RecvError::Closed) => *events = None,
        }
    }
}

fn drain(updates: &mut SnapshotReceiver) {
    while updates.try_recv().is_ok() {}
}
