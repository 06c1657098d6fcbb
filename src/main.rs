use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use dapps_game::{
    Address,
    deployment::{
        self,
        DEPLOYMENTS_ROOT,
        DeploymentEnv,
    },
    keystore,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "dapps-game.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: dapps-game [--simulated] [--devnet | --testnet | --local]\n\
         [--game-address <hex>] [--keystore <name>] [--keystore-dir <path>]\n\
         [--config <path>] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --simulated           Play against an in-process chain and wallet\n\
           --devnet              Use the latest devnet deployment record\n\
           --testnet             Use the latest testnet deployment record\n\
           --local               Use the latest local deployment record\n\
           --game-address <hex>  Override the game machine contract (default {})\n\
           --keystore <name>     Keystore whose account the simulated wallet holds\n\
           --keystore-dir <path> Override keystore directory (defaults to ~/.dapps-game/keystores)\n\
           --config <path>       JSON client config (timeouts, retries, approval, bet units)\n\
           --log-dir <path>      Directory for rolling log files (default {})",
        dapps_game::config::DEFAULT_GAME_CONTRACT,
        DEFAULT_LOG_DIR,
    );
    std::process::exit(0);
}

struct CliArgs {
    app: client::AppConfig,
    log_dir: PathBuf,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut simulated = false;
    let mut env: Option<DeploymentEnv> = None;
    let mut game_address: Option<Address> = None;
    let mut keystore_name: Option<String> = None;
    let mut keystore_dir: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut log_dir: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--simulated" => simulated = true,
            flag @ ("--devnet" | "--testnet" | "--local") => {
                if env.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                env = Some(match flag {
                    "--devnet" => DeploymentEnv::Dev,
                    "--testnet" => DeploymentEnv::Test,
                    _ => DeploymentEnv::Local,
                });
            }
            "--game-address" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--game-address requires an address argument"))?;
                if game_address.is_some() {
                    return Err(eyre!("--game-address may only be specified once"));
                }
                let address = raw
                    .parse::<Address>()
                    .wrap_err_with(|| format!("Invalid --game-address {raw}"))?;
                game_address = Some(address);
            }
            "--keystore" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--keystore requires a keystore name"))?;
                if keystore_name.is_some() {
                    return Err(eyre!("--keystore may only be specified once"));
                }
                keystore_name = Some(name);
            }
            "--keystore-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--keystore-dir requires a path argument"))?;
                if keystore_dir.is_some() {
                    return Err(eyre!("--keystore-dir may only be specified once"));
                }
                keystore_dir = Some(dir);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--config requires a path argument"))?;
                config_path = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
            }
            "--log-dir" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                log_dir = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let wallet = match (simulated, keystore_name) {
        (false, None) => client::WalletConfig::None,
        (false, Some(_)) => {
            return Err(eyre!("--keystore requires --simulated"));
        }
        (true, None) => client::WalletConfig::Simulated,
        (true, Some(name)) => client::WalletConfig::SimulatedKeystore {
            name,
            dir: keystore::resolve_keystore_dir(keystore_dir.as_deref())?,
        },
    };

    Ok(CliArgs {
        app: client::AppConfig {
            wallet,
            env,
            game_address,
            config_path,
        },
        log_dir: log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
    })
}

/// Logs go to a daily file; the terminal belongs to the TUI.
fn init_tracing(log_dir: &Path) {
    let appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = parse_cli_args()?;
    init_tracing(&args.log_dir);
    tracing::info!("starting dapps-game client");
    deployment::ensure_structure(DEPLOYMENTS_ROOT)?;
    client::run_app(args.app).await
}
