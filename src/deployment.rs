use crate::{
    address::Address,
    config::{
        BetUnits,
        ClientConfig,
    },
    provider::ChainId,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub const ALL: [DeploymentEnv; 3] = [DeploymentEnv::Dev, DeploymentEnv::Test, DeploymentEnv::Local];

    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// Where a game machine lives and how it expects to be called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub game_contract: Address,
    pub chain_id: ChainId,
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default)]
    pub token_contract: Option<Address>,
    #[serde(default)]
    pub bet_units: BetUnits,
    #[serde(default)]
    pub tokens_per_eth: Option<u64>,
}

impl DeploymentRecord {
    pub fn new(game_contract: Address, chain_id: ChainId) -> Self {
        Self {
            deployed_at: Utc::now().to_rfc3339(),
            game_contract,
            chain_id,
            network_name: None,
            token_contract: None,
            bet_units: BetUnits::default(),
            tokens_per_eth: None,
        }
    }

    /// Points `config` at this deployment.
    pub fn apply_to(&self, config: &mut ClientConfig) {
        config.game_address = self.game_contract;
        config.bet_units = self.bet_units;
        if let Some(rate) = self.tokens_per_eth {
            config.tokens_per_eth = rate;
        }
    }
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::open(DEPLOYMENTS_ROOT, env)
    }

    /// Store for `env` under `root` instead of the working directory.
    pub fn open(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Vec<DeploymentRecord>> {
        read_records(&self.path)
    }

    /// Most recently appended record, if any.
    pub fn latest(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.load()?.pop())
    }

    pub fn append(&self, record: DeploymentRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        write_records(&self.path, &records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn record_deployment(
    env: DeploymentEnv,
    game_contract: Address,
    chain_id: ChainId,
    bet_units: BetUnits,
) -> Result<()> {
    let store = DeploymentStore::new(env)?;
    let record = DeploymentRecord {
        bet_units,
        ..DeploymentRecord::new(game_contract, chain_id)
    };
    store.append(record)
}

pub fn ensure_structure(root: impl AsRef<Path>) -> Result<()> {
    for env in DeploymentEnv::ALL {
        let _ = ensure_store(root.as_ref(), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).wrap_err_with(|| {
            format!("Failed to create deployments directory {}", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).wrap_err_with(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"[]").wrap_err_with(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_records(path: impl AsRef<Path>) -> Result<Vec<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).wrap_err("Failed to read deployment records")?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice::<Vec<DeploymentRecord>>(&data)
        .wrap_err("Failed to parse deployment records JSON")
}

fn write_records(path: impl AsRef<Path>, records: &[DeploymentRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)
        .wrap_err("Failed to serialize deployment records")?;
    fs::write(path.as_ref(), json).wrap_err("Failed to write deployment records")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::config::DEFAULT_GAME_CONTRACT;

    #[test]
    fn open__creates_empty_store() {
        // given
        let root = tempfile::tempdir().unwrap();

        // when
        let store = DeploymentStore::open(root.path(), DeploymentEnv::Local).unwrap();

        // then
        assert!(store.path().ends_with("local/deployments.json"));
        assert!(store.load().unwrap().is_empty());
        assert_eq!(None, store.latest().unwrap());
    }

    #[test]
    fn append__latest_returns_last_record() {
        // given
        let root = tempfile::tempdir().unwrap();
        let store = DeploymentStore::open(root.path(), DeploymentEnv::Test).unwrap();
        let first = DeploymentRecord::new(Address::ZERO, 1337);
        let second = DeploymentRecord {
            bet_units: BetUnits::Raw,
            ..DeploymentRecord::new(DEFAULT_GAME_CONTRACT, 11155111)
        };

        // when
        store.append(first).unwrap();
        store.append(second.clone()).unwrap();

        // then
        assert_eq!(2, store.load().unwrap().len());
        assert_eq!(Some(second), store.latest().unwrap());
    }

    #[test]
    fn read_records__accepts_minimal_entries() {
        // given
        let root = tempfile::tempdir().unwrap();
        let store = DeploymentStore::open(root.path(), DeploymentEnv::Dev).unwrap();
        fs::write(
            store.path(),
            r#"[{ "deployed_at": "2024-01-01T00:00:00Z",
                  "game_contract": "0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d",
                  "chain_id": 1337 }]"#,
        )
        .unwrap();

        // when
        let record = store.latest().unwrap().unwrap();
        let mut config = ClientConfig {
            game_address: Address::ZERO,
            ..ClientConfig::default()
        };
        record.apply_to(&mut config);

        // then
        assert_eq!(BetUnits::Scaled, record.bet_units);
        assert_eq!(DEFAULT_GAME_CONTRACT, config.game_address);
        assert_eq!(100_000, config.tokens_per_eth);
    }

    #[test]
    fn ensure_structure__creates_every_env() {
        let root = tempfile::tempdir().unwrap();
        ensure_structure(root.path()).unwrap();
        for env in DeploymentEnv::ALL {
            assert!(root.path().join(env.dir_name()).join(DEPLOYMENTS_FILE).exists());
        }
    }
}
