use crate::address::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use serde::Deserialize;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

const KEYSTORE_EXTENSION: &str = "json";

#[derive(Clone, Debug)]
pub struct KeystoreDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl KeystoreDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// An account whose keystore decrypted with the supplied password. The key
/// material itself is dropped once checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnlockedAccount {
    pub address: Address,
}

#[derive(Deserialize)]
struct KeystoreHeader {
    address: Option<String>,
}

pub fn default_keystore_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".dapps-game").join("keystores"))
}

pub fn resolve_keystore_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        None => default_keystore_dir(),
    }
}

pub fn list_keystores(dir: &Path) -> Result<Vec<KeystoreDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut keystores = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let path = entry.wrap_err("Failed to read keystore entry")?.path();
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(KEYSTORE_EXTENSION)
        {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        keystores.push(KeystoreDescriptor::new(name, path));
    }
    keystores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(keystores)
}

pub fn find_keystore(dir: &Path, name: &str) -> Result<KeystoreDescriptor> {
    list_keystores(dir)?
        .into_iter()
        .find(|k| k.name == name)
        .ok_or_else(|| eyre!("Keystore '{name}' not found in {}", dir.to_string_lossy()))
}

/// Reads the account address recorded in a keystore file.
pub fn keystore_address(descriptor: &KeystoreDescriptor) -> Result<Address> {
    let data = fs::read(&descriptor.path)
        .wrap_err_with(|| format!("Failed to read keystore '{}'", descriptor.name))?;
    let header: KeystoreHeader = serde_json::from_slice(&data)
        .wrap_err_with(|| format!("Keystore '{}' is not valid JSON", descriptor.name))?;
    let raw = header
        .address
        .ok_or_else(|| eyre!("Keystore '{}' does not record an address", descriptor.name))?;
    raw.parse::<Address>()
        .wrap_err_with(|| format!("Keystore '{}' has a malformed address", descriptor.name))
}

pub fn unlock_keystore_with(
    descriptor: &KeystoreDescriptor,
    password: &str,
) -> Result<UnlockedAccount> {
    let address = keystore_address(descriptor)?;
    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for keystore '{}'", descriptor.name))?;
    if secret.len() != 32 {
        return Err(eyre!(
            "Keystore '{}' contained unsupported key material",
            descriptor.name
        ));
    }
    Ok(UnlockedAccount { address })
}

pub fn unlock_keystore(descriptor: &KeystoreDescriptor) -> Result<UnlockedAccount> {
    let prompt = format!("Enter password for keystore '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read keystore password")?;
    unlock_keystore_with(descriptor, &password)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn list_keystores__returns_sorted_json_files_only() {
        // given
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bob.json"), "{}").unwrap();
        fs::write(dir.path().join("alice.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        // when
        let names: Vec<String> = list_keystores(dir.path())
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect();

        // then
        assert_eq!(vec!["alice", "bob"], names);
    }

    #[test]
    fn list_keystores__is_empty_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_keystores(&missing).unwrap().is_empty());
    }

    #[test]
    fn keystore_address__reads_address_field() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        fs::write(
            &path,
            r#"{ "address": "5acd86cdbf49cb5551a4790fdbce14d1ec78c16d", "crypto": {} }"#,
        )
        .unwrap();
        let descriptor = KeystoreDescriptor::new("player", path);

        // when
        let address = keystore_address(&descriptor).unwrap();

        // then
        assert_eq!(
            "0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d",
            address.to_string()
        );
    }

    #[test]
    fn unlock_keystore_with__rejects_undecryptable_file() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(
            &path,
            r#"{ "address": "5acd86cdbf49cb5551a4790fdbce14d1ec78c16d", "crypto": {} }"#,
        )
        .unwrap();
        let descriptor = KeystoreDescriptor::new("broken", path);

        // when
        let result = unlock_keystore_with(&descriptor, "hunter2");

        // then
        let message = result.unwrap_err().to_string();
        assert_eq!("Invalid password for keystore 'broken'", message);
    }

    #[test]
    fn find_keystore__names_missing_keystore() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_keystore(dir.path(), "ghost").unwrap_err();
        assert!(err.to_string().starts_with("Keystore 'ghost' not found"));
    }
}
