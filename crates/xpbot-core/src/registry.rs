//! User registry: chat id → enrollment, persisted wholesale on every change.
//!
//! The registry is loaded once at startup and the whole map is rewritten after
//! each mutation. That is only safe because the bot handles one event at a
//! time (see `bot::XpBot`); it will not scale past a single process.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{domain::ChatId, errors::Error, ports::RegistryStore, Result};

pub type RegistryData = BTreeMap<ChatId, Enrollment>;

/// On-disk record shape: `{ "wallet": "0x..." | null }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub wallet: Option<String>,
}

/// Where a started chat is in the enrollment flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRecord", into = "UserRecord")]
pub enum Enrollment {
    AwaitingWallet,
    Registered { wallet: String },
}

impl From<UserRecord> for Enrollment {
    fn from(r: UserRecord) -> Self {
        match r.wallet {
            Some(wallet) if !wallet.is_empty() => Enrollment::Registered { wallet },
            _ => Enrollment::AwaitingWallet,
        }
    }
}

impl From<Enrollment> for UserRecord {
    fn from(e: Enrollment) -> Self {
        match e {
            Enrollment::AwaitingWallet => UserRecord { wallet: None },
            Enrollment::Registered { wallet } => UserRecord {
                wallet: Some(wallet),
            },
        }
    }
}

/// Per-chat conversation state as seen by the command router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatState {
    Unregistered,
    AwaitingWallet,
    Registered { wallet: String },
}

pub struct Registry {
    entries: RegistryData,
    store: Arc<dyn RegistryStore>,
}

impl Registry {
    pub fn load(store: Arc<dyn RegistryStore>) -> Result<Self> {
        let entries = store.load()?;
        info!(users = entries.len(), "registry loaded");
        Ok(Self { entries, store })
    }

    pub fn get(&self, chat_id: ChatId) -> Option<&Enrollment> {
        self.entries.get(&chat_id)
    }

    pub fn state(&self, chat_id: ChatId) -> ChatState {
        match self.entries.get(&chat_id) {
            None => ChatState::Unregistered,
            Some(Enrollment::AwaitingWallet) => ChatState::AwaitingWallet,
            Some(Enrollment::Registered { wallet }) => ChatState::Registered {
                wallet: wallet.clone(),
            },
        }
    }

    /// Create an `AwaitingWallet` record if the chat has none. Existing records
    /// are returned untouched and nothing is written.
    pub fn ensure(&mut self, chat_id: ChatId) -> Result<&Enrollment> {
        if !self.entries.contains_key(&chat_id) {
            self.entries.insert(chat_id, Enrollment::AwaitingWallet);
            if let Err(e) = self.persist() {
                self.entries.remove(&chat_id);
                return Err(e);
            }
            debug!(%chat_id, "registry: new user");
        }
        Ok(&self.entries[&chat_id])
    }

    /// Store the wallet for a chat awaiting one. Returns false (and changes
    /// nothing) for unknown chats and chats that already have a wallet.
    pub fn set_wallet(&mut self, chat_id: ChatId, address: &str) -> Result<bool> {
        let Some(entry) = self.entries.get_mut(&chat_id) else {
            return Ok(false);
        };
        if *entry != Enrollment::AwaitingWallet {
            return Ok(false);
        }

        *entry = Enrollment::Registered {
            wallet: address.to_string(),
        };
        if let Err(e) = self.persist() {
            self.entries.insert(chat_id, Enrollment::AwaitingWallet);
            return Err(e);
        }
        Ok(true)
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data(&self) -> &RegistryData {
        &self.entries
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.entries)
    }
}

/// JSON file store. A missing or empty file loads as an empty registry.
///
/// Saves go to a sibling `<file>.tmp` that is then renamed over the target, so
/// the registry file is always either the old or the new map, never a prefix.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn persist_err(&self, reason: impl ToString) -> Error {
        Error::Persist {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<RegistryData> {
        if !self.path.exists() {
            return Ok(RegistryData::new());
        }
        let txt = fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(RegistryData::new());
        }
        Ok(serde_json::from_str(&txt)?)
    }

    fn save(&self, data: &RegistryData) -> Result<()> {
        let txt = serde_json::to_string(data).map_err(|e| self.persist_err(e))?;
        let tmp = self.tmp_path();
        fs::write(&tmp, txt).map_err(|e| self.persist_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.persist_err(e)
        })
    }
}
