use crate::stores::{KeyValueStore, StoreError, StoreResult};
use shared::models::{AppSettings, Contact, ParsedCharacter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

const CONTACTS_KEY: &str = "contacts";
const SETTINGS_KEY: &str = "settings";
/// Unreadable contacts data is moved here before the key is rewritten.
const CONTACTS_BACKUP_KEY: &str = "contacts.unreadable";

/// Typed access to the contacts and settings kept in a [`KeyValueStore`].
#[derive(Clone)]
pub struct ContactBook {
    store: Arc<dyn KeyValueStore>,
    // Serialises read-modify-write cycles on the contacts key
    write_lock: Arc<Mutex<()>>,
}

impl ContactBook {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list(&self) -> StoreResult<Vec<Contact>> {
        let Some(raw) = self.store.get(CONTACTS_KEY).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored contacts are unreadable, treating as empty: {}", e);
            Vec::new()
        }))
    }

    /// Contacts for a read-modify-write cycle. Unparsable data is set aside
    /// under [`CONTACTS_BACKUP_KEY`] instead of being overwritten.
    async fn load_for_update(&self) -> StoreResult<Vec<Contact>> {
        let Some(raw) = self.store.get(CONTACTS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(contacts) => Ok(contacts),
            Err(e) => {
                warn!(
                    "Stored contacts are unreadable, moving them to {:?}: {}",
                    CONTACTS_BACKUP_KEY, e
                );
                self.store.set(CONTACTS_BACKUP_KEY, raw).await?;
                Ok(Vec::new())
            }
        }
    }

    pub async fn get(&self, contact_id: Uuid) -> StoreResult<Contact> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.id == contact_id)
            .ok_or_else(|| StoreError::NotFound(contact_id.to_string()))
    }

    pub async fn add(&self, character: ParsedCharacter) -> StoreResult<Contact> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.load_for_update().await?;
        let contact = Contact::new(character);
        contacts.push(contact.clone());
        self.write(&contacts).await?;
        Ok(contact)
    }

    pub async fn remove(&self, contact_id: Uuid) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.load_for_update().await?;
        let before = contacts.len();
        contacts.retain(|c| c.id != contact_id);
        if contacts.len() == before {
            return Err(StoreError::NotFound(contact_id.to_string()));
        }
        self.write(&contacts).await
    }

    async fn write(&self, contacts: &[Contact]) -> StoreResult<()> {
        let raw = serde_json::to_string(contacts)?;
        self.store.set(CONTACTS_KEY, raw).await
    }

    /// Stored settings, or defaults when none are saved or they cannot be read.
    pub async fn settings(&self) -> StoreResult<AppSettings> {
        let Some(raw) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(AppSettings::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored settings are unreadable, using defaults: {}", e);
            AppSettings::default()
        }))
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        let raw = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, raw).await
    }
}
