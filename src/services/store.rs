//! Whole-file JSON state store.
//!
//! Every read parses the full file and every mutation rewrites it. A single
//! async mutex is held across each read-modify-write so the webhook handlers
//! and the alert loop never interleave updates. A file that exists but cannot
//! be read or parsed is never overwritten.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::{
    error::{BotError, Result},
    models::{ChatId, StoreData, UserState},
};

pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current data for read-only callers. An unreadable file reads as empty
    /// here; [`JsonStore::update`] refuses to write over it.
    pub async fn load(&self) -> StoreData {
        self.try_load().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "serving empty data");
            StoreData::default()
        })
    }

    pub async fn try_load(&self) -> Result<StoreData> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn user(&self, chat_id: ChatId) -> Option<UserState> {
        self.load().await.users.remove(&chat_id)
    }

    /// Applies `f` to the current data and writes the result back.
    pub async fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StoreData) -> R,
    {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        let out = f(&mut data);
        self.write(&data).await?;
        Ok(out)
    }

    /// Like [`JsonStore::update`] for a single chat, creating its state if missing.
    pub async fn update_user<R, F>(&self, chat_id: ChatId, f: F) -> Result<R>
    where
        F: FnOnce(&mut UserState) -> R,
    {
        self.update(|data| f(data.user_mut(chat_id))).await
    }

    /// Missing or blank file is an empty store. Anything else that does not
    /// parse is copied to `<file>.json.bad` and reported as an error.
    async fn read(&self) -> Result<StoreData> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
            Err(e) => return Err(self.unreadable(e.to_string())),
        };

        let parsed = std::str::from_utf8(&raw)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                if text.trim().is_empty() {
                    return Ok(StoreData::default());
                }
                serde_json::from_str::<StoreData>(text).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(data) => Ok(data),
            Err(reason) => {
                let backup = self.path.with_extension("json.bad");
                match tokio::fs::copy(&self.path, &backup).await {
                    Ok(_) => tracing::error!(
                        path = %self.path.display(),
                        backup = %backup.display(),
                        %reason,
                        "data file is not valid, copy kept"
                    ),
                    Err(e) => tracing::error!(
                        path = %self.path.display(),
                        %reason,
                        error = %e,
                        "data file is not valid and could not be backed up"
                    ),
                }
                Err(self.unreadable(reason))
            }
        }
    }

    fn unreadable(&self, reason: String) -> BotError {
        BotError::Store {
            path: self.path.display().to_string(),
            reason,
        }
    }

    async fn write(&self, data: &StoreData) -> Result<()> {
        let raw = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchEntry;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("users.json"));
        assert_eq!(store.load().await, StoreData::default());
    }

    #[tokio::test]
    async fn updates_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let store = JsonStore::new(&path);

        store
            .update_user(42, |u| {
                u.add_favorite("AAPL");
                u.notifications
                    .insert("AAPL".into(), WatchEntry::new("AAPL", 5.0));
            })
            .await
            .unwrap();

        // a fresh store over the same file sees the change
        let reopened = JsonStore::new(&path);
        let user = reopened.user(42).await.unwrap();
        assert_eq!(user.favorites, vec!["AAPL".to_string()]);
        assert_eq!(user.notifications["AAPL"].threshold_pct, 5.0);
    }

    #[tokio::test]
    async fn corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonStore::new(&path);
        assert!(store.load().await.users.is_empty());
        assert!(dir.path().join("users.json.bad").exists());
        assert!(store.update_user(1, |u| u.add_favorite("AAPL")).await.is_err());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn unreadable_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let mut data = StoreData::default();
        data.user_mut(1).add_favorite("AAPL");
        let mut raw = serde_json::to_vec(&data).unwrap();
        raw.push(0xff);
        tokio::fs::write(&path, &raw).await.unwrap();

        let store = JsonStore::new(&path);
        let err = store.update_user(2, |u| u.add_favorite("MSFT")).await;
        assert!(matches!(err, Err(BotError::Store { .. })));

        assert_eq!(tokio::fs::read(&path).await.unwrap(), raw);
        assert_eq!(tokio::fs::read(dir.path().join("users.json.bad")).await.unwrap(), raw);
    }

    #[tokio::test]
    async fn directory_in_place_of_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        tokio::fs::create_dir(&path).await.unwrap();

        let store = JsonStore::new(&path);
        assert!(store.try_load().await.is_err());
        assert!(store.update_user(1, |u| u.add_favorite("AAPL")).await.is_err());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn blank_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        tokio::fs::write(&path, "  \n").await.unwrap();

        let store = JsonStore::new(&path);
        store.update_user(3, |u| u.add_favorite("AAPL")).await.unwrap();
        assert!(store.user(3).await.is_some());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonStore::new(dir.path().join("users.json")));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_user(7, |u| {
                        u.add_favorite(&format!("SYM{i}"));
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.user(7).await.unwrap().favorites.len(), 10);
    }
}
