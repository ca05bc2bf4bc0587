//! Saved uploads and generated prototypes, with a JSON ledger that records
//! where each asset came from.

use crate::PersistenceError;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::debug;

pub const UPLOADS_DIR: &str = "uploads";
pub const GENERATED_DIR: &str = "generated_code";
pub const LEDGER_FILE: &str = "asset_ledger.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    SourceImage,
    HtmlPrototype,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    pub path: String,
    pub context: String,
    /// RFC 3339, local time.
    pub timestamp: String,
}

/// Keyed record of every saved asset.
#[async_trait::async_trait]
pub trait AssetLedger: Send + Sync {
    async fn record(&self, key: &str, entry: LedgerEntry) -> Result<(), PersistenceError>;
    async fn entries(&self) -> Result<BTreeMap<String, LedgerEntry>, PersistenceError>;
}

/// Ledger persisted as one pretty-printed JSON object, rewritten in full on
/// every record.
pub struct JsonAssetLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonAssetLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, LedgerEntry>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|error| PersistenceError::json(&self.path, error)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(PersistenceError::io(&self.path, error)),
        }
    }
}

#[async_trait::async_trait]
impl AssetLedger for JsonAssetLedger {
    async fn record(&self, key: &str, entry: LedgerEntry) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), entry);

        let json = serde_json::to_vec_pretty(&entries)
            .map_err(|error| PersistenceError::json(&self.path, error))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|error| PersistenceError::io(&self.path, error))
    }

    async fn entries(&self) -> Result<BTreeMap<String, LedgerEntry>, PersistenceError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

#[derive(Default)]
pub struct InMemoryAssetLedger {
    entries: Mutex<BTreeMap<String, LedgerEntry>>,
}

impl InMemoryAssetLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AssetLedger for InMemoryAssetLedger {
    async fn record(&self, key: &str, entry: LedgerEntry) -> Result<(), PersistenceError> {
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn entries(&self) -> Result<BTreeMap<String, LedgerEntry>, PersistenceError> {
        Ok(self.entries.lock().await.clone())
    }
}

/// Writes assets under `root` and records them in the ledger.
pub struct AssetManager {
    uploads: PathBuf,
    generated: PathBuf,
    ledger: Arc<dyn AssetLedger>,
}

impl AssetManager {
    /// Create `root/uploads` and `root/generated_code` if needed.
    pub async fn new(
        root: impl AsRef<Path>,
        ledger: Arc<dyn AssetLedger>,
    ) -> Result<Self, PersistenceError> {
        let root = root.as_ref();
        let uploads = root.join(UPLOADS_DIR);
        let generated = root.join(GENERATED_DIR);
        for dir in [&uploads, &generated] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|error| PersistenceError::io(dir, error))?;
        }

        Ok(Self {
            uploads,
            generated,
            ledger,
        })
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn AssetLedger> {
        &self.ledger
    }

    /// Save an uploaded image as `uploads/HHMMSS_<name>`.
    pub async fn save_upload(
        &self,
        file_name: &str,
        data: &[u8],
        context: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let now = Local::now();
        let original_name = sanitize_file_name(file_name);
        let stored_name = format!("{}_{original_name}", now.format("%H%M%S"));
        let path = self.uploads.join(&stored_name);

        tokio::fs::write(&path, data)
            .await
            .map_err(|error| PersistenceError::io(&path, error))?;

        self.ledger
            .record(
                &stored_name,
                LedgerEntry {
                    kind: AssetKind::SourceImage,
                    original_name: Some(original_name),
                    path: path.display().to_string(),
                    context: context.to_string(),
                    timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, false),
                },
            )
            .await?;

        debug!(path = %path.display(), "upload saved");
        Ok(path)
    }

    /// Save generated markup as `generated_code/<name>`.
    pub async fn save_prototype(
        &self,
        file_name: &str,
        markup: &str,
        context: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let stored_name = sanitize_file_name(file_name);
        let path = self.generated.join(&stored_name);

        tokio::fs::write(&path, markup)
            .await
            .map_err(|error| PersistenceError::io(&path, error))?;

        self.ledger
            .record(
                &stored_name,
                LedgerEntry {
                    kind: AssetKind::HtmlPrototype,
                    original_name: None,
                    path: path.display().to_string(),
                    context: context.to_string(),
                    timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                },
            )
            .await?;

        debug!(path = %path.display(), "prototype saved");
        Ok(path)
    }
}

/// Keep only the final path component so uploads cannot escape their
/// directory.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => "upload".to_string(),
        name => name.to_string(),
    }
}
