use crate::PersistenceError;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Durable, ordered, de-duplicated list of user style rules that are
/// injected into every generation prompt.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules in insertion order.
    async fn rules(&self) -> Result<Vec<String>, PersistenceError>;

    /// Append `rule` unless it is blank or already present. Returns whether
    /// the list changed.
    async fn add(&self, rule: &str) -> Result<bool, PersistenceError>;
}

/// Rules kept in a JSON array on disk. A missing file is an empty list.
pub struct JsonRuleStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<String>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(PersistenceError::io(&self.path, error)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|error| PersistenceError::json(&self.path, error))
    }

    async fn write(&self, rules: &[String]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| PersistenceError::io(parent, error))?;
        }
        let json = serde_json::to_vec_pretty(rules)
            .map_err(|error| PersistenceError::json(&self.path, error))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|error| PersistenceError::io(&self.path, error))
    }
}

#[async_trait::async_trait]
impl RuleStore for JsonRuleStore {
    async fn rules(&self) -> Result<Vec<String>, PersistenceError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn add(&self, rule: &str) -> Result<bool, PersistenceError> {
        let rule = rule.trim();
        if rule.is_empty() {
            return Ok(false);
        }

        let _guard = self.lock.lock().await;
        let mut rules = self.read().await?;
        if rules.iter().any(|existing| existing == rule) {
            debug!(rule, "rule already remembered");
            return Ok(false);
        }

        rules.push(rule.to_string());
        self.write(&rules).await?;
        info!(rule, total = rules.len(), "rule remembered");
        Ok(true)
    }
}

/// Process-local rules, lost on restart.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: Mutex<Vec<String>>,
}

impl InMemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: Mutex::new(rules.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait::async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn rules(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.rules.lock().await.clone())
    }

    async fn add(&self, rule: &str) -> Result<bool, PersistenceError> {
        let rule = rule.trim();
        if rule.is_empty() {
            return Ok(false);
        }
        let mut rules = self.rules.lock().await;
        if rules.iter().any(|existing| existing == rule) {
            return Ok(false);
        }
        rules.push(rule.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_dedups_and_trims() {
        let store = InMemoryRuleStore::with_rules(["Use serif fonts"]);

        assert!(!store.add("  Use serif fonts ").await.unwrap());
        assert!(!store.add("   ").await.unwrap());
        assert!(store.add("No gradients").await.unwrap());

        assert_eq!(
            store.rules().await.unwrap(),
            vec!["Use serif fonts", "No gradients"]
        );
    }
}
