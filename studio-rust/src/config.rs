use crate::ConfigError;
use std::{env, path::PathBuf};

pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VERIFY_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
pub const DEFAULT_STYLE_COLLECTION: &str = "design_system_styles";
pub const DEFAULT_MEMORY_FILE: &str = "memory.json";
pub const DEFAULT_ASSET_ROOT: &str = "project_assets";
pub const DEFAULT_PORT: u16 = 8000;

/// Connection settings for the vector database backing the style memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMemoryConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub google_api_key: String,
    pub google_base_url: Option<String>,
    pub generation_model: String,
    pub verify_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// `None` when `QDRANT_URL` is unset; generation then runs unstyled.
    pub style_memory: Option<StyleMemoryConfig>,
    pub memory_file: PathBuf,
    pub asset_root: PathBuf,
    pub port: u16,
    /// Allowed CORS origin. Any origin when unset.
    pub app_url: Option<String>,
}

impl StudioConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let google_api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let embedding_dimension = match get("EMBEDDING_DIMENSION") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|dimension| *dimension > 0)
                .ok_or(ConfigError::Invalid {
                    name: "EMBEDDING_DIMENSION",
                    value,
                })?,
            None => DEFAULT_EMBEDDING_DIMENSION,
        };

        let port = match get("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let style_memory = get("QDRANT_URL").map(|url| StyleMemoryConfig {
            url,
            api_key: get("QDRANT_API_KEY"),
            collection: get("STYLE_COLLECTION")
                .unwrap_or_else(|| DEFAULT_STYLE_COLLECTION.to_string()),
        });

        Ok(Self {
            google_api_key,
            google_base_url: get("GOOGLE_BASE_URL"),
            generation_model: get("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            verify_model: get("VERIFY_MODEL").unwrap_or_else(|| DEFAULT_VERIFY_MODEL.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension,
            style_memory,
            memory_file: get("MEMORY_FILE")
                .unwrap_or_else(|| DEFAULT_MEMORY_FILE.to_string())
                .into(),
            asset_root: get("ASSET_ROOT")
                .unwrap_or_else(|| DEFAULT_ASSET_ROOT.to_string())
                .into(),
            port,
            app_url: get("APP_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = StudioConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "k")])).unwrap();

        assert_eq!(config.generation_model, DEFAULT_GENERATION_MODEL);
        assert_eq!(config.verify_model, DEFAULT_VERIFY_MODEL);
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.port, 8000);
        assert_eq!(config.memory_file, PathBuf::from("memory.json"));
        assert!(config.style_memory.is_none());
        assert!(config.app_url.is_none());
    }

    #[test]
    fn requires_api_key() {
        let result = StudioConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")]));

        assert!(matches!(result, Err(ConfigError::Missing("GOOGLE_API_KEY"))));
    }

    #[test]
    fn qdrant_url_enables_style_memory() {
        let config = StudioConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("QDRANT_URL", "http://localhost:6333"),
            ("QDRANT_API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(
            config.style_memory,
            Some(StyleMemoryConfig {
                url: "http://localhost:6333".to_string(),
                api_key: Some("secret".to_string()),
                collection: DEFAULT_STYLE_COLLECTION.to_string(),
            })
        );
    }

    #[test]
    fn rejects_zero_dimension_and_bad_port() {
        let dimension = StudioConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("EMBEDDING_DIMENSION", "0"),
        ]));
        let port =
            StudioConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "k"), ("PORT", "eighty")]));

        assert!(matches!(
            dimension,
            Err(ConfigError::Invalid {
                name: "EMBEDDING_DIMENSION",
                ..
            })
        ));
        assert!(matches!(port, Err(ConfigError::Invalid { name: "PORT", .. })));
    }
}
