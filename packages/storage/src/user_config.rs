// ABOUTME: Persisted per-user configuration
// ABOUTME: Username and access group sent with every chat request

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use ragline_core::constants::{ragline_dir, user_config_file};

use crate::StorageResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub username: String,
    pub user_group: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            username: "user".to_string(),
            user_group: "general".to_string(),
        }
    }
}

impl UserConfig {
    /// Load the config from ~/.ragline/config.json, falling back to defaults
    /// when the file is missing or unparsable.
    pub async fn load() -> Self {
        match fs::read_to_string(user_config_file()).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("failed to parse user config, using defaults: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self) -> StorageResult<()> {
        let dir = ragline_dir();
        if !dir.exists() {
            debug!("creating storage directory: {:?}", dir);
            fs::create_dir_all(&dir).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(user_config_file(), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::with_temp_home;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_defaults_when_missing() {
        with_temp_home(|| async {
            let config = UserConfig::load().await;
            assert_eq!(config, UserConfig::default());
        })
        .await;
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        with_temp_home(|| async {
            let config = UserConfig {
                username: "jsmith".to_string(),
                user_group: "engineers".to_string(),
            };
            config.save().await.unwrap();
            assert_eq!(UserConfig::load().await, config);
        })
        .await;
    }
}
