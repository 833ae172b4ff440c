use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};

use crate::batch::BatchSplit;

/// Largest number of images the annotation endpoint accepts in one call.
pub const VISION_MAX_IMAGES_PER_CALL: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub image_folder: String,
    pub bucket_name: String,
    pub entity_kind: String,
    pub namespace: String,
    pub score_threshold: f64,
    pub max_batch_size: usize,
    pub max_put_batch_size: usize,
    pub batch_split: BatchSplit,
    pub dedupe_within_dataset: bool,
    pub output_dir: String,
    pub document_store_path: String,
    pub object_store_root: String,
    pub vision_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_folder: "images".to_string(),
            bucket_name: "vision-api-example".to_string(),
            entity_kind: "ImageLabel".to_string(),
            namespace: "vision-api-example".to_string(),
            score_threshold: 0.7,
            max_batch_size: 9,
            max_put_batch_size: 100,
            batch_split: BatchSplit::Balanced,
            dedupe_within_dataset: true,
            output_dir: "output".to_string(),
            document_store_path: "image_labels.db".to_string(),
            object_store_root: "buckets".to_string(),
            vision_endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 || self.max_batch_size > VISION_MAX_IMAGES_PER_CALL {
            return Err(ConfigError::Message(format!(
                "max_batch_size must be between 1 and {}, got {}",
                VISION_MAX_IMAGES_PER_CALL, self.max_batch_size
            )));
        }
        if self.max_put_batch_size == 0 {
            return Err(ConfigError::Message(
                "max_put_batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::Message(format!(
                "score_threshold must be within 0.0..=1.0, got {}",
                self.score_threshold
            )));
        }
        Ok(())
    }
}

/// Defaults, then an optional `Config.toml`, then `LABELER_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("LABELER").try_parsing(true))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_batch_size, 9);
        assert_eq!(config.max_put_batch_size, 100);
        assert_eq!(config.entity_kind, "ImageLabel");
        assert_eq!(config.namespace, "vision-api-example");
    }

    #[test]
    fn test_batch_size_above_vision_cap_rejected() {
        let config = AppConfig {
            max_batch_size: 17,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            max_put_batch_size: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
