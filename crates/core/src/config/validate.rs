use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Thumbnail fps is non-zero and divides 1000 (the frame grid is integral)
/// - Clip byte budget and reduced fps are non-zero
/// - Index key is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let fps = config.preprocess.thumb_fps;
    if fps == 0 || 1000 % fps != 0 {
        return Err(ConfigError::ValidationError(format!(
            "preprocess.thumb_fps must divide 1000 evenly, got {}",
            fps
        )));
    }

    if config.clip.desired_max_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "clip.desired_max_bytes cannot be 0".to_string(),
        ));
    }

    if config.clip.reduced_fps == 0 {
        return Err(ConfigError::ValidationError(
            "clip.reduced_fps cannot be 0".to_string(),
        ));
    }

    if config.index.key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "index.key cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_thumb_fps() {
        for fps in [1, 2, 4, 5, 8, 10, 25] {
            let mut config = Config::default();
            config.preprocess.thumb_fps = fps;
            assert!(validate_config(&config).is_ok(), "fps {} should be valid", fps);
        }
        for fps in [0, 3, 7, 30] {
            let mut config = Config::default();
            config.preprocess.thumb_fps = fps;
            let err = validate_config(&config).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)));
        }
    }

    #[test]
    fn test_validate_clip_settings() {
        let mut config = Config::default();
        config.clip.desired_max_bytes = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.clip.reduced_fps = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_index_key() {
        let mut config = Config::default();
        config.index.key = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
