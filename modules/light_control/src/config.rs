use serde::{Deserialize, Serialize};

/// `modules.light_control` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LightControlConfig {
    /// HS256 signing key for access tokens. Required.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Readings strictly below this turn the light on.
    #[serde(default = "default_on_threshold")]
    pub on_threshold: i32,
    #[serde(default = "default_min_intensity")]
    pub min_intensity: i32,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: i32,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

impl Default for LightControlConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            on_threshold: default_on_threshold(),
            min_intensity: default_min_intensity(),
            max_intensity: default_max_intensity(),
            min_password_len: default_min_password_len(),
        }
    }
}

impl LightControlConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("light_control.jwt_secret must be set");
        }
        if self.token_ttl_secs == 0 {
            anyhow::bail!("light_control.token_ttl_secs must be greater than zero");
        }
        if self.min_intensity > self.max_intensity {
            anyhow::bail!(
                "light_control.min_intensity ({}) exceeds max_intensity ({})",
                self.min_intensity,
                self.max_intensity
            );
        }
        Ok(())
    }
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_on_threshold() -> i32 {
    30
}

fn default_min_intensity() -> i32 {
    0
}

fn default_max_intensity() -> i32 {
    100
}

fn default_min_password_len() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_partial_section() {
        let cfg: LightControlConfig = serde_json::from_value(json!({ "jwt_secret": "s3cret" })).unwrap();
        assert_eq!(cfg.token_ttl_secs, 86_400);
        assert_eq!(cfg.on_threshold, 30);
        assert_eq!((cfg.min_intensity, cfg.max_intensity), (0, 100));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(LightControlConfig::default().validate().is_err());

        let cfg = LightControlConfig {
            jwt_secret: "x".into(),
            min_intensity: 10,
            max_intensity: 5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = LightControlConfig {
            jwt_secret: "x".into(),
            token_ttl_secs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
