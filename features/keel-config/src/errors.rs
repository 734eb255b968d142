/// Errors when resolving a configuration parameter
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The override string could not be parsed into the declared type
    #[error("Config parameter '{name}' expects a {target}, but the override '{value}' could not be parsed: {reason}")]
    Coercion {
        name: String,
        value: String,
        target: &'static str,
        reason: String,
    },

    /// The environment overlay could not be loaded
    #[error("Config overrides with prefix '{prefix}' could not be loaded from the environment: {reason}")]
    Environment { prefix: String, reason: String },
}
