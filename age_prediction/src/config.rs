use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub models: ModelsConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    /// Origins allowed to call the API from a browser. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_max_upload_mb() -> usize {
    10
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    pub model_dir: PathBuf,
    #[serde(default = "default_ensemble_files")]
    pub ensemble_files: Vec<String>,
    #[serde(default = "default_transfer_file")]
    pub transfer_file: String,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_ensemble_files() -> Vec<String> {
    (1..=3)
        .map(|i| format!("keras_cnn_model_{}.onnx", i))
        .collect()
}

fn default_transfer_file() -> String {
    "resnet50_finetuned.onnx".to_string()
}

fn default_intra_threads() -> usize {
    1
}

impl ModelsConfig {
    pub fn ensemble_paths(&self) -> Vec<PathBuf> {
        self.ensemble_files
            .iter()
            .map(|file| self.model_dir.join(file))
            .collect()
    }

    pub fn transfer_path(&self) -> PathBuf {
        self.model_dir.join(&self.transfer_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .with_list_parse_key("models.ensemble_files"),
        )
        .build()?;

    config.try_deserialize::<Config>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Config>()
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let config = parse(
            r#"
server:
  host: 127.0.0.1
  port: 8000
log_level: info
models:
  model_dir: Models
"#,
        )
        .unwrap();

        assert_eq!(config.server.get_address(), "127.0.0.1:8000");
        assert_eq!(config.server.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(
            config.models.ensemble_paths(),
            vec![
                PathBuf::from("Models/keras_cnn_model_1.onnx"),
                PathBuf::from("Models/keras_cnn_model_2.onnx"),
                PathBuf::from("Models/keras_cnn_model_3.onnx"),
            ]
        );
        assert_eq!(
            config.models.transfer_path(),
            PathBuf::from("Models/resnet50_finetuned.onnx")
        );
        assert_eq!(config.models.intra_threads, 1);
    }

    #[test]
    fn test_huge_upload_limit_saturates() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_mb: usize::MAX / 2,
            cors_origins: Vec::new(),
        };

        assert_eq!(server.max_upload_bytes(), usize::MAX);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let result = parse(
            r#"
server:
  host: 127.0.0.1
  port: 8000
log_level: trace
models:
  model_dir: Models
"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::try_from("PRODUCTION".to_string())
                .unwrap()
                .as_str(),
            "production"
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
