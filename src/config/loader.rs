//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{BalancerConfig, NodeConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("node list line {line}: {reason}")]
    NodeList { line: usize, reason: String },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BalancerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Read a node list file: one `address[,weight]` per line.
pub fn load_node_list(path: &Path) -> Result<Vec<NodeConfig>, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_node_list(&content)
}

/// Parse node list text. Blank lines and `#` comments are skipped, a missing
/// weight means 1. Addresses are checked later by validation.
pub fn parse_node_list(content: &str) -> Result<Vec<NodeConfig>, ConfigError> {
    let mut nodes = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let node = match fields.as_slice() {
            [address] => NodeConfig::new(*address, 1),
            [address, weight] => {
                let weight = weight.parse::<u32>().map_err(|_| ConfigError::NodeList {
                    line: i + 1,
                    reason: format!("weight '{}' is not a positive integer", weight),
                })?;
                NodeConfig::new(*address, weight)
            }
            _ => {
                return Err(ConfigError::NodeList {
                    line: i + 1,
                    reason: "expected 'address[,weight]'".to_string(),
                })
            }
        };
        nodes.push(node);
    }

    Ok(nodes)
}
