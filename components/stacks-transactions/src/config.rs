use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::post_condition::TransactionPostConditionMode;
use crate::transaction::{TransactionAnchorMode, TransactionVersion};

pub const CHAIN_ID_MAINNET: u32 = 0x00000001;
pub const CHAIN_ID_TESTNET: u32 = 0x80000000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StacksNetwork {
    Mainnet,
    Testnet,
}

impl StacksNetwork {
    pub fn transaction_version(&self) -> TransactionVersion {
        match self {
            StacksNetwork::Mainnet => TransactionVersion::Mainnet,
            StacksNetwork::Testnet => TransactionVersion::Testnet,
        }
    }

    pub fn default_chain_id(&self) -> u32 {
        match self {
            StacksNetwork::Mainnet => CHAIN_ID_MAINNET,
            StacksNetwork::Testnet => CHAIN_ID_TESTNET,
        }
    }
}

impl From<TransactionVersion> for StacksNetwork {
    fn from(version: TransactionVersion) -> StacksNetwork {
        match version {
            TransactionVersion::Mainnet => StacksNetwork::Mainnet,
            TransactionVersion::Testnet => StacksNetwork::Testnet,
        }
    }
}

/// On-disk form of [`TransactionConfig`]; everything but the network may be left out.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionConfigFile {
    pub network: StacksNetwork,
    pub chain_id: Option<u32>,
    pub post_condition_mode: Option<TransactionPostConditionMode>,
    pub anchor_mode: Option<TransactionAnchorMode>,
}

/// Defaults applied when a transaction is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    pub network: StacksNetwork,
    pub chain_id: u32,
    pub post_condition_mode: TransactionPostConditionMode,
    /// `None` lets the payload pick its anchor mode.
    pub anchor_mode: Option<TransactionAnchorMode>,
}

impl TransactionConfig {
    pub fn new(network: StacksNetwork) -> TransactionConfig {
        TransactionConfig {
            network,
            chain_id: network.default_chain_id(),
            post_condition_mode: TransactionPostConditionMode::Deny,
            anchor_mode: None,
        }
    }

    pub fn mainnet() -> TransactionConfig {
        TransactionConfig::new(StacksNetwork::Mainnet)
    }

    pub fn testnet() -> TransactionConfig {
        TransactionConfig::new(StacksNetwork::Testnet)
    }

    pub fn from_config_file(config_file: TransactionConfigFile) -> TransactionConfig {
        let defaults = TransactionConfig::new(config_file.network);
        TransactionConfig {
            network: config_file.network,
            chain_id: config_file.chain_id.unwrap_or(defaults.chain_id),
            post_condition_mode: config_file
                .post_condition_mode
                .unwrap_or(defaults.post_condition_mode),
            anchor_mode: config_file.anchor_mode,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<TransactionConfig, String> {
        let config_file: TransactionConfigFile = toml::from_str(content)
            .map_err(|e| format!("unable to parse transaction config: {}", e))?;
        Ok(TransactionConfig::from_config_file(config_file))
    }

    pub fn from_path(path: &Path) -> Result<TransactionConfig, String> {
        let file = File::open(path)
            .map_err(|e| format!("unable to open {}: {}", path.display(), e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read {}: {}", path.display(), e))?;

        let config_file: TransactionConfigFile = toml::from_slice(&file_buffer[..])
            .map_err(|e| format!("unable to parse {}: {}", path.display(), e))?;
        debug!("Loaded transaction config from {}", path.display());
        Ok(TransactionConfig::from_config_file(config_file))
    }

    pub fn transaction_version(&self) -> TransactionVersion {
        self.network.transaction_version()
    }
}

impl From<TransactionVersion> for TransactionConfig {
    fn from(version: TransactionVersion) -> TransactionConfig {
        TransactionConfig::new(StacksNetwork::from(version))
    }
}
