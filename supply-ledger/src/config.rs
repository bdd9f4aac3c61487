//! Configuration for the ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Fixed manufacturer identifier for this process
    pub manufacturer_id: String,

    /// Consensus configuration
    pub consensus: ConsensusConfig,

    /// Dispute resolution configuration
    pub dispute: DisputeConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Parties and validators registered at startup
    pub genesis: GenesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "supply-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            manufacturer_id: "Manufacturer_A".to_string(),
            consensus: ConsensusConfig::default(),
            dispute: DisputeConfig::default(),
            actor: ActorConfig::default(),
            genesis: GenesisConfig::default(),
        }
    }
}

/// Consensus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Coins credited to the validator of each sealed block
    pub block_reward: Decimal,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_reward: Decimal::from(5),
        }
    }
}

/// Dispute resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisputeConfig {
    /// Amount deducted from the party found at fault
    pub penalty: Decimal,
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            penalty: Decimal::from(1000),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Startup registrations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Manufacturer deposit; registers the manufacturer when set
    pub manufacturer_deposit: Option<Decimal>,

    /// Distributors with initial deposits
    pub distributors: Vec<AccountConfig>,

    /// Clients with initial deposits
    pub clients: Vec<AccountConfig>,

    /// Validator nodes with initial stakes
    pub validators: Vec<ValidatorConfig>,
}

/// Account registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Party ID
    pub id: String,
    /// Initial deposit
    pub deposit: Decimal,
}

/// Validator registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Node ID
    pub id: String,
    /// Initial stake
    pub stake: Decimal,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(id) = std::env::var("SUPPLY_LEDGER_MANUFACTURER_ID") {
            config.manufacturer_id = id;
        }

        if let Ok(reward) = std::env::var("SUPPLY_LEDGER_BLOCK_REWARD") {
            config.consensus.block_reward = parse_decimal("SUPPLY_LEDGER_BLOCK_REWARD", &reward)?;
        }

        if let Ok(penalty) = std::env::var("SUPPLY_LEDGER_PENALTY") {
            config.dispute.penalty = parse_decimal("SUPPLY_LEDGER_PENALTY", &penalty)?;
        }

        if let Ok(capacity) = std::env::var("SUPPLY_LEDGER_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("SUPPLY_LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if self.manufacturer_id.is_empty() {
            return Err(crate::Error::Config("manufacturer_id must not be empty".into()));
        }
        if self.consensus.block_reward < Decimal::ZERO {
            return Err(crate::Error::Config("block_reward must not be negative".into()));
        }
        if self.dispute.penalty < Decimal::ZERO {
            return Err(crate::Error::Config("penalty must not be negative".into()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox_capacity must be positive".into()));
        }
        Ok(())
    }
}

fn parse_decimal(name: &str, value: &str) -> crate::Result<Decimal> {
    value
        .parse()
        .map_err(|e| crate::Error::Config(format!("{}: {}", name, e)))
}
