use std::fmt::Formatter;
use std::{error, fmt, io};

use crate::gateway::EventCategory;

#[derive(Debug)]
pub enum StartupError {
    NoConfig(io::Error),
    InvalidConfig(toml::de::Error),
    Logging(flexi_logger::FlexiLoggerError),
    Metrics(prometheus::Error),
    Signal(ctrlc::Error),
    Replay(serde_json::Error),
    DuplicatePlugin(String),
    DuplicateConfigKey(String),
    DuplicateCommand { name: String, plugin: String },
    PluginSetup { plugin: String, error: PluginError },
    AlreadyStarted,
    Io(io::Error),
}

impl error::Error for StartupError {}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::NoConfig(e) => write!(f, "Unable to read the config file: {}", e),
            StartupError::InvalidConfig(e) => write!(f, "The config file is invalid: {}", e),
            StartupError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            StartupError::Metrics(e) => write!(f, "Failed to set up metrics: {}", e),
            StartupError::Signal(e) => write!(f, "Failed to install the shutdown handler: {}", e),
            StartupError::Replay(e) => write!(f, "Failed to parse the replay script: {}", e),
            StartupError::DuplicatePlugin(name) => write!(f, "A plugin named {} is already registered", name),
            StartupError::DuplicateConfigKey(key) => {
                write!(f, "The guild configuration key {} is registered twice", key)
            }
            StartupError::DuplicateCommand { name, plugin } => {
                write!(f, "Command {} is already provided by plugin {}", name, plugin)
            }
            StartupError::PluginSetup { plugin, error } => write!(f, "Setup failed for plugin {}: {}", plugin, error),
            StartupError::AlreadyStarted => write!(f, "The bot was already started"),
            StartupError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl From<io::Error> for StartupError {
    fn from(e: io::Error) -> Self {
        StartupError::Io(e)
    }
}

impl From<prometheus::Error> for StartupError {
    fn from(e: prometheus::Error) -> Self {
        StartupError::Metrics(e)
    }
}

impl From<flexi_logger::FlexiLoggerError> for StartupError {
    fn from(e: flexi_logger::FlexiLoggerError) -> Self {
        StartupError::Logging(e)
    }
}

#[derive(Debug)]
pub enum GatewayError {
    Lagged { shard: u64, skipped: u64 },
}

impl error::Error for GatewayError {}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Lagged { shard, skipped } => {
                write!(f, "Subscription for shard {} fell behind and skipped {} events", shard, skipped)
            }
        }
    }
}

/// A shard did not receive its expected guilds before the sync deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTimeout {
    pub shard: u64,
    pub expected: usize,
    pub arrived: usize,
}

impl error::Error for ReadinessTimeout {}

impl fmt::Display for ReadinessTimeout {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to load guilds of shard {} in time ({}/{} arrived)",
            self.shard, self.arrived, self.expected
        )
    }
}

#[derive(Debug)]
pub enum EventHandlerError {
    Gateway(GatewayError),
    Log(LogError),
    ReadinessTimeout(ReadinessTimeout),
    WorkerGone(EventCategory),
}

impl error::Error for EventHandlerError {}

impl fmt::Display for EventHandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EventHandlerError::Gateway(e) => write!(f, "Gateway error: {}", e),
            EventHandlerError::Log(e) => write!(f, "Failed to write to the operator log: {}", e),
            EventHandlerError::ReadinessTimeout(e) => write!(f, "{}", e),
            EventHandlerError::WorkerGone(category) => {
                write!(f, "The {} worker is no longer accepting events", category)
            }
        }
    }
}

impl From<GatewayError> for EventHandlerError {
    fn from(e: GatewayError) -> Self {
        EventHandlerError::Gateway(e)
    }
}

impl From<LogError> for EventHandlerError {
    fn from(e: LogError) -> Self {
        EventHandlerError::Log(e)
    }
}

impl From<ReadinessTimeout> for EventHandlerError {
    fn from(e: ReadinessTimeout) -> Self {
        EventHandlerError::ReadinessTimeout(e)
    }
}

#[derive(Debug)]
pub enum LogError {
    Closed,
    Other(String),
}

impl error::Error for LogError {}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogError::Closed => write!(f, "the log sink is closed"),
            LogError::Other(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
pub enum DatabaseError {
    Serializing(serde_json::Error),
    Deserializing(serde_json::Error),
    Unavailable(String),
}

impl error::Error for DatabaseError {}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::Serializing(e) => write!(f, "Failed to serialize: {}", e),
            DatabaseError::Deserializing(e) => write!(f, "Failed to deserialize: {}", e),
            DatabaseError::Unavailable(e) => write!(f, "Database unavailable: {}", e),
        }
    }
}

#[derive(Debug)]
pub enum PropertyError {
    Missing(String),
    Invalid { key: String, value: String },
}

impl error::Error for PropertyError {}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::Missing(key) => write!(f, "Missing property {}", key),
            PropertyError::Invalid { key, value } => write!(f, "Invalid value ``{}`` for property {}", value, key),
        }
    }
}

#[derive(Debug)]
pub enum PluginError {
    Database(DatabaseError),
    Property(PropertyError),
    Io(io::Error),
    Other(String),
}

impl error::Error for PluginError {}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Database(e) => write!(f, "Database failure: {}", e),
            PluginError::Property(e) => write!(f, "Property error: {}", e),
            PluginError::Io(e) => write!(f, "IO error: {}", e),
            PluginError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl From<DatabaseError> for PluginError {
    fn from(e: DatabaseError) -> Self {
        PluginError::Database(e)
    }
}

impl From<PropertyError> for PluginError {
    fn from(e: PropertyError) -> Self {
        PluginError::Property(e)
    }
}

impl From<io::Error> for PluginError {
    fn from(e: io::Error) -> Self {
        PluginError::Io(e)
    }
}

/// Rejected configuration input. The reason is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        ValidationError { reason: reason.into() }
    }
}

impl error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownKey(String),
    Validation(ValidationError),
    Database(DatabaseError),
}

impl error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey(key) => write!(f, "There is no configuration entry named ``{}``", key),
            ConfigError::Validation(e) => write!(f, "{}", e),
            ConfigError::Database(e) => write!(f, "Unable to save the configuration: {}", e),
        }
    }
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        ConfigError::Validation(e)
    }
}

impl From<DatabaseError> for ConfigError {
    fn from(e: DatabaseError) -> Self {
        ConfigError::Database(e)
    }
}
