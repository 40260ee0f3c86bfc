pub use bot::{Bot, BotServices, Running};
pub use bot_config::BotConfig;
pub use guild_settings::GuildSettings;

mod bot;
pub mod bot_config;
mod guild_settings;
pub mod lifecycle;
pub mod log_sink;
pub mod logging;
pub mod pipeline;
pub mod roles;
pub mod stats;
