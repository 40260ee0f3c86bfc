use std::io::{self, Write};

use flexi_logger::writers::FileLogWriter;
use flexi_logger::{
    colored_opt_format, Age, Cleanup, Criterion, DeferredNow, Duplicate, Logger, Naming, ReconfigurationHandle,
};
use log::{Level, Record};
use once_cell::sync::OnceCell;

use crate::core::bot_config::Logging;
use crate::error::StartupError;
use crate::keeper_error;
use crate::utils::Emoji;

static LOGGER_HANDLE: OnceCell<ReconfigurationHandle> = OnceCell::new();

pub fn initialize(config: &Logging) -> Result<(), StartupError> {
    // status lines for operators, routed here by the keeper_* macros
    let operator = FileLogWriter::builder()
        .discriminant("operator")
        .directory(&config.directory)
        .format(operator_format)
        .suppress_timestamp()
        .try_build()?;

    let logger = Logger::with_env_or_str(&config.level)
        .duplicate_to_stderr(Duplicate::Info)
        .log_to_file()
        .directory(&config.directory)
        .format(colored_opt_format)
        .o_timestamp(true)
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndZipFiles(10, 30),
        )
        .add_writer("operator", Box::new(operator));

    let handle = match &config.spec_file {
        Some(spec_file) => logger.start_with_specfile(spec_file)?,
        None => logger.start()?,
    };

    if LOGGER_HANDLE.set(handle).is_err() {
        keeper_error!("The logging system was attempted to be initalized a second time!");
    }

    Ok(())
}

fn operator_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> Result<(), io::Error> {
    write!(
        w,
        "``[{}]`` {} {}",
        now.now().format("%Y-%m-%d %H:%M:%S"),
        get_emoji(record.level()).for_chat(),
        record.args()
    )
}

fn get_emoji(level: Level) -> Emoji {
    match level {
        Level::Error => Emoji::No,
        Level::Warn => Emoji::Warn,
        _ => Emoji::Info,
    }
}

#[macro_use]
pub mod macros {
    #[macro_export]
    macro_rules! keeper_info {
        ($($arg:tt)*) => (
            log::info!(target: "{operator,_Default}", $($arg)*);
        )
    }

    /// Startup and shutdown milestones.
    #[macro_export]
    macro_rules! keeper_important {
        ($($arg:tt)*) => (
            log::info!(target: "{operator,_Default}", $($arg)*);
        )
    }

    #[macro_export]
    macro_rules! keeper_warn {
        ($($arg:tt)*) => (
            log::warn!(target: "{operator,_Default}", $($arg)*);
        )
    }

    #[macro_export]
    macro_rules! keeper_error {
        ($($arg:tt)*) => (
            log::error!(target: "{operator,_Default}", $($arg)*);
        )
    }
}
