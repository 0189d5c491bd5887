//! Provides functionality to set up a logging facade and print logging information for the
//! program, per §10.B.

use crate::config::Config;
use chrono::Local;
use fern::Dispatch;
pub use log::{debug, error, info, trace, warn};

/// The time format used in log messages.
const TIME_FORMAT: &str = "%y/%m/%d %H:%M:%S%.6f";

/// Sets up the logging facade: a single `stdout` sink at the configured level, with noisy HTTP
/// dependencies pinned to `Info` regardless of the global level.
pub fn setup_logging(config: &Config) -> anyhow::Result<()> {
    Dispatch::new()
        .format(move |out, msg, record| {
            out.finish(format_args!(
                "[{}] [{}] {} {}",
                Local::now().format(TIME_FORMAT),
                record.level(),
                record.target(),
                msg
            ))
        })
        .level(config.log_level.to_level_filter())
        .level_for("reqwest", log::LevelFilter::Info)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("mio", log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
