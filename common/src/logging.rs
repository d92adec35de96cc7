// Structured logging setup via `fern`, matching the teacher's choice of
// fern (with the `colored` and `date-based` features) over a bare
// `env_logger` for long-running daemons.

use log::LevelFilter;
use std::str::FromStr;

pub fn init_logger(level: &str) -> Result<(), fern::InitError> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .map_err(fern::InitError::SetLoggerError)
}
