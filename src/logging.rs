//! `env_logger` setup shared by both binaries

use std::io::Write;

use log::LevelFilter;

/// Initialize logging to stderr; `RUST_LOG` overrides `default_level`.
pub fn init(default_level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(default_level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
    // A second init (e.g. from tests) keeps the first logger
    let _ = builder.try_init();
}
