// ============================================================================
// recast-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger backend for the `log` facade
//
// recast-core reports its progress through `log` macros. The CLI installs
// env_logger on stderr so that stdout carries only the results (scan
// reports, crop geometry, dry-run commands).
//
// USAGE:
// - default: info and above
// - --debug: debug and above, including ffmpeg output
// - RUST_LOG overrides both

use console::style;
use log::LevelFilter;
use std::io::Write;

/// Level used when `RUST_LOG` is not set.
pub fn default_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes the logger. Calling it twice is harmless.
pub fn init(debug: bool) {
    let level = default_level(debug);

    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let label = match record.level() {
                log::Level::Error => style("error:").red().bold(),
                log::Level::Warn => style("warning:").yellow(),
                log::Level::Info => style("").dim(),
                log::Level::Debug => style("debug:").blue(),
                log::Level::Trace => style("trace:").magenta(),
            };
            if record.level() == log::Level::Info {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(buf, "{} {}", label, record.args())
            }
        })
        .try_init();

    if result.is_ok() {
        log::debug!("Logger initialized with level: {}", level);
    }
}
