//! Logger initialization, in the teacher's style: a custom colored
//! formatter, an uptime clock seeded at process start, and a `RUST_LOG`
//! override that defaults to this crate's own target tree rather than
//! every dependency's logs.

use std::io::Write;
use std::time::Instant;

use log::info;
use once_cell::sync::Lazy;

/// The instant the process started caring about uptime. Forced on first use
/// of [`uptime`] or [`init_logger`].
pub static INIT_INSTANT: Lazy<Instant> = Lazy::new(Instant::now);

/// Seconds since [`INIT_INSTANT`].
#[must_use]
pub fn uptime() -> u64 {
    INIT_INSTANT.elapsed().as_secs()
}

/// Initializes the logger. Must only be called once.
pub fn init_logger(filter: log::LevelFilter) {
    let now = Lazy::force(&INIT_INSTANT);

    let mut env = String::new();
    match std::env::var("RUST_LOG") {
        Ok(e) => {
            unsafe { std::env::set_var("RUST_LOG", &e) };
            env = e;
        }
        Err(_) => unsafe { std::env::set_var("RUST_LOG", format!("off,setlist={filter}")) },
    }

    env_logger::Builder::new()
        .format(move |buf, record| {
            use env_logger::fmt::style::{AnsiColor, Color, Style};

            let (color, level) = match record.level() {
                log::Level::Debug => (AnsiColor::Blue, "D"),
                log::Level::Trace => (AnsiColor::Magenta, "T"),
                log::Level::Info => (AnsiColor::White, "I"),
                log::Level::Warn => (AnsiColor::Yellow, "W"),
                log::Level::Error => (AnsiColor::Red, "E"),
            };
            let level_style = Style::new().fg_color(Some(Color::Ansi(color))).bold();
            let dim_style = Style::new().dimmed();

            let uptime = format!("{: >9.3}", now.elapsed().as_secs_f32());
            let file = format!("{: >35}", record.file_static().unwrap_or("???"));
            let line = format!("{: <3}", record.line().unwrap_or(0));

            writeln!(
                buf,
                "| {}{}{} | {}{}{} | {}{}{} @ {}{}{} | {}",
                level_style.render(),
                level,
                level_style.render_reset(),
                dim_style.render(),
                uptime,
                dim_style.render_reset(),
                dim_style.render(),
                file,
                dim_style.render_reset(),
                dim_style.render(),
                line,
                dim_style.render_reset(),
                record.args(),
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .parse_default_env()
        .init();

    if env.is_empty() {
        info!("Log Level (Flag) ... {filter}");
    } else {
        info!("Log Level (RUST_LOG) ... {env}");
    }
}
