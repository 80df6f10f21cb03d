//! Top-level argument parsing. Grounded on the teacher's `Flags`/`Command`
//! split (`cli/src/main.rs`, `cli/src/handlers/mod.rs`): one `Parser`
//! struct carrying global flags plus a `Subcommand` enum, doc comments
//! doubling as `--help` text. Unlike the teacher there is no RPC port
//! flag to carry, since every subcommand here runs in-process.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::job::JobCommand;

#[derive(Debug, Parser)]
#[command(name = "setlist", version, about = "Assembles worship-set transitions from analyzed songs")]
pub struct Cli {
    /// Path to a TOML settings file (see `setlist_core::config::Settings`).
    /// Missing is not an error: defaults apply, then `SETLIST_`-prefixed
    /// environment variables override either source.
    #[arg(long, default_value = "setlist.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the transition between two sections to a FLAC file.
    Synthesize {
        /// Path to a JSON `SynthesizeRequest` (see `crate::synthesize`).
        request: PathBuf,
    },
    /// Submit, inspect, or list Analyze/Lrc jobs.
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_parses_request_path() {
        let cli = Cli::try_parse_from(["setlist", "synthesize", "request.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("setlist.toml"));
        assert!(matches!(cli.command, Command::Synthesize { request } if request == PathBuf::from("request.json")));
    }

    #[test]
    fn job_submit_lrc_requires_lyrics_file() {
        let cli = Cli::try_parse_from(["setlist", "job", "submit", "lrc", "http://x", "lyrics.txt"]);
        assert!(cli.is_ok());

        let missing_arg = Cli::try_parse_from(["setlist", "job", "submit", "lrc", "http://x"]);
        assert!(missing_arg.is_err());
    }

    #[test]
    fn global_config_flag_overrides_default() {
        let cli = Cli::try_parse_from(["setlist", "--config", "alt.toml", "job", "get", "abc"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
    }
}
