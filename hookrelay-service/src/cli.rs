//! Command-line conventions shared by both binaries: sysexits-style exit
//! codes, argument parsing, and the shutdown signal.

use std::process;

use clap::error::ErrorKind;
use clap::Parser;

/// Exit code for a command-line usage error.
pub const EX_USAGE: i32 = 64;
/// Exit code for an unavailable collaborator or unloadable configuration.
pub const EX_UNAVAILABLE: i32 = 69;

/// Parse arguments, exiting with [`EX_USAGE`] when they do not parse.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            process::exit(0);
        }
        Err(err) => {
            let _ = err.print();
            process::exit(EX_USAGE);
        }
    }
}

pub fn exit_usage_error(message: &str) -> ! {
    eprintln!("ERROR: {message}");
    eprintln!();
    process::exit(EX_USAGE);
}

pub fn exit_unavailable(message: &str) -> ! {
    eprintln!("ERROR: {message}");
    eprintln!();
    process::exit(EX_UNAVAILABLE);
}

/// Parse a comma-separated partition list.
pub fn parse_partition_list(raw: &str) -> Result<Vec<i32>, std::num::ParseIntError> {
    raw.split(',').map(|id| id.trim().parse()).collect()
}

/// Resolves once the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
