// SPDX-License-Identifier: MIT OR Apache-2.0

use std::process::ExitCode;

use knx_scan_rs::{
    cfg::{cli::Cli, config::ScanConfig, enums::Verbosity, logger},
    error::ScanError,
    scanner::Scanner,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit codes per spec §6: 0 success, 1 usage/config error or every target
/// unreachable, 2 missing privileges for `--search`'s multicast bind.
const EXIT_OK: u8 = 0;
const EXIT_CONFIG: u8 = 1;
const EXIT_PRIVILEGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    if let Err(e) = logger::init_logger(verbosity) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let config = match ScanConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let cancellation = CancellationToken::new();
    let ctrl_c = cancellation.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received interrupt, cancelling outstanding scans");
        ctrl_c.cancel();
    });

    let scanner = Scanner::new(config);
    let results = match scanner.run(cancellation).await {
        Ok(results) => results,
        Err(ScanError::Transport(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!(error = %e, "insufficient privileges for multicast search");
            return ExitCode::from(EXIT_PRIVILEGE);
        },
        Err(e) => {
            error!(error = %e, "scan failed");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let total = results.len();
    let succeeded = results.iter().filter(|r| r.success).count();
    info!(total, succeeded, "scan complete");
    for result in &results {
        if result.success {
            println!("{}: ok", result.target);
        } else {
            println!("{}: {}", result.target, result.error.as_deref().unwrap_or("unknown error"));
        }
    }

    if total > 0 && succeeded == 0 { ExitCode::from(EXIT_CONFIG) } else { ExitCode::from(EXIT_OK) }
}
