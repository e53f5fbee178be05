// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use walletscan::bootstrap::run;
use walletscan::config::VERBOSE_ENV;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let verbose = std::env::var(VERBOSE_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!("Wallet analysis failed: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
