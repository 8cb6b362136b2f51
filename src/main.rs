/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use anyhow::{Context, Result};
use elb_collector::config::ElbConfig;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for the result payload
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let config_path = match config_path(env::args()) {
        Ok(path) => path,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(1);
        }
    };
    info!("Loading configuration from {}", config_path.display());

    let config = ElbConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;

    let result = elb_collector::fetch_once(&config)
        .await
        .context("Failed to fetch load balancer statistics")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Extract the single config file argument, or the usage line
fn config_path(mut args: impl Iterator<Item = String>) -> Result<PathBuf, String> {
    let program = args.next().unwrap_or_else(|| "elb-collector".to_string());
    match (args.next(), args.next()) {
        (Some(path), None) => Ok(PathBuf::from(path)),
        _ => Err(format!("Usage: {} <config-file>", program)),
    }
}
