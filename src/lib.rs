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

//! # ELB Collector
//!
//! Polls AWS CloudWatch for Elastic Load Balancer statistics and publishes
//! one normalized key/value item per catalog entry on every poll cycle.
//!
//! ## Features
//!
//! - **Ordered catalog**: each (metric, statistic) pair is queried once per cycle
//! - **Window clamping**: short intervals still cover a full provider bucket
//! - **Explicit normalization**: missing data is published as zero
//! - **Non-blocking output**: a full sink drops items instead of stalling the poll
//!
//! ## Example
//!
//! ```rust,no_run
//! use elb_collector::config::ElbConfig;
//! use elb_collector::sinks::ChannelSink;
//! use elb_collector::sources::cloudwatch::CloudWatchProvider;
//! use elb_collector::CollectionJob;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ElbConfig::from_file("elb.json")?;
//!     let (sink, mut items) = ChannelSink::bounded(1024);
//!     let job = CollectionJob::new(
//!         &config,
//!         Arc::new(CloudWatchProvider::from_config(&config)),
//!         Arc::new(sink),
//!     )?;
//!     job.run_cycle().await?;
//!     while let Ok(item) = items.try_recv() {
//!         println!("{} {} {}", item.host, item.key, item.value);
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use tracing::info;

pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod model;
pub mod sinks;
pub mod sources;

pub use collection::{CollectionJob, Collector, CycleReport};
pub use error::{CollectorError, Result};

use config::ElbConfig;
use model::{MetricResult, TimeWindow};
use sources::cloudwatch::CloudWatchProvider;
use sources::{StatisticsFetcher, StatisticsProvider};

/// Run a single fetch against CloudWatch and return the raw results.
///
/// Used to check connectivity and credentials outside the host scheduler.
pub async fn fetch_once(config: &ElbConfig) -> Result<MetricResult> {
    config.validate_fetch()?;
    let provider: Arc<dyn StatisticsProvider> = Arc::new(CloudWatchProvider::from_config(config));
    fetch_with(config, provider).await
}

/// Single fetch against an arbitrary provider
///
/// `hostname` is not needed here; the other options are checked with
/// [`ElbConfig::validate_fetch`] before the provider is contacted.
pub async fn fetch_with(
    config: &ElbConfig,
    provider: Arc<dyn StatisticsProvider>,
) -> Result<MetricResult> {
    config.validate_fetch()?;
    let window = TimeWindow::ending_at(chrono::Utc::now(), config.interval);
    info!(
        "Fetching {} statistics for {} ({}s period)",
        config.metrics.len(),
        config.load_balancer_name,
        window.period_seconds
    );

    StatisticsFetcher::new(provider)
        .with_query_timeout(config.query_timeout)
        .fetch(&window, &config.dimensions(), &config.metrics)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Datum, Statistic};
    use crate::sources::testing::StubProvider;

    #[tokio::test]
    async fn test_fetch_with_returns_raw_results() {
        let config = ElbConfig::from_json(
            r#"{
                "region_name": "ap-northeast-1",
                "aws_access_key_id": "AKIDEXAMPLE",
                "aws_secret_access_key": "secret",
                "load_balancer_name": "web-lb",
                "availability_zone": "ap-northeast-1a",
                "hostname": "web-lb.example.com",
                "interval": 3
            }"#,
        )
        .unwrap();
        let provider = StubProvider::new().value("UnhealthyHostCount.Maximum", Statistic::Maximum, 1.0);

        let result = fetch_with(&config, Arc::new(provider)).await.unwrap();

        assert_eq!(result.len(), 14);
        assert_eq!(result.get("UnhealthyHostCount.Maximum"), Some(Datum::Present(1.0)));
        assert_eq!(result.get("SpilloverCount.Sum"), Some(Datum::Absent));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["UnhealthyHostCount.Maximum"], 1.0);
        assert!(json["SpilloverCount.Sum"].is_null());
    }

    #[tokio::test]
    async fn test_fetch_without_hostname() {
        let config = ElbConfig::from_json(
            r#"{
                "region_name": "ap-northeast-1",
                "aws_access_key_id": "AKIDEXAMPLE",
                "aws_secret_access_key": "secret",
                "load_balancer_name": "web-lb",
                "availability_zone": "ap-northeast-1a",
                "interval": 3
            }"#,
        )
        .unwrap();
        let provider = StubProvider::new();

        let result = fetch_with(&config, Arc::new(provider.clone())).await.unwrap();

        assert_eq!(result.len(), 14);
        assert_eq!(provider.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_unvalidated_config() {
        let mut config = ElbConfig::from_json(
            r#"{
                "region_name": "ap-northeast-1",
                "aws_access_key_id": "AKIDEXAMPLE",
                "aws_secret_access_key": "secret",
                "load_balancer_name": "web-lb",
                "availability_zone": "ap-northeast-1a"
            }"#,
        )
        .unwrap();
        config.interval = u64::MAX;
        let provider = StubProvider::new();

        let err = fetch_with(&config, Arc::new(provider.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::ConfigInvalid { .. }));
        assert_eq!(provider.connections_opened(), 0);
        assert!(provider.queries().is_empty());
    }
}
