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

//! Poll-cycle orchestration
//!
//! A [`CollectionJob`] runs one cycle at a time: derive the window, fetch the
//! catalog, resolve absent data to zero, build one item per catalog entry and
//! offer each item to the sink.

use crate::config::ElbConfig;
use crate::error::{CollectorError, Result};
use crate::model::{Datum, DimensionSet, Item, MetricResult, MetricSpec, TimeWindow};
use crate::sinks::ItemSink;
use crate::sources::{StatisticsFetcher, StatisticsProvider};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Something an external scheduler can poll once per tick
#[async_trait]
pub trait Collector: Send + Sync {
    /// Run one fetch and return the normalized items
    async fn collect(&self) -> Result<Vec<Item>>;

    /// Get the name of this collector
    fn name(&self) -> &str;
}

/// Outcome of publishing one cycle's items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items accepted by the sink
    pub published: usize,
    /// Items the sink refused
    pub dropped: usize,
}

/// Collects load balancer statistics and publishes them to a sink
pub struct CollectionJob {
    name: String,
    fetcher: StatisticsFetcher,
    sink: Arc<dyn ItemSink>,
    catalog: Vec<MetricSpec>,
    dimensions: DimensionSet,
    hostname: String,
    interval: u64,
    in_flight: AtomicBool,
}

impl CollectionJob {
    /// Create a job for the load balancer described by `config`
    ///
    /// Fails with [`CollectorError::ConfigInvalid`] when `config` does not
    /// pass [`ElbConfig::validate`].
    pub fn new(
        config: &ElbConfig,
        provider: Arc<dyn StatisticsProvider>,
        sink: Arc<dyn ItemSink>,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = StatisticsFetcher::new(provider).with_query_timeout(config.query_timeout);

        Ok(Self {
            name: format!("elb:{}", config.load_balancer_name),
            fetcher,
            sink,
            catalog: config.metrics.clone(),
            dimensions: config.dimensions(),
            hostname: config.hostname.clone(),
            interval: config.interval,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Metrics requested on every cycle, in publishing order
    pub fn catalog(&self) -> &[MetricSpec] {
        &self.catalog
    }

    /// Configured poll interval in seconds
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// True while a cycle is running on this job
    pub fn is_collecting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch and normalize the catalog for an explicit window
    pub async fn collect_window(&self, window: &TimeWindow) -> Result<Vec<Item>> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.name)?;

        debug!(
            "Collecting {} statistics for {} from {} to {} (period {}s)",
            self.catalog.len(),
            self.name,
            window.start,
            window.end,
            window.period_seconds
        );
        let result = self
            .fetcher
            .fetch(window, &self.dimensions, &self.catalog)
            .await?;

        Ok(self.build_items(&result))
    }

    /// One item per catalog entry, in catalog order
    fn build_items(&self, result: &MetricResult) -> Vec<Item> {
        self.catalog
            .iter()
            .map(|spec| {
                let key = spec.key();
                let datum = result.get(&key).unwrap_or(Datum::Absent);
                Item::new(&key, datum.resolve(), self.hostname.as_str())
            })
            .collect()
    }

    /// Offer every item to the sink; rejected items are dropped and counted
    pub fn publish(&self, items: Vec<Item>) -> CycleReport {
        let mut report = CycleReport::default();

        for item in items {
            let (key, value) = (item.key.clone(), item.value);
            match self.sink.enqueue(item) {
                Ok(()) => {
                    debug!("Inserted to {} sink {}:{}", self.sink.name(), key, value);
                    report.published += 1;
                }
                Err(err) => {
                    warn!("{}", CollectorError::from(err));
                    report.dropped += 1;
                }
            }
        }

        report
    }

    /// Collect for the current time and publish the result
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let items = self.collect().await?;
        let report = self.publish(items);

        info!(
            "Cycle for {} complete: {} published, {} dropped",
            self.name, report.published, report.dropped
        );
        Ok(report)
    }
}

#[async_trait]
impl Collector for CollectionJob {
    async fn collect(&self) -> Result<Vec<Item>> {
        let window = TimeWindow::ending_at(Utc::now(), self.interval);
        self.collect_window(&window).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Marks a job busy for the lifetime of one cycle
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, job: &str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CollectorError::CycleInProgress {
                job: job.to_string(),
            })?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
