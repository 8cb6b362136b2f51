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

//! Metric sources: the provider boundary and the statistics fetcher
//!
//! A provider hands out connections; a connection answers one statistics
//! query at a time. The fetcher drives one connection through the whole
//! catalog for a poll cycle and turns the answers into a [`MetricResult`].

use crate::catalog::ELB_NAMESPACE;
use crate::error::{BoxError, CollectorError, Result};
use crate::model::{Datum, DimensionSet, MetricResult, MetricSpec, Statistic, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub mod cloudwatch;

/// Default upper bound on a single provider query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for time-series providers that can be queried for statistics
#[async_trait]
pub trait StatisticsProvider: Send + Sync {
    /// Open a connection for one poll cycle; it is released when dropped
    async fn connect(&self) -> Result<Box<dyn StatisticsConnection>>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// An open provider connection
#[async_trait]
pub trait StatisticsConnection: Send + Sync {
    /// Fetch the data points matching a query
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery<'_>,
    ) -> std::result::Result<Vec<Datapoint>, BoxError>;
}

/// Parameters of a single statistics request
#[derive(Debug, Clone, Copy)]
pub struct StatisticsQuery<'a> {
    /// Provider namespace, e.g. `AWS/ELB`
    pub namespace: &'a str,
    /// Metric to aggregate
    pub metric_name: &'a str,
    /// Aggregation to return
    pub statistic: Statistic,
    /// Aggregation bucket length
    pub period_seconds: u64,
    /// Start of the queried range
    pub start: DateTime<Utc>,
    /// End of the queried range
    pub end: DateTime<Utc>,
    /// Resource the query is narrowed to
    pub dimensions: &'a DimensionSet,
}

impl fmt::Display for StatisticsQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.namespace, self.metric_name, self.statistic)
    }
}

/// One aggregated bucket returned by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datapoint {
    /// Start of the bucket
    pub timestamp: Option<DateTime<Utc>>,
    /// Sum of samples, when requested
    pub sum: Option<f64>,
    /// Mean of samples, when requested
    pub average: Option<f64>,
    /// Largest sample, when requested
    pub maximum: Option<f64>,
    /// Smallest sample, when requested
    pub minimum: Option<f64>,
}

impl Datapoint {
    /// A data point carrying only the given statistic
    pub fn with_value(statistic: Statistic, value: f64) -> Self {
        let mut point = Self::default();
        match statistic {
            Statistic::Sum => point.sum = Some(value),
            Statistic::Average => point.average = Some(value),
            Statistic::Maximum => point.maximum = Some(value),
            Statistic::Minimum => point.minimum = Some(value),
        }
        point
    }

    /// Value of the requested statistic, if the provider included it
    pub fn value(&self, statistic: Statistic) -> Option<f64> {
        match statistic {
            Statistic::Sum => self.sum,
            Statistic::Average => self.average,
            Statistic::Maximum => self.maximum,
            Statistic::Minimum => self.minimum,
        }
    }
}

/// Issues one query per catalog entry and collects the results
#[derive(Clone)]
pub struct StatisticsFetcher {
    provider: Arc<dyn StatisticsProvider>,
    namespace: String,
    query_timeout: Duration,
}

impl StatisticsFetcher {
    /// Create a fetcher scoped to the load balancer namespace
    pub fn new(provider: Arc<dyn StatisticsProvider>) -> Self {
        Self {
            provider,
            namespace: ELB_NAMESPACE.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Bound every query by `timeout`
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Upper bound applied to each query
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Fetch every catalog entry for the window.
    ///
    /// Queries run in catalog order over a single connection. The first
    /// provider failure or timeout aborts the fetch and no partial result is
    /// returned.
    pub async fn fetch(
        &self,
        window: &TimeWindow,
        dimensions: &DimensionSet,
        catalog: &[MetricSpec],
    ) -> Result<MetricResult> {
        let connection = self.provider.connect().await?;
        debug!("Opened {} connection", self.provider.name());

        let mut result = MetricResult::with_capacity(catalog.len());
        for spec in catalog {
            let query = StatisticsQuery {
                namespace: &self.namespace,
                metric_name: &spec.metric_name,
                statistic: spec.statistic,
                period_seconds: window.period_seconds,
                start: window.start,
                end: window.end,
                dimensions,
            };

            let pending = connection.get_metric_statistics(&query);
            let datapoints = match tokio::time::timeout(self.query_timeout, pending).await {
                Ok(Ok(datapoints)) => datapoints,
                Ok(Err(source)) => {
                    return Err(CollectorError::ProviderQuery {
                        query: query.to_string(),
                        source,
                    })
                }
                Err(_) => {
                    return Err(CollectorError::ProviderTimeout {
                        query: query.to_string(),
                        timeout: self.query_timeout,
                    })
                }
            };

            let datum = select_datum(&datapoints, spec.statistic);
            debug!("Fetched {} -> {:?} ({} data points)", query, datum, datapoints.len());
            result.record(spec.key(), datum);
        }

        info!(
            "Fetched {} statistics from {} ({} without data)",
            result.len(),
            self.provider.name(),
            result.absent_count()
        );
        Ok(result)
    }
}

/// The window holds at most one bucket, so only the first data point counts
fn select_datum(datapoints: &[Datapoint], statistic: Statistic) -> Datum {
    Datum::from(datapoints.first().and_then(|point| point.value(statistic)))
}
