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

//! Core data model for load balancer statistics collection
//!
//! Defines what gets requested from the provider (`MetricSpec`), the window a
//! poll cycle covers (`TimeWindow`), what comes back (`MetricResult`) and what
//! gets published downstream (`Item`).

use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix applied to every published item key
pub const ITEM_KEY_PREFIX: &str = "cloudwatch.elb.";

/// Smallest aggregation period the provider reports, in seconds
pub const MIN_PERIOD_SECONDS: u64 = 60;

/// Window length used when the configured interval is at or below the minimum period
pub const MIN_WINDOW_SECONDS: u64 = 120;

/// Longest poll interval honoured when deriving a window, in seconds
pub const MAX_INTERVAL_SECONDS: u64 = 86_400;

/// Aggregation applied by the provider to raw samples within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Sum of all samples
    Sum,
    /// Arithmetic mean of all samples
    Average,
    /// Largest sample
    Maximum,
    /// Smallest sample
    Minimum,
}

impl Statistic {
    /// Provider spelling of this statistic
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Sum => "Sum",
            Statistic::Average => "Average",
            Statistic::Maximum => "Maximum",
            Statistic::Minimum => "Minimum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (metric, statistic) pair to request per poll cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Provider metric name, e.g. `RequestCount`
    pub metric_name: String,

    /// Aggregation to request for the metric
    pub statistic: Statistic,
}

impl MetricSpec {
    /// Create a new metric spec
    pub fn new(metric_name: impl Into<String>, statistic: Statistic) -> Self {
        Self {
            metric_name: metric_name.into(),
            statistic,
        }
    }

    /// Result key for this spec: `<metric_name>.<statistic>`
    pub fn key(&self) -> String {
        format!("{}.{}", self.metric_name, self.statistic)
    }
}

/// Time range and aggregation period covered by one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start of the window
    pub start: DateTime<Utc>,

    /// Exclusive end of the window
    pub end: DateTime<Utc>,

    /// Aggregation period requested from the provider
    pub period_seconds: u64,
}

impl TimeWindow {
    /// Derive the window for a cycle ending at `end` with the configured poll interval.
    ///
    /// Intervals at or below 60 seconds are clamped to a 60 second period over a
    /// 120 second window so that a complete aggregation bucket is always covered.
    /// Longer intervals use the interval for both period and window length, up to
    /// [`MAX_INTERVAL_SECONDS`].
    pub fn ending_at(end: DateTime<Utc>, interval_seconds: u64) -> Self {
        let interval_seconds = interval_seconds.min(MAX_INTERVAL_SECONDS);
        let (period_seconds, span_seconds) = if interval_seconds <= MIN_PERIOD_SECONDS {
            (MIN_PERIOD_SECONDS, MIN_WINDOW_SECONDS)
        } else {
            (interval_seconds, interval_seconds)
        };

        Self {
            start: end - Duration::seconds(span_seconds as i64),
            end,
            period_seconds,
        }
    }

    /// Length of the window
    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Dimensions narrowing a query to one monitored resource
///
/// Ordered by dimension name so queries and logs are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSet(BTreeMap<String, String>);

impl DimensionSet {
    /// Create an empty dimension set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dimension
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`DimensionSet::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a dimension value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no dimension is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a single (metric, statistic) query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    /// The provider reported a value for the window
    Present(f64),
    /// The provider reported no data points for the window
    Absent,
}

impl Datum {
    /// Value to publish: absent data is reported as zero
    pub fn resolve(self) -> f64 {
        match self {
            Datum::Present(value) => value,
            Datum::Absent => 0.0,
        }
    }

    /// True when the provider reported no data points
    pub fn is_absent(&self) -> bool {
        matches!(self, Datum::Absent)
    }
}

impl From<Option<f64>> for Datum {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Datum::Absent, Datum::Present)
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Datum::Present(value) => serializer.serialize_f64(*value),
            Datum::Absent => serializer.serialize_none(),
        }
    }
}

/// Results of one fetch keyed by `<metric_name>.<statistic>`, in catalog order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResult {
    entries: Vec<(String, Datum)>,
}

impl MetricResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Record the outcome for a key, replacing any earlier outcome for the same key
    pub fn record(&mut self, key: String, datum: Datum) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = datum,
            None => self.entries.push((key, datum)),
        }
    }

    /// Look up the outcome for a key
    pub fn get(&self, key: &str) -> Option<Datum> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, datum)| *datum)
    }

    /// Iterate over `(key, datum)` pairs in the order they were recorded
    pub fn iter(&self) -> impl Iterator<Item = (&str, Datum)> {
        self.entries.iter().map(|(key, datum)| (key.as_str(), *datum))
    }

    /// Number of keys without data
    pub fn absent_count(&self) -> usize {
        self.entries.iter().filter(|(_, datum)| datum.is_absent()).count()
    }

    /// Number of recorded keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, datum) in &self.entries {
            map.serialize_entry(key, datum)?;
        }
        map.end()
    }
}

/// A normalized key/value record handed to the output sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    /// Namespaced key, e.g. `cloudwatch.elb.RequestCount.Sum`
    pub key: String,

    /// Published value
    pub value: f64,

    /// Host the item is reported under
    pub host: String,

    /// When the item was built
    #[serde(with = "chrono::serde::ts_seconds")]
    pub clock: DateTime<Utc>,
}

impl Item {
    /// Build an item for a result key, stamped with the current time
    pub fn new(metric_key: &str, value: f64, host: impl Into<String>) -> Self {
        Self {
            key: format!("{}{}", ITEM_KEY_PREFIX, metric_key),
            value,
            host: host.into(),
            clock: Utc::now(),
        }
    }
}
