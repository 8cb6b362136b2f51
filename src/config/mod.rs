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

//! Configuration parsing and validation
//!
//! Loads the collector options from JSON. Option names follow the host
//! framework's plugin section (`region_name`, `load_balancer_name`, ...).

use crate::catalog::{self, DIMENSION_AVAILABILITY_ZONE, DIMENSION_LOAD_BALANCER_NAME};
use crate::error::{CollectorError, Result};
use crate::model::{DimensionSet, MetricSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use crate::model::MAX_INTERVAL_SECONDS;

/// Collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElbConfig {
    /// Provider region, e.g. `ap-northeast-1`
    pub region_name: String,

    /// Static access key id
    pub aws_access_key_id: String,

    /// Static secret access key
    pub aws_secret_access_key: String,

    /// Load balancer to query
    pub load_balancer_name: String,

    /// Availability zone to query
    pub availability_zone: String,

    /// Host every item is reported under; only needed to publish items
    #[serde(default)]
    pub hostname: String,

    /// Poll interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Upper bound on a single provider query
    #[serde(default = "default_query_timeout", with = "duration_serde")]
    pub query_timeout: Duration,

    /// Metrics to request; the load balancer catalog when omitted
    #[serde(default = "catalog::elb_catalog")]
    pub metrics: Vec<MetricSpec>,
}

impl ElbConfig {
    /// Load and validate configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| CollectorError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string and check the fetch options
    ///
    /// `hostname` is checked later by [`ElbConfig::validate`], when a job that
    /// publishes items is built.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CollectorError::config(format!("failed to parse configuration: {}", e)))?;
        config.validate_fetch()?;
        Ok(config)
    }

    /// Check every option needed to collect and publish items
    pub fn validate(&self) -> Result<()> {
        self.validate_fetch()?;
        require("hostname", &self.hostname)
    }

    /// Check the options needed to query the provider
    pub fn validate_fetch(&self) -> Result<()> {
        require("region_name", &self.region_name)?;
        require("aws_access_key_id", &self.aws_access_key_id)?;
        require("aws_secret_access_key", &self.aws_secret_access_key)?;
        require("load_balancer_name", &self.load_balancer_name)?;
        require("availability_zone", &self.availability_zone)?;

        if self.interval > MAX_INTERVAL_SECONDS {
            return Err(CollectorError::config(format!(
                "interval must be at most {} seconds, got {}",
                MAX_INTERVAL_SECONDS, self.interval
            )));
        }

        if self.query_timeout.is_zero() {
            return Err(CollectorError::config("query_timeout must be positive"));
        }

        if self.metrics.is_empty() {
            return Err(CollectorError::config("metrics must not be empty"));
        }
        if let Some(spec) = self.metrics.iter().find(|spec| spec.metric_name.trim().is_empty()) {
            return Err(CollectorError::config(format!(
                "metric name must not be empty (statistic {})",
                spec.statistic
            )));
        }

        Ok(())
    }

    /// Dimensions identifying the configured load balancer
    pub fn dimensions(&self) -> DimensionSet {
        DimensionSet::new()
            .with(DIMENSION_LOAD_BALANCER_NAME, self.load_balancer_name.as_str())
            .with(DIMENSION_AVAILABILITY_ZONE, self.availability_zone.as_str())
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CollectorError::config(format!("{} must not be empty", name)));
    }
    Ok(())
}

// Default value functions
fn default_interval() -> u64 {
    300
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helpers
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // ISO-8601 duration format (PT1.5S)
        let iso_duration = format!("PT{}S", duration.as_secs_f64());
        serializer.serialize_str(&iso_duration)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let seconds_str = s
            .strip_prefix("PT")
            .and_then(|rest| rest.strip_suffix('S'))
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid duration format: {}", s)))?;
        let seconds: f64 = seconds_str.parse().map_err(serde::de::Error::custom)?;

        Duration::try_from_secs_f64(seconds).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Statistic;

    const MINIMAL: &str = r#"
    {
        "region_name": "ap-northeast-1",
        "aws_access_key_id": "AKIDEXAMPLE",
        "aws_secret_access_key": "secret",
        "load_balancer_name": "web-lb",
        "availability_zone": "ap-northeast-1a",
        "hostname": "web-lb.example.com"
    }
    "#;

    #[test]
    fn test_config_defaults() {
        let config = ElbConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.interval, 300);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.metrics, catalog::elb_catalog());
        assert_eq!(config.hostname, "web-lb.example.com");
    }

    #[test]
    fn test_config_overrides() {
        let json = r#"
        {
            "region_name": "us-east-1",
            "aws_access_key_id": "AKIDEXAMPLE",
            "aws_secret_access_key": "secret",
            "load_balancer_name": "api-lb",
            "availability_zone": "us-east-1b",
            "hostname": "api",
            "interval": 3,
            "query_timeout": "PT5.5S",
            "metrics": [{"metric_name": "RequestCount", "statistic": "Sum"}]
        }
        "#;

        let config = ElbConfig::from_json(json).unwrap();
        assert_eq!(config.interval, 3);
        assert_eq!(config.query_timeout, Duration::from_secs_f64(5.5));
        assert_eq!(
            config.metrics,
            vec![MetricSpec::new("RequestCount", Statistic::Sum)]
        );
    }

    #[test]
    fn test_dimensions() {
        let config = ElbConfig::from_json(MINIMAL).unwrap();
        let dimensions = config.dimensions();
        assert_eq!(dimensions.len(), 2);
        assert_eq!(dimensions.get("LoadBalancerName"), Some("web-lb"));
        assert_eq!(dimensions.get("AvailabilityZone"), Some("ap-northeast-1a"));
    }

    #[test]
    fn test_missing_required_option() {
        let json = r#"{"region_name": "us-east-1", "hostname": "h"}"#;
        let err = ElbConfig::from_json(json).unwrap_err();
        assert!(matches!(err, CollectorError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_empty_required_option() {
        let json = MINIMAL.replace("\"web-lb\"", "\"  \"");
        let err = ElbConfig::from_json(&json).unwrap_err();
        match err {
            CollectorError::ConfigInvalid { reason } => {
                assert!(reason.contains("load_balancer_name"), "{}", reason)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hostname_only_required_for_publishing() {
        let json = MINIMAL.replace("\"hostname\": \"web-lb.example.com\"", "\"interval\": 3");
        let config = ElbConfig::from_json(&json).unwrap();
        assert!(config.hostname.is_empty());
        assert!(config.validate_fetch().is_ok());

        match config.validate().unwrap_err() {
            CollectorError::ConfigInvalid { reason } => {
                assert!(reason.contains("hostname"), "{}", reason)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let mut config = ElbConfig::from_json(MINIMAL).unwrap();
        config.interval = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(CollectorError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_invalid_timeout_format() {
        let json = MINIMAL.replace(
            "\"hostname\"",
            "\"query_timeout\": \"30 seconds\", \"hostname\"",
        );
        assert!(matches!(
            ElbConfig::from_json(&json),
            Err(CollectorError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_empty_metric_list_rejected() {
        let json = MINIMAL.replace("\"hostname\"", "\"metrics\": [], \"hostname\"");
        assert!(matches!(
            ElbConfig::from_json(&json),
            Err(CollectorError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ElbConfig::from_file("/nonexistent/elb-collector.json").unwrap_err();
        assert!(matches!(err, CollectorError::ConfigRead { .. }));
    }
}
