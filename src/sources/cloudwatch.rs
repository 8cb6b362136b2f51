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

//! CloudWatch statistics provider
//!
//! Builds an SDK client per poll cycle from the configured region and static
//! credentials; the client is released with the connection.

use super::{Datapoint, StatisticsConnection, StatisticsProvider, StatisticsQuery};
use crate::config::ElbConfig;
use crate::error::{BoxError, CollectorError, Result};
use crate::model::{DimensionSet, Statistic};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::config::Credentials;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{self as cw, Dimension};
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

const CREDENTIALS_PROVIDER_NAME: &str = "elb-collector-config";

/// Provider backed by the CloudWatch `GetMetricStatistics` API
#[derive(Clone)]
pub struct CloudWatchProvider {
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl fmt::Debug for CloudWatchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudWatchProvider")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl CloudWatchProvider {
    /// Provider for `region` authenticated with static credentials
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Provider for the region and credentials in `config`
    pub fn from_config(config: &ElbConfig) -> Self {
        Self::new(
            config.region_name.as_str(),
            config.aws_access_key_id.as_str(),
            config.aws_secret_access_key.as_str(),
        )
    }
}

#[async_trait]
impl StatisticsProvider for CloudWatchProvider {
    async fn connect(&self) -> Result<Box<dyn StatisticsConnection>> {
        if self.region.is_empty() {
            return Err(CollectorError::ProviderConnect {
                reason: "region is not set".to_string(),
            });
        }

        let credentials = Credentials::new(
            self.access_key_id.as_str(),
            self.secret_access_key.as_str(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        debug!("Created CloudWatch client for region {}", self.region);
        Ok(Box::new(CloudWatchConnection {
            client: Client::new(&sdk_config),
        }))
    }

    fn name(&self) -> &str {
        "cloudwatch"
    }
}

struct CloudWatchConnection {
    client: Client,
}

#[async_trait]
impl StatisticsConnection for CloudWatchConnection {
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery<'_>,
    ) -> std::result::Result<Vec<Datapoint>, BoxError> {
        let period = i32::try_from(query.period_seconds)
            .map_err(|_| format!("period {} is out of range", query.period_seconds))?;

        let output = self
            .client
            .get_metric_statistics()
            .namespace(query.namespace)
            .metric_name(query.metric_name)
            .set_dimensions(Some(to_dimensions(query.dimensions)))
            .start_time(to_aws_time(query.start))
            .end_time(to_aws_time(query.end))
            .period(period)
            .statistics(to_cw_statistic(query.statistic))
            .send()
            .await
            .map_err(|e| DisplayErrorContext(e).to_string())?;

        Ok(output.datapoints().iter().map(from_cw_datapoint).collect())
    }
}

fn to_dimensions(dimensions: &DimensionSet) -> Vec<Dimension> {
    dimensions
        .iter()
        .map(|(name, value)| Dimension::builder().name(name).value(value).build())
        .collect()
}

fn to_aws_time(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

fn to_cw_statistic(statistic: Statistic) -> cw::Statistic {
    match statistic {
        Statistic::Sum => cw::Statistic::Sum,
        Statistic::Average => cw::Statistic::Average,
        Statistic::Maximum => cw::Statistic::Maximum,
        Statistic::Minimum => cw::Statistic::Minimum,
    }
}

fn from_cw_datapoint(point: &cw::Datapoint) -> Datapoint {
    Datapoint {
        timestamp: point
            .timestamp()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())),
        sum: point.sum(),
        average: point.average(),
        maximum: point.maximum(),
        minimum: point.minimum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_are_converted_in_name_order() {
        let dimensions = DimensionSet::new()
            .with("LoadBalancerName", "web-lb")
            .with("AvailabilityZone", "ap-northeast-1a");

        let converted = to_dimensions(&dimensions);
        let pairs: Vec<_> = converted
            .iter()
            .map(|d| (d.name().unwrap_or_default(), d.value().unwrap_or_default()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("AvailabilityZone", "ap-northeast-1a"),
                ("LoadBalancerName", "web-lb"),
            ]
        );
    }

    #[test]
    fn test_statistic_names_match_provider() {
        for statistic in [
            Statistic::Sum,
            Statistic::Average,
            Statistic::Maximum,
            Statistic::Minimum,
        ] {
            assert_eq!(to_cw_statistic(statistic).as_str(), statistic.as_str());
        }
    }

    #[test]
    fn test_datapoint_conversion() {
        let point = cw::Datapoint::builder()
            .timestamp(AwsDateTime::from_secs(1_714_564_800))
            .maximum(12.0)
            .build();

        let converted = from_cw_datapoint(&point);
        assert_eq!(converted.maximum, Some(12.0));
        assert_eq!(converted.sum, None);
        assert_eq!(
            converted.timestamp.map(|ts| ts.timestamp()),
            Some(1_714_564_800)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let provider = CloudWatchProvider::new("us-east-1", "AKIDEXAMPLE", "very-secret");
        let rendered = format!("{:?}", provider);
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
    }
}
