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

//! Load balancer metric catalog
//!
//! The ordered list of (metric, statistic) pairs requested on every poll
//! cycle. A metric may appear more than once with different statistics.

use crate::model::{MetricSpec, Statistic};

/// Provider namespace scoping every load balancer query
pub const ELB_NAMESPACE: &str = "AWS/ELB";

/// Dimension name for the load balancer
pub const DIMENSION_LOAD_BALANCER_NAME: &str = "LoadBalancerName";

/// Dimension name for the availability zone
pub const DIMENSION_AVAILABILITY_ZONE: &str = "AvailabilityZone";

const ELB_METRICS: &[(&str, Statistic)] = &[
    ("HealthyHostCount", Statistic::Maximum),
    ("UnhealthyHostCount", Statistic::Maximum),
    ("RequestCount", Statistic::Sum),
    ("Latency", Statistic::Maximum),
    ("Latency", Statistic::Minimum),
    ("Latency", Statistic::Average),
    ("HTTPCode_ELB_4XX", Statistic::Sum),
    ("HTTPCode_ELB_5XX", Statistic::Sum),
    ("HTTPCode_Backend_2XX", Statistic::Sum),
    ("HTTPCode_Backend_3XX", Statistic::Sum),
    ("HTTPCode_Backend_4XX", Statistic::Sum),
    ("HTTPCode_Backend_5XX", Statistic::Sum),
    ("BackendConnectionErrors", Statistic::Sum),
    ("SpilloverCount", Statistic::Sum),
];

/// The default catalog of classic load balancer metrics
pub fn elb_catalog() -> Vec<MetricSpec> {
    ELB_METRICS
        .iter()
        .map(|(name, statistic)| MetricSpec::new(*name, *statistic))
        .collect()
}
