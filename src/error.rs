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

//! Error types for the collector.
//!
//! Missing provider data is not represented here: it is a normal outcome
//! carried by [`crate::model::Datum::Absent`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by provider implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Main error type for the collector.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("Failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to metrics provider: {reason}")]
    ProviderConnect { reason: String },

    #[error("Provider query {query} failed: {source}")]
    ProviderQuery {
        query: String,
        #[source]
        source: BoxError,
    },

    #[error("Provider query {query} timed out after {timeout:?}")]
    ProviderTimeout { query: String, timeout: Duration },

    #[error("Collection cycle already in progress for {job}")]
    CycleInProgress { job: String },

    #[error("Item {key} rejected by sink: {reason}")]
    EnqueueRejected { key: String, reason: String },
}

impl CollectorError {
    /// Create a config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// True for failures reported by, or while waiting on, the metrics provider.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderConnect { .. } | Self::ProviderQuery { .. } | Self::ProviderTimeout { .. }
        )
    }
}
