/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Error types for configuration, subscribers and the bootstrap runner.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading or interpreting the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file: {0}")]
    Parse(String),

    #[error("unsupported reader type: {0}")]
    UnsupportedReader(String),

    #[error("unsupported stream type: {0}")]
    UnknownStreamType(String),

    #[error("stream config does not match declared type `{stream_type}`: {source}")]
    SettingsMismatch {
        stream_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors raised by subscriber backends and the factory that builds them.
#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("connection not established")]
    NotConnected,

    #[error("failed to subscribe: {0}")]
    Subscribe(String),

    #[error("at least one topic value should be configured")]
    NoTopics,

    #[error("subscriber has already been subscribed")]
    AlreadySubscribed,

    #[error("failed to read from stream: {0}")]
    Read(String),

    #[error("unable to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("author request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("no client is linked for stream type `{0}`")]
    NotLinked(&'static str),

    #[error("unsupported broker protocol: {0}")]
    UnsupportedProtocol(String),
}

/// Outcome of a bootstrap run that did not end cleanly.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("bootstrap handler `{handler}` failed to start")]
    HandlerFailed { handler: String },

    #[error("tasks still running {0:?} after shutdown was requested")]
    GraceExceeded(Duration),
}
