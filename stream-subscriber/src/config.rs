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

//! Application configuration model and file readers.
//!
//! The stream section is kept untyped (`type` tag plus raw `config` object) until
//! [`StreamInfo::settings`] turns it into a [`StreamSettings`] variant, so a payload
//! that does not match its declared type is reported as an error at construction.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MESSAGE_QUEUE_SIZE: usize = 1;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_MIN_LOG_LEVEL: &str = "info";
const SECRET_FIELDS: [&str; 2] = ["password", "psk"];
const REDACTED: &str = "***";

/// Root node for configuration.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    pub stream: StreamInfo,
    #[serde(default)]
    pub logging: LoggingInfo,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl ApplicationConfig {
    /// Renders the configuration as compact JSON, e.g. for a startup log line.
    ///
    /// Broker passwords and channel pre-shared keys are masked.
    pub fn as_string(&self) -> String {
        let mut redacted = self.clone();
        if let Value::Object(fields) = &mut redacted.stream.config {
            for name in SECRET_FIELDS {
                if let Some(value) = fields.get_mut(name) {
                    if !value.is_null() {
                        *value = Value::String(REDACTED.to_string());
                    }
                }
            }
        }
        serde_json::to_string(&redacted).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()?;
        self.stream.settings()?;
        Ok(())
    }
}

/// Declared backend plus its backend-specific settings payload.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StreamInfo {
    #[serde(rename = "type")]
    pub stream_type: String,
    #[serde(default)]
    pub config: Value,
}

impl StreamInfo {
    pub fn new(stream_type: impl Into<String>, config: Value) -> Self {
        Self {
            stream_type: stream_type.into(),
            config,
        }
    }

    /// Resolves the declared type and decodes the payload into the matching settings.
    pub fn settings(&self) -> Result<StreamSettings, ConfigError> {
        let stream_type: StreamType = self.stream_type.parse()?;
        let mismatch = |source| ConfigError::SettingsMismatch {
            stream_type: self.stream_type.clone(),
            source,
        };

        match stream_type {
            StreamType::Iota => serde_json::from_value(self.config.clone())
                .map(StreamSettings::Iota)
                .map_err(mismatch),
            StreamType::Mqtt => serde_json::from_value(self.config.clone())
                .map(StreamSettings::Mqtt)
                .map_err(mismatch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Iota,
    Mqtt,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Iota => "iota",
            StreamType::Mqtt => "mqtt",
        }
    }
}

impl FromStr for StreamType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iota" => Ok(StreamType::Iota),
            "mqtt" => Ok(StreamType::Mqtt),
            other => Err(ConfigError::UnknownStreamType(other.to_string())),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, backend-specific settings.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSettings {
    Iota(IotaStreamConfig),
    Mqtt(MqttConfig),
}

impl StreamSettings {
    pub fn stream_type(&self) -> StreamType {
        match self {
            StreamSettings::Iota(_) => StreamType::Iota,
            StreamSettings::Mqtt(_) => StreamType::Mqtt,
        }
    }
}

/// Network location of a service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceInfo {
    pub host: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub port: u16,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

impl ServiceInfo {
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MqttConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub provider: ServiceInfo,
    #[serde(default)]
    pub cleanness: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IotaStreamConfig {
    /// Author endpoint that hands out the announcement and accepts subscriptions.
    pub provider: ServiceInfo,
    #[serde(rename = "tangle")]
    pub tangle_node: ServiceInfo,
    #[serde(default)]
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoggingInfo {
    #[serde(default = "default_min_log_level")]
    pub min_log_level: String,
}

fn default_min_log_level() -> String {
    DEFAULT_MIN_LOG_LEVEL.to_string()
}

impl Default for LoggingInfo {
    fn default() -> Self {
        Self {
            min_log_level: default_min_log_level(),
        }
    }
}

/// Knobs for the bootstrap pipeline itself.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub message_queue_size: usize,
    pub connect_timeout_ms: u64,
    pub poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_grace_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            message_queue_size: DEFAULT_MESSAGE_QUEUE_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            shutdown_grace_ms: None,
        }
    }
}

impl RuntimeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Option<Duration> {
        self.shutdown_grace_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.messageQueueSize",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Hydrates an [`ApplicationConfig`] from a file.
pub trait ConfigReader {
    fn read(&self, path: &Path) -> Result<ApplicationConfig, ConfigError>;
}

pub struct JsonReader;

impl ConfigReader for JsonReader {
    fn read(&self, path: &Path) -> Result<ApplicationConfig, ConfigError> {
        let contents = read_file(path)?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

pub struct Json5Reader;

impl ConfigReader for Json5Reader {
    fn read(&self, path: &Path) -> Result<ApplicationConfig, ConfigError> {
        let contents = read_file(path)?;
        json5::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the extension of `path`, or the bare file name when it has none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn new_reader(reader_type: &str) -> Result<Box<dyn ConfigReader>, ConfigError> {
    match reader_type {
        "json" => Ok(Box::new(JsonReader)),
        "json5" => Ok(Box::new(Json5Reader)),
        other => Err(ConfigError::UnsupportedReader(other.to_string())),
    }
}

/// Picks a reader from the file extension and decodes the file.
pub fn load(path: impl AsRef<Path>) -> Result<ApplicationConfig, ConfigError> {
    let path = path.as_ref();
    let reader = new_reader(&file_extension(path))?;
    reader.read(path)
}
