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

//! Backend-agnostic message envelopes.

use crate::error::SubscriberError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON wrapper published by annotating applications.
///
/// `content` is carried as an opaque JSON value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SubscribeWrapper {
    #[serde(default)]
    pub action: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub content: Value,
}

/// A decoded message travelling from a subscriber to the consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Wrapped(SubscribeWrapper),
    Raw(Vec<u8>),
}

impl StreamMessage {
    /// Decodes a JSON payload into a wrapped message.
    pub fn decode_wrapped(payload: &[u8]) -> Result<Self, SubscriberError> {
        Ok(StreamMessage::Wrapped(serde_json::from_slice(payload)?))
    }

    /// Human-readable rendering used by the console writer.
    pub fn render(&self) -> String {
        match self {
            StreamMessage::Wrapped(wrapper) => serde_json::to_string(wrapper).unwrap_or_default(),
            StreamMessage::Raw(bytes) => format!(
                "Message -- length:{} txt:{}",
                bytes.len(),
                String::from_utf8_lossy(bytes)
            ),
        }
    }
}
