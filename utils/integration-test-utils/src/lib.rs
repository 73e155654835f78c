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

//! Fakes and helpers shared by the `stream-subscriber` integration tests.

mod collecting_sink;
pub use collecting_sink::CollectingSink;
mod fake_mqtt;
pub use fake_mqtt::{FakeMqttBroker, FakeMqttTransport};
mod fake_streams;
pub use fake_streams::{FakeAuthor, FakeStreamsClient};

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer `tracing` subscriber once per test binary; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Encodes a wrapper payload the way annotating publishers do.
pub fn wrapped_payload(action: &str, message_type: &str, content: Value) -> Vec<u8> {
    json!({ "action": action, "type": message_type, "content": content })
        .to_string()
        .into_bytes()
}
