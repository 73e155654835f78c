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

use integration_test_utils::CollectingSink;
use serde_json::{json, Value};
use std::time::Duration;
use stream_subscriber::bootstrap::{Bootstrap, BootstrapHandler};
use stream_subscriber::config::StreamInfo;
use stream_subscriber::error::BootstrapError;
use stream_subscriber::factory::SubscriberFactory;
use stream_subscriber::handlers::{MessageConsumer, Subscription};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub(crate) fn mqtt_stream(topics: &[&str], qos: u8) -> StreamInfo {
    StreamInfo::new(
        "mqtt",
        json!({
            "clientId": "integration",
            "qos": qos,
            "provider": { "host": "localhost", "protocol": "tcp", "port": 1883 },
            "cleanness": true,
            "topics": topics,
        }),
    )
}

#[allow(dead_code)]
pub(crate) fn iota_stream(psk: Option<&str>) -> StreamInfo {
    let mut config = json!({
        "provider": { "host": "localhost", "protocol": "http", "port": 8900 },
        "tangle": { "host": "localhost", "protocol": "http", "port": 14265 },
        "encoding": "utf-8",
    });
    if let (Some(psk), Value::Object(fields)) = (psk, &mut config) {
        fields.insert("psk".to_string(), Value::String(psk.to_string()));
    }
    StreamInfo::new("iota", config)
}

/// A bootstrap run on its own task, with a test-controlled interrupt.
pub(crate) struct RunningPipeline {
    interrupt: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), BootstrapError>>,
}

impl RunningPipeline {
    pub(crate) fn interrupt(&mut self) {
        if let Some(interrupt) = self.interrupt.take() {
            let _ = interrupt.send(());
        }
    }

    /// Waits for the runner to return; panics if it does not within [`SHUTDOWN_TIMEOUT`].
    pub(crate) async fn join(self) -> Result<(), BootstrapError> {
        tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle)
            .await
            .expect("runner joined within the shutdown timeout")
            .expect("runner task did not panic")
    }
}

/// Starts a collector consumer followed by a subscription, plus any `extra` handlers.
pub(crate) fn start_pipeline(
    factory: SubscriberFactory,
    stream: StreamInfo,
    sink: CollectingSink,
    extra: Vec<Box<dyn BootstrapHandler>>,
) -> RunningPipeline {
    let (publisher, receiver) = mpsc::channel(1);
    let (interrupt, signal) = oneshot::channel::<()>();

    let bootstrap = Bootstrap::new(CancellationToken::new())
        .with_shutdown_signal(async move {
            let _ = signal.await;
            Ok(())
        })
        .with_handler(MessageConsumer::new("collector", receiver, sink))
        .with_handler(
            Subscription::new(factory, stream, publisher)
                .with_connect_timeout(Duration::from_secs(2)),
        )
        .with_handlers(extra);

    RunningPipeline {
        interrupt: Some(interrupt),
        handle: tokio::spawn(bootstrap.run()),
    }
}

/// Polls `condition` until it holds; panics after [`DELIVERY_TIMEOUT`].
#[allow(dead_code)]
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(DELIVERY_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}
