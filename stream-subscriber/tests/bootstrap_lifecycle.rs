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

mod support;

use async_trait::async_trait;
use integration_test_utils::{
    init_logging, CollectingSink, FakeAuthor, FakeMqttBroker, FakeStreamsClient,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stream_subscriber::bootstrap::{BootstrapHandler, ShutdownContext};
use stream_subscriber::config::{IotaStreamConfig, StreamInfo};
use stream_subscriber::error::{BootstrapError, ConfigError, SubscriberError};
use stream_subscriber::factory::SubscriberFactory;
use stream_subscriber::subscriber::streams::StreamsSubscriber;
use stream_subscriber::subscriber::{PollingSubscriber, StreamSubscriber};
use support::{iota_stream, mqtt_stream, start_pipeline};
use tokio::sync::mpsc;

struct Probe {
    invoked: Arc<AtomicBool>,
}

#[async_trait]
impl BootstrapHandler for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    async fn bootstrap(&mut self, _ctx: &ShutdownContext) -> bool {
        self.invoked.store(true, Ordering::SeqCst);
        true
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_stream_type_stops_startup_before_later_handlers() {
    init_logging();

    let invoked = Arc::new(AtomicBool::new(false));
    let sink = CollectingSink::new();
    let pipeline = start_pipeline(
        SubscriberFactory::new(),
        StreamInfo::new("unknown", json!({})),
        sink.clone(),
        vec![Box::new(Probe {
            invoked: invoked.clone(),
        }) as Box<dyn BootstrapHandler>],
    );

    assert!(matches!(
        pipeline.join().await,
        Err(BootstrapError::HandlerFailed { handler }) if handler == "subscription"
    ));
    assert!(!invoked.load(Ordering::SeqCst));
    assert!(sink.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn healthy_pipeline_runs_every_handler() {
    init_logging();

    let invoked = Arc::new(AtomicBool::new(false));
    let broker = FakeMqttBroker::new();
    let mut pipeline = start_pipeline(
        SubscriberFactory::new().with_mqtt_builder(Arc::new(broker.clone())),
        mqtt_stream(&["a"], 0),
        CollectingSink::new(),
        vec![Box::new(Probe {
            invoked: invoked.clone(),
        }) as Box<dyn BootstrapHandler>],
    );

    support::wait_until(|| invoked.load(Ordering::SeqCst)).await;
    pipeline.interrupt();
    assert!(pipeline.join().await.is_ok());
}

#[test]
fn settings_of_the_wrong_shape_are_rejected_by_the_factory() {
    let (tx, _rx) = mpsc::channel(1);
    let declared_mqtt = StreamInfo::new("mqtt", iota_stream(None).config);

    assert!(matches!(
        SubscriberFactory::new().build(&declared_mqtt, tx),
        Err(SubscriberError::Config(ConfigError::SettingsMismatch { .. }))
    ));
}

#[tokio::test]
async fn close_before_connect_is_ok_for_every_backend() {
    let (tx, _rx) = mpsc::channel(1);
    let broker = FakeMqttBroker::new();
    let factory = SubscriberFactory::new().with_mqtt_builder(Arc::new(broker.clone()));

    let StreamSubscriber::Push(mut mqtt) = factory
        .build(&mqtt_stream(&["a"], 0), tx)
        .expect("mqtt subscriber")
    else {
        panic!("mqtt backend pushes");
    };
    assert!(mqtt.close().await.is_ok());
    assert_eq!(broker.disconnects(), 0);

    let config: IotaStreamConfig =
        serde_json::from_value(iota_stream(None).config).expect("iota config");
    let client = FakeStreamsClient::new();
    let mut streams = StreamsSubscriber::new(
        config,
        Box::new(client.clone()),
        Box::new(FakeAuthor::new("announcement")),
    );
    assert!(streams.close().await.is_ok());
    assert_eq!(client.closes(), 0);
}
