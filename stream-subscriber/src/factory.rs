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

//! Constructs the subscriber matching a stream declaration.

use crate::config::{StreamInfo, StreamSettings};
use crate::error::SubscriberError;
use crate::message::StreamMessage;
use crate::subscriber::mqtt::{MqttSubscriber, MqttTransportBuilder, RumqttTransportBuilder};
use crate::subscriber::streams::{
    AuthorBuilder, HttpAuthorBuilder, StreamsClientBuilder, StreamsSubscriber,
};
use crate::subscriber::{PollingDriver, StreamSubscriber};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Builds a [`StreamSubscriber`] from a [`StreamInfo`].
///
/// Transports are created through builder traits. MQTT defaults to `rumqttc`; the
/// encrypted channel needs a [`StreamsClientBuilder`] linking the native client, and
/// without one an `iota` declaration fails with [`SubscriberError::NotLinked`].
pub struct SubscriberFactory {
    mqtt: Arc<dyn MqttTransportBuilder>,
    streams: Option<Arc<dyn StreamsClientBuilder>>,
    author: Arc<dyn AuthorBuilder>,
    poll_interval: Duration,
}

impl Default for SubscriberFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberFactory {
    pub fn new() -> Self {
        Self {
            mqtt: Arc::new(RumqttTransportBuilder),
            streams: None,
            author: Arc::new(HttpAuthorBuilder),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_mqtt_builder(mut self, builder: Arc<dyn MqttTransportBuilder>) -> Self {
        self.mqtt = builder;
        self
    }

    pub fn with_streams_builder(mut self, builder: Arc<dyn StreamsClientBuilder>) -> Self {
        self.streams = Some(builder);
        self
    }

    pub fn with_author_builder(mut self, builder: Arc<dyn AuthorBuilder>) -> Self {
        self.author = builder;
        self
    }

    /// Delay between two reads of a polling subscriber.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Builds the subscriber declared by `info`, wired to `publisher`.
    ///
    /// Nothing is connected yet; no task is spawned.
    pub fn build(
        &self,
        info: &StreamInfo,
        publisher: Sender<StreamMessage>,
    ) -> Result<StreamSubscriber, SubscriberError> {
        match info.settings()? {
            StreamSettings::Mqtt(endpoint) => {
                let transport = self.mqtt.build(&endpoint)?;
                Ok(StreamSubscriber::Push(Box::new(MqttSubscriber::new(
                    endpoint, transport, publisher,
                ))))
            }
            StreamSettings::Iota(config) => {
                let streams = self
                    .streams
                    .as_ref()
                    .ok_or(SubscriberError::NotLinked("iota"))?;
                let client = streams.build(&config)?;
                let author = self.author.build(&config.provider)?;
                let subscriber = StreamsSubscriber::new(config, client, author);

                Ok(StreamSubscriber::Polling(PollingDriver::new(
                    Box::new(subscriber),
                    publisher,
                    self.poll_interval,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IotaStreamConfig, MqttConfig, ServiceInfo};
    use crate::error::ConfigError;
    use crate::subscriber::mqtt::{MessageListener, MqttTransport, TopicFilter};
    use crate::subscriber::streams::{StreamsClient, SubscribeLink};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc::{self, error::TryRecvError};

    struct IdleTransport;

    #[async_trait]
    impl MqttTransport for IdleTransport {
        async fn connect(&self) -> Result<(), SubscriberError> {
            Ok(())
        }

        async fn subscribe(
            &self,
            _filters: &[TopicFilter],
            _listener: Arc<dyn MessageListener>,
        ) -> Result<(), SubscriberError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), SubscriberError> {
            Ok(())
        }
    }

    struct IdleTransportBuilder;

    impl MqttTransportBuilder for IdleTransportBuilder {
        fn build(&self, _endpoint: &MqttConfig) -> Result<Arc<dyn MqttTransport>, SubscriberError> {
            Ok(Arc::new(IdleTransport))
        }
    }

    struct IdleClient;

    #[async_trait]
    impl StreamsClient for IdleClient {
        async fn open(
            &mut self,
            _node_uri: &str,
            _seed: &str,
            _encoding: &str,
            _payload_length: usize,
        ) -> Result<(), SubscriberError> {
            Ok(())
        }

        async fn store_psk(&mut self, _psk: &str) -> Result<(), SubscriberError> {
            Ok(())
        }

        async fn receive_announcement(&mut self, _id: &str) -> Result<(), SubscriberError> {
            Ok(())
        }

        async fn send_subscribe(&mut self, _id: &str) -> Result<SubscribeLink, SubscriberError> {
            Ok(SubscribeLink {
                msg_id: String::new(),
                public_key: String::new(),
            })
        }

        async fn sync_state(&mut self) -> Result<Vec<Vec<u8>>, SubscriberError> {
            Ok(Vec::new())
        }

        async fn close(&mut self) {}
    }

    struct IdleClientBuilder;

    impl StreamsClientBuilder for IdleClientBuilder {
        fn build(&self, _config: &IotaStreamConfig) -> Result<Box<dyn StreamsClient>, SubscriberError> {
            Ok(Box::new(IdleClient))
        }
    }

    fn mqtt_info() -> StreamInfo {
        StreamInfo::new(
            "mqtt",
            json!({
                "clientId": "factory",
                "qos": 0,
                "provider": { "host": "localhost", "protocol": "tcp", "port": 1883 },
                "topics": ["a"]
            }),
        )
    }

    fn iota_info() -> StreamInfo {
        StreamInfo::new(
            "iota",
            json!({
                "provider": { "host": "localhost", "protocol": "http", "port": 8900 },
                "tangle": { "host": "localhost", "protocol": "http", "port": 14265 },
                "encoding": "utf-8"
            }),
        )
    }

    fn factory() -> SubscriberFactory {
        SubscriberFactory::new()
            .with_mqtt_builder(Arc::new(IdleTransportBuilder))
            .with_streams_builder(Arc::new(IdleClientBuilder))
    }

    #[test]
    fn mqtt_declaration_builds_push_subscriber() {
        let (tx, _rx) = mpsc::channel(1);

        let subscriber = factory().build(&mqtt_info(), tx).expect("mqtt subscriber");
        assert!(subscriber.is_push());
    }

    #[test]
    fn iota_declaration_builds_polling_subscriber() {
        let (tx, _rx) = mpsc::channel(1);
        let factory = factory().with_poll_interval(Duration::from_millis(5));

        let StreamSubscriber::Polling(driver) = factory.build(&iota_info(), tx).expect("iota") else {
            panic!("expected polling subscriber");
        };
        assert_eq!(driver.poll_interval, Duration::from_millis(5));
    }

    #[test]
    fn iota_without_linked_client_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let factory = SubscriberFactory::new().with_mqtt_builder(Arc::new(IdleTransportBuilder));

        assert!(matches!(
            factory.build(&iota_info(), tx),
            Err(SubscriberError::NotLinked("iota"))
        ));
    }

    #[test]
    fn unknown_type_is_rejected_and_publisher_dropped() {
        let (tx, mut rx) = mpsc::channel(1);

        let res = factory().build(&StreamInfo::new("unknown", json!({})), tx);
        assert!(matches!(
            res,
            Err(SubscriberError::Config(ConfigError::UnknownStreamType(_)))
        ));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn mismatched_shape_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let info = StreamInfo::new("mqtt", iota_info().config);

        assert!(matches!(
            factory().build(&info, tx),
            Err(SubscriberError::Config(ConfigError::SettingsMismatch { .. }))
        ));
    }

    #[test]
    fn tls_broker_surfaces_transport_error() {
        let (tx, _rx) = mpsc::channel(1);
        let mut config: MqttConfig =
            serde_json::from_value(mqtt_info().config).expect("mqtt config");
        config.provider = ServiceInfo {
            host: "localhost".to_string(),
            protocol: "ssl".to_string(),
            port: 8883,
        };
        let info = StreamInfo::new("mqtt", serde_json::to_value(config).expect("serializable"));

        assert!(matches!(
            SubscriberFactory::new().build(&info, tx),
            Err(SubscriberError::UnsupportedProtocol(_))
        ));
    }
}
