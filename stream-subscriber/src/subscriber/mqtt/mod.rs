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

//! MQTT push subscriber.
//!
//! The wire client sits behind [`MqttTransport`]; [`RumqttTransport`] is the
//! production implementation. Inbound payloads reach a [`MessageListener`] which
//! decodes them and forwards them into the message channel.

mod rumqtt;
pub use rumqtt::{RumqttTransport, RumqttTransportBuilder};

use crate::bootstrap::ShutdownContext;
use crate::config::MqttConfig;
use crate::error::{ConfigError, SubscriberError};
use crate::message::StreamMessage;
use crate::observability::events;
use crate::subscriber::PushSubscriber;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{Sender, WeakSender};
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "mqtt_subscriber";
const MAX_QOS: u8 = 2;

/// One topic subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    pub topic: String,
    pub qos: u8,
}

impl TopicFilter {
    pub fn new(topic: impl Into<String>, qos: u8) -> Self {
        Self {
            topic: topic.into(),
            qos,
        }
    }
}

/// Callback invoked by a transport for every inbound publish.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_receive(&self, topic: &str, payload: &[u8]);
}

/// Capability contract of an MQTT client connection.
#[async_trait]
pub trait MqttTransport: Send + Sync {
    /// Connects to the broker unless already connected.
    async fn connect(&self) -> Result<(), SubscriberError>;

    /// Subscribes to every filter; inbound messages on them are handed to `listener`.
    async fn subscribe(
        &self,
        filters: &[TopicFilter],
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), SubscriberError>;

    /// Disconnects; a no-op when not connected.
    async fn disconnect(&self) -> Result<(), SubscriberError>;
}

/// Creates the [`MqttTransport`] for a configured endpoint.
///
/// ```
/// use std::sync::Arc;
/// use stream_subscriber::config::MqttConfig;
/// use stream_subscriber::error::SubscriberError;
/// use stream_subscriber::subscriber::mqtt::{
///     MqttTransport, MqttTransportBuilder, RumqttTransport,
/// };
///
/// struct LocalBroker;
///
/// impl MqttTransportBuilder for LocalBroker {
///     fn build(&self, endpoint: &MqttConfig) -> Result<Arc<dyn MqttTransport>, SubscriberError> {
///         Ok(Arc::new(RumqttTransport::new(endpoint)?))
///     }
/// }
/// ```
pub trait MqttTransportBuilder: Send + Sync {
    fn build(&self, endpoint: &MqttConfig) -> Result<Arc<dyn MqttTransport>, SubscriberError>;
}

/// Listener that decodes payloads and forwards them into the message channel.
///
/// Holds only a weak sender: once the subscriber drops the strong one the channel
/// is closed and late callbacks are discarded instead of sending.
pub(crate) struct ChannelListener {
    publisher: WeakSender<StreamMessage>,
}

impl ChannelListener {
    pub(crate) fn new(publisher: WeakSender<StreamMessage>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl MessageListener for ChannelListener {
    async fn on_receive(&self, topic: &str, payload: &[u8]) {
        let message = match StreamMessage::decode_wrapped(payload) {
            Ok(message) => message,
            Err(err) => {
                error!(
                    event = events::SUBSCRIBER_DECODE_FAILED,
                    component = COMPONENT,
                    topic,
                    err = %err,
                    "unable to decode mqtt payload"
                );
                return;
            }
        };

        let Some(publisher) = self.publisher.upgrade() else {
            debug!(
                event = events::SUBSCRIBER_CHANNEL_CLOSED,
                component = COMPONENT,
                topic,
                "message channel closed; dropping message"
            );
            return;
        };

        if publisher.send(message).await.is_err() {
            debug!(
                event = events::SUBSCRIBER_CHANNEL_CLOSED,
                component = COMPONENT,
                topic,
                "no consumer left; dropping message"
            );
        }
    }
}

pub struct MqttSubscriber {
    endpoint: MqttConfig,
    transport: Arc<dyn MqttTransport>,
    publisher: Option<Sender<StreamMessage>>,
}

impl MqttSubscriber {
    pub fn new(
        endpoint: MqttConfig,
        transport: Arc<dyn MqttTransport>,
        publisher: Sender<StreamMessage>,
    ) -> Self {
        Self {
            endpoint,
            transport,
            publisher: Some(publisher),
        }
    }

    fn topic_filters(&self) -> Result<Vec<TopicFilter>, SubscriberError> {
        if self.endpoint.topics.is_empty() {
            return Err(SubscriberError::NoTopics);
        }
        if self.endpoint.qos > MAX_QOS {
            return Err(ConfigError::InvalidValue {
                field: "stream.config.qos",
                reason: format!("{} is not a valid mqtt qos", self.endpoint.qos),
            }
            .into());
        }

        Ok(self
            .endpoint
            .topics
            .iter()
            .map(|topic| TopicFilter::new(topic.as_str(), self.endpoint.qos))
            .collect())
    }

    async fn release_after_failure(&self) {
        if let Err(err) = self.transport.disconnect().await {
            warn!(
                event = events::SUBSCRIBER_CLOSE_FAILED,
                component = COMPONENT,
                err = %err,
                "unable to disconnect after failed subscription"
            );
        }
    }
}

#[async_trait]
impl PushSubscriber for MqttSubscriber {
    async fn connect(&mut self) -> Result<(), SubscriberError> {
        self.transport.connect().await
    }

    async fn subscribe(&mut self, ctx: &ShutdownContext) -> bool {
        if let Err(err) = self.connect().await {
            error!(
                event = events::SUBSCRIBER_CONNECT_FAILED,
                component = COMPONENT,
                broker = self.endpoint.provider.uri().as_str(),
                err = %err,
                "unable to connect to mqtt broker"
            );
            return false;
        }

        let filters = match self.topic_filters() {
            Ok(filters) => filters,
            Err(err) => {
                error!(
                    event = events::SUBSCRIBER_SUBSCRIBE_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "invalid subscription"
                );
                self.release_after_failure().await;
                return false;
            }
        };

        let Some(publisher) = self.publisher.take() else {
            error!(
                event = events::SUBSCRIBER_SUBSCRIBE_FAILED,
                component = COMPONENT,
                err = %SubscriberError::AlreadySubscribed,
                "invalid subscription"
            );
            return false;
        };

        let listener: Arc<dyn MessageListener> =
            Arc::new(ChannelListener::new(publisher.downgrade()));
        if let Err(err) = self.transport.subscribe(&filters, listener).await {
            error!(
                event = events::SUBSCRIBER_SUBSCRIBE_FAILED,
                component = COMPONENT,
                err = %err,
                "unable to subscribe"
            );
            self.release_after_failure().await;
            return false;
        }

        debug!(
            event = events::SUBSCRIBER_SUBSCRIBE_OK,
            component = COMPONENT,
            topics = ?self.endpoint.topics,
            qos = self.endpoint.qos,
            "successfully subscribed"
        );

        let transport = self.transport.clone();
        let token = ctx.token().clone();
        ctx.spawn(async move {
            token.cancelled().await;
            // The only strong sender: dropping it closes the channel exactly once.
            drop(publisher);
            info!(
                event = events::SHUTDOWN_RECEIVED,
                component = COMPONENT,
                "shutdown received"
            );

            match transport.disconnect().await {
                Ok(()) => debug!(
                    event = events::SUBSCRIBER_CLOSE_OK,
                    component = COMPONENT,
                    "disconnected from broker"
                ),
                Err(err) => warn!(
                    event = events::SUBSCRIBER_CLOSE_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "unable to disconnect from broker"
                ),
            }
        });
        true
    }

    async fn close(&mut self) -> Result<(), SubscriberError> {
        self.transport.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceInfo;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct NoopTransport;

    #[async_trait]
    impl MqttTransport for NoopTransport {
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

    fn endpoint(topics: &[&str], qos: u8) -> MqttConfig {
        MqttConfig {
            client_id: "unit".to_string(),
            qos,
            user: String::new(),
            password: String::new(),
            provider: ServiceInfo {
                host: "localhost".to_string(),
                protocol: "tcp".to_string(),
                port: 1883,
            },
            cleanness: true,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn subscriber(topics: &[&str], qos: u8) -> MqttSubscriber {
        let (tx, _rx) = mpsc::channel(1);
        MqttSubscriber::new(endpoint(topics, qos), Arc::new(NoopTransport), tx)
    }

    #[test]
    fn topic_filters_apply_configured_qos_to_every_topic() {
        let filters = subscriber(&["a", "b"], 1)
            .topic_filters()
            .expect("valid filters");

        assert_eq!(
            filters,
            vec![TopicFilter::new("a", 1), TopicFilter::new("b", 1)]
        );
    }

    #[test]
    fn topic_filters_require_a_topic() {
        assert!(matches!(
            subscriber(&[], 0).topic_filters(),
            Err(SubscriberError::NoTopics)
        ));
    }

    #[test]
    fn topic_filters_reject_out_of_range_qos() {
        assert!(matches!(
            subscriber(&["a"], 3).topic_filters(),
            Err(SubscriberError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[tokio::test]
    async fn channel_listener_forwards_decoded_payloads() {
        let (tx, mut rx) = mpsc::channel(4);
        let listener = ChannelListener::new(tx.downgrade());
        let payload = json!({ "action": "create", "type": "TestData", "content": "x" }).to_string();

        listener.on_receive("a", payload.as_bytes()).await;
        listener.on_receive("a", b"{broken").await;
        drop(tx);

        assert!(matches!(rx.recv().await, Some(StreamMessage::Wrapped(_))));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn channel_listener_discards_after_publisher_dropped() {
        let (tx, mut rx) = mpsc::channel(4);
        let listener = ChannelListener::new(tx.downgrade());
        drop(tx);

        listener
            .on_receive("a", br#"{"action":"create","type":"t","content":null}"#)
            .await;

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn second_subscribe_is_rejected() {
        let ctx = ShutdownContext::new(tokio_util::sync::CancellationToken::new());
        let mut subscriber = subscriber(&["a"], 0);

        assert!(subscriber.subscribe(&ctx).await);
        assert!(!subscriber.subscribe(&ctx).await);

        ctx.cancel();
    }
}
