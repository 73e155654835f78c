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

//! [`MqttTransport`] over `rumqttc`.

use super::{MessageListener, MqttTransport, MqttTransportBuilder, TopicFilter};
use crate::config::MqttConfig;
use crate::error::SubscriberError;
use crate::observability::events;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck,
    SubscribeFilter, SubscribeReasonCode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

const COMPONENT: &str = "rumqtt_transport";
const REQUEST_CHANNEL_CAPACITY: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const DISCONNECT_QUIESCE: Duration = Duration::from_millis(1000);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const SUBACK_TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_ID_PREFIX: &str = "stream-subscriber-";

type Listeners = Arc<Mutex<Vec<(String, Arc<dyn MessageListener>)>>>;

struct Session {
    client: AsyncClient,
    stop: CancellationToken,
    event_loop: JoinHandle<()>,
    subacks: Mutex<mpsc::UnboundedReceiver<SubAck>>,
}

pub struct RumqttTransport {
    options: MqttOptions,
    listeners: Listeners,
    session: Mutex<Option<Session>>,
}

impl RumqttTransport {
    pub fn new(endpoint: &MqttConfig) -> Result<Self, SubscriberError> {
        match endpoint.provider.protocol.as_str() {
            "tcp" | "mqtt" => {}
            other => return Err(SubscriberError::UnsupportedProtocol(other.to_string())),
        }

        let client_id = if endpoint.client_id.is_empty() {
            format!("{CLIENT_ID_PREFIX}{}", Uuid::new_v4().simple())
        } else {
            endpoint.client_id.clone()
        };

        let mut options = MqttOptions::new(
            client_id,
            endpoint.provider.host.clone(),
            endpoint.provider.port,
        );
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(endpoint.cleanness);
        if !endpoint.user.is_empty() {
            options.set_credentials(endpoint.user.clone(), endpoint.password.clone());
        }

        Ok(Self {
            options,
            listeners: Arc::new(Mutex::new(Vec::new())),
            session: Mutex::new(None),
        })
    }

    pub fn client_id(&self) -> String {
        self.options.client_id()
    }
}

fn check_suback(ack: &SubAck, filters: &[TopicFilter]) -> Result<(), SubscriberError> {
    let rejected: Vec<&str> = ack
        .return_codes
        .iter()
        .zip(filters)
        .filter(|(code, _)| matches!(code, SubscribeReasonCode::Failure))
        .map(|(_, filter)| filter.topic.as_str())
        .collect();

    if !rejected.is_empty() {
        return Err(SubscriberError::Subscribe(format!(
            "broker rejected topics: {}",
            rejected.join(", ")
        )));
    }
    if ack.return_codes.len() != filters.len() {
        return Err(SubscriberError::Subscribe(format!(
            "broker acknowledged {} of {} topics",
            ack.return_codes.len(),
            filters.len()
        )));
    }
    Ok(())
}

fn to_qos(qos: u8) -> Result<QoS, SubscriberError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(SubscriberError::Subscribe(format!(
            "{other} is not a valid mqtt qos"
        ))),
    }
}

#[async_trait]
impl MqttTransport for RumqttTransport {
    async fn connect(&self) -> Result<(), SubscriberError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let (client, mut event_loop) =
            AsyncClient::new(self.options.clone(), REQUEST_CHANNEL_CAPACITY);
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        break;
                    }
                    return Err(SubscriberError::Connect(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    )));
                }
                Ok(_) => {}
                Err(err) => return Err(SubscriberError::Connect(err.to_string())),
            }
        }

        let stop = CancellationToken::new();
        let (suback_tx, subacks) = mpsc::unbounded_channel();
        let event_loop = tokio::spawn(run_event_loop(
            event_loop,
            self.listeners.clone(),
            suback_tx,
            stop.clone(),
        ));
        *session = Some(Session {
            client,
            stop,
            event_loop,
            subacks: Mutex::new(subacks),
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        filters: &[TopicFilter],
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), SubscriberError> {
        let session = self.session.lock().await;
        let Some(session) = session.as_ref() else {
            return Err(SubscriberError::NotConnected);
        };

        let subscriptions = filters
            .iter()
            .map(|filter| Ok(SubscribeFilter::new(filter.topic.clone(), to_qos(filter.qos)?)))
            .collect::<Result<Vec<_>, SubscriberError>>()?;

        self.listeners.lock().await.extend(
            filters
                .iter()
                .map(|filter| (filter.topic.clone(), listener.clone())),
        );

        let mut subacks = session.subacks.lock().await;
        while subacks.try_recv().is_ok() {}

        session
            .client
            .subscribe_many(subscriptions)
            .await
            .map_err(|e| SubscriberError::Subscribe(e.to_string()))?;

        match tokio::time::timeout(SUBACK_TIMEOUT, subacks.recv()).await {
            Ok(Some(ack)) => check_suback(&ack, filters),
            Ok(None) => Err(SubscriberError::Subscribe(
                "connection closed before the broker acknowledged".to_string(),
            )),
            Err(_) => Err(SubscriberError::Timeout(SUBACK_TIMEOUT)),
        }
    }

    async fn disconnect(&self) -> Result<(), SubscriberError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        if let Err(err) = session.client.disconnect().await {
            debug!(
                component = COMPONENT,
                err = %err,
                "disconnect request not delivered"
            );
        }

        let Session {
            stop,
            mut event_loop,
            ..
        } = session;
        if tokio::time::timeout(DISCONNECT_QUIESCE, &mut event_loop)
            .await
            .is_err()
        {
            warn!(
                event = events::MQTT_DISCONNECT_TIMEOUT,
                component = COMPONENT,
                "event loop did not stop in time; forcing"
            );
            stop.cancel();
            let _ = event_loop.await;
        }

        self.listeners.lock().await.clear();
        Ok(())
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    listeners: Listeners,
    subacks: mpsc::UnboundedSender<SubAck>,
    stop: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = stop.cancelled() => break,
            event = event_loop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                dispatch(&listeners, &publish.topic, &publish.payload[..]).await;
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let _ = subacks.send(ack);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(
                    event = events::MQTT_EVENT_LOOP_ERROR,
                    component = COMPONENT,
                    err = %err,
                    "mqtt connection error"
                );
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }

    debug!(
        event = events::MQTT_EVENT_LOOP_STOPPED,
        component = COMPONENT,
        "mqtt event loop stopped"
    );
}

async fn dispatch(listeners: &Listeners, topic: &str, payload: &[u8]) {
    let mut matching: Vec<Arc<dyn MessageListener>> = Vec::new();
    for (filter, listener) in listeners.lock().await.iter() {
        if rumqttc::matches(topic, filter) && !matching.iter().any(|l| Arc::ptr_eq(l, listener)) {
            matching.push(listener.clone());
        }
    }

    for listener in matching {
        listener.on_receive(topic, payload).await;
    }
}

/// Builds a [`RumqttTransport`] per configured endpoint.
#[derive(Default, Clone, Copy)]
pub struct RumqttTransportBuilder;

impl MqttTransportBuilder for RumqttTransportBuilder {
    fn build(&self, endpoint: &MqttConfig) -> Result<Arc<dyn MqttTransport>, SubscriberError> {
        Ok(Arc::new(RumqttTransport::new(endpoint)?))
    }
}
