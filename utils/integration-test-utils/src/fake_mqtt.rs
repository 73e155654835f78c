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

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use stream_subscriber::config::MqttConfig;
use stream_subscriber::error::SubscriberError;
use stream_subscriber::subscriber::mqtt::{
    MessageListener, MqttTransport, MqttTransportBuilder, TopicFilter,
};
use tracing::debug;

#[derive(Default)]
struct BrokerState {
    connected: bool,
    connects: usize,
    disconnects: usize,
    client_ids: Vec<String>,
    filters: Vec<TopicFilter>,
    listeners: Vec<(String, Arc<dyn MessageListener>)>,
    fail_connect: bool,
    fail_subscribe: bool,
}

/// In-memory broker. Used as the factory's [`MqttTransportBuilder`]; every transport
/// it builds talks to the same broker state.
#[derive(Clone, Default)]
pub struct FakeMqttBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl FakeMqttBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect() -> Self {
        let broker = Self::default();
        broker.state().fail_connect = true;
        broker
    }

    pub fn failing_subscribe() -> Self {
        let broker = Self::default();
        broker.state().fail_subscribe = true;
        broker
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscriptions(&self) -> Vec<TopicFilter> {
        self.state().filters.clone()
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.state().client_ids.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state().disconnects
    }

    /// Delivers `payload` to every listener subscribed to `topic`; returns how many got it.
    pub async fn publish(&self, topic: &str, payload: &[u8]) -> usize {
        let listeners: Vec<Arc<dyn MessageListener>> = {
            let state = self.state();
            if !state.connected {
                return 0;
            }
            state
                .listeners
                .iter()
                .filter(|(filter, _)| topic_matches(filter, topic))
                .map(|(_, listener)| listener.clone())
                .collect()
        };

        for listener in &listeners {
            listener.on_receive(topic, payload).await;
        }
        listeners.len()
    }
}

fn topic_matches(filter: &str, topic: &str) -> bool {
    match filter.strip_suffix('#') {
        Some(prefix) => topic.starts_with(prefix),
        None => filter == topic,
    }
}

impl MqttTransportBuilder for FakeMqttBroker {
    fn build(&self, endpoint: &MqttConfig) -> Result<Arc<dyn MqttTransport>, SubscriberError> {
        Ok(Arc::new(FakeMqttTransport {
            client_id: endpoint.client_id.clone(),
            broker: self.clone(),
        }))
    }
}

pub struct FakeMqttTransport {
    client_id: String,
    broker: FakeMqttBroker,
}

#[async_trait]
impl MqttTransport for FakeMqttTransport {
    async fn connect(&self) -> Result<(), SubscriberError> {
        let mut state = self.broker.state();
        if state.fail_connect {
            return Err(SubscriberError::Connect("broker unreachable".to_string()));
        }
        if !state.connected {
            state.connected = true;
            state.connects += 1;
            state.client_ids.push(self.client_id.clone());
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        filters: &[TopicFilter],
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), SubscriberError> {
        let mut state = self.broker.state();
        if !state.connected {
            return Err(SubscriberError::NotConnected);
        }
        if state.fail_subscribe {
            return Err(SubscriberError::Subscribe("not authorized".to_string()));
        }

        for filter in filters {
            debug!(topic = filter.topic.as_str(), qos = filter.qos, "fake broker subscription");
            state.filters.push(filter.clone());
            state.listeners.push((filter.topic.clone(), listener.clone()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SubscriberError> {
        let mut state = self.broker.state();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
            state.listeners.clear();
        }
        Ok(())
    }
}
