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
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use stream_subscriber::config::{IotaStreamConfig, ServiceInfo};
use stream_subscriber::error::SubscriberError;
use stream_subscriber::subscriber::streams::{
    AuthorBuilder, StreamsClient, StreamsClientBuilder, SubscribeLink, SubscriptionAuthor,
    SubscriptionRequest,
};

#[derive(Default)]
struct ChannelState {
    node_uri: Option<String>,
    payload_length: usize,
    psk: Option<String>,
    subscribed: bool,
    pending: VecDeque<Vec<u8>>,
    closes: usize,
    fail_open: bool,
    failing_syncs: usize,
    sync_attempts: usize,
}

/// In-memory encrypted channel. Clones share one channel; the value is also the
/// factory's [`StreamsClientBuilder`].
#[derive(Clone, Default)]
pub struct FakeStreamsClient {
    state: Arc<Mutex<ChannelState>>,
}

impl FakeStreamsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open() -> Self {
        let client = Self::default();
        client.state().fail_open = true;
        client
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next `count` calls to `sync_state` fail with a read error.
    pub fn fail_next_syncs(&self, count: usize) {
        self.state().failing_syncs = count;
    }

    pub fn sync_attempts(&self) -> usize {
        self.state().sync_attempts
    }

    /// Queues a payload for the next `sync_state`.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) {
        self.state().pending.push_back(payload.into());
    }

    pub fn node_uri(&self) -> Option<String> {
        self.state().node_uri.clone()
    }

    pub fn payload_length(&self) -> usize {
        self.state().payload_length
    }

    pub fn psk(&self) -> Option<String> {
        self.state().psk.clone()
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

impl StreamsClientBuilder for FakeStreamsClient {
    fn build(&self, _config: &IotaStreamConfig) -> Result<Box<dyn StreamsClient>, SubscriberError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl StreamsClient for FakeStreamsClient {
    async fn open(
        &mut self,
        node_uri: &str,
        _seed: &str,
        _encoding: &str,
        payload_length: usize,
    ) -> Result<(), SubscriberError> {
        let mut state = self.state();
        if state.fail_open {
            return Err(SubscriberError::Connect("tangle node unreachable".to_string()));
        }
        state.node_uri = Some(node_uri.to_string());
        state.payload_length = payload_length;
        Ok(())
    }

    async fn store_psk(&mut self, psk: &str) -> Result<(), SubscriberError> {
        self.state().psk = Some(psk.to_string());
        Ok(())
    }

    async fn receive_announcement(&mut self, _announcement_id: &str) -> Result<(), SubscriberError> {
        Ok(())
    }

    async fn send_subscribe(
        &mut self,
        announcement_id: &str,
    ) -> Result<SubscribeLink, SubscriberError> {
        self.state().subscribed = true;
        Ok(SubscribeLink {
            msg_id: format!("{announcement_id}:subscribe"),
            public_key: "fake-public-key".to_string(),
        })
    }

    async fn sync_state(&mut self) -> Result<Vec<Vec<u8>>, SubscriberError> {
        let mut state = self.state();
        state.sync_attempts += 1;
        if state.failing_syncs > 0 {
            state.failing_syncs -= 1;
            return Err(SubscriberError::Read("tangle node timed out".to_string()));
        }
        if !state.subscribed {
            return Ok(Vec::new());
        }
        Ok(state.pending.drain(..).collect())
    }

    async fn close(&mut self) {
        let mut state = self.state();
        state.subscribed = false;
        state.closes += 1;
    }
}

/// Author endpoint that always hands out the same announcement and records requests.
#[derive(Clone)]
pub struct FakeAuthor {
    announcement_id: String,
    requests: Arc<Mutex<Vec<SubscriptionRequest>>>,
}

impl FakeAuthor {
    pub fn new(announcement_id: impl Into<String>) -> Self {
        Self {
            announcement_id: announcement_id.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<SubscriptionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubscriptionAuthor for FakeAuthor {
    async fn announcement_id(&self) -> Result<String, SubscriberError> {
        Ok(self.announcement_id.clone())
    }

    async fn send_subscription(&self, request: &SubscriptionRequest) -> Result<(), SubscriberError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(())
    }
}

impl AuthorBuilder for FakeAuthor {
    fn build(&self, _provider: &ServiceInfo) -> Result<Box<dyn SubscriptionAuthor>, SubscriberError> {
        Ok(Box::new(self.clone()))
    }
}
