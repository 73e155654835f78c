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

//! Polling subscriber for the ledger-backed encrypted channel.
//!
//! The native channel library is reached through [`StreamsClient`]; linking a real
//! implementation is the job of whoever registers a [`StreamsClientBuilder`] with
//! the factory.

mod author;
pub use author::{
    AuthorBuilder, HttpAuthor, HttpAuthorBuilder, SubscriptionAuthor, SubscriptionRequest,
};

use crate::config::IotaStreamConfig;
use crate::error::SubscriberError;
use crate::message::StreamMessage;
use crate::observability::events;
use crate::subscriber::PollingSubscriber;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

const COMPONENT: &str = "streams_subscriber";
pub const SEED_LENGTH: usize = 64;
pub const PAYLOAD_LENGTH: usize = 1024;

/// Link of the subscribe message and the subscriber's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeLink {
    pub msg_id: String,
    pub public_key: String,
}

/// Capability contract of the native channel subscriber.
#[async_trait]
pub trait StreamsClient: Send {
    /// Creates the native subscriber bound to the tangle node.
    async fn open(
        &mut self,
        node_uri: &str,
        seed: &str,
        encoding: &str,
        payload_length: usize,
    ) -> Result<(), SubscriberError>;

    async fn store_psk(&mut self, psk: &str) -> Result<(), SubscriberError>;

    async fn receive_announcement(&mut self, announcement_id: &str) -> Result<(), SubscriberError>;

    async fn send_subscribe(&mut self, announcement_id: &str)
        -> Result<SubscribeLink, SubscriberError>;

    /// Fetches every message published since the last sync; returns masked payloads.
    async fn sync_state(&mut self) -> Result<Vec<Vec<u8>>, SubscriberError>;

    /// Releases the native handle.
    async fn close(&mut self);
}

pub trait StreamsClientBuilder: Send + Sync {
    fn build(&self, config: &IotaStreamConfig) -> Result<Box<dyn StreamsClient>, SubscriberError>;
}

/// Random alphanumeric seed for a fresh channel identity.
pub fn generate_seed() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SEED_LENGTH)
        .map(char::from)
        .collect()
}

pub struct StreamsSubscriber {
    config: IotaStreamConfig,
    client: Box<dyn StreamsClient>,
    author: Box<dyn SubscriptionAuthor>,
    seed: String,
    opened: bool,
    connected: bool,
}

impl StreamsSubscriber {
    pub fn new(
        config: IotaStreamConfig,
        client: Box<dyn StreamsClient>,
        author: Box<dyn SubscriptionAuthor>,
    ) -> Self {
        let seed = generate_seed();
        debug!(
            component = COMPONENT,
            seed_len = seed.len(),
            "generated streams seed"
        );

        Self {
            config,
            client,
            author,
            seed,
            opened: false,
            connected: false,
        }
    }

    fn step(step: &str) {
        debug!(
            event = events::STREAMS_HANDSHAKE_STEP,
            component = COMPONENT,
            step,
            "handshake step completed"
        );
    }
}

#[async_trait]
impl PollingSubscriber for StreamsSubscriber {
    async fn connect(&mut self) -> Result<(), SubscriberError> {
        if self.connected {
            return Ok(());
        }

        if !self.opened {
            let node_uri = self.config.tangle_node.uri();
            self.client
                .open(&node_uri, &self.seed, &self.config.encoding, PAYLOAD_LENGTH)
                .await?;
            self.opened = true;
            Self::step("open");
        }

        let announcement_id = self.author.announcement_id().await?;
        Self::step("announcement_id");

        if let Some(psk) = self.config.psk.as_deref() {
            self.client.store_psk(psk).await?;
            Self::step("store_psk");
        }

        self.client.receive_announcement(&announcement_id).await?;
        Self::step("receive_announcement");

        let link = self.client.send_subscribe(&announcement_id).await?;
        Self::step("send_subscribe");

        self.author
            .send_subscription(&SubscriptionRequest {
                msg_id: link.msg_id,
                pk: link.public_key,
            })
            .await?;
        Self::step("send_subscription");

        self.connected = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<StreamMessage>, SubscriberError> {
        if !self.connected {
            return Err(SubscriberError::NotConnected);
        }

        let payloads = self.client.sync_state().await?;
        Ok(payloads.into_iter().map(StreamMessage::Raw).collect())
    }

    async fn close(&mut self) -> Result<(), SubscriberError> {
        if self.opened {
            self.client.close().await;
            self.opened = false;
            self.connected = false;
        }
        Ok(())
    }
}
