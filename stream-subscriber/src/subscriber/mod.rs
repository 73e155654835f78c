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

//! Stream subscriber contracts and backends.
//!
//! Two shapes exist:
//!
//! - [`PollingSubscriber`]: the caller drives `read()`; decoded messages are returned
//!   and forwarded into the message channel by the polling driver.
//! - [`PushSubscriber`]: the backend invokes a listener per inbound message, which
//!   sends into the message channel; the subscriber owns the channel's closing.

pub mod mqtt;
pub mod streams;

use crate::bootstrap::ShutdownContext;
use crate::error::SubscriberError;
use crate::message::StreamMessage;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

/// A backend whose messages must be fetched by the caller.
#[async_trait]
pub trait PollingSubscriber: Send {
    async fn connect(&mut self) -> Result<(), SubscriberError>;

    /// Performs one bounded poll and returns the messages decoded by it.
    async fn read(&mut self) -> Result<Vec<StreamMessage>, SubscriberError>;

    /// Releases the connection. Safe to call when `connect` never succeeded.
    async fn close(&mut self) -> Result<(), SubscriberError>;
}

/// A backend that invokes a callback for every inbound message.
#[async_trait]
pub trait PushSubscriber: Send {
    async fn connect(&mut self) -> Result<(), SubscriberError>;

    /// Connects, registers the message callback and spawns the shutdown watcher that
    /// closes the message channel once `ctx` is cancelled.
    ///
    /// Returns `false` if the subscription could not be set up.
    async fn subscribe(&mut self, ctx: &ShutdownContext) -> bool;

    /// Releases the connection. Safe to call when `connect` never succeeded.
    async fn close(&mut self) -> Result<(), SubscriberError>;
}

/// A constructed subscriber, ready to be started by the subscription handler.
pub enum StreamSubscriber {
    Polling(PollingDriver),
    Push(Box<dyn PushSubscriber>),
}

impl StreamSubscriber {
    pub fn is_push(&self) -> bool {
        matches!(self, StreamSubscriber::Push(_))
    }
}

/// A polling subscriber together with the channel it feeds.
///
/// The driver holds the only strong sender; it is dropped when the poll loop ends,
/// which closes the channel for the consumers.
pub struct PollingDriver {
    pub(crate) subscriber: Box<dyn PollingSubscriber>,
    pub(crate) publisher: Sender<StreamMessage>,
    pub(crate) poll_interval: Duration,
}

impl PollingDriver {
    pub fn new(
        subscriber: Box<dyn PollingSubscriber>,
        publisher: Sender<StreamMessage>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            subscriber,
            publisher,
            poll_interval,
        }
    }
}
