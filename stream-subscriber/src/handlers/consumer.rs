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

//! Consumers that drain the message channel into a sink.

use crate::bootstrap::{BootstrapHandler, ShutdownContext};
use crate::message::StreamMessage;
use crate::observability::events;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

const COMPONENT: &str = "message_consumer";

/// Destination of the messages drained from the channel.
pub trait MessageSink: Send + 'static {
    fn accept(&mut self, message: StreamMessage);
}

/// Writes every message to the log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn accept(&mut self, message: StreamMessage) {
        debug!(
            component = "console_writer",
            message = message.render().as_str(),
            "message received"
        );
    }
}

/// Drains the message channel into a [`MessageSink`].
///
/// The drain loop ends only when every sender is gone, so nothing already queued
/// is lost on shutdown. Cancellation merely produces a shutdown notice.
pub struct MessageConsumer<S: MessageSink> {
    name: String,
    receiver: Option<Receiver<StreamMessage>>,
    sink: Option<S>,
}

pub type ConsoleWriter = MessageConsumer<LogSink>;

impl<S: MessageSink> MessageConsumer<S> {
    pub fn new(name: impl Into<String>, receiver: Receiver<StreamMessage>, sink: S) -> Self {
        Self {
            name: name.into(),
            receiver: Some(receiver),
            sink: Some(sink),
        }
    }
}

impl MessageConsumer<LogSink> {
    pub fn console(receiver: Receiver<StreamMessage>) -> Self {
        Self::new("console_writer", receiver, LogSink)
    }
}

#[async_trait]
impl<S: MessageSink> BootstrapHandler for MessageConsumer<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool {
        let (Some(mut receiver), Some(mut sink)) = (self.receiver.take(), self.sink.take()) else {
            error!(
                event = events::CONSUMER_RECEIVER_MISSING,
                component = COMPONENT,
                consumer = self.name.as_str(),
                "receiver already taken; consumer cannot start twice"
            );
            return false;
        };

        let name = self.name.clone();
        ctx.spawn(async move {
            while let Some(message) = receiver.recv().await {
                debug!(
                    event = events::CONSUMER_RECEIVE,
                    component = COMPONENT,
                    consumer = name.as_str(),
                    "received message"
                );
                sink.accept(message);
            }

            info!(
                event = events::CONSUMER_CHANNEL_CLOSED,
                component = COMPONENT,
                consumer = name.as_str(),
                "channel closed; stopping consumer"
            );
        });

        let name = self.name.clone();
        let token = ctx.token().clone();
        ctx.spawn(async move {
            token.cancelled().await;
            info!(
                event = events::SHUTDOWN_RECEIVED,
                component = COMPONENT,
                consumer = name.as_str(),
                "shutdown received"
            );
        });

        true
    }
}
