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

//! Startup handler that builds, connects and runs the configured subscriber.

use crate::bootstrap::{BootstrapHandler, ShutdownContext};
use crate::config::StreamInfo;
use crate::error::SubscriberError;
use crate::factory::SubscriberFactory;
use crate::message::StreamMessage;
use crate::observability::events;
use crate::subscriber::{PollingDriver, PollingSubscriber, PushSubscriber, StreamSubscriber};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "subscription";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the configured subscriber, connects it and starts feeding the channel.
///
/// The handler owns the channel's producer side until it starts: a polling
/// subscriber's loop drops the sender when it ends, a push subscriber hands it to
/// its shutdown watcher. On any startup failure the sender is dropped as well.
pub struct Subscription {
    factory: SubscriberFactory,
    stream: StreamInfo,
    publisher: Option<Sender<StreamMessage>>,
    connect_timeout: Duration,
}

impl Subscription {
    pub fn new(
        factory: SubscriberFactory,
        stream: StreamInfo,
        publisher: Sender<StreamMessage>,
    ) -> Self {
        Self {
            factory,
            stream,
            publisher: Some(publisher),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    async fn start_polling(&self, mut driver: PollingDriver, ctx: &ShutdownContext) -> bool {
        let connected = bounded_connect(self.connect_timeout, driver.subscriber.connect()).await;
        if let Err(err) = connected {
            self.connect_failed(&err);
            close_polling(driver.subscriber.as_mut()).await;
            return false;
        }
        self.connected();

        ctx.spawn(poll_loop(driver, ctx.token().clone()));
        true
    }

    async fn start_push(&self, mut subscriber: Box<dyn PushSubscriber>, ctx: &ShutdownContext) -> bool {
        let connected = bounded_connect(self.connect_timeout, subscriber.connect()).await;
        if let Err(err) = connected {
            self.connect_failed(&err);
            if let Err(err) = subscriber.close().await {
                close_failed(&err);
            }
            return false;
        }
        self.connected();

        subscriber.subscribe(ctx).await
    }

    fn connected(&self) {
        info!(
            event = events::SUBSCRIBER_CONNECT_OK,
            component = COMPONENT,
            stream_type = self.stream.stream_type.as_str(),
            "subscriber connected"
        );
    }

    fn connect_failed(&self, err: &SubscriberError) {
        error!(
            event = events::SUBSCRIBER_CONNECT_FAILED,
            component = COMPONENT,
            stream_type = self.stream.stream_type.as_str(),
            err = %err,
            "unable to connect subscriber"
        );
    }
}

#[async_trait]
impl BootstrapHandler for Subscription {
    fn name(&self) -> &str {
        COMPONENT
    }

    async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool {
        let Some(publisher) = self.publisher.take() else {
            error!(
                event = events::SUBSCRIBER_BUILD_FAILED,
                component = COMPONENT,
                err = %SubscriberError::AlreadySubscribed,
                "subscription cannot start twice"
            );
            return false;
        };

        let subscriber = match self.factory.build(&self.stream, publisher) {
            Ok(subscriber) => subscriber,
            Err(err) => {
                error!(
                    event = events::SUBSCRIBER_BUILD_FAILED,
                    component = COMPONENT,
                    stream_type = self.stream.stream_type.as_str(),
                    err = %err,
                    "unable to build subscriber"
                );
                return false;
            }
        };

        match subscriber {
            StreamSubscriber::Polling(driver) => self.start_polling(driver, ctx).await,
            StreamSubscriber::Push(subscriber) => self.start_push(subscriber, ctx).await,
        }
    }
}

async fn bounded_connect(
    limit: Duration,
    connect: impl Future<Output = Result<(), SubscriberError>>,
) -> Result<(), SubscriberError> {
    tokio::time::timeout(limit, connect)
        .await
        .unwrap_or(Err(SubscriberError::Timeout(limit)))
}

/// Reads until cancelled, forwarding every message; then closes the channel and
/// the subscriber.
async fn poll_loop(driver: PollingDriver, token: CancellationToken) {
    let PollingDriver {
        mut subscriber,
        publisher,
        poll_interval,
    } = driver;

    'poll: loop {
        let batch = tokio::select! {
            _ = token.cancelled() => break,
            batch = subscriber.read() => batch,
        };

        match batch {
            Ok(messages) => {
                for message in messages {
                    if publisher.send(message).await.is_err() {
                        warn!(
                            event = events::SUBSCRIBER_CHANNEL_CLOSED,
                            component = COMPONENT,
                            "no consumer left; stopping poll loop"
                        );
                        break 'poll;
                    }
                }
            }
            Err(err) => error!(
                event = events::SUBSCRIBER_READ_FAILED,
                component = COMPONENT,
                err = %err,
                "read failed"
            ),
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    drop(publisher);
    info!(
        event = events::SHUTDOWN_RECEIVED,
        component = COMPONENT,
        "shutdown received"
    );
    close_polling(subscriber.as_mut()).await;
}

async fn close_polling(subscriber: &mut dyn PollingSubscriber) {
    match subscriber.close().await {
        Ok(()) => debug!(
            event = events::SUBSCRIBER_CLOSE_OK,
            component = COMPONENT,
            "subscriber closed"
        ),
        Err(err) => close_failed(&err),
    }
}

fn close_failed(err: &SubscriberError) {
    warn!(
        event = events::SUBSCRIBER_CLOSE_FAILED,
        component = COMPONENT,
        err = %err,
        "unable to close subscriber"
    );
}
