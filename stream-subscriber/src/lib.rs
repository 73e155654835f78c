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

//! # stream-subscriber
//!
//! `stream-subscriber` connects to one publish/subscribe backend, decodes the
//! messages it delivers and hands them to local consumers over a bounded channel.
//! Startup, supervision and shutdown of every part run under one cancellation token.
//!
//! ```no_run
//! use stream_subscriber::bootstrap::Bootstrap;
//! use stream_subscriber::config;
//! use stream_subscriber::factory::SubscriberFactory;
//! use stream_subscriber::handlers::{ConsoleWriter, Subscription};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cfg = config::load("CONFIG.json").unwrap();
//! let (publisher, receiver) = tokio::sync::mpsc::channel(cfg.runtime.message_queue_size);
//!
//! let factory = SubscriberFactory::new().with_poll_interval(cfg.runtime.poll_interval());
//! let subscription = Subscription::new(factory, cfg.stream.clone(), publisher)
//!     .with_connect_timeout(cfg.runtime.connect_timeout());
//!
//! Bootstrap::new(CancellationToken::new())
//!     .with_handler(ConsoleWriter::console(receiver))
//!     .with_handler(subscription)
//!     .run()
//!     .await
//!     .unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Config: `ApplicationConfig` decoding and typed backend settings
//! - Subscriber: polling (`read`) and push (callback) backend contracts, MQTT and
//!   encrypted-channel implementations
//! - Factory: backend selection from the stream declaration
//! - Handlers: subscription startup and channel consumers
//! - Bootstrap: signal wiring, ordered handler startup, task join
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with `event` and `component` fields and never
//! installs a global subscriber. Binaries and tests initialize `tracing_subscriber`.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod factory;
pub mod handlers;
pub mod message;
#[doc(hidden)]
pub mod observability;
pub mod subscriber;
