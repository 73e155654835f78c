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

use clap::Parser;
use std::error::Error;
use stream_subscriber::bootstrap::Bootstrap;
use stream_subscriber::config::{self, LoggingInfo};
use stream_subscriber::factory::SubscriberFactory;
use stream_subscriber::handlers::{ConsoleWriter, Subscription};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Subscribes to a configured stream and writes its messages to the log")]
struct SubscriberArgs {
    /// Path to a `.json` or `.json5` configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

fn log_filter(logging: &LoggingInfo) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.min_log_level))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = SubscriberArgs::parse();
    let cfg = config::load(&args.config)?;
    cfg.validate()?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&cfg.logging))
        .try_init();

    info!(config = cfg.as_string().as_str(), "Started configurable-subscriber");

    let (publisher, receiver) = mpsc::channel(cfg.runtime.message_queue_size);

    let factory = SubscriberFactory::new().with_poll_interval(cfg.runtime.poll_interval());
    let subscription = Subscription::new(factory, cfg.stream.clone(), publisher)
        .with_connect_timeout(cfg.runtime.connect_timeout());

    // Consumer first, so the channel is drained as soon as the subscriber produces.
    Bootstrap::new(CancellationToken::new())
        .with_shutdown_grace(cfg.runtime.shutdown_grace())
        .with_handler(ConsoleWriter::console(receiver))
        .with_handler(subscription)
        .run()
        .await?;

    info!("configurable-subscriber stopped");
    Ok(())
}
