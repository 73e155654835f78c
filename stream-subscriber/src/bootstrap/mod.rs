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

//! Bootstrap runner.
//!
//! Wires a shutdown signal to a shared [`CancellationToken`], invokes every
//! registered [`BootstrapHandler`] in order and waits until every task spawned
//! through the [`ShutdownContext`] has exited.
//!
//! ```text
//! Bootstrap::run()
//!   ├─ spawn: select { shutdown signal => token.cancel(), token.cancelled() }
//!   ├─ handler[0].bootstrap(&ctx) -> true    (spawns tracked tasks)
//!   ├─ handler[1].bootstrap(&ctx) -> false   => token.cancel(), stop
//!   ├─ tracker.close()
//!   └─ tracker.wait()                        (optionally bounded by a grace period)
//! ```
//!
//! ```
//! use async_trait::async_trait;
//! use stream_subscriber::bootstrap::{Bootstrap, BootstrapHandler, ShutdownContext};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Ticker;
//!
//! #[async_trait]
//! impl BootstrapHandler for Ticker {
//!     fn name(&self) -> &str {
//!         "ticker"
//!     }
//!
//!     async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool {
//!         let token = ctx.token().clone();
//!         ctx.spawn(async move { token.cancelled().await });
//!         true
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let token = CancellationToken::new();
//! let stopper = token.clone();
//! tokio::spawn(async move { stopper.cancel() });
//!
//! Bootstrap::new(token)
//!     .with_shutdown_signal(std::future::pending())
//!     .with_handler(Ticker)
//!     .run()
//!     .await
//!     .unwrap();
//! # });
//! ```

mod os_signals;

use crate::error::BootstrapError;
use crate::observability::events;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "bootstrap";

type ShutdownSignal = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

/// Shared cancellation token plus the join registry every spawned task belongs to.
#[derive(Clone)]
pub struct ShutdownContext {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            tracker: TaskTracker::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests cooperative shutdown of every task. Cancellation is permanent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Spawns `task` on the runtime; it is registered with the join registry before it runs.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of spawned tasks that have not exited yet.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }
}

/// A startup routine.
///
/// Returns `true` if the handler started successfully. Any concurrent work must be
/// spawned through [`ShutdownContext::spawn`] and must end once the token is cancelled.
#[async_trait]
pub trait BootstrapHandler: Send {
    fn name(&self) -> &str;

    async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool;
}

/// Runs a list of handlers under one shared cancellation token.
pub struct Bootstrap {
    token: CancellationToken,
    handlers: Vec<Box<dyn BootstrapHandler>>,
    shutdown_signal: ShutdownSignal,
    shutdown_grace: Option<Duration>,
}

impl Bootstrap {
    /// Creates a runner that cancels `token` on SIGINT/SIGTERM/SIGQUIT/Ctrl-C.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            handlers: Vec::new(),
            shutdown_signal: Box::pin(os_signals::wait_for_shutdown_signal()),
            shutdown_grace: None,
        }
    }

    pub fn with_handler(mut self, handler: impl BootstrapHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn with_handlers(mut self, handlers: Vec<Box<dyn BootstrapHandler>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Replaces the OS signal source with any future; completion triggers shutdown.
    pub fn with_shutdown_signal<F>(mut self, signal: F) -> Self
    where
        F: Future<Output = std::io::Result<()>> + Send + 'static,
    {
        self.shutdown_signal = Box::pin(signal);
        self
    }

    /// Bounds how long the runner waits for tasks once shutdown has been requested.
    pub fn with_shutdown_grace(mut self, grace: Option<Duration>) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Starts every handler and blocks until all spawned tasks have exited.
    pub async fn run(self) -> Result<(), BootstrapError> {
        let ctx = ShutdownContext::new(self.token);
        translate_interrupt_to_cancel(&ctx, self.shutdown_signal);

        let mut failed_handler = None;
        for mut handler in self.handlers {
            let name = handler.name().to_string();
            debug!(
                event = events::BOOTSTRAP_HANDLER_START,
                component = COMPONENT,
                handler = name.as_str(),
                "starting bootstrap handler"
            );

            if handler.bootstrap(&ctx).await {
                debug!(
                    event = events::BOOTSTRAP_HANDLER_OK,
                    component = COMPONENT,
                    handler = name.as_str(),
                    "bootstrap handler started"
                );
            } else {
                error!(
                    event = events::BOOTSTRAP_HANDLER_FAILED,
                    component = COMPONENT,
                    handler = name.as_str(),
                    "bootstrap handler failed; cancelling"
                );
                ctx.cancel();
                failed_handler = Some(name);
                break;
            }
        }

        wait_for_tasks(&ctx, self.shutdown_grace).await?;

        match failed_handler {
            Some(handler) => Err(BootstrapError::HandlerFailed { handler }),
            None => Ok(()),
        }
    }
}

/// Spawns the watcher that turns the shutdown signal into a cancellation.
///
/// The watcher exits on whichever comes first, so it never outlives the token.
fn translate_interrupt_to_cancel(ctx: &ShutdownContext, signal: ShutdownSignal) {
    let token = ctx.token().clone();
    ctx.spawn(async move {
        tokio::select! {
            res = signal => match res {
                Ok(()) => {
                    info!(
                        event = events::SHUTDOWN_SIGNAL_RECEIVED,
                        component = COMPONENT,
                        "shutdown signal received"
                    );
                    token.cancel();
                }
                Err(err) => {
                    error!(
                        event = events::SHUTDOWN_SIGNAL_UNAVAILABLE,
                        component = COMPONENT,
                        err = %err,
                        "unable to listen for shutdown signals"
                    );
                    token.cancelled().await;
                }
            },
            _ = token.cancelled() => {}
        }
    });
}

async fn wait_for_tasks(
    ctx: &ShutdownContext,
    shutdown_grace: Option<Duration>,
) -> Result<(), BootstrapError> {
    ctx.tracker.close();
    debug!(
        event = events::BOOTSTRAP_JOIN_START,
        component = COMPONENT,
        active_tasks = ctx.active_tasks(),
        "waiting for tasks"
    );

    let all_done = ctx.tracker.wait();
    tokio::pin!(all_done);

    match shutdown_grace {
        None => all_done.await,
        Some(grace) => {
            tokio::select! {
                _ = &mut all_done => {}
                _ = async {
                    ctx.cancelled().await;
                    tokio::time::sleep(grace).await;
                } => {
                    warn!(
                        event = events::BOOTSTRAP_GRACE_EXCEEDED,
                        component = COMPONENT,
                        active_tasks = ctx.active_tasks(),
                        grace_ms = grace.as_millis() as u64,
                        "tasks still running after shutdown grace"
                    );
                    return Err(BootstrapError::GraceExceeded(grace));
                }
            }
        }
    }

    debug!(
        event = events::BOOTSTRAP_JOIN_OK,
        component = COMPONENT,
        "all tasks exited"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

    struct Recording {
        name: &'static str,
        succeed: bool,
        invoked: Arc<Mutex<Vec<&'static str>>>,
        cancelled_on_return: Option<Arc<AtomicBool>>,
    }

    #[async_trait]
    impl BootstrapHandler for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool {
            self.invoked.lock().unwrap().push(self.name);
            let token = ctx.token().clone();
            let observed = self.cancelled_on_return.clone();
            ctx.spawn(async move {
                token.cancelled().await;
                if let Some(flag) = observed {
                    flag.store(true, Ordering::SeqCst);
                }
            });
            self.succeed
        }
    }

    fn recording(
        name: &'static str,
        succeed: bool,
        invoked: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Recording {
        Recording {
            name,
            succeed,
            invoked: invoked.clone(),
            cancelled_on_return: None,
        }
    }

    #[tokio::test]
    async fn failing_handler_stops_later_handlers_and_cancels() {
        let invoked = Arc::new(Mutex::new(Vec::new()));
        let first_saw_cancel = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();

        let mut first = recording("first", true, &invoked);
        first.cancelled_on_return = Some(first_saw_cancel.clone());

        let res = timeout(
            LIVENESS_TIMEOUT,
            Bootstrap::new(token.clone())
                .with_shutdown_signal(std::future::pending())
                .with_handler(first)
                .with_handler(recording("second", false, &invoked))
                .with_handler(recording("third", true, &invoked))
                .run(),
        )
        .await
        .expect("runner must not hang after a failed handler");

        assert!(matches!(
            res,
            Err(BootstrapError::HandlerFailed { handler }) if handler == "second"
        ));
        assert_eq!(*invoked.lock().unwrap(), vec!["first", "second"]);
        assert!(token.is_cancelled());
        assert!(first_saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_signal_cancels_and_joins() {
        let invoked = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let (signal_tx, signal_rx) = oneshot::channel::<()>();

        let runner = tokio::spawn(
            Bootstrap::new(token.clone())
                .with_shutdown_signal(async move {
                    let _ = signal_rx.await;
                    Ok(())
                })
                .with_handler(recording("only", true, &invoked))
                .run(),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!token.is_cancelled());
        signal_tx.send(()).expect("runner is listening");

        let res = timeout(LIVENESS_TIMEOUT, runner)
            .await
            .expect("runner exits after signal")
            .expect("runner task not panicked");
        assert!(res.is_ok());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn external_cancellation_releases_signal_watcher() {
        let token = CancellationToken::new();
        token.cancel();

        let res = timeout(
            LIVENESS_TIMEOUT,
            Bootstrap::new(token)
                .with_shutdown_signal(std::future::pending())
                .run(),
        )
        .await
        .expect("watcher exits on cancellation");

        assert!(res.is_ok());
    }

    struct Stubborn;

    #[async_trait]
    impl BootstrapHandler for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn bootstrap(&mut self, ctx: &ShutdownContext) -> bool {
            ctx.spawn(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grace_bounds_wait_for_stuck_tasks() {
        let token = CancellationToken::new();
        token.cancel();

        let res = Bootstrap::new(token)
            .with_shutdown_signal(std::future::pending())
            .with_shutdown_grace(Some(Duration::from_millis(200)))
            .with_handler(Stubborn)
            .run()
            .await;

        assert!(matches!(res, Err(BootstrapError::GraceExceeded(_))));
    }
}
