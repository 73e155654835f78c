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

//! HTTP handshake with the channel author.

use crate::config::ServiceInfo;
use crate::error::SubscriberError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const COMPONENT: &str = "streams_author";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const ANNOUNCEMENT_PATH: &str = "get_announcement_id";
const SUBSCRIBE_PATH: &str = "subscribe";

/// Subscription message link and public key handed to the author.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    #[serde(rename = "msgid")]
    pub msg_id: String,
    pub pk: String,
}

#[derive(Deserialize)]
struct AnnouncementResponse {
    announcement_id: String,
}

/// The author side of the channel handshake.
#[async_trait]
pub trait SubscriptionAuthor: Send + Sync {
    /// Fetches the id of the channel announcement message.
    async fn announcement_id(&self) -> Result<String, SubscriberError>;

    /// Hands the subscription request to the author so it can issue a keyload.
    async fn send_subscription(&self, request: &SubscriptionRequest)
        -> Result<(), SubscriberError>;
}

pub struct HttpAuthor {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthor {
    pub fn new(provider: &ServiceInfo) -> Result<Self, SubscriberError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            base_url: provider.uri(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SubscriptionAuthor for HttpAuthor {
    async fn announcement_id(&self) -> Result<String, SubscriberError> {
        let url = self.endpoint(ANNOUNCEMENT_PATH);
        debug!(component = COMPONENT, url = url.as_str(), "GET announcement id");

        let response: AnnouncementResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(
            component = COMPONENT,
            announcement_id = response.announcement_id.as_str(),
            "announcement response"
        );
        Ok(response.announcement_id)
    }

    async fn send_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<(), SubscriberError> {
        let url = self.endpoint(SUBSCRIBE_PATH);
        debug!(
            component = COMPONENT,
            url = url.as_str(),
            msg_id = request.msg_id.as_str(),
            "sending subscription request"
        );

        self.client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Creates the [`SubscriptionAuthor`] for a configured author endpoint.
pub trait AuthorBuilder: Send + Sync {
    fn build(&self, provider: &ServiceInfo) -> Result<Box<dyn SubscriptionAuthor>, SubscriberError>;
}

#[derive(Default, Clone, Copy)]
pub struct HttpAuthorBuilder;

impl AuthorBuilder for HttpAuthorBuilder {
    fn build(&self, provider: &ServiceInfo) -> Result<Box<dyn SubscriptionAuthor>, SubscriberError> {
        Ok(Box::new(HttpAuthor::new(provider)?))
    }
}
