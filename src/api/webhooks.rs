//! Webhook endpoints, with local validation of target URLs and event types.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use url::{Host, Url};

use crate::error::Error;
use crate::http::Client;

/// Event types the API accepts for webhook subscriptions.
pub const VALID_WEBHOOK_EVENTS: &[&str] = &[
    "submission.created",
    "submission.completed",
    "submission.archived",
    "form.viewed",
    "form.started",
    "form.completed",
    "template.created",
    "template.updated",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateWebhookRequest {
    pub url: String,
    pub events: Vec<String>,
}

/// Partial update; unset fields are left untouched server-side.
///
/// An empty `events` list counts as unset and is never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateWebhookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "no_events")]
    pub events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

fn no_events(events: &Option<Vec<String>>) -> bool {
    events.as_ref().is_none_or(|e| e.is_empty())
}

/// Rejects URLs that are malformed, not http(s), or point at internal hosts.
pub fn validate_webhook_url(raw: &str) -> Result<(), Error> {
    let url = Url::parse(raw).map_err(|_| Error::validation("url", "invalid URL format"))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::validation(
            "url",
            "URL must use http or https scheme",
        ));
    }

    let ip = match url.host() {
        Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
            return Err(Error::validation("url", "localhost not allowed"));
        }
        Some(Host::Domain(_)) => None,
        None => return Err(Error::validation("url", "invalid URL format")),
    };

    if ip.is_some_and(is_internal) {
        return Err(Error::validation(
            "url",
            "private/loopback IP addresses not allowed",
        ));
    }
    Ok(())
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        // ::ffff:a.b.c.d is the embedded IPv4 host.
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(v4),
            None => v6.is_loopback() || v6.is_unique_local() || v6.is_unicast_link_local(),
        },
    }
}

fn is_internal_v4(v4: Ipv4Addr) -> bool {
    v4.is_loopback() || v4.is_private() || v4.is_link_local()
}

pub fn validate_webhook_events(events: &[String]) -> Result<(), Error> {
    if events.is_empty() {
        return Err(Error::validation(
            "events",
            "at least one event type required",
        ));
    }
    match events
        .iter()
        .find(|e| !VALID_WEBHOOK_EVENTS.contains(&e.as_str()))
    {
        Some(bad) => Err(Error::validation(
            "events",
            format!("unsupported event type: {}", bad),
        )),
        None => Ok(()),
    }
}

impl Client {
    /// Lists webhooks. Zero-valued paging arguments are omitted.
    #[tracing::instrument(skip(self))]
    pub async fn list_webhooks(
        &self,
        limit: u32,
        after: u64,
        before: u64,
    ) -> Result<Vec<Webhook>, Error> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if limit > 0 {
            query.append_pair("limit", &limit.to_string());
        }
        if after > 0 {
            query.append_pair("after", &after.to_string());
        }
        if before > 0 {
            query.append_pair("before", &before.to_string());
        }
        let query = query.finish();

        let path = if query.is_empty() {
            "/webhooks".to_string()
        } else {
            format!("/webhooks?{}", query)
        };
        Ok(self.get(&path).await?.unwrap_or_default())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_webhook(&self, id: u64) -> Result<Option<Webhook>, Error> {
        self.get(&format!("/webhooks/{}", id)).await
    }

    #[tracing::instrument(skip(self, req))]
    pub async fn create_webhook(
        &self,
        req: &CreateWebhookRequest,
    ) -> Result<Option<Webhook>, Error> {
        validate_webhook_url(&req.url)?;
        validate_webhook_events(&req.events)?;
        self.post("/webhooks", req).await
    }

    #[tracing::instrument(skip(self, req))]
    pub async fn update_webhook(
        &self,
        id: u64,
        req: &UpdateWebhookRequest,
    ) -> Result<Option<Webhook>, Error> {
        if let Some(url) = req.url.as_deref() {
            validate_webhook_url(url)?;
        }
        if let Some(events) = req.events.as_deref().filter(|e| !e.is_empty()) {
            validate_webhook_events(events)?;
        }
        self.put(&format!("/webhooks/{}", id), req).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_webhook(&self, id: u64) -> Result<(), Error> {
        self.delete::<serde::de::IgnoredAny>(&format!("/webhooks/{}", id))
            .await?;
        Ok(())
    }
}
