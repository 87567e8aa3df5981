//! Tenant isolation layer.
//!
//! Responsibilities:
//! - Company-scoped transport credential loading (one company must never be
//!   able to send through another company's SMTP/telephony/LinkedIn account).
//! - Minimal in-memory tenant-channel scoping primitives to prevent cross-
//!   company state bleed in pollers and dispatchers.

use anyhow::{anyhow, Context, Result};
use engage_schemas::Channel;
use serde_json::Value;
use std::collections::BTreeMap;

/// Tenant identity as it appears in config (a stable slug, not the DB uuid).
/// Config is authored by hand and checked into version control; the slug is
/// what operators type, the uuid in `engage-schemas::CompanyId` is what the
/// database uses. The two are joined at config-load time by the caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TenantSlug(pub String);

impl TenantSlug {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-tenant, per-channel credential isolation policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelIsolation {
    pub channel: Channel,
    /// Env var name holding this tenant+channel's API key.
    pub api_key_env: String,
}

impl ChannelIsolation {
    /// Build from canonical config JSON at `/companies/<slug>/transports/<channel>`.
    ///
    /// Required: `.api_key_env`.
    ///
    /// The env var name must contain the tenant slug token, so that two
    /// tenants on the same channel cannot be configured to point at the same
    /// credential by a copy-paste mistake.
    pub fn from_config_json(
        cfg: &Value,
        slug: &TenantSlug,
        channel: Channel,
    ) -> Result<Self> {
        let pointer = format!("/companies/{}/transports/{}/api_key_env", slug.as_str(), channel.as_str());
        let api_key_env = cfg
            .pointer(&pointer)
            .and_then(Value::as_str)
            .with_context(|| format!("config missing {pointer}"))?;

        let token = slug.as_str().to_ascii_uppercase();
        if !api_key_env.to_ascii_uppercase().contains(&token) {
            return Err(anyhow!(
                "transports.{}.api_key_env must include tenant token '{token}' (got '{api_key_env}')",
                channel.as_str()
            ));
        }

        Ok(Self {
            channel,
            api_key_env: api_key_env.to_string(),
        })
    }

    /// Load the credential from the environment using the tenant-scoped env var name.
    pub fn load_api_key_from_env(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .with_context(|| format!("missing env {}", self.api_key_env))
    }
}

/// Minimal (tenant, channel)-keyed store to avoid cross-tenant state bleed
/// in-memory (poller claim batches, per-tenant counters, adapter handles).
#[derive(Clone, Debug)]
pub struct TenantStore<T> {
    inner: BTreeMap<(TenantSlug, Channel), T>,
}

impl<T> Default for TenantStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TenantStore<T> {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, slug: TenantSlug, channel: Channel, value: T) {
        self.inner.insert((slug, channel), value);
    }

    pub fn get(&self, slug: &TenantSlug, channel: Channel) -> Option<&T> {
        self.inner.get(&(slug.clone(), channel))
    }

    pub fn get_mut(&mut self, slug: &TenantSlug, channel: Channel) -> Option<&mut T> {
        self.inner.get_mut(&(slug.clone(), channel))
    }
}
