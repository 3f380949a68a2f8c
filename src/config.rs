//! Endpoint configuration: which store to query and with what credential.

use crate::error::{MetricsError, Result};
use std::fmt;

pub const DEFAULT_API_VERSION: &str = "2025-01";
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Destination identity plus credential for the analytics API.
#[derive(Clone)]
pub struct EndpointContext {
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    /// Full GraphQL URL, overriding the one derived from the shop domain
    pub endpoint_url: Option<String>,
}

impl EndpointContext {
    pub fn new(shop_domain: &str, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: normalize_shop_domain(shop_domain),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            endpoint_url: None,
        }
    }

    pub fn with_shop_domain(mut self, shop_domain: &str) -> Self {
        self.shop_domain = normalize_shop_domain(shop_domain);
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Load from environment variables. `.env` is read once by the binary.
    ///
    /// * `STOREFRONT_SHOP_DOMAIN` - required
    /// * `STOREFRONT_ACCESS_TOKEN` - required
    /// * `STOREFRONT_API_VERSION` - defaults to `DEFAULT_API_VERSION`
    /// * `STOREFRONT_ENDPOINT_URL` - optional full URL override
    pub fn from_env() -> Result<Self> {
        let shop_domain = required_var("STOREFRONT_SHOP_DOMAIN")?;
        let access_token = required_var("STOREFRONT_ACCESS_TOKEN")?;
        let api_version = std::env::var("STOREFRONT_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        let mut ctx = Self::new(&shop_domain, access_token).with_api_version(api_version);
        if let Ok(url) = std::env::var("STOREFRONT_ENDPOINT_URL") {
            if !url.trim().is_empty() {
                ctx = ctx.with_endpoint_url(url.trim());
            }
        }
        Ok(ctx)
    }

    pub fn graphql_url(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}/admin/api/{}/graphql.json",
                self.shop_domain, self.api_version
            ),
        }
    }
}

impl fmt::Debug for EndpointContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointContext")
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(MetricsError::Config(format!("{} is not set", name))),
    }
}

fn normalize_shop_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}
