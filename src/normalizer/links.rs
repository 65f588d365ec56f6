use std::time::Duration;

use reqwest::header::USER_AGENT;
use tracing::{debug, warn};
use url::Url;

use crate::config::{AMAZON_SEARCH_URL, EBAY_SEARCH_URL};
use crate::error::Result;
use crate::types::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marketplace {
    Ebay,
    Amazon,
}

impl Marketplace {
    /// Search-results page for `product_name`.
    pub fn search_url(self, product_name: &str) -> String {
        let (base, key) = match self {
            Marketplace::Ebay => (EBAY_SEARCH_URL, "_nkw"),
            Marketplace::Amazon => (AMAZON_SEARCH_URL, "k"),
        };
        match Url::parse(base) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair(key, product_name.trim());
                url.to_string()
            }
            Err(_) => base.to_string(),
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marketplace::Ebay => write!(f, "ebay"),
            Marketplace::Amazon => write!(f, "amazon"),
        }
    }
}

/// Decides whether marketplace links from the model point at live listings.
#[derive(Clone)]
pub struct LinkProber {
    client: reqwest::Client,
    user_agent: String,
    /// When false, well-formed URLs are trusted without a request.
    probe: bool,
}

impl LinkProber {
    pub fn new(probe: bool, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            probe,
        })
    }

    /// Verify both links concurrently. A link that fails is nulled and the
    /// matching search URL is filled in; a link that passes clears it.
    pub async fn resolve(&self, result: &mut AnalysisResult) {
        let (ebay, amazon) = tokio::join!(
            self.check(Marketplace::Ebay, result.ebay_url.as_deref()),
            self.check(Marketplace::Amazon, result.amazon_url.as_deref()),
        );

        result.ebay_search_url = ebay
            .is_none()
            .then(|| Marketplace::Ebay.search_url(&result.product_name));
        result.ebay_url = ebay;

        result.amazon_search_url = amazon
            .is_none()
            .then(|| Marketplace::Amazon.search_url(&result.product_name));
        result.amazon_url = amazon;
    }

    async fn check(&self, market: Marketplace, candidate: Option<&str>) -> Option<String> {
        let candidate = candidate?;
        let url = match Url::parse(candidate) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => {
                debug!(%market, url = candidate, "listing URL is not an absolute http(s) URL");
                return None;
            }
        };
        if !self.probe {
            return Some(candidate.to_string());
        }
        if self.is_live(market, url).await {
            Some(candidate.to_string())
        } else {
            None
        }
    }

    /// Single GET, redirects followed; live means a final status in [200, 400).
    async fn is_live(&self, market: Marketplace, url: Url) -> bool {
        match self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let live = (200..400).contains(&status);
                if !live {
                    warn!(%market, %url, status, "listing probe failed, using search fallback");
                }
                live
            }
            Err(e) => {
                warn!(%market, %url, "listing probe error, using search fallback: {e}");
                false
            }
        }
    }
}
