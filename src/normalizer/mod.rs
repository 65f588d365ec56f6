pub mod coerce;
pub mod extract;
pub mod links;
pub mod schema;

pub use links::LinkProber;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::AnalysisResult;

/// Turns a raw model reply into an `AnalysisResult`.
///
/// Pipeline: extract object → optional schema check → coerce → resolve links.
/// Extraction and schema failures are terminal for the request.
#[derive(Clone)]
pub struct Normalizer {
    validate_schema: bool,
    links: LinkProber,
}

impl Normalizer {
    pub fn new(validate_schema: bool, links: LinkProber) -> Self {
        Self { validate_schema, links }
    }

    pub async fn normalize(&self, raw: &str, store_price: f64) -> Result<AnalysisResult> {
        let obj = extract::extract_object(raw).inspect_err(|e| {
            warn!("model reply rejected: {e}");
        })?;

        if self.validate_schema {
            schema::validate(&obj, raw).inspect_err(|e| {
                warn!("model reply rejected: {e}");
            })?;
        }

        let mut result = coerce::coerce(&obj, store_price);
        self.links.resolve(&mut result).await;

        debug!(
            verdict = ?result.verdict,
            market_price = result.market_price,
            net_profit = result.net_profit,
            ebay_link = result.ebay_url.is_some(),
            amazon_link = result.amazon_url.is_some(),
            "reply normalized"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::types::{Verdict, VelocityScore};
    use std::time::Duration;

    fn normalizer(validate_schema: bool) -> Normalizer {
        let links = LinkProber::new(false, Duration::from_secs(1), "test-agent").expect("prober");
        Normalizer::new(validate_schema, links)
    }

    const REPLY: &str = r#"Sure! Here's the analysis:
```json
{
  "verdict": "buy",
  "market_price": 64.0,
  "net_profit": 31.5,
  "product_name": "Pyrex 4-Cup Measuring Glass",
  "velocity_score": "High",
  "ebay_url": "https://www.ebay.com/itm/1111",
  "shipping_cost": 8
}
```"#;

    #[tokio::test]
    async fn wrapped_reply_normalizes() {
        let r = normalizer(true).normalize(REPLY, 12.0).await.unwrap();
        assert_eq!(r.verdict, Verdict::Buy);
        assert_eq!(r.velocity_score, VelocityScore::High);
        assert_eq!(r.market_price, 64.0);
        assert!((r.sales_tax_amount - 0.96).abs() < 1e-9);
        assert!((r.fees_amount - 9.6).abs() < 1e-9);
        assert_eq!(r.ebay_url.as_deref(), Some("https://www.ebay.com/itm/1111"));
        assert!(r.ebay_search_url.is_none());
        assert!(r.amazon_url.is_none());
        assert!(r
            .amazon_search_url
            .as_deref()
            .is_some_and(|u| u.contains("Pyrex+4-Cup+Measuring+Glass")));
        assert!(r.profit_calculation.ends_with("- $8.00 shipping = $31.50 profit"));
    }

    #[tokio::test]
    async fn schema_check_is_optional() {
        let sparse = r#"{"verdict":"PASS"}"#;
        assert!(matches!(
            normalizer(true).normalize(sparse, 5.0).await,
            Err(AppError::Schema { .. })
        ));
        let r = normalizer(false).normalize(sparse, 5.0).await.unwrap();
        assert_eq!(r.product_name, "Unknown Product");
    }

    #[tokio::test]
    async fn unparsable_reply_keeps_raw_text() {
        let raw = "The image is too blurry to identify.";
        match normalizer(false).normalize(raw, 5.0).await {
            Err(AppError::Parse { raw: r, .. }) => assert_eq!(r, raw),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
