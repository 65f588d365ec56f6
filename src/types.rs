use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// Body of `POST /analyze-product` exactly as the client sent it.
/// `store_price` and `condition` are kept loose so bad values become a 400
/// with a specific message instead of a generic body error.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnalysisRequest {
    pub image_base64: Option<String>,
    pub image_url: Option<String>,
    pub barcode: Option<String>,
    pub store_price: Option<serde_json::Value>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    #[default]
    Used,
    New,
    NewInBox,
}

impl Condition {
    /// Blank means the default (Used); unknown labels are rejected.
    pub fn parse(s: Option<&str>) -> Option<Self> {
        match s.map(str::trim).unwrap_or("") {
            "" | "Used" => Some(Condition::Used),
            "New" => Some(Condition::New),
            "New in Box" => Some(Condition::NewInBox),
            _ => None,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Condition::Used => "Used",
            Condition::New => "New",
            Condition::NewInBox => "New in Box",
        };
        write!(f, "{s}")
    }
}

/// Image attached to the prompt, already base64 encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// A validated analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Option<InlineImage>,
    pub barcode: Option<String>,
    pub store_price: f64,
    pub condition: Condition,
}

// ---------------------------------------------------------------------------
// Normalized result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Pass,
}

impl Verdict {
    /// Only a case-insensitive "BUY" counts as a buy.
    pub fn from_reply(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.eq_ignore_ascii_case("BUY") => Verdict::Buy,
            _ => Verdict::Pass,
        }
    }
}

/// How quickly the item is expected to resell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityScore {
    High,
    #[default]
    Med,
    Low,
}

impl VelocityScore {
    /// Exact match only; anything else is Med.
    pub fn from_reply(s: Option<&str>) -> Self {
        match s {
            Some("High") => VelocityScore::High,
            Some("Low") => VelocityScore::Low,
            _ => VelocityScore::Med,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    pub market_price: f64,
    pub net_profit: f64,
    pub reasoning: String,
    pub velocity_score: VelocityScore,
    pub product_name: String,
    pub ebay_price: Option<f64>,
    pub amazon_price: Option<f64>,
    pub current_price: Option<f64>,
    pub market_price_source: String,
    pub sales_tax_rate: f64,
    pub sales_tax_amount: f64,
    pub fee_percentage: f64,
    pub fees_amount: f64,
    pub shipping_cost: Option<f64>,
    pub profit_calculation: String,
    pub market_analysis: Option<String>,
    pub product_image_url: Option<String>,
    pub ebay_url: Option<String>,
    pub amazon_url: Option<String>,
    /// Set only when `ebay_url` is null.
    pub ebay_search_url: Option<String>,
    /// Set only when `amazon_url` is null.
    pub amazon_search_url: Option<String>,
}
