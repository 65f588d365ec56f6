use serde_json::{Map, Value};

use crate::config::defaults;
use crate::types::{AnalysisResult, Verdict, VelocityScore};

/// Coerce a parsed reply into the result shape, filling defaults and derived
/// amounts. `ebay_url`/`amazon_url` are copied through unverified; link
/// resolution happens afterwards.
pub fn coerce(obj: &Map<String, Value>, store_price: f64) -> AnalysisResult {
    let verdict = Verdict::from_reply(obj.get("verdict").and_then(Value::as_str));
    let market_price = number(obj.get("market_price")).unwrap_or(0.0);
    let net_profit = number(obj.get("net_profit")).unwrap_or(0.0);

    // The prompt asks for `velocity_score`; replies spelled `velocityScore` are accepted too.
    let velocity_score = VelocityScore::from_reply(
        obj.get("velocity_score")
            .or_else(|| obj.get("velocityScore"))
            .and_then(Value::as_str),
    );

    let ebay_price = price(obj.get("ebay_price"));
    let amazon_price = price(obj.get("amazon_price"));
    let current_price = price(obj.get("current_price"));
    let shipping_cost = price(obj.get("shipping_cost"));

    let sales_tax_rate = number(obj.get("sales_tax_rate")).unwrap_or(defaults::SALES_TAX_RATE);
    let sales_tax_amount = number(obj.get("sales_tax_amount"))
        .unwrap_or(store_price * sales_tax_rate / 100.0);
    let fee_percentage = number(obj.get("fee_percentage")).unwrap_or(defaults::FEE_PERCENTAGE);
    let fees_amount = number(obj.get("fees_amount")).unwrap_or(market_price * defaults::FEE_RATIO);

    let profit_calculation = text(obj.get("profit_calculation")).unwrap_or_else(|| {
        profit_sentence(&ProfitBreakdown {
            market_price,
            store_price,
            sales_tax_amount,
            sales_tax_rate,
            fees_amount,
            fee_percentage,
            shipping_cost,
            net_profit,
        })
    });

    AnalysisResult {
        verdict,
        market_price,
        net_profit,
        reasoning: text(obj.get("reasoning")).unwrap_or_else(|| defaults::REASONING.to_string()),
        velocity_score,
        product_name: text(obj.get("product_name"))
            .unwrap_or_else(|| defaults::PRODUCT_NAME.to_string()),
        ebay_price,
        amazon_price,
        current_price,
        market_price_source: text(obj.get("market_price_source"))
            .unwrap_or_else(|| defaults::MARKET_PRICE_SOURCE.to_string()),
        sales_tax_rate,
        sales_tax_amount,
        fee_percentage,
        fees_amount,
        shipping_cost,
        profit_calculation,
        market_analysis: text(obj.get("market_analysis")),
        product_image_url: text(obj.get("product_image_url")),
        ebay_url: text(obj.get("ebay_url")),
        amazon_url: text(obj.get("amazon_url")),
        ebay_search_url: None,
        amazon_search_url: None,
    }
}

pub struct ProfitBreakdown {
    pub market_price: f64,
    pub store_price: f64,
    pub sales_tax_amount: f64,
    pub sales_tax_rate: f64,
    pub fees_amount: f64,
    pub fee_percentage: f64,
    pub shipping_cost: Option<f64>,
    pub net_profit: f64,
}

/// `$80.00 market price - $9.99 buy price - $0.80 sales tax (8%) - $12.00 fees (15%) - $7.00 shipping = $50.21 profit`
pub fn profit_sentence(p: &ProfitBreakdown) -> String {
    let shipping = p
        .shipping_cost
        .map(|s| format!(" - ${s:.2} shipping"))
        .unwrap_or_default();
    format!(
        "${:.2} market price - ${:.2} buy price - ${:.2} sales tax ({}%) - ${:.2} fees ({}%){} = ${:.2} profit",
        p.market_price,
        p.store_price,
        p.sales_tax_amount,
        p.sales_tax_rate,
        p.fees_amount,
        p.fee_percentage,
        shipping,
        p.net_profit,
    )
}

/// JSON numbers as-is, strings by their leading float (`"12.5 USD"` → 12.5).
fn number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_float(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Optional prices: zero means the model could not find one.
fn price(v: Option<&Value>) -> Option<f64> {
    number(v).filter(|n| *n != 0.0)
}

/// Non-blank string fields.
fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let mut digits = false;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
        digits = true;
    }
    if i < b.len() && b[i] == b'.' {
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
            digits = true;
        }
    }
    if !digits {
        return None;
    }
    let mut end = i;
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }
    s[..end].parse().ok()
}
