use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Pull the JSON object out of a model reply.
///
/// The whole reply is tried first. Models often wrap the object in prose or a
/// ```json fence, so on failure the span from the first `{` to the last `}`
/// is parsed instead. Anything else is a parse error carrying the raw text.
pub fn extract_object(raw: &str) -> Result<Map<String, Value>> {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(obj);
    }

    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(parse_error("no JSON object found in reply", raw));
    };
    if end <= start {
        return Err(parse_error("no JSON object found in reply", raw));
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(_) => Err(parse_error("reply JSON is not an object", raw)),
        Err(e) => Err(parse_error(&e.to_string(), raw)),
    }
}

fn parse_error(reason: &str, raw: &str) -> AppError {
    AppError::Parse {
        reason: reason.to_string(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ: &str = r#"{"verdict":"BUY","market_price":42.5,"notes":{"a":1}}"#;

    #[test]
    fn bare_object_parses_directly() {
        let obj = extract_object(OBJ).unwrap();
        assert_eq!(obj["verdict"], "BUY");
        assert_eq!(obj["market_price"], 42.5);
    }

    #[test]
    fn fenced_and_prose_wrapped_replies_match_bare() {
        let bare = extract_object(OBJ).unwrap();
        let fenced = extract_object(&format!("```json\n{OBJ}\n```")).unwrap();
        let prose = extract_object(&format!("Here is my analysis:\n{OBJ}\nGood luck!")).unwrap();
        assert_eq!(fenced, bare);
        assert_eq!(prose, bare);
    }

    #[test]
    fn reply_without_braces_is_parse_error_with_raw_text() {
        let raw = "I could not identify this item.";
        match extract_object(raw) {
            Err(AppError::Parse { raw: r, .. }) => assert_eq!(r, raw),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn broken_object_is_parse_error() {
        assert!(matches!(
            extract_object("result: {\"verdict\": BUY}"),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn reversed_braces_are_parse_error() {
        assert!(matches!(extract_object("} nothing {"), Err(AppError::Parse { .. })));
    }

    #[test]
    fn top_level_array_falls_back_to_brace_span() {
        let obj = extract_object(r#"[{"verdict":"PASS"}]"#).unwrap();
        assert_eq!(obj["verdict"], "PASS");
    }
}
