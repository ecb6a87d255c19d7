// Lenient parser for advisor replies. Models wrap JSON in prose or code fences
// and quote numbers inconsistently, so every numeric field accepts either form.
use serde_json::{Map, Value};
use shared::models::Recommendation;

use crate::error::{EngineError, Result};

pub fn parse_recommendation(content: &str) -> Result<Recommendation> {
    let json = extract_object(content)
        .ok_or_else(|| EngineError::AdvisoryError("no JSON object in advisor response".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| EngineError::AdvisoryError(format!("malformed JSON in advisor response: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(EngineError::AdvisoryError("advisor response is not a JSON object".to_string()));
    };

    Ok(Recommendation {
        analysis_text: text(&fields, "analysis"),
        support: number(fields.get("support")).unwrap_or(0.0),
        resistance: number(fields.get("resistance")).unwrap_or(0.0),
        buy_levels: levels(&fields, "buyLevels"),
        sell_levels: levels(&fields, "sellLevels"),
        confidence_label: text(&fields, "confidence"),
        risk_label: text(&fields, "riskLevel"),
        recommended_budget: text(&fields, "recommendedBudget"),
        max_position_size: text(&fields, "maxPositionSize"),
        gap_strategy: text(&fields, "gapStrategy"),
    })
}

/// Outermost `{...}` after stripping Markdown fences.
fn extract_object(content: &str) -> Option<&str> {
    let mut body = content.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string (`json`) up to the first newline.
        body = rest.split_once('\n').map_or(rest, |(_, after)| after);
        body = body.trim_end().strip_suffix("```").unwrap_or(body);
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Strings as-is, numbers in their JSON form, anything else empty.
fn text(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parseable entries in order; the rest are dropped.
fn levels(fields: &Map<String, Value>, key: &str) -> Vec<f64> {
    match fields.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(|v| number(Some(v))).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply_with_mixed_number_encodings() {
        let reply = r#"```json
{
  "analysis": "range-bound",
  "support": "0.0185",
  "resistance": 0.0231,
  "buyLevels": [0.019, "0.0188", 0.0186, "0.0184", 0.0182],
  "sellLevels": ["0.0212", 0.0215, 0.0218, 0.0221, "0.0224"],
  "confidence": "Medium",
  "riskLevel": "High",
  "maxPositionSize": "20%",
  "recommendedBudget": 80,
  "gapStrategy": "ATR spaced"
}
```"#;
        let rec = parse_recommendation(reply).unwrap();
        assert_eq!(rec.support, 0.0185);
        assert_eq!(rec.resistance, 0.0231);
        assert_eq!(rec.buy_levels, vec![0.019, 0.0188, 0.0186, 0.0184, 0.0182]);
        assert_eq!(rec.sell_levels.len(), 5);
        assert_eq!(rec.sell_levels[0], 0.0212);
        assert_eq!(rec.confidence_label, "Medium");
        assert_eq!(rec.risk_label, "High");
        assert_eq!(rec.recommended_budget, "80");
        assert_eq!(rec.max_position_size, "20%");
        assert_eq!(rec.gap_strategy, "ATR spaced");
    }

    #[test]
    fn tolerates_prose_short_arrays_and_bad_entries() {
        let reply = "Here is my grid:\n{\"buyLevels\": [\"abc\", 1.5, null, \"1.4\"], \"sellLevels\": [2.0]} Good luck!";
        let rec = parse_recommendation(reply).unwrap();
        assert_eq!(rec.buy_levels, vec![1.5, 1.4]);
        assert_eq!(rec.sell_levels, vec![2.0]);
        assert_eq!(rec.support, 0.0);
        assert_eq!(rec.analysis_text, "");
    }

    #[test]
    fn missing_object_is_an_advisory_error() {
        let err = parse_recommendation("I cannot help with that.").unwrap_err();
        assert!(matches!(err, EngineError::AdvisoryError(_)));
        let err = parse_recommendation("} backwards {").unwrap_err();
        assert!(matches!(err, EngineError::AdvisoryError(_)));
    }

    #[test]
    fn malformed_json_is_an_advisory_error() {
        let err = parse_recommendation("{\"buyLevels\": [1.0,}").unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
    }
}
