//! Lenient parsing of oracle text into validated domain values.
//!
//! Model output is treated as untrusted: fences are stripped, the outermost
//! JSON object is located, trailing commas are tolerated and every field is
//! normalized. Only the absence of any usable JSON object is an error.

use serde_json::{Map, Value};

use crate::domain::models::persona::MAX_ANALYSIS_POINTS_LEN;
use crate::domain::models::{
    clamp_score, CompetitorComparison, Evaluation, Finding, PersonaCategory, PersonaDraft,
    QuickScan, Severity,
};
use crate::domain::ports::OracleError;

/// Findings beyond this count are dropped.
pub const MAX_FINDINGS: usize = 10;

/// Locate and parse the JSON object in a model reply.
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = strip_code_fence(text.trim());
    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    let object = outermost_object(cleaned)?;
    if let Ok(value) = serde_json::from_str::<Value>(object) {
        return Some(value);
    }
    serde_json::from_str::<Value>(&remove_trailing_commas(object)).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let mut s = text;
    if let Some(rest) = s.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        s = rest.trim_start();
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest.trim_end();
    }
    s
}

/// Slice from the first `{` to its matching `}`.
fn outermost_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas that directly precede `}` or `]`, outside string literals.
fn remove_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn object(text: &str) -> Result<Map<String, Value>, OracleError> {
    match extract_json(text) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(OracleError::Malformed("expected a JSON object".to_string())),
        None => Err(OracleError::Malformed("no JSON object in response".to_string())),
    }
}

/// First present, non-null field among `keys`.
fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn score_of(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    };
    clamp_score(raw)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| text_of(Some(v)))
            .filter(|s| !s.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Normalize a raw findings array.
pub fn validate_findings(value: Option<&Value>) -> Vec<Finding> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .take(MAX_FINDINGS)
        .enumerate()
        .map(|(i, f)| {
            let id = text_of(field(f, &["id"]));
            let category = text_of(field(f, &["category"]));
            let code = text_of(field(f, &["code_example", "codeExample"]));
            Finding {
                id: if id.is_empty() { format!("f-{}", i + 1) } else { id },
                category: if category.is_empty() { "general".to_string() } else { category },
                severity: Severity::parse_lenient(&text_of(field(f, &["severity"]))),
                title: text_of(field(f, &["title"])),
                description: text_of(field(f, &["description"])),
                recommendation: text_of(field(f, &["recommendation"])),
                code_example: if code.is_empty() { None } else { Some(code) },
            }
        })
        .collect()
}

fn comparison_of(value: Option<&Value>) -> Option<CompetitorComparison> {
    let map = value?.as_object()?;
    let comparison = CompetitorComparison {
        main_site_advantages: string_list(field(map, &["main_site_advantages", "mainSiteAdvantages"])),
        competitor_advantages: string_list(field(
            map,
            &["competitor_advantages", "competitorAdvantages"],
        )),
        suggestions: string_list(field(map, &["suggestions"])),
        overall_assessment: text_of(field(map, &["overall_assessment", "overallAssessment"])),
    };
    (!comparison.is_empty()).then_some(comparison)
}

/// Parse a persona evaluation reply.
///
/// The comparison is kept only when one was requested.
pub fn parse_evaluation(text: &str, with_comparison: bool) -> Result<Evaluation, OracleError> {
    let map = object(text)?;
    Ok(Evaluation {
        score: score_of(field(&map, &["score"])),
        summary: text_of(field(&map, &["summary"])),
        findings: validate_findings(field(&map, &["findings"])),
        thinking_process: text_of(field(&map, &["thinking_process", "thinkingProcess"])),
        competitor_comparison: if with_comparison {
            comparison_of(field(&map, &["competitor_comparison", "competitorComparison"]))
        } else {
            None
        },
    })
}

/// Parse a five-category quick-scan reply.
pub fn parse_quick_scan(text: &str) -> Result<QuickScan, OracleError> {
    let map = object(text)?;
    let categories = field(&map, &["category_scores", "categoryScores"]).and_then(Value::as_object);
    let category_scores: Vec<(PersonaCategory, u8)> = PersonaCategory::ALL
        .iter()
        .map(|category| {
            let score = categories
                .and_then(|c| {
                    c.iter()
                        .find(|(k, _)| PersonaCategory::from_str(k) == Some(*category))
                        .map(|(_, v)| v)
                })
                .map_or(50, |v| score_of(Some(v)));
            (*category, score)
        })
        .collect();

    let overall_score = match field(&map, &["overall_score", "overallScore"]) {
        Some(v) => score_of(Some(v)),
        None => {
            let sum: u32 = category_scores.iter().map(|(_, s)| u32::from(*s)).sum();
            (f64::from(sum) / category_scores.len() as f64).round() as u8
        }
    };

    Ok(QuickScan {
        overall_score,
        category_scores,
        strengths: string_list(field(&map, &["strengths"])),
        weaknesses: string_list(field(&map, &["weaknesses"])),
    })
}

/// Parse a persona draft reply.
pub fn parse_persona_draft(text: &str) -> Result<PersonaDraft, OracleError> {
    let map = object(text)?;
    let name = text_of(field(&map, &["name"])).trim().to_string();
    let specialty = text_of(field(&map, &["specialty"])).trim().to_string();
    if name.is_empty() || specialty.is_empty() {
        return Err(OracleError::Malformed("persona draft is missing name or specialty".to_string()));
    }
    let raw_category = text_of(field(&map, &["category"]));
    let category = PersonaCategory::from_str(&raw_category)
        .ok_or_else(|| OracleError::Malformed(format!("unknown persona category '{raw_category}'")))?;

    let analysis_points: String = text_of(field(&map, &["analysis_points", "analysisPoints"]))
        .chars()
        .take(MAX_ANALYSIS_POINTS_LEN)
        .collect();

    Ok(PersonaDraft {
        name,
        specialty,
        analysis_points,
        category,
        evaluation_framework: text_of(field(&map, &["evaluation_framework", "evaluationFramework"])),
        scoring_criteria: text_of(field(&map, &["scoring_criteria", "scoringCriteria"])),
        exclusions: text_of(field(&map, &["exclusions"])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let text = "```json\n{\"score\": 81}\n```";
        assert_eq!(extract_json(text), Some(json!({"score": 81})));
    }

    #[test]
    fn test_extract_json_with_prose_and_trailing_commas() {
        let text = "Here is my analysis:\n{\"score\": 70, \"findings\": [{\"title\": \"a, b\",},],}\nThanks!";
        let value = extract_json(text).unwrap();
        assert_eq!(value["score"], 70);
        assert_eq!(value["findings"][0]["title"], "a, b");
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("{ unterminated"), None);
    }

    #[test]
    fn test_parse_evaluation_normalizes_fields() {
        let findings: Vec<_> = (0..12)
            .map(|i| json!({"severity": if i == 0 { "critical" } else { "low" }, "title": format!("t{i}")}))
            .collect();
        let text = json!({
            "score": 140,
            "summary": "Good",
            "findings": findings,
            "thinkingProcess": "Looked at headings",
            "competitor_comparison": {"suggestions": ["x"]}
        })
        .to_string();

        let evaluation = parse_evaluation(&text, false).unwrap();
        assert_eq!(evaluation.score, 100);
        assert_eq!(evaluation.findings.len(), MAX_FINDINGS);
        assert_eq!(evaluation.findings[0].id, "f-1");
        assert_eq!(evaluation.findings[0].category, "general");
        assert_eq!(evaluation.findings[0].severity, Severity::Medium);
        assert_eq!(evaluation.findings[1].severity, Severity::Low);
        assert!(evaluation.findings[0].code_example.is_none());
        assert_eq!(evaluation.thinking_process, "Looked at headings");
        assert!(evaluation.competitor_comparison.is_none());
    }

    #[test]
    fn test_parse_evaluation_non_numeric_score() {
        let evaluation = parse_evaluation(r#"{"score": "n/a"}"#, false).unwrap();
        assert_eq!(evaluation.score, 50);
        let evaluation = parse_evaluation(r#"{"score": "64.6"}"#, false).unwrap();
        assert_eq!(evaluation.score, 65);
    }

    #[test]
    fn test_parse_evaluation_keeps_requested_comparison() {
        let text = r#"{"score": 60, "competitor_comparison": {"main_site_advantages": ["faster"], "overall_assessment": "close"}}"#;
        let comparison = parse_evaluation(text, true).unwrap().competitor_comparison.unwrap();
        assert_eq!(comparison.main_site_advantages, vec!["faster"]);
        assert_eq!(comparison.overall_assessment, "close");
    }

    #[test]
    fn test_parse_evaluation_malformed() {
        assert!(matches!(parse_evaluation("sorry", false), Err(OracleError::Malformed(_))));
        assert!(matches!(parse_evaluation("[1, 2]", false), Err(OracleError::Malformed(_))));
    }

    #[test]
    fn test_parse_quick_scan() {
        let text = r#"{"category_scores": {"marketing": 70, "design": 80, "technical": 90, "business": 60, "user-experience": 50}, "strengths": ["fast"], "weaknesses": []}"#;
        let scan = parse_quick_scan(text).unwrap();
        assert_eq!(scan.category_scores.len(), 5);
        assert_eq!(scan.category_scores[2], (PersonaCategory::Technical, 90));
        assert_eq!(scan.overall_score, 70);
        assert_eq!(scan.strengths, vec!["fast"]);
    }

    #[test]
    fn test_parse_persona_draft() {
        let text = r#"{"name": "Legal Reviewer", "specialty": "Compliance", "analysis_points": "Cookie banner", "category": "business", "evaluation_framework": "GDPR"}"#;
        let draft = parse_persona_draft(text).unwrap();
        assert_eq!(draft.category, PersonaCategory::Business);
        assert_eq!(draft.evaluation_framework, "GDPR");
        assert!(draft.scoring_criteria.is_empty());

        let missing = r#"{"name": "", "specialty": "x", "category": "design"}"#;
        assert!(matches!(parse_persona_draft(missing), Err(OracleError::Malformed(_))));
    }
}
