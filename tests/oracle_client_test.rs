//! Integration tests for the Claude-backed scoring oracle
//!
//! Uses wiremock to stand in for the Messages API.

use serde_json::{json, Value};
use siteprobe::domain::models::{
    ChatContext, ChatMessage, Persona, PersonaCategory, ScrapedContent, Severity,
};
use siteprobe::domain::ports::{OracleError, ScoringOracle};
use siteprobe::infrastructure::oracle::{ClaudeOracle, ClaudeOracleConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oracle(server: &MockServer) -> ClaudeOracle {
    ClaudeOracle::new(ClaudeOracleConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        model: "claude-test".to_string(),
        max_tokens: 1024,
        timeout_secs: 5,
        rate_limit_rps: 100.0,
    })
    .unwrap()
}

/// A Messages API reply wrapping `text`.
fn reply(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-test",
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 120, "output_tokens": 80}
    })
}

fn persona() -> Persona {
    Persona::new(
        "seo",
        "SEO Specialist",
        "Search visibility",
        "Titles, meta descriptions, headings",
        PersonaCategory::Marketing,
    )
}

fn page(url: &str) -> ScrapedContent {
    ScrapedContent::empty(url).with_title("Example")
}

const EVALUATION: &str = r#"Here is my review:
```json
{
  "score": 72,
  "summary": "Solid basics, weak meta data",
  "findings": [
    {"severity": "high", "title": "Missing meta description", "description": "None found", "recommendation": "Add one"}
  ],
  "thinking_process": "Checked the head first",
  "competitor_comparison": {
    "main_site_advantages": ["Better headings"],
    "competitor_advantages": [],
    "suggestions": ["Add FAQ schema"],
    "overall_assessment": "Slightly ahead"
  }
}
```"#;

#[tokio::test]
async fn test_evaluate_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"model": "claude-test", "max_tokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(EVALUATION)))
        .expect(1)
        .mount(&server)
        .await;

    let evaluation = oracle(&server)
        .evaluate(&page("https://example.com"), &persona(), None)
        .await
        .unwrap();

    assert_eq!(evaluation.score, 72);
    assert_eq!(evaluation.summary, "Solid basics, weak meta data");
    assert_eq!(evaluation.findings.len(), 1);
    assert_eq!(evaluation.findings[0].severity, Severity::High);
    assert_eq!(evaluation.findings[0].id, "f-1");
    // No competitor was given, so the comparison is dropped.
    assert!(evaluation.competitor_comparison.is_none());
}

#[tokio::test]
async fn test_evaluate_keeps_comparison_with_competitor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(EVALUATION)))
        .mount(&server)
        .await;

    let evaluation = oracle(&server)
        .evaluate(
            &page("https://example.com"),
            &persona(),
            Some(&page("https://rival.example.com")),
        )
        .await
        .unwrap();

    let comparison = evaluation.competitor_comparison.unwrap();
    assert_eq!(comparison.main_site_advantages, vec!["Better headings"]);
    assert_eq!(comparison.overall_assessment, "Slightly ahead");
}

#[tokio::test]
async fn test_malformed_reply_is_retried_at_lower_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"temperature": 0.7})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(reply("I would rate this site highly.")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"temperature": 0.3})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply(r#"{"score": 64, "summary": "ok", "findings": []}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let evaluation = oracle(&server)
        .evaluate(&page("https://example.com"), &persona(), None)
        .await
        .unwrap();

    assert_eq!(evaluation.score, 64);
    assert!(evaluation.findings.is_empty());
}

#[tokio::test]
async fn test_malformed_twice_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("no json at all")))
        .expect(2)
        .mount(&server)
        .await;

    let err = oracle(&server)
        .evaluate(&page("https://example.com"), &persona(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, OracleError::Malformed(_)));
}

#[tokio::test]
async fn test_http_errors_are_classified_without_retry() {
    let cases = [
        (429, "slow down"),
        (401, "invalid x-api-key"),
        (500, "internal error"),
        (400, "bad request"),
    ];

    for (status, body) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let err = oracle(&server)
            .evaluate(&page("https://example.com"), &persona(), None)
            .await
            .unwrap_err();

        match status {
            429 => assert_eq!(err, OracleError::RateLimited),
            401 => assert!(matches!(err, OracleError::Authentication(ref b) if b == body)),
            500 => assert_eq!(err, OracleError::Server(500, body.to_string())),
            _ => assert!(matches!(err, OracleError::InvalidRequest(_))),
        }
    }
}

#[tokio::test]
async fn test_quick_scan_fills_missing_categories() {
    let server = MockServer::start().await;
    let text = r#"{
        "category_scores": {"marketing": 80, "design": 70, "technical": 90},
        "strengths": ["Fast"],
        "weaknesses": ["Thin copy"]
    }"#;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(text)))
        .mount(&server)
        .await;

    let scan = oracle(&server)
        .quick_scan(&page("https://rival.example.com"))
        .await
        .unwrap();

    let business = scan
        .category_scores
        .iter()
        .find(|(c, _)| *c == PersonaCategory::Business)
        .map(|(_, s)| *s);
    assert_eq!(business, Some(50));
    // (80 + 70 + 90 + 50 + 50) / 5
    assert_eq!(scan.overall_score, 68);
    assert_eq!(scan.strengths, vec!["Fast"]);
}

#[tokio::test]
async fn test_assist_drafts_persona() {
    let server = MockServer::start().await;
    let text = r#"{
        "name": "Accessibility Auditor",
        "specialty": "WCAG 2.2 conformance",
        "analysis_points": "Contrast, alt text, keyboard navigation",
        "category": "user-experience",
        "evaluation_framework": "WCAG 2.2 AA",
        "scoring_criteria": "Deduct per failed success criterion",
        "exclusions": ""
    }"#;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(text)))
        .mount(&server)
        .await;

    let draft = oracle(&server)
        .assist("accessibility auditor for public sector sites")
        .await
        .unwrap();

    assert_eq!(draft.name, "Accessibility Auditor");
    assert_eq!(draft.category, PersonaCategory::UserExperience);
    let persona = draft.into_persona("accessibility-auditor");
    assert!(persona.exclusions.is_none());
    assert_eq!(persona.evaluation_framework.as_deref(), Some("WCAG 2.2 AA"));
}

fn chat_context() -> ChatContext {
    ChatContext {
        url: "https://example.com".to_string(),
        persona_id: "seo".to_string(),
        persona_name: "SEO Specialist".to_string(),
        specialty: "Search visibility".to_string(),
        analysis_points: String::new(),
        score: 72,
        summary: "Solid basics".to_string(),
        findings: Vec::new(),
    }
}

#[tokio::test]
async fn test_chat_sends_transcript_as_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "Why 72?"},
                {"role": "assistant", "content": "Meta data is thin."},
                {"role": "user", "content": "What first?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("  Start with the description.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![ChatMessage::user("Why 72?"), ChatMessage::persona("Meta data is thin.")];
    let answer = oracle(&server)
        .chat(&chat_context(), &history, "What first?")
        .await
        .unwrap();

    assert_eq!(answer, "Start with the description.");
}

#[tokio::test]
async fn test_chat_empty_reply_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("   ")))
        .expect(1)
        .mount(&server)
        .await;

    let err = oracle(&server)
        .chat(&chat_context(), &[], "Hello?")
        .await
        .unwrap_err();

    assert!(matches!(err, OracleError::Malformed(_)));
}
