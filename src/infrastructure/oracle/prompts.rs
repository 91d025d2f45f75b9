//! Prompt construction for the scoring oracle.

use std::fmt::Write as _;

use crate::domain::models::{ChatContext, Persona, ScrapedContent};

/// Markup sent to the model is capped at this many characters.
const PROMPT_HTML_CHARS: usize = 15_000;
const PROMPT_COMPETITOR_HTML_CHARS: usize = 5_000;
const PROMPT_JSON_LD_CHARS: usize = 3_000;

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// System prompt casting the model as `persona`.
pub fn evaluation_system_prompt(persona: &Persona, with_competitor: bool) -> String {
    let mut prompt = format!(
        "You are \"{name}\", a professional who evaluates websites.\n\n\
         ## Specialty\n{specialty}\n\n\
         ## Analysis focus\n{points}\n",
        name = persona.name,
        specialty = persona.specialty,
        points = persona.analysis_points,
    );
    if let Some(framework) = &persona.evaluation_framework {
        let _ = write!(prompt, "\n## Evaluation framework\n{framework}\n");
    }
    if let Some(criteria) = &persona.scoring_criteria {
        let _ = write!(prompt, "\n## Scoring criteria\n{criteria}\n");
    }
    if let Some(exclusions) = &persona.exclusions {
        let _ = write!(prompt, "\n## Out of scope\n{exclusions}\n");
    }

    prompt.push_str(
        "\n## Output format\n\
         Reply with a single JSON object and nothing else:\n\
         {\n  \
           \"score\": <integer 0-100>,\n  \
           \"summary\": \"<overall assessment, at most 200 characters>\",\n  \
           \"findings\": [\n    {\n      \
             \"id\": \"<unique id such as f-1>\",\n      \
             \"category\": \"<category name>\",\n      \
             \"severity\": \"<high | medium | low>\",\n      \
             \"title\": \"<short title>\",\n      \
             \"description\": \"<detailed explanation>\",\n      \
             \"recommendation\": \"<concrete improvement>\",\n      \
             \"code_example\": \"<optional code snippet>\"\n    }\n  ],\n",
    );
    if with_competitor {
        prompt.push_str(
            "  \"competitor_comparison\": {\n    \
               \"main_site_advantages\": [\"...\"],\n    \
               \"competitor_advantages\": [\"...\"],\n    \
               \"suggestions\": [\"...\"],\n    \
               \"overall_assessment\": \"...\"\n  },\n",
        );
    }
    prompt.push_str(
        "  \"thinking_process\": \"<your reasoning, at most 400 characters>\"\n}\n\n\
         ## Rules\n\
         - List 3 to 8 findings, most important first\n\
         - Score objectively; 90 or above is reserved for exceptional sites\n\
         - Recommendations must be specific and actionable\n",
    );
    prompt
}

fn describe_site(out: &mut String, content: &ScrapedContent, html_chars: usize) {
    let _ = writeln!(out, "URL: {}", content.url);
    let _ = writeln!(out, "Title: {}", content.title);
    let _ = writeln!(out, "Description: {}", content.description);

    let _ = writeln!(out, "\nHeadings:");
    if content.headings.is_empty() {
        let _ = writeln!(out, "none");
    }
    for heading in content.headings.iter().take(30) {
        let _ = writeln!(out, "{heading}");
    }

    let _ = writeln!(out, "\nMeta tags:");
    if content.meta_tags.is_empty() {
        let _ = writeln!(out, "none");
    }
    for (key, value) in content.meta_tags.iter().take(20) {
        let _ = writeln!(out, "{key}: {value}");
    }

    let _ = writeln!(out, "\nLinks: {}", content.links.len());
    let _ = writeln!(out, "Images: {}", content.images.len());
    for image in content.images.iter().take(10) {
        let alt = if image.alt.is_empty() { "(missing)" } else { image.alt.as_str() };
        let _ = writeln!(out, "- src: {}, alt: {alt}", image.src);
    }

    let _ = writeln!(out, "\nStructured data (JSON-LD):");
    if content.structured_data.is_empty() {
        let _ = writeln!(out, "none");
    } else {
        let json = serde_json::to_string_pretty(&content.structured_data).unwrap_or_default();
        let _ = writeln!(out, "{}", truncate_chars(&json, PROMPT_JSON_LD_CHARS));
    }

    let _ = writeln!(out, "\nExternal scripts:");
    if content.scripts.is_empty() {
        let _ = writeln!(out, "none");
    }
    for script in content.scripts.iter().take(15) {
        let _ = writeln!(out, "{script}");
    }

    let hints = &content.performance_hints;
    let _ = writeln!(out, "\nPerformance hints:");
    let _ = writeln!(out, "- SSL: {}", yes_no(hints.has_ssl));
    let _ = writeln!(out, "- Responsive viewport meta: {}", yes_no(hints.has_responsive_meta));
    let _ = writeln!(out, "- Oversized images: {}", yes_no(hints.has_large_images));
    let _ = writeln!(out, "- Minified assets: {}", yes_no(hints.has_minified_assets));

    let _ = writeln!(out, "\nHTML (leading part):");
    let _ = writeln!(out, "{}", truncate_chars(&content.html, html_chars));
}

/// User prompt describing the site (and competitor, if any).
pub fn evaluation_user_prompt(content: &ScrapedContent, competitor: Option<&ScrapedContent>) -> String {
    let mut out = String::from("Analyze the following website.\n\n");
    describe_site(&mut out, content, PROMPT_HTML_CHARS);
    if let Some(competitor) = competitor {
        out.push_str("\n---\nCompare it against this competitor site.\n\n");
        describe_site(&mut out, competitor, PROMPT_COMPETITOR_HTML_CHARS);
    }
    out
}

pub fn quick_scan_system_prompt() -> String {
    "You are a panel of website experts producing a quick competitive scan.\n\
     Score the site from 0 to 100 in each of these categories: marketing, design, \
     technical, business, user-experience.\n\n\
     Reply with a single JSON object and nothing else:\n\
     {\n  \
       \"category_scores\": {\"marketing\": 0, \"design\": 0, \"technical\": 0, \"business\": 0, \"user-experience\": 0},\n  \
       \"overall_score\": <integer 0-100>,\n  \
       \"strengths\": [\"<up to 3 items>\"],\n  \
       \"weaknesses\": [\"<up to 3 items>\"]\n\
     }\n"
        .to_string()
}

pub fn quick_scan_user_prompt(content: &ScrapedContent) -> String {
    let mut out = String::from("Quick-scan the following competitor website.\n\n");
    describe_site(&mut out, content, PROMPT_COMPETITOR_HTML_CHARS);
    out
}

pub fn assist_system_prompt() -> String {
    "You design expert personas that review websites.\n\
     Given a theme, propose one persona.\n\n\
     Reply with a single JSON object and nothing else:\n\
     {\n  \
       \"name\": \"<persona name>\",\n  \
       \"specialty\": \"<one line>\",\n  \
       \"analysis_points\": \"<what to look at, at most 500 characters>\",\n  \
       \"category\": \"<marketing | design | technical | business | user-experience>\",\n  \
       \"evaluation_framework\": \"<optional named framework>\",\n  \
       \"scoring_criteria\": \"<optional scoring guidance>\",\n  \
       \"exclusions\": \"<optional out-of-scope topics>\"\n\
     }\n"
        .to_string()
}

pub fn assist_user_prompt(theme: &str) -> String {
    format!("Theme: {theme}")
}

pub fn chat_system_prompt(context: &ChatContext) -> String {
    let mut out = format!(
        "You are {}, a website reviewer. You already evaluated {} and now answer \
         the site owner's follow-up questions in character.\n",
        context.persona_name, context.url
    );
    if !context.specialty.is_empty() {
        let _ = writeln!(out, "Specialty: {}", context.specialty);
    }
    if !context.analysis_points.is_empty() {
        let _ = writeln!(out, "Focus: {}", context.analysis_points);
    }
    let _ = writeln!(out, "\nYour evaluation\nScore: {}/100\nSummary: {}", context.score, context.summary);
    if !context.findings.is_empty() {
        out.push_str("Findings:\n");
        for finding in &context.findings {
            let _ = writeln!(
                out,
                "- [{}] {}: {} Recommendation: {}",
                finding.severity.as_str(),
                finding.title,
                finding.description,
                finding.recommendation
            );
        }
    }
    out.push_str(
        "\nAnswer in plain prose, concretely and briefly. Stay consistent with your \
         evaluation. If a question is outside your specialty, say so.\n",
    );
    out
}
