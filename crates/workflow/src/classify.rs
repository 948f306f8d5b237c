//! `analyze(prompt) -> TaskClassification` via the provider, with a
//! conservative fallback when the response doesn't parse.

use llm::{Message, Provider, Request};
use schemas::{Complexity, TaskClassification, TaskType};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You classify incoming work requests for an AI agent orchestration \
engine. Respond with a single JSON object of shape {\"type\": \"feature\"|\"bugfix\"|\"refactor\"\
|\"research\"|\"deployment\"|\"config\", \"complexity\": \"trivial\"|\"simple\"|\"moderate\"|\
\"complex\"|\"epic\", \"requires_design\": bool, \"requires_architecture\": bool, \
\"requires_compliance\": bool, \"confidence\": number in [0,1]}.";

fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn parse_task_type(value: &str) -> Option<TaskType> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

fn parse_complexity(value: &str) -> Option<Complexity> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

pub async fn analyze(provider: &Arc<dyn Provider>, prompt: &str) -> TaskClassification {
    let request = Request::new(SYSTEM_PROMPT, vec![Message::user(prompt)]);
    if request.validate().is_err() {
        return TaskClassification::conservative_default();
    }

    let response = match provider.complete(request).await {
        Ok(response) => response,
        Err(_) => return TaskClassification::conservative_default(),
    };

    let Some(parsed) = extract_json_object(&response.content) else {
        return TaskClassification::conservative_default();
    };

    let task_type = parsed
        .get("type")
        .and_then(|v| v.as_str())
        .and_then(parse_task_type);
    let complexity = parsed
        .get("complexity")
        .and_then(|v| v.as_str())
        .and_then(parse_complexity);
    let (Some(task_type), Some(complexity)) = (task_type, complexity) else {
        return TaskClassification::conservative_default();
    };

    let confidence = parsed
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.0);

    TaskClassification {
        task_type,
        complexity,
        requires_design: parsed
            .get("requires_design")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        requires_architecture: parsed
            .get("requires_architecture")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        requires_compliance: parsed
            .get("requires_compliance")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        confidence,
    }
}
