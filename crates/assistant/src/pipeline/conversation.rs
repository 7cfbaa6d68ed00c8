use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// One display line per agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentTurn {
    pub agent: String,
    pub role: String,
    pub emoji: String,
    pub summary: String,
}

impl AgentTurn {
    fn new(agent: &str, role: &str, emoji: &str, summary: String) -> Self {
        Self {
            agent: agent.to_string(),
            role: role.to_string(),
            emoji: emoji.to_string(),
            summary,
        }
    }
}

fn text_or(value: &Value, key: &str, fallback: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// Scalar JSON rendered without quotes; anything else is absent.
pub(super) fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(super) fn build_log(
    planner: &Value,
    executor: &Value,
    reviewer: &Value,
    coordinator: &Value,
) -> Vec<AgentTurn> {
    let quality =
        scalar_text(reviewer.get("quality_score")).unwrap_or_else(|| "N/A".to_string());

    vec![
        AgentTurn::new(
            "Planner",
            "Strategic Planning",
            "🎯",
            text_or(planner, "analysis", "Analyzed goal and created task breakdown"),
        ),
        AgentTurn::new(
            "Executor",
            "Execution Analysis",
            "⚡",
            text_or(
                executor,
                "execution_strategy",
                "Assessed feasibility and execution approach",
            ),
        ),
        AgentTurn::new(
            "Reviewer",
            "Quality Assurance",
            "🔍",
            format!("Quality score: {}/10 - Provided improvements", quality),
        ),
        AgentTurn::new(
            "Coordinator",
            "Final Synthesis",
            "🎭",
            text_or(coordinator, "executive_summary", "Created final optimized plan"),
        ),
    ]
}
