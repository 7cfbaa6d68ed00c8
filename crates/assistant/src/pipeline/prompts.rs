use db::models::task::Task;
use serde_json::{Value, json};

use crate::prompt::{PromptTemplate, TaskCounts, quote};

pub(super) const AGENT_SYSTEM_MESSAGE: &str =
    "You are an AI agent. Respond only with valid JSON, no markdown, no explanations.";

const PLANNER: PromptTemplate = PromptTemplate::new(
    r#"You are the PLANNER AGENT. You MUST respond with ONLY valid JSON, nothing else.

USER'S GOAL: {{goal}}

ADDITIONAL CONTEXT: {{context}}

CURRENT TASKS:
{{tasks}}

Respond with ONLY this JSON structure (no markdown, no explanations):
{
  "analysis": "Your strategic analysis of the goal",
  "tasks": [
    {
      "title": "Task name",
      "description": "What needs to be done",
      "difficulty": "easy",
      "dependencies": [],
      "priority": "high"
    }
  ],
  "estimated_timeline": "3 months"
}

CRITICAL: Return ONLY the JSON object. No other text."#,
);

const EXECUTOR: PromptTemplate = PromptTemplate::new(
    r#"You are the EXECUTOR AGENT. Respond with ONLY valid JSON, nothing else.

PLANNER'S ANALYSIS:
{{planner}}

CURRENT PROGRESS:
- Total tasks: {{total}}
- Completed: {{completed}}

Respond with ONLY this JSON (no markdown, no explanations):
{
  "feasibility_score": 8,
  "execution_strategy": "Your recommended approach",
  "potential_blockers": ["Challenge 1", "Challenge 2"],
  "quick_wins": ["Quick task 1"],
  "risk_assessment": "Medium"
}

CRITICAL: Return ONLY the JSON object."#,
);

const REVIEWER: PromptTemplate = PromptTemplate::new(
    r#"You are the REVIEWER AGENT. Respond with ONLY valid JSON, nothing else.

ANALYSIS TO REVIEW:
{{analysis}}

Respond with ONLY this JSON (no markdown, no explanations):
{
  "quality_score": 8,
  "missing_tasks": ["Additional task 1"],
  "improvements": [
    {
      "task": "Task title",
      "suggestion": "How to improve"
    }
  ],
  "best_practices": ["Practice 1", "Practice 2"]
}

CRITICAL: Return ONLY the JSON object."#,
);

const COORDINATOR: PromptTemplate = PromptTemplate::new(
    r#"You are the COORDINATOR AGENT. Respond with ONLY valid JSON, nothing else.

GOAL: {{goal}}

ALL AGENT INPUTS:
{{analysis}}

Respond with ONLY this JSON (no markdown, no explanations):
{
  "executive_summary": "Brief overview",
  "final_tasks": [
    {
      "title": "Task title",
      "description": "Description",
      "priority": "high",
      "phase": "Phase 1",
      "estimated_hours": 10
    }
  ],
  "key_insights": ["Insight 1"],
  "next_steps": ["Step 1"]
}

CRITICAL: Return ONLY the JSON object."#,
);

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub(super) fn planner(goal: &str, context: &str, tasks: &[Task]) -> String {
    let task_list = if tasks.is_empty() {
        "No current tasks".to_string()
    } else {
        tasks
            .iter()
            .map(|t| format!("- {}", quote(&t.title)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    PLANNER.render(&[("goal", goal), ("context", context), ("tasks", &task_list)])
}

pub(super) fn executor(planner: &Value, tasks: &[Task]) -> String {
    let counts = TaskCounts::from_tasks(tasks);
    EXECUTOR.render(&[
        ("planner", &pretty(planner)),
        ("total", &counts.total.to_string()),
        ("completed", &counts.completed.to_string()),
    ])
}

pub(super) fn reviewer(planner: &Value, executor: &Value) -> String {
    let combined = json!({ "planner": planner, "executor": executor });
    REVIEWER.render(&[("analysis", &pretty(&combined))])
}

pub(super) fn coordinator(goal: &str, planner: &Value, executor: &Value, reviewer: &Value) -> String {
    let combined = json!({ "planner": planner, "executor": executor, "reviewer": reviewer });
    COORDINATOR.render(&[("goal", goal), ("analysis", &pretty(&combined))])
}
