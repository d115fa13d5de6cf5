//! Stage 0 (§4.6): the chairman drafts (or reuses) the task list a run
//! executes. The blueprint is data, not code (§9) — an acyclic list with a
//! cursor, never a general DAG.

use std::time::Duration;

use provider::{ChatMessage, CompletionParams, Provider};
use store::{Blueprint, Task};

const BLUEPRINT_SYSTEM_PROMPT: &str = "You are the chairman of a deliberation council. Given the user's \
    request, produce a short JSON array of tasks the council should work through in order. Each task is an \
    object with fields: \"id\" (short string), \"type\" (one of \"draft\", \"analyze\", \"vision\", \"code\"), \"label\" \
    (one short sentence describing the task), \"required_skills\" (array, any of \"tools\", \"vision\", \"reasoning\", \
    \"thinking\", \"json_mode\", may be empty), and \"breakpoint\" (boolean, true if a human should review before \
    continuing). Reply with the JSON array only, no surrounding prose.";

/// Drafts a new blueprint from `user_text`, or returns `prior` unchanged if
/// the run is a continuation that already has one (§4.6 Stage 0: "prior
/// blueprint (if any) + latest user content").
///
/// Never fails: a chairman call error or an unparseable reply both fall back
/// to the default single-task blueprint `[draft(query)]` with a logged
/// warning, exactly as §4.6 specifies for parse failure.
pub async fn draft_blueprint(
    provider: &dyn Provider,
    chairman_model_id: &str,
    prior: Option<Blueprint>,
    user_text: &str,
    timeout: Duration,
) -> Blueprint {
    if let Some(blueprint) = prior {
        return blueprint;
    }

    let messages = [ChatMessage::system(BLUEPRINT_SYSTEM_PROMPT), ChatMessage::user(user_text)];

    let reply = match provider
        .complete(chairman_model_id, &messages, &CompletionParams::default(), timeout)
        .await
    {
        Ok(result) => result.content,
        Err(err) => {
            log::warn!("blueprint drafting call failed, falling back to default blueprint: {err}");
            return default_blueprint(user_text);
        }
    };

    match parse_tasks(&reply) {
        Some(tasks) if !tasks.is_empty() => Blueprint { tasks },
        _ => {
            log::warn!("chairman blueprint reply did not parse as a task list, falling back to default blueprint");
            default_blueprint(user_text)
        }
    }
}

fn default_blueprint(user_text: &str) -> Blueprint {
    Blueprint {
        tasks: vec![Task {
            id: "t1".to_string(),
            task_type: "draft".to_string(),
            label: user_text.chars().take(120).collect(),
            breakpoint: false,
            required_skills: Vec::new(),
        }],
    }
}

/// Finds the first `[...]` substring in `raw` and parses it as a task list,
/// tolerating a chairman reply that wraps the array in prose or a code
/// fence.
fn parse_tasks(raw: &str) -> Option<Vec<Task>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_fenced_task_list() {
        let raw = "Here you go:\n```json\n[{\"id\":\"t1\",\"type\":\"draft\",\"label\":\"Draft\"}]\n```";
        let tasks = parse_tasks(raw).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "t1");
        assert!(!tasks[0].breakpoint);
    }

    #[test]
    fn default_blueprint_is_single_draft_task() {
        let blueprint = default_blueprint("hello");
        assert_eq!(blueprint.tasks.len(), 1);
        assert_eq!(blueprint.tasks[0].task_type, "draft");
    }
}
