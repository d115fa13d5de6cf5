//! Shared prompt construction for the three provider-facing stages. Kept in
//! one place so the labelling/blinding conventions stay consistent between
//! Stage 1, Stage 2, and Stage 3.

use provider::ChatMessage;

pub fn council_system_prompt(personality: Option<&str>) -> String {
    let mut prompt = "You are one independent member of a deliberation council. Answer the user's \
        request directly and completely; you will not see other members' answers at this stage."
        .to_string();

    if let Some(personality) = personality {
        prompt.push_str("\n\n");
        prompt.push_str(personality);
    }

    prompt
}

pub fn stage1_messages(personality: Option<&str>, task_label: &str, user_text: &str, feedback: Option<&str>) -> Vec<ChatMessage> {
    let mut user = format!("Task: {task_label}\n\n{user_text}");
    if let Some(feedback) = feedback {
        user.push_str("\n\nAdditional context from a human reviewer: ");
        user.push_str(feedback);
    }

    vec![ChatMessage::system(council_system_prompt(personality)), ChatMessage::user(user)]
}

pub fn ballot_messages(own_label: &str, labeled_drafts: &[(String, String)]) -> Vec<ChatMessage> {
    let system = "You are ranking anonymized answers from a deliberation council, best to worst. \
        Reply with a comma-separated list of labels only, e.g. \"B, C, A\". Do not rank your own \
        answer; it is excluded from the list below."
        .to_string();

    let mut user = String::from("Responses:\n\n");
    for (label, content) in labeled_drafts {
        if label == own_label {
            continue;
        }
        user.push_str(&format!("[{label}]\n{content}\n\n"));
    }
    user.push_str("Rank the labels above from best to worst.");

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn synthesis_messages(labeled_drafts: &[(String, String)], preferred_label: &str) -> Vec<ChatMessage> {
    let system = "You are the chairman of a deliberation council. Synthesize one final answer from \
        the council's independent responses below, preferring the response the council ranked \
        highest, but feel free to incorporate strong points from the others."
        .to_string();

    let mut user = format!("The council's preferred response is [{preferred_label}].\n\nResponses:\n\n");
    for (label, content) in labeled_drafts {
        user.push_str(&format!("[{label}]\n{content}\n\n"));
    }
    user.push_str("Write the final answer.");

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn chairman_pick_messages(shortlist: &[(String, String)]) -> Vec<ChatMessage> {
    let system = "You are the chairman of a deliberation council. Pick the single best response \
        from the shortlist below. Reply with only its label, nothing else."
        .to_string();

    let mut user = String::from("Shortlist:\n\n");
    for (label, content) in shortlist {
        user.push_str(&format!("[{label}]\n{content}\n\n"));
    }
    user.push_str("Which label is best?");

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
