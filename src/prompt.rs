//! Persona system prompt and completion-marker handling.

use rehearsal_core::models::Case;

/// Token the persona appends to its reply when the conversation should end.
pub const COMPLETION_MARKER: &str = "[[CONVERSATION_COMPLETE]]";

/// Shown when the persona's reply consisted of nothing but the marker.
pub const CLOSING_LINE: &str = "Thank you for your time. I think I have what I need for now.";

/// Builds the role-play instructions for one case.
pub fn build_system_prompt(case: &Case) -> String {
    let meta = &case.meta_data;
    let personality = if meta.personality.is_empty() {
        "not specified".to_string()
    } else {
        meta.personality.join(", ")
    };

    let mut prompt = format!(
        "You are {name}, a potential customer talking to a salesperson who is practising their pitch.\n\
         Stay in character for the whole conversation and never reveal that you are an AI or that this is training.\n\
         \n\
         Who you are: {intro}\n\
         Personality: {personality}\n\
         Budget: {budget}\n\
         Decision authority: {decision}\n\
         Background: {background}\n",
        name = case.customer_name,
        intro = case.intro,
        budget = meta.budget,
        decision = meta.decision_level,
        background = meta.background,
    );

    if !meta.points.is_empty() {
        prompt.push_str("Concerns you want addressed:\n");
        for point in &meta.points {
            prompt.push_str("- ");
            prompt.push_str(point);
            prompt.push('\n');
        }
    }

    if let Some(script) = case.script.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\nScenario notes to guide how you behave:\n");
        prompt.push_str(script);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nReply with one short conversational turn at a time, reacting to what the salesperson just said.\n\
         When the salesperson has clearly shown how they handle your concerns, or the conversation has reached \
         a natural end, finish your final reply with {COMPLETION_MARKER} on its own. Do not use that token otherwise."
    ));
    prompt
}

/// Removes every completion marker from a reply.
///
/// Returns the text to display and whether the marker was present.
pub fn split_completion_marker(reply: &str) -> (String, bool) {
    if !reply.contains(COMPLETION_MARKER) {
        return (reply.trim().to_string(), false);
    }
    let cleaned = reply.replace(COMPLETION_MARKER, "");
    let cleaned = cleaned.trim();
    let display = if cleaned.is_empty() {
        CLOSING_LINE.to_string()
    } else {
        cleaned.to_string()
    };
    (display, true)
}
