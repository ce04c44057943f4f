//! Prompt construction and reply formatting for medication lookups.

/// Heading placed above every successful lookup.
pub const ADVICE_HEADING: &str = "💊 **Medication Information:**";

pub const SYSTEM_PROMPT: &str = "You are a helpful medical assistant. You explain medication \
labels in plain language and always remind the user to follow their prescriber's instructions.";

/// Build the user prompt for a confirmed label text.
pub fn build_user_prompt(label_text: &str) -> String {
    format!(
        "The user has asked for information about the following medicine and dosages \
from their prescription label: {label}.

Your task:
- Identify **each medicine name** mentioned.
- Provide **a brief explanation** of what the medicine is used for.
- Include **dosage recommendations** if relevant.
- List **important precautions** in bullet points.
- Mention **common side effects**.

Keep the response **short, concise, and easy to read in a chat message**.",
        label = label_text.trim()
    )
}

/// Wrap model output in the chat-facing layout.
pub fn format_advice(content: &str) -> String {
    format!("{ADVICE_HEADING}\n\n{}", content.trim())
}
