//! Prompt text shared by every provider.

/// System instruction for chat-style providers.
pub const SYSTEM_PROMPT: &str = "Convert the document content into clean markdown.";

/// User prompt embedding the document's name, type and text.
pub fn format_prompt(text: &str, filename: &str, content_type: &str) -> String {
    format!(
        "Filename: {}\nContent-Type: {}\nContent:\n{}",
        filename, content_type, text
    )
}
