/// Hyphens are reserved in the chatbot's auth_id space.
const RESERVED: char = '-';
const REPLACEMENT: &str = "__";

/// Derives the chatbot-side identity for one comment. Deterministic, one
/// identity per comment, so every comment becomes its own conversation.
pub fn chat_auth_id(author: &str, comment_id: &str) -> String {
    format!(
        "{}{}{}",
        sanitize_handle(author),
        REPLACEMENT,
        comment_id
    )
}

pub fn sanitize_handle(handle: &str) -> String {
    handle.replace(RESERVED, REPLACEMENT)
}
