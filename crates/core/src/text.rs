use crate::domain::comment::ThreadComment;

/// Body placeholders Reddit substitutes for removed/deleted comments.
pub const REMOVED_BODY: &str = "[removed]";
pub const DELETED_BODY: &str = "[deleted]";

/// Reserved reply value signalling the chatbot has nothing further to say.
pub const BREAK_SENTINEL: &str = "Bot breaks";
/// Literal empty-object body some chatbot flows emit instead of silence.
pub const EMPTY_OBJECT_SENTINEL: &str = "{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Real reply text, to be buffered for delivery.
    Content,
    /// The conversation is over; close it.
    Break,
    /// Empty or placeholder payload; nothing to deliver.
    Empty,
}

pub fn classify_reply(text: &str) -> ReplyKind {
    if text.is_empty() || text == EMPTY_OBJECT_SENTINEL {
        ReplyKind::Empty
    } else if text == BREAK_SENTINEL {
        ReplyKind::Break
    } else {
        ReplyKind::Content
    }
}

pub fn is_removed(comment: &ThreadComment) -> bool {
    comment.removed || comment.body == REMOVED_BODY || comment.body == DELETED_BODY
}

/// Reddit markdown folds single newlines; two trailing spaces force a hard
/// break, matching how the reply should render on the thread.
pub fn markdown_hard_breaks(text: &str) -> String {
    text.replace('\n', "  \n  ")
}
