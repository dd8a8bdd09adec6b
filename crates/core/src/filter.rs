use crate::domain::comment::ThreadComment;
use crate::domain::state::ConversationState;
use crate::text;

/// Why a comment is not forwarded. First matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A pagination stub, not a real comment.
    ContinuationStub,
    /// Already queued, forwarded or answered within the guard window.
    AlreadyHandled,
    /// The chatbot closed this conversation with a break.
    ConversationClosed,
    /// The bot never talks to itself.
    BotAuthored,
    /// Removed or deleted on the thread.
    Removed,
    /// The bot already replied on-thread.
    BotAlreadyReplied,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::ContinuationStub => "continuation_stub",
            Rejection::AlreadyHandled => "already_handled",
            Rejection::ConversationClosed => "conversation_closed",
            Rejection::BotAuthored => "bot_authored",
            Rejection::Removed => "removed",
            Rejection::BotAlreadyReplied => "bot_already_replied",
        }
    }
}

/// Eligibility check for forwarding one comment. `state` is the stored
/// conversation record for this comment id, looked up by the caller (the
/// one cheap store read happens before any body inspection).
pub fn reject_reason(
    comment: &ThreadComment,
    bot_identity: &str,
    state: Option<ConversationState>,
) -> Option<Rejection> {
    if comment.is_continuation {
        return Some(Rejection::ContinuationStub);
    }
    match state {
        Some(ConversationState::BreakClosed) => return Some(Rejection::ConversationClosed),
        Some(_) => return Some(Rejection::AlreadyHandled),
        None => {}
    }
    if comment
        .author
        .as_deref()
        .is_some_and(|author| author == bot_identity)
    {
        return Some(Rejection::BotAuthored);
    }
    if text::is_removed(comment) {
        return Some(Rejection::Removed);
    }
    if comment
        .reply_authors
        .iter()
        .any(|author| author == bot_identity)
    {
        return Some(Rejection::BotAlreadyReplied);
    }
    None
}
