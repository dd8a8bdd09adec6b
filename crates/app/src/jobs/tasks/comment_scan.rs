use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::AppState;
use redrelay_core::domain::comment::{QueuedComment, ThreadComment};
use redrelay_core::domain::state::ConversationState;
use redrelay_core::filter::reject_reason;
use redrelay_core::identity::chat_auth_id;
use redrelay_infra::reddit::RedditError;
use redrelay_infra::store::StoreError;

/// A comment that keeps failing to forward is dropped after this many
/// attempts so it cannot wedge the queue.
const MAX_FORWARD_ATTEMPTS: u32 = 3;

#[derive(Debug, Default, Serialize)]
pub struct ScanStats {
    pub comments_seen: usize,
    pub rejected: usize,
    pub queued: usize,
    pub forwarded: usize,
    pub requeued: usize,
    pub dropped: usize,
    pub errors: usize,
    pub throttled: bool,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("thread error: {0}")]
    Thread(#[from] RedditError),
}

/// One scan-and-forward pass: walk the thread, queue eligible comments,
/// then drain the queue into the chatbot.
pub async fn run(state: &AppState) -> Result<ScanStats, ScanError> {
    let mut stats = ScanStats::default();
    if throttle_check(state, &mut stats, "before scan") {
        return Ok(stats);
    }

    let page = state
        .reddit
        .comment_tree(&state.config.submission_id)
        .await?;
    let mut pending_more = page.more;
    for comment in &page.comments {
        consider(state, &mut stats, comment).await?;
    }

    while !pending_more.is_empty() {
        if throttle_check(state, &mut stats, "mid scan") {
            break;
        }
        let children = std::mem::take(&mut pending_more);
        let page = state
            .reddit
            .expand_more(&state.config.submission_id, &children)
            .await?;
        for comment in &page.comments {
            consider(state, &mut stats, comment).await?;
        }
        pending_more = page.more;
    }

    forward_queue(state, &mut stats).await?;
    Ok(stats)
}

fn throttle_check(state: &AppState, stats: &mut ScanStats, phase: &str) -> bool {
    match state.reddit.rate_limit().throttle(Utc::now()) {
        Some(cooldown) => {
            warn!(
                cooldown_secs = cooldown.as_secs(),
                phase, "rate limit budget low, ending scan early"
            );
            stats.throttled = true;
            true
        }
        None => false,
    }
}

async fn consider(
    state: &AppState,
    stats: &mut ScanStats,
    comment: &ThreadComment,
) -> Result<(), ScanError> {
    stats.comments_seen += 1;
    let record = if comment.is_continuation {
        None
    } else {
        state.store.state(&comment.id).await?
    };
    if let Some(rejection) = reject_reason(comment, &state.config.reddit.username, record) {
        debug!(
            comment_id = %comment.id,
            reason = rejection.as_str(),
            "comment not forwarded"
        );
        stats.rejected += 1;
        return Ok(());
    }
    let queued = QueuedComment::new(&comment.id, &comment.body, comment.author_str());
    if state.store.enqueue(&queued).await? {
        stats.queued += 1;
    } else {
        stats.rejected += 1;
    }
    Ok(())
}

/// Drains the entries present at the start of the stage; failed entries
/// requeued here are picked up by the next pass, not this one.
async fn forward_queue(state: &AppState, stats: &mut ScanStats) -> Result<(), ScanError> {
    let mut batch = Vec::new();
    while let Some(comment) = state.store.pop_queued().await? {
        batch.push(comment);
    }

    for mut queued in batch {
        let auth_id = chat_auth_id(&queued.author, &queued.id);
        // An already-provisioned user is fine; only log the failure.
        if let Err(err) = state.chatbot.create_user(&auth_id).await {
            debug!(error = %err, auth_id, "create user did not succeed");
        }
        match state.chatbot.log_message(&auth_id, &queued.body).await {
            Ok(message_id) => {
                state.store.record_mapping(&message_id, &queued.id).await?;
                state
                    .store
                    .set_state(&queued.id, ConversationState::Forwarded)
                    .await?;
                stats.forwarded += 1;
            }
            Err(err) => {
                stats.errors += 1;
                queued.attempts += 1;
                if queued.attempts < MAX_FORWARD_ATTEMPTS {
                    warn!(
                        error = %err,
                        comment_id = %queued.id,
                        attempts = queued.attempts,
                        "forwarding failed, requeued"
                    );
                    state.store.requeue(&queued).await?;
                    stats.requeued += 1;
                } else {
                    warn!(
                        error = %err,
                        comment_id = %queued.id,
                        "forwarding failed too often, dropping comment"
                    );
                    state.store.clear_state(&queued.id).await?;
                    stats.dropped += 1;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::test_support::{TestHarness, comment};
    use redrelay_core::domain::state::ConversationState;
    use redrelay_infra::reddit::CommentPage;

    #[tokio::test]
    async fn eligible_comment_is_forwarded_once() {
        let harness = TestHarness::new();
        harness.reddit.set_tree(CommentPage {
            comments: vec![comment("abc", "hi", "alice")],
            more: vec![],
        });
        let state = harness.state();

        let stats = run(&state).await.unwrap();
        assert_eq!(stats.comments_seen, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.forwarded, 1);

        assert_eq!(harness.chatbot.created(), vec!["alice__abc"]);
        let messages = harness.chatbot.messages();
        assert_eq!(messages, vec![("alice__abc".to_string(), "hi".to_string())]);
        assert_eq!(
            state.store.state("abc").await.unwrap(),
            Some(ConversationState::Forwarded)
        );
        assert_eq!(
            state.store.take_mapping("m1").await.unwrap(),
            Some("abc".to_string())
        );

        // A second pass over the same tree forwards nothing new.
        harness.reddit.set_tree(CommentPage {
            comments: vec![comment("abc", "hi", "alice")],
            more: vec![],
        });
        let stats = run(&state).await.unwrap();
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.rejected, 1);
        assert_eq!(harness.chatbot.messages().len(), 1);
    }

    #[tokio::test]
    async fn ineligible_comments_are_rejected() {
        let harness = TestHarness::new();
        let mut removed = comment("r1", "[removed]", "alice");
        removed.removed = true;
        let mut bot_authored = comment("b1", "beep", "relay_bot");
        bot_authored.author = Some(harness.bot_identity.clone());
        let mut stub = comment("s1", "", "alice");
        stub.is_continuation = true;
        harness.reddit.set_tree(CommentPage {
            comments: vec![removed, bot_authored, stub, comment("ok", "hi", "bob")],
            more: vec![],
        });
        let state = harness.state();

        let stats = run(&state).await.unwrap();
        assert_eq!(stats.comments_seen, 4);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.forwarded, 1);
    }

    #[tokio::test]
    async fn continuation_stubs_are_expanded() {
        let harness = TestHarness::new();
        harness.reddit.set_tree(CommentPage {
            comments: vec![comment("c1", "first", "alice")],
            more: vec!["c2".to_string()],
        });
        harness.reddit.push_more_page(CommentPage {
            comments: vec![comment("c2", "second", "bob")],
            more: vec![],
        });
        let state = harness.state();

        let stats = run(&state).await.unwrap();
        assert_eq!(stats.comments_seen, 2);
        assert_eq!(stats.forwarded, 2);
        // FIFO: the top-level page forwards before the expanded one.
        let messages = harness.chatbot.messages();
        assert_eq!(messages[0].0, "alice__c1");
        assert_eq!(messages[1].0, "bob__c2");
    }

    #[tokio::test]
    async fn low_rate_limit_budget_aborts_the_scan() {
        let harness = TestHarness::new();
        harness.reddit.set_remaining(5.0);
        harness.reddit.set_tree(CommentPage {
            comments: vec![comment("abc", "hi", "alice")],
            more: vec![],
        });
        let state = harness.state();

        let stats = run(&state).await.unwrap();
        assert!(stats.throttled);
        assert_eq!(stats.comments_seen, 0);
        assert!(harness.chatbot.messages().is_empty());
    }

    #[tokio::test]
    async fn failed_forwarding_requeues_then_drops() {
        let harness = TestHarness::new();
        harness.chatbot.fail_log_message(usize::MAX);
        harness.reddit.set_tree(CommentPage {
            comments: vec![comment("abc", "hi", "alice")],
            more: vec![],
        });
        let state = harness.state();

        let stats = run(&state).await.unwrap();
        assert_eq!(stats.requeued, 1);
        assert_eq!(stats.dropped, 0);

        // Two more passes exhaust the attempt budget.
        for _ in 0..2 {
            harness.reddit.set_tree(CommentPage::default());
            run(&state).await.unwrap();
        }
        assert!(state.store.pop_queued().await.unwrap().is_none());
        assert_eq!(state.store.state("abc").await.unwrap(), None);
    }
}
