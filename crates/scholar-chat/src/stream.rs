//! Drains a fragment stream into the in-progress turn.

use tokio::sync::watch;

use scholar_core::{ConversationHistory, ScholarError, TurnId};
use scholar_gateway::FragmentStream;

use crate::error::ChatError;

/// Written into a turn whose stream ended without any text.
pub const NO_RESPONSE_NOTICE: &str =
    "[No response] The AI returned an empty answer. Please try again.";

/// Snapshot of the turn being streamed, as observers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTurn {
    pub turn_id: TurnId,
    pub content: String,
    pub finished: bool,
}

/// Appends fragments to the in-progress turn and publishes whole snapshots.
#[derive(Debug)]
pub struct StreamingConsumer {
    live: watch::Sender<Option<LiveTurn>>,
}

impl Default for StreamingConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingConsumer {
    pub fn new() -> Self {
        let (live, _) = watch::channel(None);
        Self { live }
    }

    /// Watch the turn being streamed. Each value is a full snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveTurn>> {
        self.live.subscribe()
    }

    /// Consume `fragments` into the in-progress turn of `history`.
    ///
    /// The turn is finalized on every exit path once streaming has begun. A
    /// transport error is written into the turn as a marked line and returned.
    /// Turns ending in a marker or the empty-answer notice are finalized as
    /// failed so they are never replayed as context.
    pub async fn consume(
        &self,
        history: &mut ConversationHistory,
        mut fragments: FragmentStream,
    ) -> Result<String, ChatError> {
        let turn_id = history
            .in_progress_id()
            .ok_or_else(|| ScholarError::Input("no response is in progress".to_string()))?;

        let mut buffer = String::new();
        let mut count = 0usize;

        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    count += 1;
                    buffer.push_str(&fragment);
                    history.write_in_progress(buffer.clone())?;
                    self.publish(turn_id, &buffer, false);
                }
                Err(e) => {
                    let content = with_error_marker(&buffer, &e);
                    history.write_in_progress(content.clone())?;
                    history.finalize_failed();
                    self.publish(turn_id, &content, true);
                    tracing::warn!(
                        turn_id = %turn_id,
                        fragments = count,
                        error = %e,
                        "Response stream failed"
                    );
                    return Err(e.into());
                }
            }
        }

        if buffer.is_empty() {
            history.write_in_progress(NO_RESPONSE_NOTICE.to_string())?;
            history.finalize_failed();
            self.publish(turn_id, NO_RESPONSE_NOTICE, true);
            tracing::warn!(turn_id = %turn_id, "Response stream ended without text");
        } else {
            history.finalize();
            self.publish(turn_id, &buffer, true);
        }

        tracing::debug!(
            turn_id = %turn_id,
            fragments = count,
            len = buffer.len(),
            "Response stream complete"
        );
        Ok(buffer)
    }

    /// Mark an already-open turn as failed before any stream existed.
    pub fn fail_open_turn(&self, history: &mut ConversationHistory, error: &ScholarError) {
        let Some(turn_id) = history.in_progress_id() else {
            return;
        };
        let content = with_error_marker("", error);
        if history.write_in_progress(content.clone()).is_ok() {
            self.publish(turn_id, &content, true);
        }
        history.finalize_failed();
    }

    fn publish(&self, turn_id: TurnId, content: &str, finished: bool) {
        self.live.send_replace(Some(LiveTurn {
            turn_id,
            content: content.to_string(),
            finished,
        }));
    }
}

/// The partial text followed by a visibly marked error line.
pub fn with_error_marker(partial: &str, error: &ScholarError) -> String {
    let message = match error {
        ScholarError::Remote(msg) => msg.clone(),
        other => other.to_string(),
    };
    if partial.is_empty() {
        format!("[Error] {}", message)
    } else {
        format!("{}\n\n[Error] {}", partial, message)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_history() -> ConversationHistory {
        let mut h = ConversationHistory::new();
        h.push_user("Explain recursion", None).unwrap();
        h.open_response().unwrap();
        h
    }

    #[tokio::test]
    async fn test_fragments_concatenate_into_turn() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        let stream = FragmentStream::from_fragments(["Recur", "sion is", "..."]);

        let text = consumer.consume(&mut history, stream).await.unwrap();
        assert_eq!(text, "Recursion is...");
        assert_eq!(history.last().unwrap().content, "Recursion is...");
        assert!(!history.last().unwrap().failed);
        assert!(!history.is_in_progress());
    }

    #[tokio::test]
    async fn test_live_snapshot_is_final_text() {
        let consumer = StreamingConsumer::new();
        let rx = consumer.subscribe();
        let mut history = open_history();
        let id = history.in_progress_id().unwrap();

        consumer
            .consume(&mut history, FragmentStream::from_fragments(["a", "b"]))
            .await
            .unwrap();

        let live = rx.borrow().clone().unwrap();
        assert_eq!(live.turn_id, id);
        assert_eq!(live.content, "ab");
        assert!(live.finished);
    }

    #[tokio::test]
    async fn test_snapshots_grow_monotonically() {
        let consumer = StreamingConsumer::new();
        let mut rx = consumer.subscribe();
        let mut history = open_history();

        let (tx, stream) = FragmentStream::channel(1);
        let producer = tokio::spawn(async move {
            for f in ["one ", "two ", "three"] {
                tx.send(Ok(f.to_string())).await.unwrap();
            }
        });

        let observer = tokio::spawn(async move {
            let mut seen: Vec<String> = Vec::new();
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone().unwrap();
                seen.push(snap.content.clone());
                if snap.finished {
                    break;
                }
            }
            seen
        });

        consumer.consume(&mut history, stream).await.unwrap();
        producer.await.unwrap();
        let seen = observer.await.unwrap();

        for pair in seen.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
        }
        assert_eq!(seen.last().unwrap(), "one two three");
    }

    #[tokio::test]
    async fn test_error_marks_turn_and_finalizes() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        let stream = FragmentStream::from_items(vec![
            Ok("Partial answer".to_string()),
            Err(ScholarError::Remote("connection reset".into())),
        ]);

        let err = consumer.consume(&mut history, stream).await.unwrap_err();
        assert!(matches!(err, ChatError::Core(ScholarError::Remote(_))));
        assert_eq!(
            history.last().unwrap().content,
            "Partial answer\n\n[Error] connection reset"
        );
        assert!(history.last().unwrap().failed);
        assert!(!history.is_in_progress());
    }

    #[tokio::test]
    async fn test_error_before_any_fragment() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        let stream =
            FragmentStream::from_items(vec![Err(ScholarError::Remote("HTTP 500".into()))]);

        assert!(consumer.consume(&mut history, stream).await.is_err());
        assert_eq!(history.last().unwrap().content, "[Error] HTTP 500");
        assert!(history.last().unwrap().failed);
    }

    #[tokio::test]
    async fn test_empty_stream_gets_notice() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        let text = consumer
            .consume(&mut history, FragmentStream::from_items(vec![]))
            .await
            .unwrap();
        assert!(text.is_empty());
        assert_eq!(history.last().unwrap().content, NO_RESPONSE_NOTICE);
        assert!(history.last().unwrap().failed);
        assert!(!history.is_in_progress());
    }

    #[tokio::test]
    async fn test_empty_fragments_are_skipped() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        let text = consumer
            .consume(&mut history, FragmentStream::from_fragments(["", "x", ""]))
            .await
            .unwrap();
        assert_eq!(text, "x");
    }

    #[tokio::test]
    async fn test_consume_without_open_turn_is_input_error() {
        let consumer = StreamingConsumer::new();
        let mut history = ConversationHistory::new();
        let err = consumer
            .consume(&mut history, FragmentStream::from_fragments(["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Core(ScholarError::Input(_))));
        assert!(history.is_empty());
    }

    #[test]
    fn test_fail_open_turn() {
        let consumer = StreamingConsumer::new();
        let mut history = open_history();
        consumer.fail_open_turn(&mut history, &ScholarError::Configuration("no key".into()));
        assert!(!history.is_in_progress());
        assert!(history.last().unwrap().content.starts_with("[Error] "));
        assert!(history.last().unwrap().failed);
    }
}
