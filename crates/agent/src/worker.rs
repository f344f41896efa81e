//! Conversation worker — feeds inbound channel messages to the orchestrator.
//!
//! Messages are handled one at a time in arrival order. When the inbound
//! stream ends the history is saved one last time.

use std::sync::Arc;

use chatterbox_core::channel::ChannelMessage;
use chatterbox_core::error::ChannelError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::orchestrator::TurnOrchestrator;

/// Counters for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Messages received from the channel
    pub received: usize,
    /// Messages that produced a reply
    pub replied: usize,
    /// Channel errors seen on the inbound stream
    pub errors: usize,
}

pub struct ConversationWorker {
    orchestrator: Arc<TurnOrchestrator>,
}

impl ConversationWorker {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Drain `inbound` until every sender is gone.
    pub async fn run(
        &self,
        mut inbound: mpsc::Receiver<Result<ChannelMessage, ChannelError>>,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();

        while let Some(next) = inbound.recv().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Inbound channel error");
                    stats.errors += 1;
                    continue;
                }
            };
            stats.received += 1;

            debug!(
                channel = %message.channel_id,
                sender = %message.sender_name,
                "Inbound message"
            );
            if self
                .orchestrator
                .handle_turn(&message.sender_name, &message.content)
                .await
                .is_some()
            {
                stats.replied += 1;
            }
        }

        self.orchestrator.persist().await;
        info!(
            received = stats.received,
            replied = stats.replied,
            "Conversation worker stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelGateway;
    use crate::session::{BotIdentity, Session};
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use chatterbox_core::channel::ChannelId;
    use chatterbox_core::error::HistoryError;
    use chatterbox_core::event::EventBus;
    use chatterbox_core::history::{History, HistoryStore, Turn};
    use chatterbox_core::tool::ToolRegistry;
    use chatterbox_core::topic::topic_state;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingStore {
        saves: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl HistoryStore for CountingStore {
        fn name(&self) -> &str {
            "counting"
        }
        async fn load(&self) -> Result<Vec<Turn>, HistoryError> {
            Ok(vec![])
        }
        async fn save(&self, turns: &[Turn]) -> Result<(), HistoryError> {
            self.saves.lock().unwrap().push(turns.len());
            Ok(())
        }
    }

    fn message(sender: &str, content: &str) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("test".into()),
            sender_name: sender.into(),
            content: content.into(),
            chat_id: "room".into(),
        }
    }

    #[tokio::test]
    async fn handles_messages_in_order_and_saves_on_close() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::text("first"),
            verdict(true),
            Step::text("second"),
            verdict(true),
        ]));
        let (_writer, reader) = topic_state();
        let session = Arc::new(Session::new(
            BotIdentity::new("SLM_Bot", "room", "room"),
            History::new(100),
            reader,
        ));
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(CountingStore::default());
        let orchestrator = TurnOrchestrator::new(
            session.clone(),
            Arc::new(ModelGateway::new(provider, "m", 0.2)),
            Arc::new(ToolRegistry::new()),
            sink.clone(),
            Arc::new(EventBus::default()),
        )
        .with_store(store.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send(Ok(message("alice", "!ai one"))).await.unwrap();
        tx.send(Ok(message("bob", "just chatting"))).await.unwrap();
        tx.send(Err(ChannelError::ConnectionLost("blip".into()))).await.unwrap();
        tx.send(Ok(message("carol", "!ai two"))).await.unwrap();
        drop(tx);

        let stats = ConversationWorker::new(Arc::new(orchestrator)).run(rx).await;

        assert_eq!(stats, WorkerStats { received: 3, replied: 2, errors: 1 });
        assert_eq!(sink.texts(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(session.history_len().await, 4);
        assert_eq!(*store.saves.lock().unwrap(), vec![2, 4, 4]);
    }
}
