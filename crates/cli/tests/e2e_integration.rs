//! End-to-end integration tests for the Chatterbox turn pipeline.
//!
//! These tests wire the real crates together (tools, history store, topic
//! feed, reactor, worker) and swap only the model backend for a script.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chatterbox_agent::{
    BotIdentity, ContextBuilder, ConversationWorker, Fallback, ModelGateway, Session, TopicReactor,
    TurnOrchestrator,
};
use chatterbox_channels::ManualTopicFeed;
use chatterbox_config::{AppConfig, TemplateConfig};
use chatterbox_core::channel::{ChannelId, ChannelMessage, ReplySink};
use chatterbox_core::error::{ChannelError, ProviderError, ToolError};
use chatterbox_core::event::{DomainEvent, EventBus};
use chatterbox_core::history::{History, HistoryStore, Turn, TurnRole, load_or_empty};
use chatterbox_core::message::{Message, MessageToolCall, Role};
use chatterbox_core::provider::{Provider, ProviderRequest, ProviderResponse};
use chatterbox_core::topic::{Topic, TopicUpdate, topic_state};
use chatterbox_memory::JsonFileHistory;
use chatterbox_tools::{SearchBackend, SearchHit, default_registry};
use tokio::sync::mpsc;

// ── Scripted Provider ────────────────────────────────────────────────────

enum Script {
    Text(&'static str),
    Tools(Vec<(&'static str, serde_json::Value)>),
    Down,
    Hang,
}

/// A provider that plays back scripted replies and records every request.
struct ScriptedProvider {
    script: Mutex<Vec<Script>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_script"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider exhausted");

        let message = match next {
            Script::Text(text) => Message::assistant(text),
            Script::Tools(calls) => {
                let mut message = Message::assistant("");
                message.tool_calls = calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, arguments))| MessageToolCall {
                        id: format!("call_{i}"),
                        name: name.into(),
                        arguments,
                    })
                    .collect();
                message
            }
            Script::Down => return Err(ProviderError::Network("connection refused".into())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Message::assistant("far too late")
            }
        };

        Ok(ProviderResponse {
            message,
            usage: None,
            model: "e2e-model".into(),
        })
    }
}

const OK: Script = Script::Text(r#"{"accepted": true}"#);
const NO: Script = Script::Text(r#"{"accepted": false}"#);

// ── Collaborators ────────────────────────────────────────────────────────

#[derive(Default)]
struct Room {
    sent: Mutex<Vec<String>>,
}

impl Room {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for Room {
    async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }
}

struct CannedSearch;

#[async_trait]
impl SearchBackend for CannedSearch {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<SearchHit>, ToolError> {
        Ok(vec![SearchHit {
            title: format!("About {query}"),
            href: "https://example.org/a".into(),
            body: "An article.".into(),
        }]
        .into_iter()
        .take(max)
        .collect())
    }
}

struct Bot {
    orchestrator: Arc<TurnOrchestrator>,
    reactor: TopicReactor,
    session: Arc<Session>,
    provider: Arc<ScriptedProvider>,
    room: Arc<Room>,
    events: Arc<EventBus>,
}

fn bot_with(script: Vec<Script>, store: Option<Arc<dyn HistoryStore>>, turns: Vec<Turn>) -> Bot {
    let config = AppConfig::default();
    let provider = ScriptedProvider::new(script);
    let room = Arc::new(Room::default());
    let events = Arc::new(EventBus::default());
    let (writer, reader) = topic_state();
    let session = Arc::new(Session::new(
        BotIdentity::new("BotName", "somestreamer", "somestreamer"),
        History::from_turns(turns, config.bot.max_history),
        reader,
    ));
    let context = ContextBuilder::new(config.templates.prompt.clone());

    let mut orchestrator = TurnOrchestrator::new(
        session.clone(),
        Arc::new(ModelGateway::new(provider.clone(), "e2e-model", 0.2)),
        Arc::new(default_registry(Box::new(CannedSearch))),
        room.clone(),
        events.clone(),
    )
    .with_context_builder(context.clone())
    .with_prefix(&config.bot.command_prefix)
    .with_deadline(config.bot.response_timeout());
    if let Some(store) = store {
        orchestrator = orchestrator.with_store(store);
    }

    let reactor = TopicReactor::new(session.clone(), writer, room.clone(), events.clone())
        .with_context_builder(context)
        .with_templates(TemplateConfig::default());

    Bot {
        orchestrator: Arc::new(orchestrator),
        reactor,
        session,
        provider,
        room,
        events,
    }
}

fn bot(script: Vec<Script>) -> Bot {
    bot_with(script, None, Vec::new())
}

fn pairs(turns: &[Turn]) -> Vec<(TurnRole, &str)> {
    turns.iter().map(|t| (t.role, t.content.as_str())).collect()
}

// ── Turn scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_hello_scenario() {
    let b = bot(vec![Script::Text("Hi!"), OK]);
    let reply = b.orchestrator.handle_turn("alice", "!ai hello").await;

    assert_eq!(reply.as_deref(), Some("Hi!"));
    assert_eq!(b.room.sent(), vec!["Hi!"]);
    let turns = b.session.history_snapshot().await;
    assert_eq!(
        pairs(&turns),
        vec![
            (TurnRole::User, "alice: hello"),
            (TurnRole::Assistant, "BotName: Hi!"),
        ]
    );
}

#[tokio::test]
async fn e2e_all_three_tools_are_declared() {
    let b = bot(vec![Script::Text("Hi!"), OK]);
    b.orchestrator.handle_turn("alice", "!ai hello").await;

    let names: Vec<String> = b.provider.requests()[0]
        .tools
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(names, vec!["respond_to_user", "search_internet", "get_current_time"]);
}

#[tokio::test]
async fn e2e_clock_tool_feeds_second_pass() {
    let b = bot(vec![
        Script::Tools(vec![("get_current_time", serde_json::json!({}))]),
        Script::Text("It's noon somewhere."),
        OK,
    ]);
    let reply = b.orchestrator.handle_turn("bob", "!ai what time is it?").await;
    assert_eq!(reply.as_deref(), Some("It's noon somewhere."));

    let turns = b.session.history_snapshot().await;
    assert_eq!(turns[1].role, TurnRole::Tool);
    let timestamp = turns[1]
        .content
        .strip_prefix("Tool get_current_time returned ")
        .expect("clock summary");
    assert!(timestamp.ends_with('Z') && timestamp.contains('T'));

    let second = &b.provider.requests()[1];
    assert!(second.tools.is_empty());
    assert!(
        second
            .messages
            .iter()
            .any(|m| m.role == Role::Tool && m.content == turns[1].content)
    );
    assert!(second.messages[0].content.contains(&turns[1].content));
}

#[tokio::test]
async fn e2e_search_and_noop_tools_in_order() {
    let b = bot(vec![
        Script::Tools(vec![
            ("search_internet", serde_json::json!({"query": "celeste"})),
            ("respond_to_user", serde_json::json!({})),
        ]),
        Script::Text("Celeste is a climbing game."),
        OK,
    ]);
    b.orchestrator.handle_turn("carol", "!ai what is celeste").await;

    let turns = b.session.history_snapshot().await;
    assert!(turns[1].content.starts_with("Tool search_internet returned 1 results. Results: "));
    assert!(turns[1].content.contains("About celeste"));
    assert_eq!(turns[2].content, "Null tool call was used.");
    assert_eq!(turns[3].content, "BotName: Celeste is a climbing game.");
}

#[tokio::test(start_paused = true)]
async fn e2e_hung_backend_times_out() {
    let b = bot(vec![Script::Hang]);
    let reply = b.orchestrator.handle_turn("alice", "!ai are you there?").await;

    assert_eq!(reply.as_deref(), Some(Fallback::Timeout.sentence()));
    assert_eq!(b.room.sent(), vec![Fallback::Timeout.sentence()]);
    let turns = b.session.history_snapshot().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(
        turns[1].content,
        format!("BotName: {}", Fallback::Timeout.sentence())
    );
}

#[tokio::test]
async fn e2e_backend_down_and_rejection() {
    let b = bot(vec![Script::Down, Script::Text("nasty words"), NO]);

    let first = b.orchestrator.handle_turn("alice", "!ai hi").await;
    assert_eq!(first.as_deref(), Some(Fallback::Backend.sentence()));

    let second = b.orchestrator.handle_turn("alice", "!ai say something bad").await;
    assert_eq!(second.as_deref(), Some(Fallback::Processing.sentence()));
    assert!(!b.room.sent().iter().any(|s| s.contains("nasty")));
}

#[tokio::test]
async fn e2e_ignores_unaddressed_chat() {
    let b = bot(vec![]);
    for line in ["hello chat", "!aim for the top", "lol !ai"] {
        assert!(b.orchestrator.handle_turn("dave", line).await.is_none());
    }
    assert!(b.session.history_snapshot().await.is_empty());
    assert!(b.room.sent().is_empty());
    assert!(b.provider.requests().is_empty());
}

// ── Topic ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_topic_changes_reach_the_next_turn() {
    let b = bot(vec![Script::Text("GL on the climb!"), OK]);

    assert!(b.reactor.apply(TopicUpdate::category("Game A")).await);
    assert!(b.reactor.apply(TopicUpdate::category("Game B")).await);
    assert!(!b.reactor.apply(TopicUpdate::category("Game B")).await);
    assert_eq!(b.session.context_generation(), 2);
    assert!(b.room.sent().len() <= 2);

    b.orchestrator.handle_turn("erin", "!ai hype").await;
    let system = &b.provider.requests()[0].messages[0].content;
    assert!(system.contains("The current game is Game B."));
    assert!(system.contains("The streamer's name is somestreamer."));
}

#[tokio::test]
async fn e2e_reactor_follows_manual_feed() {
    let b = bot(vec![]);
    let session = b.session.clone();
    let room = b.room.clone();
    let mut events = b.events.subscribe();
    let feed = Arc::new(ManualTopicFeed::new(Some(TopicUpdate::category("Celeste"))));
    let handle = b.reactor.spawn(feed.clone());

    // The startup lookup resolves quietly.
    loop {
        if let DomainEvent::TopicChanged { to, .. } = events.recv().await.unwrap().as_ref() {
            assert_eq!(to, "Celeste");
            break;
        }
    }
    assert!(room.sent().is_empty());

    feed.push(TopicUpdate::offline()).await.unwrap();
    loop {
        if let DomainEvent::TopicChanged { to, .. } = events.recv().await.unwrap().as_ref() {
            assert_eq!(to, "[No Stream Category]");
            break;
        }
    }
    handle.abort();

    assert_eq!(session.topic(), Topic::Offline);
    assert_eq!(session.context_generation(), 2);
}

// ── Persistence ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("history.json");

    let store: Arc<dyn HistoryStore> = Arc::new(JsonFileHistory::new(&path));
    let first = bot_with(vec![Script::Text("Hi!"), OK], Some(store.clone()), Vec::new());
    first.orchestrator.handle_turn("alice", "!ai hello").await;
    let before = first.session.history_snapshot().await;

    let reloaded = load_or_empty(store.as_ref()).await;
    assert_eq!(reloaded, before);

    let second = bot_with(vec![Script::Text("Welcome back!"), OK], Some(store), reloaded);
    second.orchestrator.handle_turn("alice", "!ai I'm back").await;
    let system = &second.provider.requests()[0].messages[0].content;
    assert!(system.contains("[user] alice: hello"));
    assert_eq!(second.session.history_len().await, 4);
}

#[tokio::test]
async fn e2e_corrupt_history_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = JsonFileHistory::new(&path);
    assert!(load_or_empty(&store).await.is_empty());
}

// ── Worker ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_worker_runs_a_chat_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let store: Arc<dyn HistoryStore> = Arc::new(JsonFileHistory::new(&path));
    let b = bot_with(
        vec![Script::Text("Hey alice!"), OK, Script::Text("Hey bob!"), OK],
        Some(store.clone()),
        Vec::new(),
    );

    let (tx, rx) = mpsc::channel(8);
    for (sender, content) in [
        ("alice", "!ai hey"),
        ("carol", "nice run"),
        ("bob", "!ai yo"),
    ] {
        tx.send(Ok(ChannelMessage {
            channel_id: ChannelId("test".into()),
            sender_name: sender.into(),
            content: content.into(),
            chat_id: "somestreamer".into(),
        }))
        .await
        .unwrap();
    }
    drop(tx);

    let stats = ConversationWorker::new(b.orchestrator.clone()).run(rx).await;
    assert_eq!(stats.received, 3);
    assert_eq!(stats.replied, 2);
    assert_eq!(b.room.sent(), vec!["Hey alice!", "Hey bob!"]);

    let saved = store.load().await.unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(saved[2].content, "bob: yo");
}
