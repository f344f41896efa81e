//! `chatterbox run` — Chat with the bot from the terminal.
//!
//! Wires the whole pipeline: provider, tools, history store, topic feed,
//! reactor, and the CLI channel, then runs until stdin closes or Ctrl+C.

use std::sync::Arc;

use chatterbox_agent::{
    BotIdentity, ContextBuilder, ConversationWorker, ModelGateway, Session, TopicReactor,
    TurnOrchestrator,
};
use chatterbox_channels::{CliChannel, ManualTopicFeed};
use chatterbox_config::AppConfig;
use chatterbox_core::channel::Channel;
use chatterbox_core::event::{DomainEvent, EventBus};
use chatterbox_core::history::{History, HistoryStore, load_or_empty};
use chatterbox_core::topic::{TopicUpdate, topic_state};
use chatterbox_memory::{InMemoryHistory, JsonFileHistory};
use chatterbox_tools::{DuckDuckGoSearch, default_registry};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub async fn run(
    config: AppConfig,
    viewer: &str,
    category: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = chatterbox_providers::build_from_config(&config.provider)?;
    match provider.health_check().await {
        Ok(true) => debug!(provider = provider.name(), "Model backend is up"),
        Ok(false) => warn!(provider = provider.name(), "Model backend reported unhealthy"),
        Err(e) => warn!(provider = provider.name(), error = %e, "Model backend is not reachable yet"),
    }

    let store: Arc<dyn HistoryStore> = if config.history.persist {
        Arc::new(JsonFileHistory::new(&config.history.path))
    } else {
        Arc::new(InMemoryHistory::new())
    };
    let turns = load_or_empty(store.as_ref()).await;
    info!(store = store.name(), turns = turns.len(), "Chat history loaded");

    let identity = BotIdentity::from_config(&config.bot);
    let (writer, reader) = topic_state();
    let session = Arc::new(Session::new(
        identity.clone(),
        History::from_turns(turns, config.bot.max_history),
        reader,
    ));

    let feed = Arc::new(ManualTopicFeed::new(category.map(TopicUpdate::category)));
    let channel = Arc::new(
        CliChannel::new(&identity.channel, &identity.bot_name)
            .with_viewer(viewer)
            .with_topic_feed(feed.clone()),
    );

    let events = Arc::new(EventBus::default());
    spawn_event_logger(&events);

    let tools = Arc::new(default_registry(Box::new(DuckDuckGoSearch::new()?)));
    let gateway = Arc::new(ModelGateway::new(
        provider,
        &config.provider.model,
        config.provider.temperature,
    ));
    let context = ContextBuilder::new(config.templates.prompt.clone());

    let orchestrator = TurnOrchestrator::new(
        session.clone(),
        gateway,
        tools.clone(),
        channel.clone(),
        events.clone(),
    )
    .with_context_builder(context.clone())
    .with_prefix(&config.bot.command_prefix)
    .with_deadline(config.bot.response_timeout())
    .with_followup_deadline(config.bot.followup_timeout())
    .with_store(store);
    let orchestrator = Arc::new(orchestrator);

    let reactor = TopicReactor::new(session, writer, channel.clone(), events)
        .with_context_builder(context)
        .with_templates(config.templates.clone())
        .spawn(feed);

    println!();
    println!("  Chatterbox — {} in #{}", identity.bot_name, identity.channel);
    println!();
    println!("  Provider:  {}", config.provider.kind);
    println!("  Model:     {}", config.provider.model);
    println!("  Tools:     {}", tools.names().join(", "));
    println!("  History:   {}", config.history.path.display());
    println!();
    println!("  Address the bot with \"{} <message>\".", config.bot.command_prefix);
    println!("  Speak as someone else with \"name: message\".");
    println!("  Change the topic with \"/category <name>\" or \"/offline\".");
    println!("  Type 'exit' or press Ctrl+C to quit.");
    println!();

    let inbound = channel
        .start()
        .await
        .map_err(|e| format!("Channel error: {e}"))?;
    let worker = ConversationWorker::new(orchestrator.clone());

    tokio::select! {
        stats = worker.run(inbound) => {
            debug!(?stats, "Input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, saving history");
            orchestrator.persist().await;
        }
    }

    reactor.abort();
    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Mirror pipeline events into the log at debug level.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::ErrorOccurred { context, error_message, .. } => {
                        debug!(context = %context, error = %error_message, "Pipeline error event");
                    }
                    DomainEvent::ContextRegenerated { generation, system_context, .. } => {
                        debug!(generation, "System context now reads:\n{system_context}");
                    }
                    other => debug!(event = ?other, "Pipeline event"),
                },
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
