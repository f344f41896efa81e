//! Topic Reactor — keeps the topic state in step with the update feed.
//!
//! Unresolved until the first category signal, then Resolved. Every change
//! stores the new topic, regenerates the system context, and may post a
//! templated notification to the room. Repeats of the current topic are
//! ignored.

use std::sync::Arc;

use chatterbox_config::TemplateConfig;
use chatterbox_core::channel::ReplySink;
use chatterbox_core::event::{DomainEvent, EventBus};
use chatterbox_core::topic::{Topic, TopicFeed, TopicUpdate, TopicWriter};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{ContextBuilder, render_template};
use crate::session::Session;

pub struct TopicReactor {
    session: Arc<Session>,
    writer: TopicWriter,
    context: ContextBuilder,
    sink: Arc<dyn ReplySink>,
    events: Arc<EventBus>,
    templates: TemplateConfig,
}

impl TopicReactor {
    /// `writer` must be the writer behind the session's topic reader.
    pub fn new(
        session: Arc<Session>,
        writer: TopicWriter,
        sink: Arc<dyn ReplySink>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            session,
            writer,
            context: ContextBuilder::default(),
            sink,
            events,
            templates: TemplateConfig::default(),
        }
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_templates(mut self, templates: TemplateConfig) -> Self {
        self.templates = templates;
        self
    }

    pub fn current(&self) -> Topic {
        self.writer.current()
    }

    /// Ask the feed for the category once, at startup. No notification is sent.
    ///
    /// A failed lookup leaves the topic Unresolved.
    pub async fn resolve_initial(&self, feed: &dyn TopicFeed) -> Topic {
        match feed.current().await {
            Ok(update) => {
                let topic = update.into_topic();
                if let Some(previous) = self.writer.set(topic.clone()) {
                    info!(feed = feed.name(), topic = %topic, "Initial topic resolved");
                    self.regenerate(&previous, &topic).await;
                }
                topic
            }
            Err(e) => {
                warn!(feed = feed.name(), error = %e, "Initial topic lookup failed");
                self.events.publish(DomainEvent::ErrorOccurred {
                    context: "topic_lookup".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.writer.current()
            }
        }
    }

    /// Apply one feed update. Returns whether the topic changed.
    pub async fn apply(&self, update: TopicUpdate) -> bool {
        let topic = update.into_topic();
        let Some(previous) = self.writer.set(topic.clone()) else {
            debug!(topic = %topic, "Topic unchanged");
            return false;
        };

        info!(from = %previous, to = %topic, "Topic changed");
        self.regenerate(&previous, &topic).await;
        self.notify(&previous, &topic).await;
        true
    }

    /// Resolve the initial topic, then follow the feed until it closes.
    pub async fn run(self, feed: Arc<dyn TopicFeed>) {
        self.resolve_initial(feed.as_ref()).await;

        let mut updates = match feed.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(feed = feed.name(), error = %e, "Cannot subscribe to topic updates");
                return;
            }
        };

        while let Some(update) = updates.recv().await {
            self.apply(update).await;
        }
        debug!(feed = feed.name(), "Topic feed closed");
    }

    pub fn spawn(self, feed: Arc<dyn TopicFeed>) -> JoinHandle<()> {
        tokio::spawn(self.run(feed))
    }

    async fn regenerate(&self, previous: &Topic, topic: &Topic) {
        let system_context = self.context.render_for(&self.session).await;
        let generation = self.session.bump_context_generation();
        debug!(generation, "System context regenerated");

        self.events.publish(DomainEvent::ContextRegenerated {
            generation,
            system_context,
            timestamp: Utc::now(),
        });
        self.events.publish(DomainEvent::TopicChanged {
            from: previous.label().to_string(),
            to: topic.label().to_string(),
            timestamp: Utc::now(),
        });
    }

    /// The notification for a change, or `None` if its template renders empty.
    pub fn notification(&self, previous: &Topic, topic: &Topic) -> Option<String> {
        let template = match topic {
            Topic::Offline => &self.templates.empty_category,
            _ => &self.templates.category_changed,
        };
        let text = render_template(
            template,
            &[
                ("old_category", previous.label()),
                ("new_category", topic.label()),
                ("streamer_name", self.session.identity().streamer_name.as_str()),
            ],
        );
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    async fn notify(&self, previous: &Topic, topic: &Topic) {
        let Some(text) = self.notification(previous, topic) else {
            return;
        };
        let channel = &self.session.identity().channel;
        if let Err(e) = self.sink.send(channel, &text).await {
            warn!(error = %e, "Topic notification delivery failed");
            self.events.publish(DomainEvent::ErrorOccurred {
                context: "reply_sink".into(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}
