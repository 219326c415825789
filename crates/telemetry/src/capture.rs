//! A layer that keeps every event in memory, for asserting on log output.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    /// Every other field, rendered as `name=value`.
    pub fields: Vec<String>,
}

impl CapturedEvent {
    fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle) || self.fields.iter().any(|f| f.contains(needle))
    }
}

/// Cloneable handle; all clones share the same buffer.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events on the current thread to this capture until the guard
    /// drops.
    pub fn set_default(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .map(|event| event.message)
            .collect()
    }

    /// True when any captured message or field value contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.events().iter().any(|event| event.mentions(needle))
    }

    pub fn last(&self) -> Option<CapturedEvent> {
        self.events().pop()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message.unwrap_or_default(),
                fields: visitor.fields,
            });
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_level_and_formatted_message() {
        let capture = LogCapture::new();
        {
            let _guard = capture.set_default();
            let reason = "An error";
            tracing::info!(phase = "create_db", "creating role");
            tracing::error!(phase = "create_db", "{reason}");
        }
        tracing::error!("outside the guard");

        assert_eq!(
            capture.events(),
            vec![
                CapturedEvent {
                    level: Level::INFO,
                    message: "creating role".to_string(),
                    fields: vec!["phase=create_db".to_string()],
                },
                CapturedEvent {
                    level: Level::ERROR,
                    message: "An error".to_string(),
                    fields: vec!["phase=create_db".to_string()],
                },
            ]
        );
        assert_eq!(capture.messages_at(Level::ERROR), vec!["An error"]);
        assert_eq!(capture.last().map(|e| e.level), Some(Level::ERROR));
        assert!(capture.mentions("create_db"));
        assert!(!capture.mentions("outside"));
    }
}
