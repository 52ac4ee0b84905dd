#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "tracing"), allow(dead_code, unused_imports))]

//! Structured logging integration tests.
//!
//! With events:
//!   cargo test -p canload-core --features tracing --test tracing_tests
//!
//! Without the feature the macros compile to nothing:
//!   cargo test -p canload-core --test tracing_tests -- no_subscriber

use std::sync::{Arc, Mutex};
use std::time::Duration;

use canload_core::{
    Loader, LoaderEvent, LoaderOptions, Outcome, Phase, ReadyState, RecordingSurface, StaticHost,
};
use pretty_assertions::assert_eq;
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
}

/// Layer recording every event's level and message.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_owned());
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0.unwrap_or_default(),
        });
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    (result, captured)
}

fn drive(host: &StaticHost, events: Vec<LoaderEvent>) -> Loader<RecordingSurface> {
    let (mut loader, _) = Loader::activate(
        LoaderOptions::default(),
        host,
        RecordingSurface::new(),
        Duration::ZERO,
    );
    let mut now = Duration::ZERO;
    for event in events {
        now += Duration::from_millis(10);
        loader.handle(event, now);
    }
    while let Some(deadline) = loader.next_deadline() {
        now = now.max(deadline);
        loader.advance(now);
    }
    loader
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn no_subscriber_lifecycle_still_completes() {
    let host = StaticHost {
        ready_state: ReadyState::Complete,
        font_readiness: false,
        image_sources: vec!["a.png".into()],
        background_images: Vec::new(),
    };
    let loader = drive(
        &host,
        vec![LoaderEvent::ImageSettled {
            url: "a.png".into(),
            outcome: Outcome::Loaded,
        }],
    );
    assert_eq!(loader.phase(), Phase::Removed);
}

#[cfg(feature = "tracing")]
#[test]
fn lifecycle_milestones_are_logged_in_order() {
    let host = StaticHost {
        ready_state: ReadyState::Complete,
        font_readiness: false,
        image_sources: vec!["a.png".into()],
        background_images: Vec::new(),
    };
    let (loader, events) = capture(|| {
        drive(
            &host,
            vec![LoaderEvent::ImageSettled {
                url: "a.png".into(),
                outcome: Outcome::Loaded,
            }],
        )
    });
    assert_eq!(loader.phase(), Phase::Removed);

    let infos: Vec<&str> = events
        .iter()
        .filter(|e| e.level == tracing::Level::INFO)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        infos,
        vec!["loader activated", "finish sequence started", "overlay removed"]
    );
}

#[cfg(feature = "tracing")]
#[test]
fn rejected_font_readiness_warns_once() {
    let host = StaticHost {
        ready_state: ReadyState::Complete,
        font_readiness: true,
        image_sources: vec!["a.png".into()],
        background_images: Vec::new(),
    };
    let (_, events) = capture(|| {
        drive(
            &host,
            vec![
                LoaderEvent::FontsSettled(Outcome::Failed),
                LoaderEvent::FontsSettled(Outcome::Failed),
            ],
        )
    });
    let warnings = events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .count();
    assert_eq!(warnings, 1);
}
