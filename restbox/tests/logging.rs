mod common;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use restbox::{RequestOptions, RestClient};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use common::MockTransport;

/// Collects the message of every event.
#[derive(Clone, Default)]
struct Messages(Arc<Mutex<Vec<String>>>);

impl Messages {
    fn contains(&self, message: &str) -> bool {
        self.0.lock().unwrap().iter().any(|seen| seen == message)
    }
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for Messages {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.0.lock().unwrap().push(message);
        }
    }
}

#[tokio::test]
async fn exchanges_are_traced() {
    let messages = Messages::default();
    let subscriber = tracing_subscriber::registry().with(messages.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let transport = MockTransport::new();
    let client = RestClient::builder("http://api.test")
        .transport(transport)
        .cache_lifetime(Duration::from_secs(60))
        .build();

    client.get("/todos", RequestOptions::new()).await.unwrap();
    client.get("/todos", RequestOptions::new()).await.unwrap();

    assert!(messages.contains("sending request"));
    assert!(messages.contains("replaying cached response"));
}

#[tokio::test]
async fn transport_failures_are_warned() {
    let messages = Messages::default();
    let subscriber = tracing_subscriber::registry().with(messages.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = RestClient::builder("http://api.test")
        .transport(MockTransport::failing("refused"))
        .build();

    client.get("/todos", RequestOptions::new()).await.unwrap_err();

    assert!(messages.contains("transport failed"));
}
