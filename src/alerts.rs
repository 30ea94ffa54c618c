//! Error-level events, forwarded to the admin on Slack.
//!
//! Failed tasks are only logged, so someone has to notice them to fix the
//! tracker by hand. [`AdminAlertLayer`] hands every `ERROR` event to
//! [`forward_alerts`], which posts it to the admin. Events raised while an
//! alert is being posted are not forwarded again.

use std::fmt::{self, Write as _};

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Instrument, Level, Subscriber, info_span, warn};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::chat::{ChatClient, Message};

const FORWARDER_SPAN: &str = "admin_alert";

/// A `tracing` layer that queues error events for the admin.
pub struct AdminAlertLayer {
    tx: mpsc::UnboundedSender<String>,
}

/// Creates the layer and the receiving end for [`forward_alerts`].
pub fn admin_alerts() -> (AdminAlertLayer, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AdminAlertLayer { tx }, rx)
}

impl<S> Layer<S> for AdminAlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let forwarding = ctx
            .event_scope(event)
            .is_some_and(|mut scope| scope.any(|span| span.name() == FORWARDER_SPAN));
        if forwarding {
            return;
        }
        let mut text = AlertText::default();
        event.record(&mut text);
        // The forwarder only goes away at shutdown.
        let _ = self.tx.send(text.finish(event.metadata().target()));
    }
}

#[derive(Default)]
struct AlertText {
    message: String,
    fields: String,
}

impl AlertText {
    fn finish(self, target: &str) -> String {
        if self.fields.is_empty() {
            format!("`{target}`: {}", self.message)
        } else {
            format!("`{target}`: {} ({})", self.message, self.fields)
        }
    }
}

impl Visit for AlertText {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
            return;
        }
        if !self.fields.is_empty() {
            self.fields.push_str(", ");
        }
        let _ = write!(self.fields, "{}={value:?}", field.name());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_debug(field, &format_args!("{value}"));
    }
}

/// Posts queued alerts to `admin` (a user or channel id) until the layer is
/// dropped.
pub async fn forward_alerts<C: ChatClient>(
    client: C,
    admin: String,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = rx.recv().await {
        let posted = client
            .post_message(&admin, &Message::text(text))
            .instrument(info_span!(FORWARDER_SPAN))
            .await;
        if let Err(e) = posted {
            warn!(error = %e, "Could not alert the admin");
        }
    }
}
