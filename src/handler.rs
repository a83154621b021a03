//! End-to-end message handling: dispatch an inbound message, render the
//! outcome, deliver the reply.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::delivery::{Delivery, RateLimiter};
use crate::dispatch::{Dispatcher, DispatcherOptions, Outcome};
use crate::error::SignupError;
use crate::response::Response;
use crate::storage::Store;
use crate::transport::{InboundMessage, Messenger};

pub struct HandlerOptions {
    pub dispatcher: DispatcherOptions,
    /// Token bucket size for outbound messages.
    pub rate_limit_burst: u32,
    /// Time to regain one outbound token.
    pub rate_limit_refill: Duration,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        HandlerOptions {
            dispatcher: DispatcherOptions::default(),
            rate_limit_burst: 5,
            rate_limit_refill: Duration::from_millis(500),
        }
    }
}

/// The single entry point a host process wires inbound messages into. Safe
/// to call concurrently; cancellation is dropping the returned future.
pub struct MessageHandler {
    dispatcher: Dispatcher,
    delivery: Delivery,
}

impl MessageHandler {
    pub fn new(store: Arc<Store>, messenger: Arc<dyn Messenger>, opts: HandlerOptions) -> Self {
        MessageHandler {
            dispatcher: Dispatcher::new(store, opts.dispatcher),
            delivery: Delivery::new(
                messenger,
                RateLimiter::new(opts.rate_limit_burst, opts.rate_limit_refill),
            ),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn handle(&self, msg: &InboundMessage) {
        let response = match self.dispatcher.dispatch(msg) {
            Outcome::Respond(response) => response,
            Outcome::NoResponse
            | Outcome::Unauthorized
            | Outcome::UnknownCommand
            | Outcome::NotACommand => {
                debug!(guild_id = %msg.guild_id, "no response");
                return;
            }
            Outcome::Fail(err) => render_error(msg, err),
        };

        let channel = if response.channel.is_empty() {
            msg.channel_id.as_str()
        } else {
            response.channel.as_str()
        };

        self.delivery.deliver(channel, &response).await;
    }
}

/// Corrective errors go back to the caller verbatim; internal failures are
/// logged and rendered generically so storage details never leak.
fn render_error(msg: &InboundMessage, err: SignupError) -> Response {
    let mut r = Response::to_user(&msg.author_mention);

    if err.is_user_facing() {
        r.description = err.to_string();
    } else {
        error!(guild_id = %msg.guild_id, error = %err, "error handling command");
        r.description = "Something went wrong handling that command".to_string();
    }

    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMessenger {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_message(&self, channel: &str, content: &str) -> Result<()> {
            self.sent
                .lock()
                .push((channel.to_string(), content.to_string()));
            Ok(())
        }
    }

    fn handler() -> (MessageHandler, Arc<RecordingMessenger>) {
        let store = Arc::new(Store::temporary().unwrap());
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = MessageHandler::new(store, messenger.clone(), HandlerOptions::default());
        (handler, messenger)
    }

    fn msg(author: &str, content: &str) -> InboundMessage {
        InboundMessage {
            guild_id: "g1".to_string(),
            channel_id: "chan-1".to_string(),
            channel_name: "general".to_string(),
            author_id: author.trim_start_matches('@').to_string(),
            author_mention: author.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_signup_scenario() {
        let (handler, messenger) = handler();

        // Fresh guild, no prior settings: admin commands are open.
        handler.handle(&msg("@admin", "!admin add Raid1")).await;
        handler
            .handle(&msg("@admin", "!admin roles Raid1 tank:2:🛡️,heal:1"))
            .await;

        for user in ["@A", "@B", "@C"] {
            handler.handle(&msg(user, "!su Raid1 tank")).await;
        }

        handler.handle(&msg("@A", "!show Raid1")).await;
        {
            let texts = messenger.texts();
            let shown = texts.last().unwrap();
            assert!(shown.contains("*tank* (2/2)"));
            assert!(shown.contains("🛡️@A\n🛡️@B"));
            assert!(shown.contains("*Overflow tank* (1)"));
            assert!(shown.contains("🛡️@C"));
            assert!(shown.contains("*heal* (0/1)"));
        }

        handler.handle(&msg("@A", "!wd Raid1")).await;
        handler.handle(&msg("@A", "!show Raid1")).await;
        {
            let texts = messenger.texts();
            let shown = texts.last().unwrap();
            // C promoted out of overflow.
            assert!(shown.contains("*tank* (2/2)"));
            assert!(shown.contains("🛡️@B\n🛡️@C"));
            assert!(!shown.contains("Overflow"));
        }
    }

    #[tokio::test]
    async fn test_silent_outcomes_send_nothing() {
        let (handler, messenger) = handler();

        handler.handle(&msg("@A", "just chatting")).await;
        handler.handle(&msg("@A", "!frobnicate")).await;
        assert!(messenger.texts().is_empty());
    }

    #[tokio::test]
    async fn test_user_facing_error_is_rendered() {
        let (handler, messenger) = handler();

        handler.handle(&msg("@A", "!su Ghost tank")).await;
        let texts = messenger.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("event 'Ghost' does not exist"));
    }

    #[tokio::test]
    async fn test_reply_goes_to_origin_channel() {
        let (handler, messenger) = handler();

        handler.handle(&msg("@admin", "!admin add Raid1")).await;
        let sent = messenger.sent.lock();
        assert_eq!(sent[0].0, "chan-1");
    }
}
