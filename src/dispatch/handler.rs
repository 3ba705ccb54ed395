//! Message handlers
//!
//! A handler is invoked once per received message, in registration order.
//! Handler errors are logged by the reader loop and never stop dispatch to
//! the remaining handlers.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::link::Connection;
use crate::message::Message;

/// Callback invoked for every message pulled off the link.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: &Message, connection: &dyn Connection) -> Result<()>;
}

/// Adapter turning a plain closure into a [`MessageHandler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&Message, &dyn Connection) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Message, &dyn Connection) -> Result<()> + Send + Sync,
{
    async fn on_message(&self, message: &Message, connection: &dyn Connection) -> Result<()> {
        (self.0)(message, connection)
    }
}

/// Logs the type of every message it sees.
///
/// Handy when bringing up a new link.
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn on_message(&self, message: &Message, _connection: &dyn Connection) -> Result<()> {
        info!(message_type = %message.get_type(), "Got message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ChannelConnection;

    #[tokio::test]
    async fn test_fn_handler_invokes_closure() {
        let (near, _far) = ChannelConnection::pair(1);
        let handler = FnHandler::new(|message: &Message, _: &dyn Connection| {
            assert_eq!(message.get_type(), "STATUS");
            Ok(())
        });

        handler
            .on_message(&Message::new("STATUS"), &near)
            .await
            .unwrap();
    }
}
