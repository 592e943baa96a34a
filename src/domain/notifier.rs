//! Out-of-band notifications from inside a tool or prompt body.

use serde_json::Value;

use crate::errors::TransportError;
use crate::mcp::transport::Connection;

/// Handed to every tool/prompt invocation. Anything sent through it is
/// queued on the connection before the invocation's own reply.
pub trait Notifier: Send + Sync {
    fn notify(&self, method: &str, params: Value) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct ConnectionNotifier {
    connection: Connection,
}

impl ConnectionNotifier {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

impl Notifier for ConnectionNotifier {
    fn notify(&self, method: &str, params: Value) -> Result<(), TransportError> {
        self.connection.notify(method, &params)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn notification_is_written_to_connection() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let notifier = ConnectionNotifier::new(Connection::new(sender));

        notifier
            .notify("test/notification", json!({"message": "Processing text"}))
            .expect("notify");

        let line: Value =
            serde_json::from_str(&receiver.try_recv().expect("queued")).expect("json");
        assert_eq!(line["method"], "test/notification");
        assert_eq!(line["params"]["message"], "Processing text");
        assert!(line.get("id").is_none());
    }
}
