use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::message::{MessageType, ServerMessage};
use crate::server_client::{ClientError, ServerTransport};
use crate::types::ServerResponse;

pub(crate) type Reply = Result<ServerResponse<Value>, ClientError>;

type Handler = Box<dyn Fn(&ServerMessage) -> Reply + Send + Sync>;

/// In-memory wallet server: answers from a closure and records every call.
pub(crate) struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<ServerMessage>>,
}

impl MockTransport {
    pub(crate) fn new(handler: impl Fn(&ServerMessage) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<ServerMessage> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: MessageType) -> usize {
        self.calls()
            .iter()
            .filter(|m| m.method == method.as_str())
            .count()
    }

    pub(crate) fn count_with(&self, method: MessageType, arg: &str) -> usize {
        self.calls()
            .iter()
            .filter(|m| m.method == method.as_str() && first_param(m) == Some(arg))
            .count()
    }
}

#[async_trait]
impl ServerTransport for MockTransport {
    async fn send(&self, message: &ServerMessage) -> Reply {
        if message.is_empty() {
            return Err(ClientError::NullMessage);
        }
        self.calls.lock().unwrap().push(message.clone());
        tokio::task::yield_now().await;
        (self.handler)(message)
    }
}

pub(crate) fn first_param(message: &ServerMessage) -> Option<&str> {
    message.params.first().and_then(Value::as_str)
}

pub(crate) fn ok(result: Value) -> Reply {
    Ok(ServerResponse::ok(result))
}

pub(crate) fn app_error(error: &str) -> Reply {
    Ok(ServerResponse::err(error))
}

pub(crate) fn unreachable_backend() -> Reply {
    Err(ClientError::Server("connection refused".into()))
}
