//! In-memory gateway that replays scripted responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mlguide::gateway::{ChatGateway, ChatRequest, ChatResponse, ProviderError};
use mlguide::requests::{ClientConfig, GenerativeClient};

/// One scripted reply, matched to requests by caller tag.
pub enum Reply {
    Text(String),
    Fail(fn() -> ProviderError),
}

pub fn text(s: impl Into<String>) -> Reply {
    Reply::Text(s.into())
}

pub fn unavailable() -> ProviderError {
    ProviderError::provider("scripted", "service unavailable", false)
}

/// Replies are queued per operation (`"suggest_models"`, `"generate_metrics"`, ...)
/// so concurrent requests get deterministic answers regardless of order.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<Vec<(String, VecDeque<Reply>)>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, operation: &str, reply: Reply) -> &Self {
        let mut replies = self.replies.lock().unwrap();
        match replies.iter_mut().find(|(op, _)| op == operation) {
            Some((_, queue)) => queue.push_back(reply),
            None => replies.push((operation.to_string(), VecDeque::from([reply]))),
        }
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| operation_of(r) == operation)
            .count()
    }

    pub fn last(&self, operation: &str) -> Option<ChatRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| operation_of(r) == operation)
    }
}

fn operation_of(req: &ChatRequest) -> &str {
    req.attribution
        .caller
        .strip_prefix("requests::")
        .unwrap_or(req.attribution.caller)
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let operation = operation_of(&req).to_string();
        self.requests.lock().unwrap().push(req);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .iter_mut()
            .find(|(op, _)| *op == operation)
            .and_then(|(_, queue)| queue.pop_front());

        match reply {
            Some(Reply::Text(content)) => Ok(ChatResponse::text(content)),
            Some(Reply::Fail(make)) => Err(make()),
            None => panic!("no scripted reply for {operation}"),
        }
    }
}

pub fn client(gateway: &Arc<ScriptedGateway>) -> GenerativeClient {
    GenerativeClient::new(gateway.clone(), ClientConfig::default())
}
