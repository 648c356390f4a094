//! Scripted RPC client for lifecycle tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{RemoteError, RpcClient, RpcError};

/// One scripted response, consumed in order regardless of method.
pub(crate) enum Step {
    Ok(Value),
    Node(RemoteError),
    Transport(String),
}

pub(crate) struct ScriptedRpc {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRpc {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Methods invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcClient for ScriptedRpc {
    async fn call(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Ok(value)) => Ok(value),
            Some(Step::Node(error)) => Err(RpcError::Node(error)),
            Some(Step::Transport(message)) => Err(RpcError::Transport(message)),
            None => Err(RpcError::Transport("script exhausted".to_string())),
        }
    }
}
