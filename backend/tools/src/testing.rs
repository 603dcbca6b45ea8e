//! Test double for the gateway RPC surface: records every call and replays
//! scripted responses per method.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use nestforge_gateway::{Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
    pub timeout: Duration,
}

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, VecDeque<Result<Value, GatewayError>>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response for `method`. Unscripted methods answer
    /// `Ok(Value::Null)`.
    pub fn script(&self, method: &str, response: Result<Value, GatewayError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    /// Poll until a `method` call is recorded (drives detached tasks on the
    /// test runtime). Panics after ~1s.
    pub async fn wait_for_call(&self, method: &str) -> RecordedCall {
        for _ in 0..200 {
            if let Some(call) = self.calls_for(method).into_iter().next() {
                return call;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no {method} call recorded within the test budget");
    }

    /// Give detached tasks a chance to drain before asserting on absence.
    pub async fn settle(&self) {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params,
            timeout,
        });
        self.responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(Value::Null))
    }
}
