//! In-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::error::RemoteApiError;
use crate::remote::EnvironmentConfig;
use crate::remote::transport::{ApiRequest, Transport};

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Json(Value),
    Status(u16, String),
}

/// Routes keyed by `METHOD url`. A route holding several responses hands
/// them out in order and keeps repeating the last one.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: RefCell<HashMap<String, VecDeque<FakeResponse>>>,
    calls: RefCell<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, method: &str, url: &str, response: FakeResponse) {
        self.on_sequence(method, url, vec![response]);
    }

    pub(crate) fn on_get(&self, url: &str, body: Value) {
        self.on("GET", url, FakeResponse::Json(body));
    }

    pub(crate) fn on_sequence(&self, method: &str, url: &str, responses: Vec<FakeResponse>) {
        self.routes
            .borrow_mut()
            .insert(format!("{} {}", method, url), responses.into());
    }

    pub(crate) fn calls(&self) -> Vec<ApiRequest> {
        self.calls.borrow().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.method.as_str() != "GET")
            .collect()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        self.calls.borrow_mut().push(request.clone());
        let key = format!("{} {}", request.method.as_str(), request.url);

        let mut routes = self.routes.borrow_mut();
        let queue = routes
            .get_mut(&key)
            .ok_or_else(|| anyhow!("no fake route for {}", key))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
        .ok_or_else(|| anyhow!("empty fake route for {}", key))?;

        match response {
            FakeResponse::Json(body) => Ok(body),
            FakeResponse::Status(status, body) => Err(RemoteApiError {
                status,
                status_text: "Fake".to_string(),
                body,
            }
            .into()),
        }
    }
}

pub(crate) fn test_env() -> EnvironmentConfig {
    EnvironmentConfig {
        base_url: "http://noco.test".to_string(),
        api_token: "tok".to_string(),
        base_id: Some("b1".to_string()),
        ..EnvironmentConfig::default()
    }
}
