use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::envelope::ResponseEnvelope;
use crate::api::{Params, RemoteQuery};
use crate::error::Result;

/// Remote that records every request and answers with `respond`.
/// A gated stub parks each call until the gate is notified.
pub struct StubRemote<F> {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Params)>>,
    gate: Option<Arc<Notify>>,
    respond: F,
}

impl<F> StubRemote<F>
where
    F: Fn(&str, &Params) -> Result<ResponseEnvelope> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        StubRemote {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            respond,
        }
    }

    pub fn gated(respond: F, gate: Arc<Notify>) -> Self {
        StubRemote {
            gate: Some(gate),
            ..StubRemote::new(respond)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Params)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> RemoteQuery for StubRemote<F>
where
    F: Fn(&str, &Params) -> Result<ResponseEnvelope> + Send + Sync,
{
    async fn query(&self, endpoint: &str, params: &Params) -> Result<ResponseEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        (self.respond)(endpoint, params)
    }
}

/// Responder serving pages of the given sizes, then empty pages.
pub fn paged(
    sizes: &'static [usize],
) -> impl Fn(&str, &Params) -> Result<ResponseEnvelope> + Send + Sync {
    move |_: &str, params: &Params| {
        let page = params
            .get("page")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        let size = sizes.get(page - 1).copied().unwrap_or(0);
        let items: Vec<Value> = (0..size).map(|i| json!({ "id": i })).collect();
        Ok(ResponseEnvelope::success(Value::Array(items)))
    }
}
