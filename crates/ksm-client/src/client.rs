use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use ksm_core::{
    AddResult, ClientError, ClientResult, ListResult, MemoryClient, Metadata, ProfileResult,
    SearchResult,
};

pub const DEFAULT_API_URL: &str = "https://api.supermemory.ai";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Search tuning applied to every query.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub threshold: f64,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            limit: 5,
        }
    }
}

/// Blocking HTTP client for the Supermemory REST API.
pub struct SupermemoryClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    search: SearchOptions,
}

impl SupermemoryClient {
    pub fn new(base_url: &str, api_key: &str, search: SearchOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .user_agent(concat!("kimi-supermemory/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            search,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> ClientResult<T> {
        debug!("POST {path}");
        let request = self.authorized(self.agent.post(&self.url(path)));
        let body = read_body(request.send_json(body))?;
        decode(&body)
    }
}

impl MemoryClient for SupermemoryClient {
    fn add(
        &self,
        content: &str,
        container_tag: &str,
        metadata: &Metadata,
    ) -> ClientResult<AddResult> {
        self.post(
            "/v3/documents",
            &json!({
                "content": content,
                "containerTags": [container_tag],
                "metadata": metadata,
            }),
        )
    }

    fn delete(&self, id: &str) -> ClientResult<()> {
        let path = format!("/v3/documents/{id}");
        debug!("DELETE {path}");
        let request = self.authorized(self.agent.delete(&self.url(&path)));
        read_body(request.call())?;
        Ok(())
    }

    fn search(&self, query: &str, container_tag: &str) -> ClientResult<SearchResult> {
        self.post(
            "/v4/search",
            &json!({
                "q": query,
                "containerTag": container_tag,
                "threshold": self.search.threshold,
                "limit": self.search.limit,
            }),
        )
    }

    fn list(&self, container_tag: &str, limit: usize) -> ClientResult<ListResult> {
        self.post(
            "/v3/documents/list",
            &json!({
                "containerTags": [container_tag],
                "limit": limit,
                "order": "desc",
                "sort": "createdAt",
            }),
        )
    }

    fn profile(&self, container_tag: &str, query: Option<&str>) -> ClientResult<ProfileResult> {
        let mut body = json!({ "containerTag": container_tag });
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            body["q"] = Value::String(q.to_string());
        }
        self.post("/v4/profile", &body)
    }
}

fn read_body(response: Result<ureq::Response, ureq::Error>) -> ClientResult<String> {
    match response {
        Ok(resp) => resp
            .into_string()
            .map_err(|e| ClientError::Transport(format!("cannot read response: {e}"))),
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(ClientError::Api {
                status,
                message: error_message(&body),
            })
        }
        Err(ureq::Error::Transport(t)) => Err(ClientError::Transport(t.to_string())),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    // Some endpoints answer 2xx with an empty body.
    let body = if body.trim().is_empty() { "{}" } else { body };
    Ok(serde_json::from_str(body)?)
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        ["error", "message", "details"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
    });
    match field {
        Some(msg) => msg.to_string(),
        None if body.trim().is_empty() => "empty response".to_string(),
        None => body.trim().to_string(),
    }
}
