//! Slack Web API calls used by the workflow: message lookup, team lookup and the confirmation
//! post.

use anyhow::{Context, Result, anyhow, bail};
use issue_bridge_core::{
    config::{HttpConfig, SlackConfig},
    error::StageFailure,
    models::ThreadContext,
    secret::Secret,
    util::{build_http_client, truncate_for_error},
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    text: String,
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamInfoResponse {
    ok: bool,
    team: Option<Team>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Team {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: Secret,
}

impl SlackClient {
    pub fn new(config: &SlackConfig, http_config: &HttpConfig, bot_token: Secret) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = build_http_client(http_config, headers)?;
        Ok(Self {
            http,
            api_base: config.api_url.as_str().trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    /// Fetch the single message at or immediately before `reference_ts` (inclusive).
    /// Thread replies are not included.
    pub async fn fetch_message(
        &self,
        channel: &str,
        reference_ts: &str,
    ) -> Result<ThreadContext, StageFailure> {
        let request = self
            .http
            .get(format!("{}/conversations.history", self.api_base))
            .bearer_auth(self.bot_token.expose())
            .query(&[
                ("channel", channel),
                ("latest", reference_ts),
                ("inclusive", "true"),
                ("limit", "1"),
            ]);
        let response: HistoryResponse = self.request_json("conversations.history", request).await?;
        if !response.ok {
            return Err(StageFailure::expected(format!(
                "slack conversations.history failed: {}",
                response.error.as_deref().unwrap_or("unknown error")
            )));
        }
        let Some(message) = response.messages.into_iter().next() else {
            return Err(StageFailure::expected(format!(
                "no message at or before {reference_ts} in {channel}"
            )));
        };
        tracing::debug!("Fetched message {} from {}", reference_ts, channel);
        Ok(ThreadContext {
            channel: channel.to_string(),
            timestamp: message.ts.unwrap_or_else(|| reference_ts.to_string()),
            text: message.text,
        })
    }

    pub async fn team_id(&self) -> Result<String, StageFailure> {
        let request = self
            .http
            .get(format!("{}/team.info", self.api_base))
            .bearer_auth(self.bot_token.expose());
        let response: TeamInfoResponse = self.request_json("team.info", request).await?;
        if !response.ok {
            return Err(StageFailure::expected(format!(
                "slack team.info failed: {}",
                response.error.as_deref().unwrap_or("unknown error")
            )));
        }
        response
            .team
            .map(|team| team.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StageFailure::Unexpected(anyhow!("slack team.info did not return a team ID")))
    }

    /// Post `text` to `channel`, in the thread of `thread_ts` when given. Link previews are
    /// disabled. Returns the timestamp of the posted message.
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<String> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
        });
        if let Some(thread_ts) = thread_ts.filter(|ts| !ts.is_empty()) {
            payload["thread_ts"] = json!(thread_ts);
        }
        let request = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(self.bot_token.expose())
            .json(&payload);
        let response: PostMessageResponse = self.request_json("chat.postMessage", request).await?;
        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response.error.as_deref().unwrap_or("unknown error")
            );
        }
        response.ts.ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "slack api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response.json::<T>().await.with_context(|| format!("failed to decode slack {operation}"))
    }
}
