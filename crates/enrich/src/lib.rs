use anyhow::{Context, Result};
use issue_bridge_core::{
    config::{EnrichmentConfig, HttpConfig, Tenant},
    error::StageFailure,
    models::Suggestion,
    util::{build_http_client, truncate_for_error},
};
use reqwest::header::HeaderMap;
use serde::Serialize;

pub const SUGGEST_PATH: &str = "populate_title_and_description";

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    channel_id: &'a str,
    team_id: &'a str,
    user_query: &'a str,
}

/// Client for the title/description suggestion service. Requests are never retried.
#[derive(Clone)]
pub struct EnrichmentClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EnrichmentClient {
    pub fn new(config: &EnrichmentConfig, http_config: &HttpConfig) -> Result<Self> {
        let http = build_http_client(http_config, HeaderMap::new())?;
        let endpoint = format!("{}/{}", config.url.as_str().trim_end_matches('/'), SUGGEST_PATH);
        Ok(Self { http, endpoint })
    }

    pub async fn suggest(&self, raw_text: &str, tenant: &Tenant) -> Result<Suggestion, StageFailure> {
        let request = SuggestRequest {
            channel_id: &tenant.channel_id,
            team_id: &tenant.team_id,
            user_query: raw_text,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Suggestion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StageFailure::expected(format!(
                "suggestion service returned {}: {}",
                status,
                truncate_for_error(&text, 320)
            )));
        }
        let suggestion: Suggestion =
            response.json().await.context("Malformed suggestion response")?;
        tracing::debug!("Received suggestion for {} ({} chars)", tenant.channel_id, raw_text.len());
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use issue_bridge_core::config::TenantIds;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> EnrichmentClient {
        let config = EnrichmentConfig {
            url: format!("{}/api", server.base_url()).parse().unwrap(),
            tenant_ids: TenantIds::Dynamic,
        };
        EnrichmentClient::new(&config, &HttpConfig::default()).unwrap()
    }

    fn tenant() -> Tenant { Tenant { channel_id: "C06EEUJTNGJ".into(), team_id: "T06E4RAA0M8".into() } }

    #[tokio::test]
    async fn test_suggest() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/populate_title_and_description").json_body(json!({
                "channel_id": "C06EEUJTNGJ",
                "team_id": "T06E4RAA0M8",
                "user_query": "the parser crashes when the input is empty"
            }));
            then.status(200).json_body(json!({
                "title": "Bug in parser",
                "description": "Crashes on empty input"
            }));
        });

        let suggestion = client(&server)
            .suggest("the parser crashes when the input is empty", &tenant())
            .await
            .unwrap();
        mock.assert();
        assert_eq!(suggestion, Suggestion {
            title: "Bug in parser".into(),
            description: "Crashes on empty input".into()
        });
    }

    #[tokio::test]
    async fn test_suggest_error_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/populate_title_and_description");
            then.status(503).body("model overloaded");
        });

        let err = client(&server).suggest("text", &tenant()).await.unwrap_err();
        mock.assert_hits(1);
        assert!(err.is_expected());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_suggest_malformed_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/populate_title_and_description");
            then.status(200).json_body(json!({ "summary": "missing fields" }));
        });

        let err = client(&server).suggest("text", &tenant()).await.unwrap_err();
        assert!(!err.is_expected());
    }
}
