use crate::config::ClientConfig;
use crate::error::{CerebroError, Result};
use crate::model::ChatMessage;
use crate::planner::{PlanReply, PlanRequest};

/// HTTP client for the plan endpoint of a running CEREBRO server.
#[derive(Debug, Clone)]
pub struct PlanClient {
    server_url: String,
    http: reqwest::Client,
}

impl PlanClient {
    /// `server_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.server_url.as_str())
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Send the whole transcript for one turn.
    ///
    /// POST {server_url}/plans
    pub async fn send(&self, token: &str, transcript: &[ChatMessage]) -> Result<PlanReply> {
        let url = format!("{}/plans", self.server_url);
        let body = PlanRequest::new(transcript.to_vec());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            tracing::debug!(%status, %message, "plan request rejected");
            return Err(CerebroError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<PlanReply>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn fake_server(status: StatusCode, reply: Value) -> String {
        let app = Router::new().route(
            "/api/plans",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let reply = reply.clone();
                async move {
                    let authed = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer tok");
                    if !authed {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"})));
                    }
                    if body["messages"].as_array().map_or(true, |m| m.is_empty()) {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"message": "Messages are required"})),
                        );
                    }
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    #[tokio::test]
    async fn test_question_reply() {
        let url = fake_server(
            StatusCode::OK,
            json!({"type": "question", "question": "What is your deadline?"}),
        )
        .await;
        let client = PlanClient::new(url);
        let reply = client
            .send("tok", &[ChatMessage::user("Statistics")])
            .await
            .unwrap();
        assert_eq!(reply.assistant_text(), "What is your deadline?");
    }

    #[tokio::test]
    async fn test_plan_reply() {
        let url = fake_server(
            StatusCode::OK,
            json!({"type": "plan", "summary": "Go", "plan": [
                {"stepId": "1", "title": "t", "description": "d", "status": "pending", "estimatedTime": "Flexible"}
            ]}),
        )
        .await;
        let reply = PlanClient::new(url)
            .send("tok", &[ChatMessage::user("Statistics")])
            .await
            .unwrap();
        let PlanReply::Plan { plan, .. } = reply else {
            panic!("expected plan");
        };
        assert_eq!(plan[0].title, "t");
    }

    #[tokio::test]
    async fn test_error_message_is_surfaced() {
        let url = fake_server(StatusCode::OK, json!({})).await;
        let err = PlanClient::new(url)
            .send("wrong", &[ChatMessage::user("Statistics")])
            .await
            .unwrap_err();
        match err {
            CerebroError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_failure() {
        let url = fake_server(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"message": "Failed to generate plan"}),
        )
        .await;
        let err = PlanClient::new(url)
            .send("tok", &[ChatMessage::user("Statistics")])
            .await
            .unwrap_err();
        assert!(matches!(err, CerebroError::Api { status: 500, .. }));
    }
}
