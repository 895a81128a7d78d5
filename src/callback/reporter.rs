//! 上报通道
//!
//! Reporter 是外部能力的边界；HttpReporter 以短超时 POST JSON，只有 HTTP 200 视为成功，不做重试。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use super::FinalResultPayload;

/// 上报失败（均为软失败：记日志，下一次合并时自然重试）
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Callback transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Callback rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Callback reporting is disabled")]
    Disabled,
}

/// 上报外部收集端
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send(&self, payload: &FinalResultPayload) -> Result<(), CallbackError>;
}

/// 通过 HTTP POST 上报
pub struct HttpReporter {
    client: reqwest::Client,
    url: String,
}

impl HttpReporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    async fn send(&self, payload: &FinalResultPayload) -> Result<(), CallbackError> {
        let resp = self.client.post(&self.url).json(payload).send().await?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(CallbackError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// 关闭上报时使用：每次都返回 Disabled，记录保持未上报状态
#[derive(Debug, Default)]
pub struct DisabledReporter;

#[async_trait]
impl Reporter for DisabledReporter {
    async fn send(&self, _payload: &FinalResultPayload) -> Result<(), CallbackError> {
        Err(CallbackError::Disabled)
    }
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::callback::ExtractedIntelligence;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};

    fn payload() -> FinalResultPayload {
        FinalResultPayload {
            session_id: "s1".to_string(),
            scam_detected: true,
            total_messages_exchanged: 3,
            extracted_intelligence: ExtractedIntelligence {
                upi_ids: vec!["fraud@ybl".to_string()],
                ..Default::default()
            },
            agent_notes: None,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/result")
    }

    #[tokio::test]
    async fn test_http_200_is_success() {
        let router = Router::new().route(
            "/result",
            post(|Json(body): Json<FinalResultPayload>| async move {
                assert_eq!(body.session_id, "s1");
                AxumStatus::OK
            }),
        );
        let reporter = HttpReporter::new(serve(router).await, Duration::from_secs(5)).unwrap();
        assert!(reporter.send(&payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_200_is_rejected() {
        let router = Router::new().route(
            "/result",
            post(|| async { (AxumStatus::ACCEPTED, "queued") }),
        );
        let reporter = HttpReporter::new(serve(router).await, Duration::from_secs(5)).unwrap();
        match reporter.send(&payload()).await {
            Err(CallbackError::Rejected { status, body }) => {
                assert_eq!(status, 202);
                assert_eq!(body, "queued");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_transport_error() {
        let reporter =
            HttpReporter::new("http://127.0.0.1:9/result", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            reporter.send(&payload()).await,
            Err(CallbackError::Transport(_))
        ));
    }
}
