use std::time::Duration;

use api_types::{
    AgentId, RecordId,
    establishment::Establishment,
    invoice::{InvoiceCount, PendingInvoiceRecord},
    review::{PointsAccrual, RejectionNotice, TransitionPayload},
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url, header};
use review::{AgentQueue, EstablishmentDirectory, Loyalty, Rejections, ServiceError};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP client for the establishment, queue, points and rejection services.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str, api_token: Option<&str>, timeout: Duration) -> Result<Self> {
        // `Url::join` replaces the last segment unless the base ends with '/'.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|err| AppError::Setup(format!("invalid base_url: {err}")))?;

        let mut headers = header::HeaderMap::new();
        if let Some(token) = api_token {
            let mut auth = header::HeaderValue::try_from(format!("Bearer {token}"))
                .map_err(|err| AppError::Setup(format!("invalid auth header value: {err}")))?;
            auth.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url, http })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|err| ServiceError::Transport(format!("invalid endpoint {path}: {err}")))
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ServiceError> {
        let res = request.send().await.map_err(transport)?;
        if res.status().is_success() {
            return Ok(res);
        }
        Err(error_from(res).await)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ServiceError> {
        let endpoint = self.endpoint(path)?;
        let res = self.send(self.http.get(endpoint)).await?;
        res.json::<T>().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

async fn error_from(res: Response) -> ServiceError {
    let status = res.status();
    let message = res
        .json::<ErrorResponse>()
        .await
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());
    ServiceError::Server {
        status: status.as_u16(),
        message,
    }
}

/// Pending record from a raw body: empty or `null` means nothing is pending.
fn parse_pending(body: &str) -> std::result::Result<Option<PendingInvoiceRecord>, ServiceError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<PendingInvoiceRecord>>(body)
        .map_err(|err| ServiceError::Decode(err.to_string()))
}

#[async_trait]
impl EstablishmentDirectory for Client {
    async fn list(&self) -> std::result::Result<Vec<Establishment>, ServiceError> {
        self.get_json("establishments").await
    }
}

#[async_trait]
impl AgentQueue for Client {
    async fn next(
        &self,
        agent_id: AgentId,
    ) -> std::result::Result<Option<PendingInvoiceRecord>, ServiceError> {
        let endpoint = self.endpoint(&format!("agent-shopping/{agent_id}"))?;
        let res = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(transport)?;

        match res.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => return Ok(None),
            status if !status.is_success() => return Err(error_from(res).await),
            _ => {}
        }
        let body = res.text().await.map_err(transport)?;
        parse_pending(&body)
    }

    async fn update(
        &self,
        payload: &TransitionPayload,
        record_id: RecordId,
    ) -> std::result::Result<(), ServiceError> {
        let endpoint = self.endpoint(&format!("agent-shopping/{record_id}"))?;
        self.send(self.http.put(endpoint).json(payload)).await?;
        Ok(())
    }

    async fn count(&self, agent_id: AgentId) -> std::result::Result<InvoiceCount, ServiceError> {
        let endpoint = self.endpoint("invoices/count")?;
        let res = self
            .send(self.http.get(endpoint).query(&[("idAgent", agent_id)]))
            .await?;
        res.json::<InvoiceCount>().await.map_err(transport)
    }
}

#[async_trait]
impl Loyalty for Client {
    async fn add_points(&self, accrual: &PointsAccrual) -> std::result::Result<(), ServiceError> {
        let endpoint = self.endpoint("points")?;
        self.send(self.http.post(endpoint).json(accrual)).await?;
        Ok(())
    }
}

#[async_trait]
impl Rejections for Client {
    async fn record(&self, notice: &RejectionNotice) -> std::result::Result<(), ServiceError> {
        let endpoint = self.endpoint("invoices/reject")?;
        self.send(self.http.post(endpoint).json(notice)).await?;
        Ok(())
    }
}
