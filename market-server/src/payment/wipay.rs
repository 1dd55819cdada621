//! WiPay REST client (no SDK dependency)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use super::{
    GatewayClient, GatewayConfig, GatewayError, PaymentIntent, PaymentRequest, VerifiedPayment,
    signature,
};

#[derive(Debug, Clone)]
pub struct WipayClient {
    client: reqwest::Client,
    base_url: String,
    webhook_secret: String,
}

fn header(value: &str, name: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value).map_err(|_| GatewayError::Config(format!("invalid {name}")))
}

/// First non-empty string among `keys`
fn first_str(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn parse_intent(body: &Value) -> Result<PaymentIntent, GatewayError> {
    let transaction_id = first_str(body, &["transaction_id", "id"])
        .ok_or_else(|| GatewayError::InvalidResponse(format!("missing transaction id: {body}")))?;
    let payment_url = first_str(body, &["payment_url", "checkout_url"])
        .ok_or_else(|| GatewayError::InvalidResponse(format!("missing payment url: {body}")))?;
    let reference =
        first_str(body, &["reference", "transaction_id"]).unwrap_or_else(|| transaction_id.clone());
    Ok(PaymentIntent {
        transaction_id,
        payment_url,
        reference,
    })
}

fn parse_verification(reference: &str, body: Value) -> VerifiedPayment {
    VerifiedPayment {
        transaction_id: first_str(&body, &["transaction_id", "id"]),
        reference: first_str(&body, &["reference", "transaction_id"])
            .unwrap_or_else(|| reference.to_string()),
        status: first_str(&body, &["status"]).unwrap_or_default(),
        amount: body.get("amount").and_then(Value::as_f64),
        currency: first_str(&body, &["currency"]),
        metadata: body,
    }
}

impl WipayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Merchant-Id", header(&config.merchant_id, "merchant id")?);
        headers.insert("X-Merchant-Key", header(&config.merchant_key, "merchant key")?);
        headers.insert(
            AUTHORIZATION,
            header(&format!("Bearer {}", config.secret_key), "secret key")?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    async fn handle_response(resp: reqwest::Response) -> Result<Value, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| first_str(&v, &["message", "error"]))
                .unwrap_or(text);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl GatewayClient for WipayClient {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/payments", self.base_url);
        let resp = self.client.post(&url).json(request).send().await?;
        let body = Self::handle_response(resp).await?;
        let intent = parse_intent(&body)?;
        tracing::debug!(
            order_number = %request.order_id,
            reference = %intent.reference,
            "Gateway payment created"
        );
        Ok(intent)
    }

    async fn verify_payment(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let url = format!("{}/payments/{}", self.base_url, reference);
        let resp = self.client.get(&url).send().await?;
        let body = Self::handle_response(resp).await?;
        Ok(parse_verification(reference, body))
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(&self.webhook_secret, payload, signature)
    }
}
