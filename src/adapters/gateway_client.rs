//! Outbound refund submission over HTTP, one base URL per rail. Every
//! call is bounded by the client timeout; a timed-out or failed call
//! surfaces as `PipelineError::Gateway` and the refund lands in `failed`.

use {
    crate::domain::{
        error::PipelineError,
        gateway::{GatewayRefund, RefundGateway},
        money::Money,
        payment::PaymentMethod,
    },
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    uuid::Uuid,
};

pub struct HttpRefundGateway {
    client: reqwest::Client,
    card_base_url: String,
    wallet_base_url: String,
    card_api_key: String,
    wallet_api_key: String,
}

impl HttpRefundGateway {
    pub fn new(
        card_base_url: String,
        wallet_base_url: String,
        card_api_key: String,
        wallet_api_key: String,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Gateway(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            card_base_url,
            wallet_base_url,
            card_api_key,
            wallet_api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct RefundSubmission<'a> {
    gateway_ref: &'a str,
    amount_cents: i64,
    currency: &'a str,
    reference: Uuid,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefundCreated {
    id: String,
}

#[async_trait]
impl RefundGateway for HttpRefundGateway {
    async fn submit_refund(
        &self,
        method: PaymentMethod,
        gateway_ref: &str,
        amount: &Money,
        reference: Uuid,
    ) -> Result<GatewayRefund, PipelineError> {
        let (base, key) = match method {
            PaymentMethod::Card => (&self.card_base_url, &self.card_api_key),
            PaymentMethod::Wallet => (&self.wallet_base_url, &self.wallet_api_key),
        };

        let submission = RefundSubmission {
            gateway_ref,
            amount_cents: amount.amount().cents(),
            currency: amount.currency().as_str(),
            reference,
            reason: "requested_by_customer",
        };

        let response = self
            .client
            .post(format!("{base}/refunds"))
            .bearer_auth(key)
            .json(&submission)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Gateway(format!("{method} gateway timed out"))
                } else {
                    PipelineError::Gateway(format!("{method} gateway unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Gateway(format!(
                "{method} gateway returned {status}"
            )));
        }

        let created: RefundCreated = response
            .json()
            .await
            .map_err(|e| PipelineError::Gateway(format!("{method} gateway bad response: {e}")))?;

        tracing::info!(
            gateway = %method,
            gateway_ref,
            refund_txn_id = %created.id,
            "gateway accepted refund"
        );
        Ok(GatewayRefund {
            refund_txn_id: created.id,
        })
    }
}
