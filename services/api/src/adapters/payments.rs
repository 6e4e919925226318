//! services/api/src/adapters/payments.rs
//!
//! This module contains the adapter for the billing collaborator. It
//! implements the `PaymentService` port against the Razorpay subscriptions
//! REST API. The port only needs "plan in, subscription id or failure out";
//! webhook verification and reconciliation are out of scope.

use std::time::Duration;

use async_trait::async_trait;
use habitchat_core::domain::Plan;
use habitchat_core::ports::{PaymentService, PortError, PortResult};
use serde::{Deserialize, Serialize};

use crate::config::PaymentConfig;

/// Billing cycles requested for every new subscription (monthly, one year).
const SUBSCRIPTION_TOTAL_COUNT: u32 = 12;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CreateSubscriptionBody<'a> {
    plan_id: &'a str,
    customer_notify: u8,
    total_count: u32,
}

#[derive(Deserialize)]
struct SubscriptionResponse {
    id: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PaymentService` against the Razorpay
/// subscriptions endpoint.
pub struct RazorpayPayments {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl RazorpayPayments {
    /// Creates a new `RazorpayPayments`.
    pub fn new(config: PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");
        Self { client, config }
    }

    fn vendor_plan_id(&self, plan: Plan) -> PortResult<&str> {
        match plan {
            Plan::Silver => Ok(&self.config.plan_id_silver),
            Plan::Gold => Ok(&self.config.plan_id_gold),
            Plan::Free => Err(PortError::Unexpected(
                "the free plan has no vendor plan id".to_string(),
            )),
        }
    }
}

//=========================================================================================
// `PaymentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentService for RazorpayPayments {
    async fn create_subscription(&self, plan: Plan) -> PortResult<String> {
        let plan_id = self.vendor_plan_id(plan)?;
        let url = format!("{}/v1/subscriptions", self.config.base_url);
        let body = CreateSubscriptionBody {
            plan_id,
            customer_notify: 1,
            total_count: SUBSCRIPTION_TOTAL_COUNT,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Collaborator(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Collaborator(format!(
                "subscription request failed with {status}: {detail}"
            )));
        }

        let subscription: SubscriptionResponse = response
            .json()
            .await
            .map_err(|e| PortError::Collaborator(e.to_string()))?;

        Ok(subscription.id)
    }
}

//=========================================================================================
// Disabled Fallback
//=========================================================================================

/// Stands in when billing credentials are not configured. Paid plan changes
/// report the capability as unavailable; free changes never reach here.
pub struct DisabledPayments;

#[async_trait]
impl PaymentService for DisabledPayments {
    async fn create_subscription(&self, _plan: Plan) -> PortResult<String> {
        Err(PortError::Unavailable)
    }
}
