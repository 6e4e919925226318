//! crates/habitchat_core/src/plan.rs
//!
//! Plan policy: per-tier daily allowances and prices (both configuration,
//! not behavior), and the two-phase upgrade flow through the billing
//! collaborator.

use std::sync::Arc;

use crate::domain::{Plan, UserRecord};
use crate::ports::{PaymentService, PortResult, UserStore};

/// Per-plan daily message allowance.
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub free: u32,
    pub silver: u32,
    pub gold: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free: 20,
            silver: 100,
            gold: 400,
        }
    }
}

impl QuotaPolicy {
    pub fn allowance(&self, plan: Plan) -> u32 {
        match plan {
            Plan::Free => self.free,
            Plan::Silver => self.silver,
            Plan::Gold => self.gold,
        }
    }
}

/// Per-plan price in the smallest currency unit. Free is always 0, so a
/// downgrade to Free never touches the billing vendor.
#[derive(Debug, Clone, Copy)]
pub struct PlanPricing {
    pub silver: u64,
    pub gold: u64,
}

impl Default for PlanPricing {
    fn default() -> Self {
        Self {
            silver: 19900,
            gold: 49900,
        }
    }
}

impl PlanPricing {
    pub fn price(&self, plan: Plan) -> u64 {
        match plan {
            Plan::Free => 0,
            Plan::Silver => self.silver,
            Plan::Gold => self.gold,
        }
    }
}

/// How a plan change took effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Zero-price target; applied without involving the billing vendor.
    Applied,
    /// Paid target; the vendor accepted the subscription.
    SubscriptionCreated { subscription_id: String },
}

pub struct PlanManager {
    store: Arc<dyn UserStore>,
    payments: Arc<dyn PaymentService>,
    pricing: PlanPricing,
}

impl PlanManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        payments: Arc<dyn PaymentService>,
        pricing: PlanPricing,
    ) -> Self {
        Self {
            store,
            payments,
            pricing,
        }
    }

    /// Two-phase plan change: a paid target only takes effect once the
    /// billing vendor reports success; on failure the plan is untouched.
    /// There is no reconciliation afterwards — a vendor-side reversal is
    /// never observed by this system.
    pub async fn upgrade(
        &self,
        record: &mut UserRecord,
        target: Plan,
    ) -> PortResult<UpgradeOutcome> {
        if self.pricing.price(target) == 0 {
            record.plan = target;
            self.store.save(record).await?;
            return Ok(UpgradeOutcome::Applied);
        }

        let subscription_id = self.payments.create_subscription(target).await?;
        record.plan = target;
        self.store.save(record).await?;
        Ok(UpgradeOutcome::SubscriptionCreated { subscription_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use crate::test_support::{today, AcceptingPayments, MemoryStore, RejectingPayments};

    fn manager_with(payments: Arc<dyn PaymentService>) -> (Arc<MemoryStore>, PlanManager) {
        let store = Arc::new(MemoryStore::default());
        let manager = PlanManager::new(store.clone(), payments, PlanPricing::default());
        (store, manager)
    }

    #[tokio::test]
    async fn zero_price_targets_apply_immediately() {
        let (store, manager) = manager_with(Arc::new(RejectingPayments));
        let mut record = UserRecord::new("a@x.com", today());
        record.plan = Plan::Gold;

        // Downgrading to Free never consults the (here broken) vendor.
        let outcome = manager.upgrade(&mut record, Plan::Free).await.unwrap();
        assert_eq!(outcome, UpgradeOutcome::Applied);
        assert_eq!(record.plan, Plan::Free);

        let persisted = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(persisted.plan, Plan::Free);
    }

    #[tokio::test]
    async fn paid_targets_apply_only_on_vendor_success() {
        let (store, manager) = manager_with(Arc::new(AcceptingPayments::new("sub_123")));
        let mut record = UserRecord::new("a@x.com", today());

        let outcome = manager.upgrade(&mut record, Plan::Gold).await.unwrap();
        assert_eq!(
            outcome,
            UpgradeOutcome::SubscriptionCreated {
                subscription_id: "sub_123".to_string(),
            }
        );
        assert_eq!(record.plan, Plan::Gold);

        let persisted = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(persisted.plan, Plan::Gold);
    }

    #[tokio::test]
    async fn a_vendor_failure_leaves_the_plan_unchanged() {
        let (store, manager) = manager_with(Arc::new(RejectingPayments));
        let mut record = UserRecord::new("a@x.com", today());

        let err = manager.upgrade(&mut record, Plan::Gold).await.unwrap_err();
        assert!(matches!(err, PortError::Collaborator(_)));
        assert_eq!(record.plan, Plan::Free);
        assert!(store.load("a@x.com").await.unwrap().is_none());
    }

    #[test]
    fn default_allowances_follow_the_tier_order() {
        let quota = QuotaPolicy::default();
        assert!(quota.allowance(Plan::Free) < quota.allowance(Plan::Silver));
        assert!(quota.allowance(Plan::Silver) < quota.allowance(Plan::Gold));
    }
}
