pub mod chat;
pub mod domain;
pub mod habits;
pub mod plan;
pub mod ports;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::{AskOutcome, ChatManager};
pub use domain::{Plan, QAPair, UnknownPlan, UserRecord};
pub use habits::HabitManager;
pub use plan::{PlanManager, PlanPricing, QuotaPolicy, UpgradeOutcome};
pub use ports::{
    PaymentService, PortError, PortResult, TextGenerationService, UserStore,
};
pub use session::SessionManager;
