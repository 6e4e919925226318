//! crates/habitchat_core/src/chat.rs
//!
//! The quota-gated conversation log. Text generation is delegated to the
//! external collaborator behind [`TextGenerationService`]; this module owns
//! the quota gate, the optional memoization shortcut, and the append of the
//! resulting [`QAPair`].

use std::sync::Arc;

use crate::domain::{QAPair, UserRecord};
use crate::plan::QuotaPolicy;
use crate::ports::{PortError, PortResult, TextGenerationService, UserStore};

/// Recorded as the answer when the collaborator fails mid-call.
const FAILURE_PLACEHOLDER: &str =
    "Sorry, something went wrong while generating a reply. Please try again.";

/// The outcome of one `ask` call. Quota rejections and collaborator
/// failures are ordinary outcomes rather than errors so the caller can
/// render each one differently instead of receiving a swallowed exception
/// disguised as an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered {
        answer: String,
        /// True when the answer was served from an earlier identical
        /// question without touching the collaborator or the quota.
        cached: bool,
    },
    /// Rejected before any external call; nothing changed.
    QuotaExceeded { used: u32, allowance: u32 },
    /// The collaborator failed. The placeholder went into the log and the
    /// quota slot was consumed, but the failure is tagged so "the AI said X"
    /// and "the system failed" stay distinguishable.
    GenerationFailed {
        recorded_answer: String,
        detail: String,
    },
    /// Generation is not configured. Nothing was recorded and no quota was
    /// consumed; this is a configuration state, not a transient failure.
    Unavailable,
}

pub struct ChatManager {
    store: Arc<dyn UserStore>,
    generator: Arc<dyn TextGenerationService>,
    quota: QuotaPolicy,
    memoize: bool,
}

impl ChatManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        generator: Arc<dyn TextGenerationService>,
        quota: QuotaPolicy,
        memoize: bool,
    ) -> Self {
        Self {
            store,
            generator,
            quota,
            memoize,
        }
    }

    /// Asks the collaborator one question on behalf of `record`'s user.
    ///
    /// Order of the gates matters: validation first (free), then the
    /// memoization shortcut (free), then the quota check, and only then the
    /// external call. The counter is incremented in the same mutation as the
    /// QAPair append, so it can never run ahead of the log.
    pub async fn ask(&self, record: &mut UserRecord, question: &str) -> PortResult<AskOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PortError::Validation(
                "question must not be empty".to_string(),
            ));
        }

        // Exact, case-sensitive match against earlier questions. A hit costs
        // neither quota nor a collaborator call.
        if self.memoize {
            if let Some(prior) = record.conversation.iter().find(|qa| qa.question == question) {
                return Ok(AskOutcome::Answered {
                    answer: prior.answer.clone(),
                    cached: true,
                });
            }
        }

        let allowance = self.quota.allowance(record.plan);
        if record.messages_used_today >= allowance {
            return Ok(AskOutcome::QuotaExceeded {
                used: record.messages_used_today,
                allowance,
            });
        }

        let (answer, failure) = match self.generator.generate(question).await {
            Ok(text) => (text, None),
            Err(PortError::Unavailable) => return Ok(AskOutcome::Unavailable),
            Err(e) => (FAILURE_PLACEHOLDER.to_string(), Some(e.to_string())),
        };

        record.conversation.push(QAPair {
            question: question.to_string(),
            answer: answer.clone(),
        });
        record.messages_used_today += 1;
        self.store.save(record).await?;

        Ok(match failure {
            Some(detail) => AskOutcome::GenerationFailed {
                recorded_answer: answer,
                detail,
            },
            None => AskOutcome::Answered {
                answer,
                cached: false,
            },
        })
    }

    /// Removes one QAPair by position and persists the shortened log.
    pub async fn delete_message(&self, record: &mut UserRecord, index: usize) -> PortResult<()> {
        if index >= record.conversation.len() {
            return Err(PortError::Validation(format!("no message at index {index}")));
        }
        record.conversation.remove(index);
        self.store.save(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Plan;
    use crate::test_support::{
        today, FailingGenerator, FixedGenerator, MemoryStore, UnavailableGenerator,
    };

    fn manager_with(
        generator: Arc<dyn TextGenerationService>,
        quota: QuotaPolicy,
        memoize: bool,
    ) -> (Arc<MemoryStore>, ChatManager) {
        let store = Arc::new(MemoryStore::default());
        let manager = ChatManager::new(store.clone(), generator, quota, memoize);
        (store, manager)
    }

    #[tokio::test]
    async fn a_successful_ask_logs_and_counts() {
        let generator = Arc::new(FixedGenerator::new("Paris"));
        let (store, manager) = manager_with(generator, QuotaPolicy::default(), false);
        let mut record = UserRecord::new("a@x.com", today());

        let outcome = manager
            .ask(&mut record, "Capital of France?")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AskOutcome::Answered {
                answer: "Paris".to_string(),
                cached: false,
            }
        );
        assert_eq!(record.messages_used_today, 1);
        assert_eq!(
            record.conversation,
            vec![QAPair {
                question: "Capital of France?".to_string(),
                answer: "Paris".to_string(),
            }]
        );

        let persisted = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(persisted.conversation.len(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_locally() {
        let generator = Arc::new(FixedGenerator::new("unused"));
        let (_store, manager) = manager_with(generator.clone(), QuotaPolicy::default(), false);
        let mut record = UserRecord::new("a@x.com", today());

        let err = manager.ask(&mut record, "  ").await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(record.messages_used_today, 0);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn the_counter_never_exceeds_the_allowance() {
        let generator = Arc::new(FixedGenerator::new("hi"));
        let quota = QuotaPolicy {
            free: 2,
            ..QuotaPolicy::default()
        };
        let (_store, manager) = manager_with(generator.clone(), quota, false);
        let mut record = UserRecord::new("a@x.com", today());

        for i in 0..5 {
            let outcome = manager.ask(&mut record, &format!("q{i}")).await.unwrap();
            assert!(record.messages_used_today <= 2);
            if i >= 2 {
                assert_eq!(
                    outcome,
                    AskOutcome::QuotaExceeded {
                        used: 2,
                        allowance: 2,
                    }
                );
            }
        }
        assert_eq!(record.conversation.len(), 2);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn quota_is_checked_per_plan() {
        let generator = Arc::new(FixedGenerator::new("hi"));
        let quota = QuotaPolicy {
            free: 1,
            silver: 3,
            gold: 5,
        };
        let (_store, manager) = manager_with(generator, quota, false);

        let mut record = UserRecord::new("a@x.com", today());
        record.plan = Plan::Silver;
        record.messages_used_today = 2;

        let outcome = manager.ask(&mut record, "still room?").await.unwrap();
        assert!(matches!(outcome, AskOutcome::Answered { .. }));
        assert_eq!(record.messages_used_today, 3);
    }

    #[tokio::test]
    async fn memoization_replays_without_spending_quota() {
        let generator = Arc::new(FixedGenerator::new("Paris"));
        let (_store, manager) = manager_with(generator.clone(), QuotaPolicy::default(), true);
        let mut record = UserRecord::new("a@x.com", today());

        let first = manager
            .ask(&mut record, "Capital of France?")
            .await
            .unwrap();
        let second = manager
            .ask(&mut record, "Capital of France?")
            .await
            .unwrap();

        assert_eq!(
            first,
            AskOutcome::Answered {
                answer: "Paris".to_string(),
                cached: false,
            }
        );
        assert_eq!(
            second,
            AskOutcome::Answered {
                answer: "Paris".to_string(),
                cached: true,
            }
        );
        assert_eq!(record.messages_used_today, 1);
        assert_eq!(record.conversation.len(), 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn memoization_is_case_sensitive() {
        let generator = Arc::new(FixedGenerator::new("Paris"));
        let (_store, manager) = manager_with(generator.clone(), QuotaPolicy::default(), true);
        let mut record = UserRecord::new("a@x.com", today());

        manager.ask(&mut record, "capital of france?").await.unwrap();
        manager.ask(&mut record, "Capital of France?").await.unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(record.messages_used_today, 2);
    }

    #[tokio::test]
    async fn a_collaborator_failure_logs_the_placeholder_and_spends_the_slot() {
        let (store, manager) = manager_with(
            Arc::new(FailingGenerator),
            QuotaPolicy::default(),
            false,
        );
        let mut record = UserRecord::new("a@x.com", today());

        let outcome = manager.ask(&mut record, "anyone there?").await.unwrap();
        match outcome {
            AskOutcome::GenerationFailed {
                recorded_answer,
                detail,
            } => {
                assert_eq!(recorded_answer, FAILURE_PLACEHOLDER);
                assert!(detail.contains("boom"));
            }
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        assert_eq!(record.messages_used_today, 1);
        assert_eq!(record.conversation[0].answer, FAILURE_PLACEHOLDER);

        let persisted = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(persisted.messages_used_today, 1);
    }

    #[tokio::test]
    async fn a_disabled_generator_costs_nothing() {
        let (store, manager) = manager_with(
            Arc::new(UnavailableGenerator),
            QuotaPolicy::default(),
            false,
        );
        let mut record = UserRecord::new("a@x.com", today());

        let outcome = manager.ask(&mut record, "hello?").await.unwrap();
        assert_eq!(outcome, AskOutcome::Unavailable);
        assert_eq!(record.messages_used_today, 0);
        assert!(record.conversation.is_empty());
        assert!(store.load("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_message_removes_by_position() {
        let generator = Arc::new(FixedGenerator::new("yes"));
        let (_store, manager) = manager_with(generator, QuotaPolicy::default(), false);
        let mut record = UserRecord::new("a@x.com", today());

        manager.ask(&mut record, "first").await.unwrap();
        manager.ask(&mut record, "second").await.unwrap();

        manager.delete_message(&mut record, 0).await.unwrap();
        assert_eq!(record.conversation.len(), 1);
        assert_eq!(record.conversation[0].question, "second");

        let err = manager.delete_message(&mut record, 5).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }
}
