use std::sync::Arc;

use prep_core::model::TestDefinition;
use storage::repository::Storage;

use crate::Clock;
use crate::config::EngineConfig;
use crate::error::AppServicesError;
use crate::sessions::{SessionBackend, SessionEngine, StoreBackend, TokioDelay, TransitionDelay};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    config: EngineConfig,
    storage: Storage,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: EngineConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, config))
    }

    /// Build services over in-memory repositories.
    #[must_use]
    pub fn in_memory(clock: Clock, config: EngineConfig) -> Self {
        Self::with_storage(Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn with_storage(storage: Storage, clock: Clock, config: EngineConfig) -> Self {
        Self {
            clock,
            config,
            storage,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Storage-backed session backend serving `test`.
    #[must_use]
    pub fn backend_for(&self, test: Arc<TestDefinition>) -> StoreBackend {
        StoreBackend::from_storage(self.clock, test, &self.storage)
    }

    /// Session engine for `test` with the configured transition delay.
    #[must_use]
    pub fn engine_for(&self, test: Arc<TestDefinition>) -> SessionEngine {
        let backend: Arc<dyn SessionBackend> = Arc::new(self.backend_for(Arc::clone(&test)));
        let delay: Arc<dyn TransitionDelay> = Arc::new(TokioDelay(self.config.transition_delay));
        SessionEngine::new(test, backend, delay).with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{
        AnswerLetter, Difficulty, QuestionDraft, QuestionId, TestDefinitionDraft, TestKind,
    };
    use prep_core::time::fixed_clock;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn engines_share_storage_across_runs() {
        let config = EngineConfig::default().with_transition_delay(Duration::from_millis(10));
        let services = AppServices::in_memory(fixed_clock(), config);
        let test = Arc::new(
            TestDefinitionDraft {
                slug: "wiring".into(),
                kind: TestKind::Section,
                name: "Wiring".into(),
                topic: String::new(),
                difficulty: Difficulty::Easy,
                seconds_per_question: 15,
                questions: (1..=2)
                    .map(|id| QuestionDraft {
                        id: QuestionId::new(id),
                        prompt: format!("Q{id}"),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_answer: AnswerLetter::D,
                        difficulty: None,
                    })
                    .collect(),
            }
            .validate()
            .unwrap(),
        );

        let mut first = services.engine_for(Arc::clone(&test));
        assert_eq!(first.config(), config);
        let started = first.start().await.unwrap();
        first.skip().await;

        let mut second = services.engine_for(Arc::clone(&test));
        let resumed = second.start().await.unwrap();
        assert_eq!(resumed.session_id(), started.session_id());
        assert_eq!(resumed.current_question_index(), 1);

        let done = second.skip().await;
        let summary = services
            .backend_for(test)
            .load_results(done.session_id().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.skipped, 2);
    }
}
