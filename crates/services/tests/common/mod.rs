#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use prep_core::ResultsSummary;
use prep_core::model::{
    AnswerLetter, Difficulty, QuestionDraft, QuestionId, SessionId, TestDefinition,
    TestDefinitionDraft, TestKind,
};
use prep_core::time::fixed_clock;
use services::{
    BackendError, EngineConfig, NoDelay, ResponseSubmission, SessionBackend, SessionEngine,
    SessionHandle, StoreBackend, TransitionDelay,
};
use storage::repository::{SessionStatus, Storage};

/// Correct letters cycle A, B, C, D by position.
pub fn correct_letter(index: usize) -> AnswerLetter {
    AnswerLetter::ALL[index % AnswerLetter::COUNT]
}

pub fn build_test(slug: &str, count: usize, seconds_per_question: u32) -> Arc<TestDefinition> {
    let questions = (0..count)
        .map(|i| QuestionDraft {
            id: QuestionId::new(100 + i as u64),
            prompt: format!("<p>Question {}</p>", i + 1),
            options: vec!["one".into(), "two".into(), "three".into(), "four".into()],
            correct_answer: correct_letter(i),
            difficulty: None,
        })
        .collect();
    let draft = TestDefinitionDraft {
        slug: slug.into(),
        kind: TestKind::Topic,
        name: format!("Test {slug}"),
        topic: "algebra".into(),
        difficulty: Difficulty::Medium,
        seconds_per_question,
        questions,
    };
    Arc::new(draft.validate().expect("valid test"))
}

/// Store backend whose calls can be made to fail on demand.
pub struct FlakyBackend {
    inner: StoreBackend,
    pub fail_init: AtomicBool,
    pub fail_record: AtomicBool,
    pub fail_progress: AtomicBool,
    pub fail_complete: AtomicBool,
    pub complete_calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(inner: StoreBackend) -> Self {
        Self {
            inner,
            fail_init: AtomicBool::new(false),
            fail_record: AtomicBool::new(false),
            fail_progress: AtomicBool::new(false),
            fail_complete: AtomicBool::new(false),
            complete_calls: AtomicUsize::new(0),
        }
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn completions(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), BackendError> {
        if flag.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable(format!("{what} is offline")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionBackend for FlakyBackend {
    async fn init_or_resume_session(
        &self,
        test_slug: &str,
    ) -> Result<SessionHandle, BackendError> {
        Self::check(&self.fail_init, "init")?;
        self.inner.init_or_resume_session(test_slug).await
    }

    async fn record_response(
        &self,
        session_id: SessionId,
        response: &ResponseSubmission,
    ) -> Result<(), BackendError> {
        Self::check(&self.fail_record, "record")?;
        self.inner.record_response(session_id, response).await
    }

    async fn update_progress(
        &self,
        session_id: SessionId,
        current_question_index: usize,
        status: SessionStatus,
    ) -> Result<(), BackendError> {
        Self::check(&self.fail_progress, "progress")?;
        self.inner
            .update_progress(session_id, current_question_index, status)
            .await
    }

    async fn complete_session(
        &self,
        session_id: SessionId,
    ) -> Result<ResultsSummary, BackendError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_complete, "complete")?;
        self.inner.complete_session(session_id).await
    }
}

/// Engine plus its flaky backend over shared in-memory storage.
pub struct Harness {
    pub test: Arc<TestDefinition>,
    pub storage: Storage,
    pub backend: Arc<FlakyBackend>,
}

impl Harness {
    pub fn new(test: Arc<TestDefinition>) -> Self {
        Self::with_storage(test, Storage::in_memory())
    }

    pub fn with_storage(test: Arc<TestDefinition>, storage: Storage) -> Self {
        let store = StoreBackend::from_storage(fixed_clock(), Arc::clone(&test), &storage);
        Self {
            test,
            storage,
            backend: Arc::new(FlakyBackend::new(store)),
        }
    }

    pub fn engine(&self) -> SessionEngine {
        self.engine_with_delay(Arc::new(NoDelay))
    }

    pub fn engine_with_delay(&self, delay: Arc<dyn TransitionDelay>) -> SessionEngine {
        let backend: Arc<dyn SessionBackend> = self.backend.clone();
        SessionEngine::new(Arc::clone(&self.test), backend, delay)
            .with_config(EngineConfig::default())
    }
}
