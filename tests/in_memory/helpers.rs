//! Builders shared by the in-memory integration tests.

use async_trait::async_trait;
use atelier::config::OrchestrationConfig;
use atelier::generation::GenerationService;
use atelier::provider::domain::{
    Capability, ProviderError, ProviderFamily, ProviderId, ProviderResult,
};
use atelier::provider::ports::GenerationProvider;
use atelier::provider::services::{ProviderDispatcher, ProviderEntry, RetryPolicy};
use atelier::rate_limit::RateLimiterRegistry;
use atelier::run::adapters::InMemoryRunRepository;
use atelier::run::services::ResultStore;
use atelier::task::domain::{GenerationPayload, Task, TaskInput};
use mockable::DefaultClock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Service type used by the batch tests.
pub type TestGeneration = GenerationService<InMemoryRunRepository, DefaultClock>;

/// Image provider answering from the prompt text.
///
/// Prompts containing `forbidden` are rejected as fatal. A strict painter
/// also produces nothing for prompts containing `refuse`.
pub struct Painter {
    id: ProviderId,
    strict: bool,
}

impl Painter {
    /// Creates a painter that refuses `refuse` prompts.
    pub fn strict(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id).expect("valid provider id"),
            strict: true,
        })
    }

    /// Creates a painter that draws anything not forbidden.
    pub fn lenient(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id).expect("valid provider id"),
            strict: false,
        })
    }
}

#[async_trait]
impl GenerationProvider for Painter {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::Image
    }

    async fn generate(
        &self,
        task: &Task,
        _cancel: &CancellationToken,
    ) -> ProviderResult<GenerationPayload> {
        let prompt = task.input().prompt();
        if self.strict && prompt.contains("refuse") {
            return Err(ProviderError::no_usable_output("safety filter"));
        }
        if prompt.contains("forbidden") {
            return Err(ProviderError::from_http_status(403, "forbidden"));
        }
        Ok(GenerationPayload::from_url(format!(
            "https://{}/{}.png",
            self.id,
            prompt.replace(' ', "-")
        )))
    }
}

/// Test configuration: no retries, fast pacing, short grace period.
pub fn config() -> OrchestrationConfig {
    OrchestrationConfig::from_json_str(
        r#"{
            "retry": { "max_retries": 0, "base_delay_ms": 0, "max_delay_ms": 0 },
            "queue": { "batch_delay_ms": 200, "batch_size": 2 },
            "results": { "failed_slot_grace_ms": 50 }
        }"#,
    )
    .expect("valid test configuration")
}

/// Builds a generation service over the given provider table.
pub fn generation(entries: Vec<ProviderEntry>) -> TestGeneration {
    let config = config();
    let clock = Arc::new(DefaultClock);
    let limiters = Arc::new(
        RateLimiterRegistry::new(&config.rate_limits, &clock).expect("valid rate limits"),
    );
    let dispatcher = ProviderDispatcher::new(
        entries,
        limiters,
        RetryPolicy::new(config.retry),
        config.dispatch,
    );
    GenerationService::new(
        Arc::new(dispatcher),
        ResultStore::new(Arc::new(InMemoryRunRepository::new()), clock),
        config.queue,
        config.results,
    )
}

/// Builds text-only tasks from prompts.
pub fn tasks(prompts: &[&str]) -> Vec<Task> {
    prompts
        .iter()
        .map(|prompt| Task::new(TaskInput::from_prompt(*prompt)).expect("valid task"))
        .collect()
}

/// Table with a primary and a fallback painter accepting every task.
pub fn primary_and_fallback() -> Vec<ProviderEntry> {
    vec![
        ProviderEntry::new(Painter::strict("primary"), Capability::any()),
        ProviderEntry::new(Painter::lenient("fallback"), Capability::any()),
    ]
}
