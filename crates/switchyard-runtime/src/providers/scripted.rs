//! In-memory adapters that follow a script, for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use switchyard_core::{BackendProfile, ProviderKind};

use super::{AdapterFactory, ApiCredential, ProviderAdapter, ProviderError, ProviderSettings};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(String),
    Fail(String),
    Empty,
    Hang,
}

pub(crate) struct ScriptedAdapter {
    name: String,
    script: Mutex<VecDeque<Step>>,
    then: Step,
    calls: AtomicUsize,
    healthy: bool,
}

impl ScriptedAdapter {
    pub(crate) fn scripted(name: &str, steps: Vec<Step>, then: Step) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(steps.into()),
            then,
            calls: AtomicUsize::new(0),
            healthy: true,
        }
    }

    pub(crate) fn replying(name: &str, text: &str) -> Self {
        Self::scripted(name, Vec::new(), Step::Reply(text.to_string()))
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self::scripted(name, Vec::new(), Step::Fail(format!("{} connection refused", name)))
    }

    pub(crate) fn hanging(name: &str) -> Self {
        Self::scripted(name, Vec::new(), Step::Hang)
    }

    pub(crate) fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn invoke(&self, _prompt: &str, _timeout: Duration) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or_else(|| self.then.clone());

        match step {
            Step::Reply(text) => Ok(text),
            Step::Fail(message) => Err(ProviderError::HttpError(message)),
            Step::Empty => Ok(String::new()),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(ProviderError::HttpError("woke from hang".to_string()))
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Hands out the same scripted adapter for every backend of its kind.
pub(crate) struct ScriptedFactory {
    kind: ProviderKind,
    adapter: Arc<ScriptedAdapter>,
}

impl ScriptedFactory {
    pub(crate) fn new(kind: ProviderKind, adapter: ScriptedAdapter) -> Self {
        Self {
            kind,
            adapter: Arc::new(adapter),
        }
    }
}

impl AdapterFactory for ScriptedFactory {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn create(
        &self,
        _profile: &BackendProfile,
        _credential: ApiCredential,
        _settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let adapter: Arc<dyn ProviderAdapter> = self.adapter.clone();
        Ok(adapter)
    }
}
