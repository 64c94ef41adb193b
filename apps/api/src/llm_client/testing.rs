//! Scripted `ReasoningService` double for unit tests.
//!
//! Replies are queued per system prompt, so each stage gets its own script.
//! When a queue runs dry the `always` reply for that system prompt is used;
//! with neither, the call fails with `Api { status: 500 }` so a missing script
//! is loud.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{ReasoningService, ServiceError};

#[derive(Clone)]
enum Step {
    Reply(String),
    Fail(ServiceError),
    Delayed(Duration, String),
}

#[derive(Default)]
pub struct ScriptedService {
    queued: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, Step>>,
    prompts: Mutex<HashMap<String, Vec<String>>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, system: &str, step: Step) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(system.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn reply(self, system: &str, text: impl Into<String>) -> Self {
        self.push(system, Step::Reply(text.into()))
    }

    pub fn fail(self, system: &str, error: ServiceError) -> Self {
        self.push(system, Step::Fail(error))
    }

    /// Sleeps `delay` (tokio time, so paused clocks apply) before replying.
    pub fn reply_after(self, system: &str, delay: Duration, text: impl Into<String>) -> Self {
        self.push(system, Step::Delayed(delay, text.into()))
    }

    /// Reply used whenever the queue for `system` is empty.
    pub fn always(self, system: &str, text: impl Into<String>) -> Self {
        self.fallback
            .lock()
            .unwrap()
            .insert(system.to_string(), Step::Reply(text.into()));
        self
    }

    pub fn calls_for(&self, system: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .get(system)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.prompts.lock().unwrap().values().map(Vec::len).sum()
    }

    pub fn prompts_for(&self, system: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .get(system)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError> {
        self.prompts
            .lock()
            .unwrap()
            .entry(system.to_string())
            .or_default()
            .push(prompt.to_string());

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(system)
            .and_then(VecDeque::pop_front);
        let step = queued.or_else(|| self.fallback.lock().unwrap().get(system).cloned());

        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(ServiceError::Api {
                status: 500,
                message: format!("no scripted reply for system prompt: {system:.40}"),
            }),
        }
    }
}
