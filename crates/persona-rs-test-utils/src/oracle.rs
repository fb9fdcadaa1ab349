use async_trait::async_trait;
use parking_lot::Mutex;
use persona_rs_memory::{MemoryError, Oracle, OracleRequest};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Oracle that always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    answer: String,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl FixedOracle {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Oracle for FixedOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<String, MemoryError> {
        self.requests.lock().push(request.clone());
        Ok(self.answer.clone())
    }
}

/// Oracle answering from a queue, recording every request.
///
/// Once the queue is empty every call fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    answers: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer.
    pub fn then_answer(self, answer: impl Into<String>) -> Self {
        self.answers.lock().push_back(Ok(answer.into()));
        self
    }

    /// Queue a failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.answers.lock().push_back(Err(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<String, MemoryError> {
        self.requests.lock().push(request.clone());
        let next = self.answers.lock().pop_front();
        match next {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(MemoryError::Oracle(message)),
            None => Err(MemoryError::Oracle("script exhausted".to_string())),
        }
    }
}

/// Oracle that always fails.
#[derive(Debug, Clone)]
pub struct FailingOracle {
    message: String,
}

impl FailingOracle {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Oracle for FailingOracle {
    async fn consult(&self, _request: &OracleRequest) -> Result<String, MemoryError> {
        Err(MemoryError::Oracle(self.message.clone()))
    }
}

/// Oracle that answers only after a long delay, for timeout tests.
#[derive(Debug, Clone)]
pub struct HangingOracle {
    delay: Duration,
}

impl HangingOracle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for HangingOracle {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl Oracle for HangingOracle {
    async fn consult(&self, _request: &OracleRequest) -> Result<String, MemoryError> {
        tokio::time::sleep(self.delay).await;
        Ok("<save>false</save>".to_string())
    }
}
