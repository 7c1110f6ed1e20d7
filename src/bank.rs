// src/bank.rs

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::{error::AppError, models::quiz::Question};

/// TTL cache for question-bank responses, keyed by subject.
///
/// Freshness is decided against a caller-supplied `Instant` so the policy
/// can be tested without waiting on wall-clock time.
struct QuestionCache {
    ttl: Duration,
    entries: HashMap<String, (Instant, Vec<Question>)>,
}

impl QuestionCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn lookup(&self, subject: &str, now: Instant) -> Option<&[Question]> {
        let (fetched_at, questions) = self.entries.get(subject)?;
        if now.duration_since(*fetched_at) < self.ttl {
            Some(questions)
        } else {
            None
        }
    }

    fn store(&mut self, subject: &str, questions: Vec<Question>, now: Instant) {
        self.entries.insert(subject.to_string(), (now, questions));
    }
}

/// Client for the external question bank, with a per-subject TTL cache.
///
/// Injected through `AppState`; handlers never talk to the bank URL or a
/// global cache directly.
pub struct QuestionBank {
    http: reqwest::Client,
    base_url: String,
    cache: RwLock<QuestionCache>,
}

impl QuestionBank {
    pub fn new(base_url: String, cache_ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            cache: RwLock::new(QuestionCache::new(cache_ttl)),
        }
    }

    /// Fetches up to `amount` questions for `subject`, serving a fresh
    /// cached set when one exists. The full cached set is stored so later
    /// requests with smaller `amount` still hit.
    pub async fn get_questions(
        &self,
        subject: &str,
        amount: usize,
    ) -> Result<Vec<Question>, AppError> {
        let now = Instant::now();

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.lookup(subject, now) {
                tracing::debug!("Question bank cache hit for subject '{}'", subject);
                return Ok(cached.iter().take(amount).cloned().collect());
            }
        }

        let questions = self.fetch(subject).await?;

        let mut cache = self.cache.write().await;
        cache.store(subject, questions.clone(), now);

        Ok(questions.into_iter().take(amount).collect())
    }

    async fn fetch(&self, subject: &str) -> Result<Vec<Question>, AppError> {
        let url = format!("{}/questions", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("category", subject)])
            .send()
            .await
            .map_err(|e| AppError::BadGateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::BadGateway(format!(
                "question bank returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Question>>()
            .await
            .map_err(|e| AppError::BadGateway(e.to_string()))
    }
}
