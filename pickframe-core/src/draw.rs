//! Per-request orchestration: empty check, draw-and-transform attempts under
//! one deadline, metadata, then a refill check.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{DrawError, Result};
use crate::metadata::{MetadataEnricher, ResponseHeaders};
use crate::refill::RefillCoordinator;
use crate::sampling::{Generation, SamplingCache};
use crate::transform::{ImageTransformer, TransformedImage};

/// Retry and deadline settings for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPolicy {
    /// Attempts per request. Every attempt consumes a fresh candidate.
    pub retry_budget: usize,
    /// Bound on the whole draw, transform and metadata sequence.
    pub deadline: Duration,
}

impl Default for DrawPolicy {
    fn default() -> Self {
        Self {
            retry_budget: 5,
            deadline: Duration::from_millis(5000),
        }
    }
}

/// A successfully served image and the headers to send with it.
#[derive(Debug, Clone)]
pub struct ServedImage {
    pub path: PathBuf,
    pub generation: Generation,
    pub bytes: Vec<u8>,
    pub headers: ResponseHeaders,
    pub attempts: usize,
}

pub struct DrawService {
    cache: Arc<SamplingCache>,
    transformer: Arc<dyn ImageTransformer>,
    enricher: MetadataEnricher,
    refill: Arc<RefillCoordinator>,
    policy: DrawPolicy,
}

impl fmt::Debug for DrawService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawService")
            .field("cache", &self.cache)
            .field("enricher", &self.enricher)
            .field("refill", &self.refill)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

struct Attempted {
    image: TransformedImage,
    generation: Generation,
    attempts: usize,
}

impl DrawService {
    pub fn new(
        cache: Arc<SamplingCache>,
        transformer: Arc<dyn ImageTransformer>,
        enricher: MetadataEnricher,
        refill: Arc<RefillCoordinator>,
        policy: DrawPolicy,
    ) -> Self {
        Self {
            cache,
            transformer,
            enricher,
            refill,
            policy,
        }
    }

    pub fn policy(&self) -> DrawPolicy {
        self.policy
    }

    /// Serve one previously unserved image.
    ///
    /// An empty pool fails fast with [`DrawError::PoolEmpty`] and skips the
    /// refill check. Every other outcome, success or failure, is followed by
    /// a refill check against the reduced pool.
    pub async fn serve_random(&self) -> Result<ServedImage> {
        if self.cache.remaining() == 0 {
            info!("pool empty, nothing to serve");
            return Err(DrawError::PoolEmpty);
        }

        let result = self.serve_within_deadline().await;
        self.refill.observe(self.cache.remaining());

        match &result {
            Ok(served) => debug!(
                path = %served.path.display(),
                attempts = served.attempts,
                bytes = served.bytes.len(),
                "served image"
            ),
            Err(DrawError::PoolEmpty) => info!("pool drained while attempting"),
            Err(err) => error!(error = %err, "failed to serve image"),
        }
        result
    }

    async fn serve_within_deadline(&self) -> Result<ServedImage> {
        let deadline = self.policy.deadline;
        let started = Instant::now();
        let cancel = CancellationToken::new();

        let attempted = match tokio::time::timeout(deadline, self.attempt(&cancel)).await {
            Ok(attempted) => attempted?,
            Err(_) => {
                // Stops blocking work still running for the abandoned attempt.
                cancel.cancel();
                return Err(DrawError::TimedOut { after: deadline });
            }
        };

        let left = deadline.saturating_sub(started.elapsed());
        let enrichment = self.enricher.enrich(&attempted.image.path, left).await;
        let TransformedImage { path, bytes, mime } = attempted.image;

        Ok(ServedImage {
            path,
            generation: attempted.generation,
            bytes,
            headers: ResponseHeaders::new(mime, enrichment),
            attempts: attempted.attempts,
        })
    }

    /// Draw, transform, and on failure draw again. The failed path is already
    /// gone from the pool and is never retried.
    async fn attempt(&self, cancel: &CancellationToken) -> Result<Attempted> {
        let budget = self.policy.retry_budget.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let Some(candidate) = self.cache.draw() else {
                return Err(DrawError::PoolEmpty);
            };

            match self
                .transformer
                .transform(&candidate.path, cancel.child_token())
                .await
            {
                Ok(image) => {
                    return Ok(Attempted {
                        image,
                        generation: candidate.generation,
                        attempts: attempt,
                    });
                }
                Err(source) if attempt >= budget => {
                    return Err(DrawError::Exhausted {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    warn!(
                        path = %candidate.path.display(),
                        attempt,
                        budget,
                        error = %err,
                        "transform failed, drawing a fresh candidate"
                    );
                }
            }
        }
    }
}
