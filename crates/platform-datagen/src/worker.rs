//! Bounded worker pool dispatching prompts to an [`LlmClient`] (spec.md
//! §4.8, §9 REDESIGN FLAG: a `tokio::sync::mpsc` channel of fixed width,
//! not a raw thread-pool-plus-futures pattern). Grounded on
//! `run_and_collect_results`'s parallel branch in the source — a pool of
//! workers, each failure written to a traceback file rather than
//! aborting the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::DatagenError;
use crate::llm::{LlmClient, PromptRequest};

/// One unit of work: a prompt plus a channel to return its completion (or
/// error) to the caller that submitted it.
struct Job {
    request: PromptRequest,
    reply: oneshot::Sender<Result<String, DatagenError>>,
}

/// A fixed-width pool of LLM-dispatch workers, fed through one bounded
/// `mpsc` channel. Cloning the handle is cheap — every clone shares the
/// same channel and worker set.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    /// Spawn `concurrency` workers pulling from a channel of depth
    /// `queue_depth`, each writing failures to `traceback_path` rather
    /// than propagating them to the batch (§4.8: "each call that throws
    /// is written to a traceback file and does not abort the batch").
    #[must_use]
    pub fn spawn(
        concurrency: usize,
        queue_depth: usize,
        client: Arc<dyn LlmClient>,
        traceback_path: PathBuf,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel::<Job>(queue_depth);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..concurrency.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let client = Arc::clone(&client);
                let traceback_path = traceback_path.clone();
                tokio::spawn(async move { worker_loop(receiver, client, traceback_path).await })
            })
            .collect();

        (Self { sender }, handles)
    }

    /// Submit one prompt and await its completion. Returns the provider's
    /// error rather than propagating a panic/disconnect, so callers can
    /// collect partial batches the way `run_and_collect_results` does.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::LlmCall`] if the underlying completion
    /// call fails, or if the pool has been shut down.
    pub async fn submit(&self, request: PromptRequest) -> Result<String, DatagenError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Job {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DatagenError::LlmCall("worker pool is shut down".to_owned()))?;

        reply_rx
            .await
            .map_err(|_| DatagenError::LlmCall("worker dropped before replying".to_owned()))?
    }
}

async fn worker_loop(
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    client: Arc<dyn LlmClient>,
    traceback_path: PathBuf,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        let result = client.completion(&job.request).await;
        if let Err(e) = &result {
            if let Err(write_err) = append_traceback(&traceback_path, &job.request.prompt, e).await {
                tracing::warn!(error = %write_err, "failed to write LLM traceback entry");
            }
        }

        let _ = job.reply.send(result);
    }
}

async fn append_traceback(path: &Path, prompt: &str, error: &DatagenError) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let entry = format!("{}\nprompt: {prompt}\n{}\n", "=".repeat(100), error);
    file.write_all(entry.as_bytes()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn completion(&self, request: &PromptRequest) -> Result<String, DatagenError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if request.prompt == "fail" {
                Err(DatagenError::LlmCall("simulated failure".to_owned()))
            } else {
                Ok(format!("ok-{call}"))
            }
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_block_other_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let traceback = dir.path().join("traceback.err");
        let client: Arc<dyn LlmClient> = Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
        });
        let (pool, _handles) = WorkerPool::spawn(2, 8, client, traceback.clone());

        let ok = pool
            .submit(PromptRequest {
                prompt: "hello".to_owned(),
                system_prompt: None,
            })
            .await;
        let failed = pool
            .submit(PromptRequest {
                prompt: "fail".to_owned(),
                system_prompt: None,
            })
            .await;

        assert!(ok.is_ok());
        assert!(failed.is_err());
        assert!(tokio::fs::metadata(&traceback).await.is_ok());
    }
}
