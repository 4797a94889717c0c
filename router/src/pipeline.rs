//! End-to-end orchestration of one coding task.
//!
//! One request runs synchronously through author, verify, and
//! materialization. Nothing touches the workspace until the author file list
//! is known non-empty and the verify reply has parsed, so a failed run
//! leaves no trace on disk.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::RouterConfig;
use crate::gateway::{ChatGateway, GatewayError};
use crate::prompts;
use crate::reply::{self, AuthorReply, VerifyReply};
use crate::store::{RunStore, Status, StoreError};

/// Author stage sampling temperature.
const AUTHOR_TEMPERATURE: f32 = 0.2;
/// The retry and verify stages run colder.
const STRICT_TEMPERATURE: f32 = 0.1;

/// One incoming coding task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default = "default_project")]
    pub project: String,
}

fn default_project() -> String {
    "default".to_string()
}

/// Verdict returned to the caller after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskVerdict {
    pub verdict: String,
    pub run_id: String,
    pub files: Vec<String>,
}

/// Full pipeline outcome: the caller-facing verdict plus the verify reply.
///
/// Verify findings are advisory today; they are surfaced here so a future
/// rejection gate has somewhere to hook in without reshaping the pipeline.
#[derive(Debug, Clone)]
pub struct CodeTaskOutcome {
    pub verdict: TaskVerdict,
    pub verify: VerifyReply,
}

/// Pipeline failures, distinguishable enough for the HTTP layer to tell
/// "your task was unsatisfiable" apart from "the upstream model misbehaved".
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Author output stayed invalid JSON even after the strict retry.
    #[error("author stage returned invalid JSON after retry")]
    AuthorJsonInvalid,
    /// Verify output was not valid JSON; no retry is attempted there.
    #[error("verify stage returned invalid JSON")]
    VerifyJsonInvalid,
    /// Well-formed author reply without a single file.
    #[error("author returned no files")]
    NoFilesProduced,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generate the run identifier: unix timestamp plus a short task hash.
///
/// Stable for identical `(task, second)` pairs; the hash component keeps
/// distinct tasks submitted within the same second apart.
pub fn generate_run_id(task: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    run_id_at(task, now)
}

fn run_id_at(task: &str, unix_secs: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", unix_secs, &digest[..10])
}

/// Drive one task end-to-end: author, verify, materialize.
#[instrument(skip_all, fields(project = %request.project))]
pub async fn run_code_task<G>(
    config: &RouterConfig,
    gateway: &G,
    store: &RunStore,
    request: &TaskRequest,
) -> Result<CodeTaskOutcome, PipelineError>
where
    G: ChatGateway + ?Sized,
{
    store.ensure_layout()?;
    let run_id = generate_run_id(&request.task);
    info!(run_id = %run_id, "starting code task");

    let author_value = author_stage(config, gateway, &request.task).await?;
    let author = AuthorReply::from_value(author_value);
    if author.files.is_empty() {
        return Err(PipelineError::NoFilesProduced);
    }
    debug!(files = author.files.len(), "author stage produced files");

    let bundle = reply::bundle(&author.files);
    let verify = verify_stage(config, gateway, &request.task, &bundle).await?;
    if !verify.pass {
        // Advisory only: findings are logged, never gating.
        warn!(
            run_id = %run_id,
            issues = verify.issues.len(),
            "verify stage reported issues"
        );
    }

    let run_dir = store.write_run(Status::Approved, &request.project, &run_id, &author.files)?;
    info!(run_dir = %run_dir.display(), files = author.files.len(), "run approved");

    Ok(CodeTaskOutcome {
        verdict: TaskVerdict {
            verdict: "approved".to_string(),
            run_id,
            files: author.files.iter().map(|file| file.path.clone()).collect(),
        },
        verify,
    })
}

/// Run the author stage with its single strict-retry fallback.
///
/// The retry bypasses the normal template: strict system line, raw task
/// text, colder temperature. A second decode failure aborts the stage.
async fn author_stage<G>(
    config: &RouterConfig,
    gateway: &G,
    task: &str,
) -> Result<Value, PipelineError>
where
    G: ChatGateway + ?Sized,
{
    let model = config.active_author_model();
    let raw = gateway
        .chat(model, &prompts::author_messages(task), AUTHOR_TEMPERATURE)
        .await?;

    match reply::decode(Some(raw.as_str())) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!(error = %err, "author reply not decodable, retrying once");
            let raw = gateway
                .chat(
                    model,
                    &prompts::author_retry_messages(task),
                    STRICT_TEMPERATURE,
                )
                .await?;
            reply::decode(Some(raw.as_str())).map_err(|_| PipelineError::AuthorJsonInvalid)
        }
    }
}

/// Run the verify stage over the bundled author output. No retry here.
async fn verify_stage<G>(
    config: &RouterConfig,
    gateway: &G,
    task: &str,
    bundle: &str,
) -> Result<VerifyReply, PipelineError>
where
    G: ChatGateway + ?Sized,
{
    let raw = gateway
        .chat(
            config.active_author_model(),
            &prompts::verify_messages(task, bundle),
            STRICT_TEMPERATURE,
        )
        .await?;
    let value = reply::decode(Some(raw.as_str())).map_err(|_| PipelineError::VerifyJsonInvalid)?;
    Ok(VerifyReply::from_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_stable_within_a_second() {
        assert_eq!(
            run_id_at("write a hello world script", 1_700_000_000),
            run_id_at("write a hello world script", 1_700_000_000)
        );
    }

    #[test]
    fn run_id_distinguishes_tasks_in_the_same_second() {
        let a = run_id_at("task one", 1_700_000_000);
        let b = run_id_at("task two", 1_700_000_000);
        assert_ne!(a, b);
        assert!(a.starts_with("1700000000-"));
        assert!(b.starts_with("1700000000-"));
    }

    #[test]
    fn run_id_hash_component_is_ten_hex_chars() {
        let id = run_id_at("task", 42);
        let (secs, hash) = id.split_once('-').expect("separator");
        assert_eq!(secs, "42");
        assert_eq!(hash.len(), 10);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn task_request_project_defaults() {
        let request: TaskRequest =
            serde_json::from_str("{\"task\": \"do it\"}").expect("deserialize");
        assert_eq!(request.project, "default");

        let request: TaskRequest =
            serde_json::from_str("{\"task\": \"do it\", \"project\": \"demo\"}")
                .expect("deserialize");
        assert_eq!(request.project, "demo");
    }
}
