//! The job orchestrator.
//!
//! One orchestrator drives one job: detection, bounded fan-out to the four
//! category agents, deterministic merge, validation, summary, report-ready
//! completion. Every state transition publishes a whole-record snapshot to
//! the store before the next step begins.
//!
//! Failure policy: detector failure and an unreadable file set are fatal;
//! agent and validator failures degrade the job (fewer fixes, a warning)
//! but never abort it.

use anyhow::anyhow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::events::{PipelineEvent, PipelineEventKind};
use super::stage::{
    advance, bump_progress, fail, PROGRESS_ACCEPTED, PROGRESS_DETECTED, PROGRESS_PER_AGENT,
    PROGRESS_VALIDATED,
};
use crate::agents::{builtin_agents, CategoryAgent};
use crate::detect::{IssueDetector, RuleDetector};
use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue, Job};
use crate::patch::merge_fixes;
use crate::state::store::JobStore;
use crate::summary::summarize;
use crate::validate::{RuleValidator, Validator};

/// Commands a running job accepts from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCommand {
    Cancel,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently running category agents
    pub agent_parallelism: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_parallelism: Category::ALL.len(),
        }
    }
}

/// Drives a single job through the pipeline. Built once per job; `run`
/// consumes it.
pub struct Orchestrator {
    config: OrchestratorConfig,
    store: JobStore,
    detector: Arc<dyn IssueDetector>,
    agents: HashMap<Category, Arc<dyn CategoryAgent>>,
    validator: Arc<dyn Validator>,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
    command_rx: Option<mpsc::Receiver<JobCommand>>,
}

impl Orchestrator {
    /// Orchestrator with the built-in detector, agent roster, and
    /// validator.
    pub fn new(store: JobStore) -> Self {
        let mut agents = HashMap::new();
        for agent in builtin_agents() {
            let agent: Arc<dyn CategoryAgent> = Arc::from(agent);
            agents.insert(agent.category(), agent);
        }
        Self {
            config: OrchestratorConfig::default(),
            store,
            detector: Arc::new(RuleDetector::new()),
            agents,
            validator: Arc::new(RuleValidator::new()),
            event_tx: None,
            command_rx: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn IssueDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the agent roster. Later agents win on category collision.
    pub fn with_agents(mut self, agents: Vec<Box<dyn CategoryAgent>>) -> Self {
        self.agents.clear();
        for agent in agents {
            let agent: Arc<dyn CategoryAgent> = Arc::from(agent);
            self.agents.insert(agent.category(), agent);
        }
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_command_channel(mut self, rx: mpsc::Receiver<JobCommand>) -> Self {
        self.command_rx = Some(rx);
        self
    }

    /// Run the job to a terminal state. Never returns early: failures and
    /// cancellation surface as the returned job's `error` state.
    #[tracing::instrument(skip_all, fields(job_id = %job.id))]
    pub async fn run(mut self, mut job: Job, files: FileSet) -> Job {
        let mut command_rx = self.command_rx.take();

        bump_progress(&mut job, PROGRESS_ACCEPTED);
        job.message = "File set accepted".to_string();
        self.publish(&job).await;
        self.emit(&job.id, PipelineEventKind::JobAccepted {
            file_count: files.len(),
        })
        .await;

        // --- Detection (fatal on failure) ---
        advance(&mut job, "Scanning for accessibility issues");
        self.publish(&job).await;
        self.emit(&job.id, PipelineEventKind::DetectionStarted).await;

        let detected = tokio::select! {
            result = self.detector.detect(&files) => result,
            _ = recv_command(&mut command_rx) => {
                return self.cancel(job).await;
            }
        };

        match detected {
            Ok(issues) => {
                info!(count = issues.len(), "detection complete");
                self.emit(&job.id, PipelineEventKind::DetectionCompleted {
                    issue_count: issues.len(),
                })
                .await;
                job.issues = issues;
                bump_progress(&mut job, PROGRESS_DETECTED);
            }
            Err(e) => {
                error!(error = %e, "detection failed");
                self.emit(&job.id, PipelineEventKind::DetectionFailed {
                    error: e.to_string(),
                })
                .await;
                job.issues.clear();
                fail(&mut job, format!("Issue detection failed: {e}"));
                self.publish(&job).await;
                self.emit(&job.id, PipelineEventKind::JobFailed {
                    error: e.to_string(),
                })
                .await;
                return job;
            }
        }

        // --- Fixing: bounded fan-out, one agent per category ---
        advance(&mut job, "Applying category fixes");
        self.publish(&job).await;

        let mut partitions: HashMap<Category, Vec<Issue>> = HashMap::new();
        for issue in &job.issues {
            partitions.entry(issue.category).or_default().push(issue.clone());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.agent_parallelism.max(1)));
        let mut join_set: JoinSet<(Category, anyhow::Result<Vec<Fix>>)> = JoinSet::new();

        for category in Category::ALL {
            let Some(issues) = partitions.remove(&category) else {
                // Nothing for this agent; its share of progress is
                // accounted immediately.
                let next = job.progress + PROGRESS_PER_AGENT;
                bump_progress(&mut job, next);
                continue;
            };
            let Some(agent) = self.agents.get(&category).cloned() else {
                warn!(?category, "no agent registered; issues left unfixed");
                let next = job.progress + PROGRESS_PER_AGENT;
                bump_progress(&mut job, next);
                continue;
            };

            let paths: BTreeSet<String> =
                issues.iter().map(|i| i.file_path.clone()).collect();
            let subset = files.subset(&paths);
            let sem = semaphore.clone();
            let issue_count = issues.len();

            self.emit(&job.id, PipelineEventKind::AgentStarted {
                category,
                issue_count,
            })
            .await;

            join_set.spawn(async move {
                let result: anyhow::Result<Vec<Fix>> = async {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow!("agent semaphore closed"))?;
                    agent.propose_fixes(&issues, &subset).await
                }
                .await;
                (category, result)
            });
        }

        let category_of: HashMap<String, Category> = job
            .issues
            .iter()
            .map(|i| (i.id.clone(), i.category))
            .collect();

        // Fixes accumulate in agent completion order; a failed agent
        // contributes nothing but still advances progress.
        let mut fixes: Vec<Fix> = Vec::new();
        loop {
            let joined = tokio::select! {
                joined = join_set.join_next() => joined,
                _ = recv_command(&mut command_rx) => {
                    join_set.abort_all();
                    return self.cancel(job).await;
                }
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((category, Ok(mut proposed))) => {
                    let before = proposed.len();
                    proposed.retain(|f| {
                        category_of.get(&f.issue_id) == Some(&category)
                    });
                    if proposed.len() < before {
                        warn!(
                            ?category,
                            rejected = before - proposed.len(),
                            "agent proposed fixes outside its category"
                        );
                    }
                    info!(?category, fixes = proposed.len(), "agent finished");
                    self.emit(&job.id, PipelineEventKind::AgentCompleted {
                        category,
                        fix_count: proposed.len(),
                    })
                    .await;
                    fixes.append(&mut proposed);
                }
                Ok((category, Err(e))) => {
                    warn!(?category, error = %e, "agent failed; continuing without its fixes");
                    job.message =
                        format!("{} agent failed; continuing without its fixes", category.as_str());
                    self.emit(&job.id, PipelineEventKind::AgentFailed {
                        category,
                        error: e.to_string(),
                    })
                    .await;
                }
                Err(e) => {
                    warn!(error = %e, "agent task aborted; continuing");
                }
            }
            let next = job.progress + PROGRESS_PER_AGENT;
            bump_progress(&mut job, next);
            self.publish(&job).await;
        }

        // At most one fix per issue; the earliest-arriving one wins the slot.
        let mut seen = HashSet::new();
        fixes.retain(|f| seen.insert(f.issue_id.clone()));

        // --- Merge ---
        let outcome = merge_fixes(&files, &job.issues, &mut fixes);
        let applied = fixes.iter().filter(|f| f.applied).count();
        for note in &outcome.notes {
            info!(issue = %note.issue_id, detail = %note.detail, "merge note");
        }
        self.emit(&job.id, PipelineEventKind::FixesMerged {
            applied,
            note_count: outcome.notes.len(),
        })
        .await;
        job.fixes = fixes;
        job.merge_notes = outcome.notes;
        job.patched = Some(outcome.patched);

        // --- Validation (degraded on failure) ---
        advance(&mut job, "Validating patched files");
        self.publish(&job).await;

        let touched: BTreeSet<String> = job
            .fixes
            .iter()
            .filter(|f| f.applied)
            .map(|f| f.file_path.clone())
            .collect();
        self.emit(&job.id, PipelineEventKind::ValidationStarted {
            file_count: touched.len(),
        })
        .await;

        // Always present after the merge above.
        let patched = job.patched.clone().unwrap_or_default();
        let validated = tokio::select! {
            result = self.validator.validate(&touched, &patched) => result,
            _ = recv_command(&mut command_rx) => {
                return self.cancel(job).await;
            }
        };

        match validated {
            Ok(results) => {
                let failed_files: BTreeSet<&str> = results
                    .iter()
                    .filter(|r| !r.passed)
                    .map(|r| r.file_path.as_str())
                    .collect();
                for fix in &mut job.fixes {
                    if failed_files.contains(fix.file_path.as_str()) {
                        fix.applied = false;
                    }
                }
                let passed = failed_files.is_empty();
                self.emit(&job.id, PipelineEventKind::ValidationCompleted { passed })
                    .await;
                job.validation_results = results;
            }
            Err(e) => {
                warn!(error = %e, "validator failed; keeping post-merge fix state");
                job.message = "Validation unavailable; fixes kept as merged".to_string();
                self.emit(&job.id, PipelineEventKind::ValidationFailed {
                    error: e.to_string(),
                })
                .await;
                job.validation_results.clear();
            }
        }
        bump_progress(&mut job, PROGRESS_VALIDATED);
        self.publish(&job).await;

        // --- Summary + completion ---
        let summary = summarize(&job.issues, &job.fixes, &job.validation_results);
        job.summary = Some(summary.clone());
        advance(&mut job, "Accessibility fixes complete");
        self.publish(&job).await;
        self.emit(&job.id, PipelineEventKind::JobCompleted { summary })
            .await;

        job
    }

    /// Cancellation path: partial outputs are discarded, detected issues
    /// are kept for the record.
    async fn cancel(&self, mut job: Job) -> Job {
        info!(job_id = %job.id, "job cancelled");
        job.fixes.clear();
        job.merge_notes.clear();
        job.validation_results.clear();
        job.patched = None;
        fail(&mut job, "Job cancelled by request");
        self.publish(&job).await;
        self.emit(&job.id, PipelineEventKind::JobCancelled).await;
        job
    }

    async fn publish(&self, job: &Job) {
        self.store.publish(job).await;
    }

    async fn emit(&self, job_id: &str, kind: PipelineEventKind) {
        if let Some(tx) = &self.event_tx {
            // Observational channel; a full or closed receiver never
            // affects the job.
            let _ = tx.send(PipelineEvent::new(job_id, kind)).await;
        }
    }
}

/// Resolve to the next command, or park forever when no channel exists or
/// the sender is gone (a dropped handle must not look like a cancel).
async fn recv_command(rx: &mut Option<mpsc::Receiver<JobCommand>>) -> JobCommand {
    match rx {
        Some(rx) => match rx.recv().await {
            Some(cmd) => cmd,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectError;
    use crate::models::{JobStatus, Severity, ValidationResult};
    use async_trait::async_trait;

    fn sample_files() -> FileSet {
        FileSet::from_entries([(
            "index.html".to_string(),
            "<html>\n<img src=\"logo.png\">\n</html>\n".to_string(),
        )])
    }

    struct FailingDetector;

    #[async_trait]
    impl IssueDetector for FailingDetector {
        async fn detect(&self, _files: &FileSet) -> Result<Vec<Issue>, DetectError> {
            Err(DetectError::ScanFailed("parser crashed".to_string()))
        }
    }

    struct FailingAgent(Category);

    #[async_trait]
    impl CategoryAgent for FailingAgent {
        fn category(&self) -> Category {
            self.0
        }
        async fn propose_fixes(
            &self,
            _issues: &[Issue],
            _files: &FileSet,
        ) -> anyhow::Result<Vec<Fix>> {
            anyhow::bail!("model unavailable")
        }
    }

    struct SlowAgent(Category);

    #[async_trait]
    impl CategoryAgent for SlowAgent {
        fn category(&self) -> Category {
            self.0
        }
        async fn propose_fixes(
            &self,
            _issues: &[Issue],
            _files: &FileSet,
        ) -> anyhow::Result<Vec<Fix>> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    struct StrayAgent(Category);

    #[async_trait]
    impl CategoryAgent for StrayAgent {
        fn category(&self) -> Category {
            self.0
        }
        async fn propose_fixes(
            &self,
            issues: &[Issue],
            _files: &FileSet,
        ) -> anyhow::Result<Vec<Fix>> {
            // References an issue it was never given.
            let mut fixes: Vec<Fix> = issues
                .iter()
                .map(|i| Fix {
                    issue_id: i.id.clone(),
                    file_path: i.file_path.clone(),
                    before_code: i.code_snippet.clone(),
                    after_code: format!("{} <!-- fixed -->", i.code_snippet),
                    diff: String::new(),
                    confidence: 0.9,
                    applied: false,
                })
                .collect();
            fixes.push(Fix {
                issue_id: "someone-elses-issue".to_string(),
                file_path: "index.html".to_string(),
                before_code: "x".to_string(),
                after_code: "y".to_string(),
                diff: String::new(),
                confidence: 0.9,
                applied: false,
            });
            Ok(fixes)
        }
    }

    struct FixedDetector(Vec<Issue>);

    #[async_trait]
    impl IssueDetector for FixedDetector {
        async fn detect(&self, _files: &FileSet) -> Result<Vec<Issue>, DetectError> {
            Ok(self.0.clone())
        }
    }

    struct EchoAgent(Category);

    #[async_trait]
    impl CategoryAgent for EchoAgent {
        fn category(&self) -> Category {
            self.0
        }
        async fn propose_fixes(
            &self,
            issues: &[Issue],
            _files: &FileSet,
        ) -> anyhow::Result<Vec<Fix>> {
            Ok(issues
                .iter()
                .map(|i| Fix {
                    issue_id: i.id.clone(),
                    file_path: i.file_path.clone(),
                    before_code: i.code_snippet.clone(),
                    after_code: format!("{} <!-- reviewed -->", i.code_snippet),
                    diff: String::new(),
                    confidence: 0.8,
                    applied: false,
                })
                .collect())
        }
    }

    struct RejectAllValidator;

    #[async_trait]
    impl Validator for RejectAllValidator {
        async fn validate(
            &self,
            touched: &BTreeSet<String>,
            _files: &FileSet,
        ) -> anyhow::Result<Vec<ValidationResult>> {
            Ok(touched
                .iter()
                .map(|p| ValidationResult {
                    file_path: p.clone(),
                    passed: false,
                    errors: vec!["still broken".to_string()],
                    warnings: Vec::new(),
                })
                .collect())
        }
    }

    struct BrokenValidator;

    #[async_trait]
    impl Validator for BrokenValidator {
        async fn validate(
            &self,
            _touched: &BTreeSet<String>,
            _files: &FileSet,
        ) -> anyhow::Result<Vec<ValidationResult>> {
            anyhow::bail!("validator binary missing")
        }
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_applied_fixes() {
        let store = JobStore::new();
        let job = Job::with_id("job-happy");
        let done = Orchestrator::new(store.clone())
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert_eq!(done.progress, 100);
        assert!(done.completed_at.is_some());

        // img-alt and html-lang both fire on the sample.
        assert_eq!(done.issues.len(), 2);
        let summary = done.summary.as_ref().unwrap();
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.total_fixes, 2);
        assert_eq!(summary.remaining_issues, 0);
        assert!(summary.validation_passed);

        let patched = done.patched.as_ref().unwrap();
        assert!(patched.get("index.html").unwrap().contains("alt=\"\""));
        assert!(patched.get("index.html").unwrap().contains("lang=\"en\""));

        // Store snapshot matches the returned job.
        let snap = store.snapshot("job-happy").await.unwrap();
        assert_eq!(snap.status, JobStatus::Complete);
        assert_eq!(snap.progress, 100);
    }

    #[tokio::test]
    async fn test_detector_failure_is_fatal() {
        let store = JobStore::new();
        let job = Job::with_id("job-fatal");
        let done = Orchestrator::new(store.clone())
            .with_detector(Arc::new(FailingDetector))
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Error);
        assert!(done.issues.is_empty());
        assert!(done.fixes.is_empty());
        // Progress froze at the accepted checkpoint.
        assert_eq!(done.progress, PROGRESS_ACCEPTED);
        assert!(done.message.contains("detection failed"));
    }

    #[tokio::test]
    async fn test_agent_failure_degrades_not_fails() {
        let store = JobStore::new();
        let job = Job::with_id("job-degraded");
        let done = Orchestrator::new(store)
            .with_agents(vec![
                Box::new(FailingAgent(Category::Perceivable)),
                Box::new(FailingAgent(Category::Understandable)),
            ])
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert_eq!(done.progress, 100);
        let summary = done.summary.as_ref().unwrap();
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.total_fixes, 0);
        assert_eq!(summary.remaining_issues, 2);
    }

    #[tokio::test]
    async fn test_failed_agent_keeps_per_category_accounting() {
        // 10 issues spread 3/3/3/1 across the categories; the perceivable
        // agent fails on every call while the other three fix everything.
        fn spread_issue(n: u32, category: Category) -> Issue {
            Issue {
                id: format!("page.html_{n}"),
                file_path: "page.html".to_string(),
                line_start: n,
                line_end: n,
                category,
                severity: Severity::Medium,
                description: String::new(),
                code_snippet: format!("line{n}"),
                rule_id: None,
            }
        }
        let mut issues = Vec::new();
        for n in 1..=3 {
            issues.push(spread_issue(n, Category::Perceivable));
        }
        for n in 4..=6 {
            issues.push(spread_issue(n, Category::Operable));
        }
        for n in 7..=9 {
            issues.push(spread_issue(n, Category::Understandable));
        }
        issues.push(spread_issue(10, Category::Robust));

        let content: String = (1..=10).map(|n| format!("line{n}\n")).collect();
        let files = FileSet::from_entries([("page.html".to_string(), content)]);

        let store = JobStore::new();
        let done = Orchestrator::new(store)
            .with_detector(Arc::new(FixedDetector(issues)))
            .with_agents(vec![
                Box::new(FailingAgent(Category::Perceivable)),
                Box::new(EchoAgent(Category::Operable)),
                Box::new(EchoAgent(Category::Understandable)),
                Box::new(EchoAgent(Category::Robust)),
            ])
            .run(Job::with_id("job-spread"), files)
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        let summary = done.summary.as_ref().unwrap();
        assert_eq!(summary.total_issues, 10);
        assert_eq!(summary.issues_by_category[&Category::Perceivable], 3);
        assert_eq!(summary.issues_by_category[&Category::Operable], 3);
        assert_eq!(summary.issues_by_category[&Category::Understandable], 3);
        assert_eq!(summary.issues_by_category[&Category::Robust], 1);
        assert_eq!(summary.fixes_by_category[&Category::Perceivable], 0);
        assert_eq!(summary.fixes_by_category[&Category::Operable], 3);
        assert_eq!(summary.fixes_by_category[&Category::Understandable], 3);
        assert_eq!(summary.fixes_by_category[&Category::Robust], 1);
        assert_eq!(summary.total_fixes, 7);
        assert_eq!(summary.remaining_issues, 3);
    }

    #[tokio::test]
    async fn test_validation_failure_demotes_fixes() {
        let store = JobStore::new();
        let job = Job::with_id("job-demoted");
        let done = Orchestrator::new(store)
            .with_validator(Arc::new(RejectAllValidator))
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert!(done.fixes.iter().all(|f| !f.applied));
        let summary = done.summary.as_ref().unwrap();
        assert_eq!(summary.total_fixes, 0);
        assert_eq!(summary.remaining_issues, summary.total_issues);
        assert!(!summary.validation_passed);
    }

    #[tokio::test]
    async fn test_validator_error_is_degraded() {
        let store = JobStore::new();
        let job = Job::with_id("job-noval");
        let done = Orchestrator::new(store)
            .with_validator(Arc::new(BrokenValidator))
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert!(done.validation_results.is_empty());
        // Post-merge applied state survives.
        assert!(done.fixes.iter().any(|f| f.applied));
    }

    #[tokio::test]
    async fn test_cancellation_during_fixing() {
        let store = JobStore::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let job = Job::with_id("job-cancel");

        let orchestrator = Orchestrator::new(store.clone())
            .with_agents(vec![
                Box::new(SlowAgent(Category::Perceivable)),
                Box::new(SlowAgent(Category::Understandable)),
            ])
            .with_command_channel(cmd_rx);

        let handle = tokio::spawn(orchestrator.run(job, sample_files()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cmd_tx.send(JobCommand::Cancel).await.unwrap();

        let done = handle.await.unwrap();
        assert_eq!(done.status, JobStatus::Error);
        assert!(done.fixes.is_empty());
        assert!(done.patched.is_none());
        assert!(done.message.contains("cancelled"));
        // Detected issues are kept for the record.
        assert_eq!(done.issues.len(), 2);
    }

    #[tokio::test]
    async fn test_cross_category_fixes_rejected() {
        let store = JobStore::new();
        let job = Job::with_id("job-stray");
        let done = Orchestrator::new(store)
            .with_agents(vec![Box::new(StrayAgent(Category::Perceivable))])
            .run(job, sample_files())
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert!(done
            .fixes
            .iter()
            .all(|f| f.issue_id != "someone-elses-issue"));
    }

    #[tokio::test]
    async fn test_clean_input_completes_quickly() {
        let store = JobStore::new();
        let files = FileSet::from_entries([(
            "clean.html".to_string(),
            "<p>nothing wrong here</p>".to_string(),
        )]);
        let done = Orchestrator::new(store)
            .run(Job::with_id("job-clean"), files)
            .await;

        assert_eq!(done.status, JobStatus::Complete);
        assert_eq!(done.progress, 100);
        let summary = done.summary.as_ref().unwrap();
        assert_eq!(summary.total_issues, 0);
        assert!(summary.validation_passed);
    }

    #[tokio::test]
    async fn test_events_emitted_in_lifecycle_order() {
        let store = JobStore::new();
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let done = Orchestrator::new(store)
            .with_event_channel(event_tx)
            .run(Job::with_id("job-events"), sample_files())
            .await;
        assert_eq!(done.status, JobStatus::Complete);

        let mut kinds = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            kinds.push(event.kind);
        }
        assert!(matches!(kinds.first(), Some(PipelineEventKind::JobAccepted { .. })));
        assert!(matches!(kinds.last(), Some(PipelineEventKind::JobCompleted { .. })));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, PipelineEventKind::DetectionCompleted { .. })));
        assert!(kinds
            .iter()
            .any(|k| matches!(k, PipelineEventKind::AgentCompleted { .. })));
    }
}
