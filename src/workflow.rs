//! Workflow state machine.
//!
//! [`Workflow`] is the single mutator of a [`SessionState`]. Each user event
//! is a named transition. Transitions that need the generative service are
//! split in three so a host can drop its lock while a request is in flight:
//!
//! 1. `begin_*` validates the event, moves the stage, and returns a ticket
//!    stamped with the current workflow pass;
//! 2. `run_*` performs the requests for that ticket against a
//!    [`GenerativeClient`] without touching the state;
//! 3. `apply_*` commits the outcome, or discards it as [`Applied::Stale`] if
//!    the session was reset (or moved on) in the meantime.
//!
//! Single-owner callers can use the chained helpers ([`Workflow::submit_goal`],
//! [`Workflow::select_model`], [`Workflow::fill_sample_row`],
//! [`Workflow::test_model`]) instead.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{classify_task, TaskCategory};
use crate::dataset::{DatasetDescriptor, DatasetKind, FileUpload, RawContent};
use crate::requests::{
    ExplainInput, FeatureRow, GenerativeClient, MetricsReport, ModelSuggestions, RequestError,
};
use crate::session::{RequestFailure, SessionState, WorkflowStage};

const GOAL_RETRY_MESSAGE: &str =
    "Something went wrong while analysing your goal. Please try again.";
const EXPLANATION_FAILED_MESSAGE: &str = "Could not generate the workflow explanation.";
const METRICS_FAILED_MESSAGE: &str = "Could not generate performance metrics.";
const SAMPLE_ROW_FAILED_MESSAGE: &str = "Could not generate a sample row. Please try again.";
const PREDICTION_FAILED_MESSAGE: &str = "Could not generate a prediction. Please try again.";

// =============================================================================
// Errors and outcomes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("unsupported file type for {name}: upload a CSV file or an image")]
    InvalidFileType { name: String },
    #[error("please describe your goal")]
    EmptyGoal,
    #[error("please fill in every feature before testing: {}", .missing.join(", "))]
    IncompleteInput { missing: Vec<String> },
    #[error("the test bench needs a tabular dataset")]
    TestBenchUnavailable,
    #[error("unknown test-bench feature {0:?}")]
    UnknownFeature(String),
    #[error("{event} is not accepted while {stage}")]
    InvalidTransition {
        event: &'static str,
        stage: WorkflowStage,
    },
}

/// Whether an outcome was committed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Applied {
    Committed,
    /// The outcome belongs to an earlier pass or stage and was discarded.
    Stale,
}

/// Result of a single request, stamped with the pass it was issued in.
#[derive(Debug)]
pub struct Outcome<T> {
    pass: u64,
    pub result: Result<T, RequestError>,
}

impl<T> Outcome<T> {
    pub fn pass(&self) -> u64 {
        self.pass
    }
}

/// Result of the goal-processing requests.
#[derive(Debug)]
pub struct GoalOutcome {
    pass: u64,
    /// `None` for image datasets.
    pub target: Option<Result<String, RequestError>>,
    /// `None` when target identification failed first.
    pub suggestions: Option<Result<ModelSuggestions, RequestError>>,
}

impl GoalOutcome {
    pub fn pass(&self) -> u64 {
        self.pass
    }
}

// =============================================================================
// Tickets
// =============================================================================

#[derive(Debug, Clone)]
pub struct GoalTicket {
    session_id: Uuid,
    pass: u64,
    goal: String,
    kind: DatasetKind,
    columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResultsTicket {
    session_id: Uuid,
    pass: u64,
    goal: String,
    model: String,
    category: TaskCategory,
    kind: DatasetKind,
    columns: Vec<String>,
    raw_content: RawContent,
}

#[derive(Debug, Clone)]
pub struct SampleRowTicket {
    session_id: Uuid,
    pass: u64,
    columns: Vec<String>,
    raw_text: String,
    target: String,
}

#[derive(Debug, Clone)]
pub struct PredictionTicket {
    session_id: Uuid,
    pass: u64,
    goal: String,
    model: String,
    columns: Vec<String>,
    input_json: String,
}

impl PredictionTicket {
    /// The feature values sent to the service, as JSON.
    pub fn input_json(&self) -> &str {
        &self.input_json
    }
}

// =============================================================================
// Runners
// =============================================================================

/// Identify the target column (tabular only), then ask for model suggestions.
pub async fn run_goal(client: &GenerativeClient, ticket: GoalTicket) -> GoalOutcome {
    let client = client.for_pass(ticket.session_id, ticket.pass);

    let target = match ticket.kind {
        DatasetKind::Tabular => Some(
            client
                .identify_target_column(&ticket.goal, &ticket.columns)
                .await,
        ),
        DatasetKind::Image => None,
    };

    let suggestions = match &target {
        Some(Err(_)) => None,
        _ => Some(client.suggest_models(&ticket.goal, ticket.kind).await),
    };

    GoalOutcome {
        pass: ticket.pass,
        target,
        suggestions,
    }
}

/// Request the explanation and the metrics concurrently. Neither failure
/// cancels the other.
pub async fn run_results(
    client: &GenerativeClient,
    ticket: ResultsTicket,
) -> (Outcome<String>, Outcome<MetricsReport>) {
    let client = client.for_pass(ticket.session_id, ticket.pass);
    let input = ExplainInput {
        goal: &ticket.goal,
        model: &ticket.model,
        kind: ticket.kind,
        column_names: &ticket.columns,
        raw_content: Some(&ticket.raw_content),
    };

    let (explanation, metrics) = futures::join!(
        client.explain_workflow(input),
        client.generate_metrics(&ticket.model, &ticket.goal, ticket.category),
    );

    (
        Outcome {
            pass: ticket.pass,
            result: explanation,
        },
        Outcome {
            pass: ticket.pass,
            result: metrics,
        },
    )
}

pub async fn run_sample_row(client: &GenerativeClient, ticket: SampleRowTicket) -> Outcome<FeatureRow> {
    let client = client.for_pass(ticket.session_id, ticket.pass);
    let result = client
        .generate_sample_row(&ticket.columns, &ticket.raw_text, &ticket.target)
        .await;
    Outcome {
        pass: ticket.pass,
        result,
    }
}

pub async fn run_prediction(client: &GenerativeClient, ticket: PredictionTicket) -> Outcome<String> {
    let client = client.for_pass(ticket.session_id, ticket.pass);
    let result = client
        .generate_prediction(
            &ticket.goal,
            &ticket.model,
            &ticket.input_json,
            Some(&ticket.columns),
        )
        .await;
    Outcome {
        pass: ticket.pass,
        result,
    }
}

// =============================================================================
// Workflow
// =============================================================================

#[derive(Debug, Clone)]
pub struct Workflow {
    state: SessionState,
    session_id: Uuid,
    pass: u64,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self::with_session_id(Uuid::new_v4())
    }

    pub fn with_session_id(session_id: Uuid) -> Self {
        Self {
            state: SessionState::default(),
            session_id,
            pass: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stage(&self) -> WorkflowStage {
        self.state.stage
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current workflow pass. Bumped by every reset.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    fn expect_stage(&self, event: &'static str, stage: WorkflowStage) -> Result<(), WorkflowError> {
        if self.state.stage == stage {
            Ok(())
        } else {
            debug!(event, stage = %self.state.stage, "rejected out-of-stage event");
            Err(WorkflowError::InvalidTransition {
                event,
                stage: self.state.stage,
            })
        }
    }

    /// Record a user-facing error in the session and hand it back.
    fn report(&mut self, err: WorkflowError) -> WorkflowError {
        self.state.last_error = Some(err.to_string());
        err
    }

    fn is_current(&self, pass: u64, stage: WorkflowStage, what: &'static str) -> bool {
        if pass == self.pass && self.state.stage == stage {
            return true;
        }
        debug!(
            what,
            outcome_pass = pass,
            current_pass = self.pass,
            stage = %self.state.stage,
            "discarding stale outcome"
        );
        false
    }

    /// Return to the initial state. Valid from every stage; outstanding
    /// tickets become stale.
    pub fn reset(&mut self) {
        self.pass += 1;
        self.state = SessionState::default();
        info!(session_id = %self.session_id, pass = self.pass, "workflow reset");
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    pub fn accept_file(&mut self, upload: FileUpload) -> Result<(), WorkflowError> {
        self.expect_stage("accept_file", WorkflowStage::UploadingFile)?;

        let name = upload.name.clone();
        let Some(dataset) = DatasetDescriptor::from_upload(upload) else {
            warn!(file = %name, "rejected upload with unsupported type");
            return Err(self.report(WorkflowError::InvalidFileType { name }));
        };

        info!(
            file = %dataset.name,
            kind = dataset.kind.as_str(),
            columns = dataset.column_names.len(),
            "dataset accepted"
        );
        self.state.dataset = Some(dataset);
        self.state.stage = WorkflowStage::CollectingGoal;
        self.state.last_error = None;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Goal
    // -------------------------------------------------------------------------

    pub fn begin_goal(&mut self, goal: &str) -> Result<GoalTicket, WorkflowError> {
        self.expect_stage("submit_goal", WorkflowStage::CollectingGoal)?;

        let goal = goal.trim();
        if goal.is_empty() {
            return Err(self.report(WorkflowError::EmptyGoal));
        }

        let Some(dataset) = self.state.dataset.as_ref() else {
            return Err(WorkflowError::InvalidTransition {
                event: "submit_goal",
                stage: self.state.stage,
            });
        };
        let kind = dataset.kind;
        let columns = dataset.column_names.clone();

        self.state.goal = goal.to_string();
        self.state.task_category = classify_task(goal);
        self.state.stage = WorkflowStage::ProcessingGoal;
        self.state.last_error = None;
        debug!(category = self.state.task_category.as_str(), "goal classified");

        Ok(GoalTicket {
            session_id: self.session_id,
            pass: self.pass,
            goal: goal.to_string(),
            kind,
            columns,
        })
    }

    pub fn apply_goal(&mut self, outcome: GoalOutcome) -> Applied {
        if !self.is_current(outcome.pass, WorkflowStage::ProcessingGoal, "goal") {
            return Applied::Stale;
        }

        // A resolved target survives a later suggestions failure.
        let mut failure = None;
        match outcome.target {
            Some(Ok(target)) => self.state.target_column = target,
            Some(Err(err)) => failure = Some(err),
            None => {}
        }

        match (failure, outcome.suggestions) {
            (None, Some(Ok(suggestions))) => {
                info!(
                    recommended = %suggestions.recommended,
                    options = suggestions.options.len(),
                    target = %self.state.target_column,
                    "model suggestions ready"
                );
                self.state.suggestions = Some(suggestions);
                self.state.stage = WorkflowStage::SelectingModel;
                self.state.last_error = None;
            }
            (failure, suggestions) => {
                match failure.or(suggestions.and_then(Result::err)) {
                    Some(err) => warn!(error = %err, "goal processing failed"),
                    None => warn!("goal processing produced no suggestions"),
                }
                self.state.stage = WorkflowStage::CollectingGoal;
                self.state.last_error = Some(GOAL_RETRY_MESSAGE.to_string());
            }
        }
        Applied::Committed
    }

    /// Submit a goal and process it to completion.
    ///
    /// Request failures are reported through the session, not the return value.
    pub async fn submit_goal(
        &mut self,
        client: &GenerativeClient,
        goal: &str,
    ) -> Result<Applied, WorkflowError> {
        let ticket = self.begin_goal(goal)?;
        let outcome = run_goal(client, ticket).await;
        Ok(self.apply_goal(outcome))
    }

    // -------------------------------------------------------------------------
    // Model selection and results
    // -------------------------------------------------------------------------

    /// Select a model and enter the results view. Any model name is accepted.
    pub fn begin_select_model(&mut self, model: &str) -> Result<ResultsTicket, WorkflowError> {
        self.expect_stage("select_model", WorkflowStage::SelectingModel)?;

        let Some(dataset) = self.state.dataset.as_ref() else {
            return Err(WorkflowError::InvalidTransition {
                event: "select_model",
                stage: self.state.stage,
            });
        };
        let ticket = ResultsTicket {
            session_id: self.session_id,
            pass: self.pass,
            goal: self.state.goal.clone(),
            model: model.to_string(),
            category: self.state.task_category,
            kind: dataset.kind,
            columns: dataset.column_names.clone(),
            raw_content: dataset.raw_content.clone(),
        };
        let inputs = dataset
            .feature_columns(&self.state.target_column)
            .map(|column| (column.to_string(), String::new()))
            .collect();

        if self
            .state
            .suggestions
            .as_ref()
            .is_some_and(|s| !s.offers(model))
        {
            debug!(model, "selected model was not among the suggestions");
        }

        self.state.selected_model = model.to_string();
        self.state.test_bench_inputs = inputs;
        self.state.explanation = None;
        self.state.metrics = None;
        self.state.prediction = None;
        self.state.stage = WorkflowStage::ShowingResults;
        self.state.last_error = None;
        info!(model, "model selected");
        Ok(ticket)
    }

    pub fn apply_explanation(&mut self, outcome: Outcome<String>) -> Applied {
        if !self.is_current(outcome.pass, WorkflowStage::ShowingResults, "explanation") {
            return Applied::Stale;
        }
        if let Err(err) = &outcome.result {
            warn!(error = %err, "workflow explanation failed");
            self.note_results_error(EXPLANATION_FAILED_MESSAGE);
        }
        self.state.explanation = Some(outcome.result.map_err(|e| RequestFailure::from(&e)));
        Applied::Committed
    }

    pub fn apply_metrics(&mut self, outcome: Outcome<MetricsReport>) -> Applied {
        if !self.is_current(outcome.pass, WorkflowStage::ShowingResults, "metrics") {
            return Applied::Stale;
        }
        if let Err(err) = &outcome.result {
            warn!(error = %err, "metrics generation failed");
            self.note_results_error(METRICS_FAILED_MESSAGE);
        }
        self.state.metrics = Some(outcome.result.map_err(|e| RequestFailure::from(&e)));
        Applied::Committed
    }

    /// Both results requests may fail in one pass; keep every message.
    fn note_results_error(&mut self, message: &str) {
        match self.state.last_error.as_mut() {
            Some(existing) if existing.contains(message) => {}
            Some(existing) => {
                existing.push(' ');
                existing.push_str(message);
            }
            None => self.state.last_error = Some(message.to_string()),
        }
    }

    /// Select a model and wait for both results requests.
    pub async fn select_model(
        &mut self,
        client: &GenerativeClient,
        model: &str,
    ) -> Result<Applied, WorkflowError> {
        let ticket = self.begin_select_model(model)?;
        let (explanation, metrics) = run_results(client, ticket).await;
        let explanation = self.apply_explanation(explanation);
        let metrics = self.apply_metrics(metrics);
        Ok(if explanation == Applied::Committed && metrics == Applied::Committed {
            Applied::Committed
        } else {
            Applied::Stale
        })
    }

    // -------------------------------------------------------------------------
    // Test bench
    // -------------------------------------------------------------------------

    fn expect_test_bench(&self, event: &'static str) -> Result<(), WorkflowError> {
        self.expect_stage(event, WorkflowStage::ShowingResults)?;
        if self.state.is_tabular() {
            Ok(())
        } else {
            Err(WorkflowError::TestBenchUnavailable)
        }
    }

    pub fn set_test_input(&mut self, column: &str, value: impl Into<String>) -> Result<(), WorkflowError> {
        self.expect_test_bench("set_test_input")?;
        match self.state.test_bench_inputs.get_mut(column) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(WorkflowError::UnknownFeature(column.to_string())),
        }
    }

    pub fn begin_sample_row(&self) -> Result<SampleRowTicket, WorkflowError> {
        self.expect_test_bench("generate_sample_row")?;
        let dataset = self
            .state
            .dataset
            .as_ref()
            .ok_or(WorkflowError::TestBenchUnavailable)?;
        let raw_text = dataset
            .raw_content
            .as_text()
            .ok_or(WorkflowError::TestBenchUnavailable)?;

        Ok(SampleRowTicket {
            session_id: self.session_id,
            pass: self.pass,
            columns: dataset.column_names.clone(),
            raw_text: raw_text.to_string(),
            target: self.state.target_column.clone(),
        })
    }

    /// Copy generated values into the matching test-bench fields.
    pub fn apply_sample_row(&mut self, outcome: Outcome<FeatureRow>) -> Applied {
        if !self.is_current(outcome.pass, WorkflowStage::ShowingResults, "sample_row") {
            return Applied::Stale;
        }
        match outcome.result {
            Ok(row) => {
                for (column, value) in row {
                    if let Some(slot) = self.state.test_bench_inputs.get_mut(&column) {
                        *slot = value.to_string();
                    }
                }
                self.state.last_error = None;
            }
            Err(err) => {
                warn!(error = %err, "sample row generation failed");
                self.state.last_error = Some(SAMPLE_ROW_FAILED_MESSAGE.to_string());
            }
        }
        Applied::Committed
    }

    pub async fn fill_sample_row(&mut self, client: &GenerativeClient) -> Result<Applied, WorkflowError> {
        let ticket = self.begin_sample_row()?;
        let outcome = run_sample_row(client, ticket).await;
        Ok(self.apply_sample_row(outcome))
    }

    /// Validate the test-bench inputs and start a prediction.
    ///
    /// Fails with [`WorkflowError::IncompleteInput`] without issuing a request
    /// if any field is blank.
    pub fn begin_prediction(&mut self) -> Result<PredictionTicket, WorkflowError> {
        self.expect_test_bench("test_model")?;

        let missing = self.state.missing_inputs();
        if !missing.is_empty() {
            return Err(self.report(WorkflowError::IncompleteInput { missing }));
        }

        let input: Map<String, Value> = self
            .state
            .test_bench_inputs
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.trim().to_string())))
            .collect();

        self.state.prediction = None;
        self.state.last_error = None;
        Ok(PredictionTicket {
            session_id: self.session_id,
            pass: self.pass,
            goal: self.state.goal.clone(),
            model: self.state.selected_model.clone(),
            columns: self.state.column_names().to_vec(),
            input_json: format!("{:#}", Value::Object(input)),
        })
    }

    pub fn apply_prediction(&mut self, outcome: Outcome<String>) -> Applied {
        if !self.is_current(outcome.pass, WorkflowStage::ShowingResults, "prediction") {
            return Applied::Stale;
        }
        if let Err(err) = &outcome.result {
            warn!(error = %err, "prediction failed");
            self.state.last_error = Some(PREDICTION_FAILED_MESSAGE.to_string());
        }
        self.state.prediction = Some(outcome.result.map_err(|e| RequestFailure::from(&e)));
        Applied::Committed
    }

    pub async fn test_model(&mut self, client: &GenerativeClient) -> Result<Applied, WorkflowError> {
        let ticket = self.begin_prediction()?;
        let outcome = run_prediction(client, ticket).await;
        Ok(self.apply_prediction(outcome))
    }
}
