#![forbid(unsafe_code)]

//! # mlguide
//!
//! Core of a guided, simulated data-science assistant.
//!
//! A user uploads a dataset, describes a goal, picks one of the models a
//! generative-language service suggests, and is shown a staged workflow
//! explanation, illustrative metrics, and a test bench that fabricates
//! predictions. Nothing here trains or evaluates a model: every metric and
//! prediction is text produced by the external service.
//!
//! The session lives in a [`Workflow`], a reducer over [`SessionState`]. All
//! service traffic goes through a [`GenerativeClient`] backed by any
//! [`ChatGateway`]; [`ProviderGateway`] over OpenRouter is the shipped one.

pub mod classifier;
pub mod dataset;
pub mod gateway;
pub mod prompts;
pub mod requests;
pub mod schema;
pub mod session;
pub mod workflow;

pub use classifier::{classify_task, TaskCategory};
pub use dataset::{derive_column_names, DatasetDescriptor, DatasetKind, FileUpload, RawContent};
pub use gateway::{Attribution, ChatGateway, ProviderError, ProviderGateway, UsageSink};
pub use requests::{
    ClientConfig, FeatureRow, FeatureValue, GenerativeClient, MetricValue, MetricsReport,
    ModelSuggestions, RequestError,
};
pub use schema::{is_numeric_hint, FeatureType, ObjectSchema, Schema};
pub use session::{FailureKind, RequestFailure, SessionState, WorkflowStage};
pub use workflow::{Applied, Workflow, WorkflowError};
