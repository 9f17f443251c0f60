//! stackctl-lib: lifecycle orchestration for CloudFormation-style stacks
//!
//! This crate converges one named stack at a time towards a desired template:
//! - `Stack`: handle exposing create, update, delete, recreate and
//!   create-or-update, each polled until the remote side settles
//! - `StackGateway`: the boundary to the provisioning service
//! - `EventTracker`: deduplicated, oldest-first stack events
//! - `StatusClass`: what a raw remote status means
//! - `TemplateDiff`: normalized line diff of deployed vs. candidate templates

pub mod config;
pub mod consts;
pub mod error;
pub mod gateway;
pub mod stack;
pub mod template;

pub use config::OrchestratorConfig;
pub use error::StackError;
pub use gateway::{CloudFormationGateway, GatewayError, NoOpDetector, StackGateway, ValidationReport};
pub use stack::{
  ApplyResult, EventSink, EventTracker, OperationOptions, Outcome, Stack, StackAction, StackEvent, StackOutput,
  StackStatus, StatusClass,
};
pub use template::{TemplateDiff, TemplateSource};
