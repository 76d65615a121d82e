//! Core data model shared by every subsystem: request envelopes, agent
//! payloads, the layered context shapes, policy entities, and the workflow
//! result. Pure data + validation; no I/O.

pub mod context;
pub mod envelope;
pub mod error;
pub mod payloads;
pub mod policy;
pub mod validation;
pub mod workflow;

pub use context::{
    BudgetConfig, CriticView, DomainLayer, EphemeralLayer, LayeredContext, PolicyLayer,
    PruningReport, PruningStep, SessionLayer,
};
pub use envelope::{AgentKind, AgentPayload, Priority, RequestEnvelope};
pub use error::{ProcureError, Result};
pub use payloads::{CompliancePayload, ForecastPayload, NegotiationPayload, RiskTolerance};
pub use policy::{ComplianceRule, EnforcementLevel, Location, PolicyViolation, Severity, ViolationKind};
pub use validation::{FieldError, ValidationError, Validator};
pub use workflow::{ContextUsage, CriticOutcome, FinalStatus, RevisionAction, WorkflowMetrics, WorkflowResult};
