pub mod completion;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod pricing;
pub mod promotion;

pub use completion::{completion, CompletionReport, REQUIRED_FIELDS};
pub use context::{resume_context, summary_lines};
pub use domain::business::BusinessDefaults;
pub use domain::customer::{Customer, CustomerId};
pub use domain::draft::{
    AddOn, ColorAssignment, ConversationEntry, Draft, DraftField, DraftId, DraftUpdate, PaintItem,
    ProjectType, SpeakerRole,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extraction::FieldExtractor;
pub use pricing::{DeterministicRecalculator, DraftFinancials, Recalculator};
pub use promotion::{build_payload, EstimatePayload};
