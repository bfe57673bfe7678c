//! Voice session runtime.
//!
//! This crate sits between the dialogue transport and the deterministic core:
//! - `drafts` owns every draft mutation and recalculates before each save
//! - `tools` answers named tool calls and returns draft effects as commands
//! - `session` runs the turn loop: append, extract, merge, report progress
//!
//! # Safety Principle
//!
//! The dialogue agent never decides prices. Totals come from the core
//! recalculator after every merge, whatever the transcript says.

pub mod drafts;
pub mod session;
pub mod tools;

pub use drafts::{DraftLifecycle, FieldChange};
pub use session::{SessionClose, SessionSettings, SessionStart, TurnOutcome, VoiceSession};
pub use tools::{
    BusinessConfigSource, BusinessConfigTool, CustomerLookupTool, StaticBusinessConfig, Tool,
    ToolEffect, ToolOutput, ToolRegistry, GET_BUSINESS_CONFIG, LOOKUP_CUSTOMER,
};
