//! Shared domain types for the Hindsight transcript pipeline.
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//! transcript submissions and their validation rules, the extracted-entity
//! shapes produced by the language model, and the hydrated records served
//! back out of the relational store.

pub mod extraction;
pub mod sentiment;
pub mod submission;
pub mod transcript;

pub use extraction::ExtractedEntities;
pub use sentiment::Sentiment;
pub use submission::{
    FieldViolation, ParticipantSpec, TranscriptSubmission, ValidationError, is_valid_email,
};
pub use transcript::{ParticipantRef, TranscriptDetail, TranscriptRecord};
