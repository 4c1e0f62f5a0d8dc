pub mod api;
pub mod cli;
pub mod domain;
pub mod fhir;
pub mod infra;
pub mod llm;
pub mod prompts;
