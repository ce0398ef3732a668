//! ui
//!
//! Terminal-facing pieces of `dsync`: [`output`] prints the run summary
//! and status lines, [`prompts`] asks for confirmation and credentials.
//! Neither is used by the engine directly; it reports through
//! [`WorkflowResult`](crate::engine::WorkflowResult) and the
//! [`CredentialPrompt`](crate::auth::CredentialPrompt) seam.

pub mod output;
pub mod prompts;
