//! Completion Endpoint Layer
//!
//! Discovers how an LLM-style completion service wants to be called and then
//! calls it.
//!
//! ## Modules
//!
//! - `catalog`: candidate tables (URLs, auth schemes, payload shapes)
//! - `prober`: discovery state machine with a cached binding
//! - `extract`: ordered response-layout extractors
//! - `prompts`: prompt builder and documentation templates
//! - `completion`: client for the bound endpoint

mod catalog;
mod completion;
mod extract;
mod prober;
mod prompts;

pub use catalog::{AuthScheme, CompletionRequest, EndpointCandidate, EndpointCatalog, PayloadShape};
pub use completion::{CompletionClient, CompletionResult, DocumentationWriter};
pub use extract::{extract_text, snippet};
pub use prober::{
    EndpointBinding, EndpointProber, ProbeAttempt, ProbeOutcome, ProbeReport, ProbeState,
};
pub use prompts::{PromptBuilder, SYSTEM_PROMPT, chunk_prompt, overview_prompt};
