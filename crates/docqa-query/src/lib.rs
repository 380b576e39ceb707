//! Retrieval and answer generation for docqa.
//!
//! [`Retriever::answer`] embeds the question, queries the workspace index,
//! assembles a labeled context block and asks a [`Generator`] for a grounded
//! answer with de-duplicated source citations.
//!
//! [`Generator`]: docqa_core::Generator

pub mod context;
pub mod generator;
pub mod retriever;

pub use context::{NO_DOCUMENTS_ANSWER, SYSTEM_PROMPT, build_context, dedup_sources, preview};
pub use generator::{ChatGenerator, GeneratorConfig};
pub use retriever::{Retriever, RetrieverSettings};
