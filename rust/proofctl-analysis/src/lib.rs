//! Lean 4 source parsing, dependency analysis, subproblem synthesis, and
//! LLM output normalization.

pub mod declaration;
pub mod error;
pub mod graph;
pub mod header;
pub mod output;
pub mod proof_analysis;
pub mod subproblem;

pub use declaration::{Declaration, DeclarationKind};
pub use error::AnalysisError;
pub use output::{DefaultOutputPolicy, ExtractedProof, OutputPolicy};
pub use proof_analysis::{LeanVerifier, ProofAnalysis, ProofReport};
pub use subproblem::Subproblem;
