use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no declaration named `{0}` in this file")]
    UnknownDeclaration(String),

    #[error("verifier call failed: {0}")]
    Verifier(String),

    #[error("replacement source for `{0}` did not contain a declaration with that name")]
    MissingTargetInReplacement(String),
}
