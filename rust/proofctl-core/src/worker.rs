use serde::{Deserialize, Serialize};

/// A registered LLM backend, keyed by `(model_name, url)` in the gateway's
/// pool table. `model_path` is the name the backend itself expects in the
/// forwarded request body, which may differ from the friendly `model_name`
/// clients address it by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmWorkerRecord {
    pub url: String,
    pub model_name: String,
    pub model_path: String,
}

/// A registered compilation worker in the flat round-robin pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileWorkerRecord {
    pub url: String,
}
