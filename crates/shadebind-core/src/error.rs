use std::path::PathBuf;

/// Engine-level errors used across shadebind crates.
///
/// Contract rule: this type lives in `shadebind-core` and is re-exported by runtimes.
/// Only construction-time APIs return it; the per-draw paths never fail.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    // ---- Core / config ----
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // ---- Runtime-facing (backend) ----
    #[error("vertex shader compile error: {0}")]
    VertexCompile(String),

    #[error("fragment shader compile error: {0}")]
    FragmentCompile(String),

    #[error("program link error: {0}")]
    Link(String),

    #[error("backend object creation failed: {0}")]
    GlCreate(String),

    // ---- Fallback ----
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        EngineError::Other(s.into())
    }

    /// True for failures reported by the backend while building a program.
    pub fn is_program_failure(&self) -> bool {
        matches!(
            self,
            EngineError::VertexCompile(_)
                | EngineError::FragmentCompile(_)
                | EngineError::Link(_)
                | EngineError::GlCreate(_)
        )
    }
}
