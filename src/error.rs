//! Crate-wide error taxonomy.

use thiserror::Error;

/// Unified error type for every fallible operation in the bridge.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol framing error: {0}")]
    ProtocolFraming(String),

    #[error("CDP error {code}: {message}")]
    Cdp { code: i64, message: String },

    #[error("missing target: {0}")]
    MissingTarget(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("pipe closed")]
    PipeClosed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("process error: {0}")]
    Process(String),
}

impl ProxyError {
    /// True for the one CDP error code that detach paths must swallow.
    pub fn is_invalid_params(&self) -> bool {
        matches!(self, ProxyError::Cdp { code: -32602, .. })
    }
}

impl From<nix::Error> for ProxyError {
    fn from(err: nix::Error) -> Self {
        ProxyError::Process(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_cdp_error_with_code_and_message() {
        let err = ProxyError::Cdp {
            code: -32602,
            message: "invalid params".to_string(),
        };
        assert_eq!(err.to_string(), "CDP error -32602: invalid params");
    }

    #[test]
    fn is_invalid_params_only_matches_32602() {
        let swallowed = ProxyError::Cdp { code: -32602, message: "x".into() };
        let other = ProxyError::Cdp { code: -32000, message: "x".into() };
        assert!(swallowed.is_invalid_params());
        assert!(!other.is_invalid_params());
        assert!(!ProxyError::PipeClosed.is_invalid_params());
    }

    #[test]
    fn all_variants_have_non_empty_display() {
        let variants: Vec<ProxyError> = vec![
            ProxyError::ProtocolFraming("bad frame".into()),
            ProxyError::Cdp { code: -32000, message: "not allowed".into() },
            ProxyError::MissingTarget("T1".into()),
            ProxyError::Config("no path".into()),
            ProxyError::PipeClosed,
            ProxyError::Transport("non-text frame".into()),
            ProxyError::Process("spawn failed".into()),
        ];
        for variant in variants {
            assert!(!variant.to_string().is_empty());
        }
    }
}
