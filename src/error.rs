//! Top-level error and exit codes.

use std::io;

use thiserror::Error;

use crate::build::BuildError;
use crate::config::ConfigError;
use crate::inputs::InputError;
use crate::merge::MergeError;
use crate::script::ScriptError;
use crate::style::StyleError;

/// Any failure of a mapt command
#[derive(Debug, Error)]
pub enum MaptError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MaptError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MaptError::Config(_) => 1,
            MaptError::Input(_) => 1,
            MaptError::Merge(_) => 1,
            MaptError::Script(_) => 3,
            MaptError::Style(StyleError::Stitch(_)) => 2,
            MaptError::Style(_) => 1,
            MaptError::Build(e) => e.exit_code(),
            MaptError::Signal(_) => 1,
            MaptError::Io(_) => 1,
            MaptError::Serialization(_) => 1,
        }
    }
}

/// Result type for mapt commands
pub type MaptResult<T> = Result<T, MaptError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mapt_style::StitchError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MaptError::Config(ConfigError::ParseError("x".into())).exit_code(), 1);
        assert_eq!(MaptError::Script(ScriptError::DuplicateModule("a".into())).exit_code(), 3);
        let stitch = StitchError::UnknownSourceLayer {
            fragment: "water".into(),
            layer: "rivers".into(),
        };
        assert_eq!(MaptError::Style(StyleError::Stitch(stitch)).exit_code(), 2);
        assert_eq!(MaptError::Build(BuildError::Cancelled).exit_code(), 130);
        assert_eq!(
            MaptError::Build(BuildError::EngineFailed { slice: None, code: 42 }).exit_code(),
            42
        );
    }

    #[test]
    fn test_script_errors_keep_their_code_through_build() {
        let err = MaptError::from(BuildError::Script(ScriptError::Load {
            module: "water".into(),
            message: "syntax error".into(),
        }));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("water"));
    }
}
