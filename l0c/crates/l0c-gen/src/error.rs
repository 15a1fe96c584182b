//! Error types for C99 code generation.
//!
//! User-facing problems never reach this crate; the driver refuses to lower
//! a unit with error diagnostics. Everything here is an internal
//! consistency failure, surfaced to the user as an `ICE-` diagnostic that
//! is fatal to the translation unit but not to the process.

use thiserror::Error;

/// Error type for C99 code generation.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Lowering was invoked while error diagnostics exist.
    #[error("cannot emit C: the unit has {0} error diagnostic(s)")]
    ErrorsPresent(usize),

    /// An expression reached lowering without a recorded type.
    #[error("missing type for expression {0:?}")]
    MissingExprType(l0c_par::ast::NodeId),

    /// A variable reference reached lowering without a resolution.
    #[error("missing resolution for reference {0:?}")]
    MissingVarTarget(l0c_par::ast::NodeId),

    /// A semantic table held an unexpected shape.
    #[error("unexpected semantic shape: {0}")]
    BadShape(String),

    /// The entry `main` has parameters.
    #[error("entry `main` must take no parameters")]
    MainWithParams,
}

/// Result type alias for code generation operations.
pub type Result<T> = std::result::Result<T, CodegenError>;
