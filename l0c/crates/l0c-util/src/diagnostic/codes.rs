//! Stable diagnostic codes.
//!
//! Codes take the form `XXX-NNNN`: a three-letter phase prefix and a
//! four-digit number. The numbers are append-only; a published code is never
//! renumbered or reused for a different condition.

use std::fmt;

/// Compiler phase a diagnostic code belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Lexing.
    Lex,
    /// Parsing.
    Par,
    /// Driver / module loading.
    Drv,
    /// Name resolution.
    Nam,
    /// Signature and type reference resolution.
    Sig,
    /// Local scope resolution.
    Loc,
    /// Type checking.
    Typ,
    /// Match exhaustiveness and overlap.
    Mtc,
    /// Backend lowering.
    Bak,
    /// Driver orchestration.
    L0c,
    /// Internal consistency errors.
    Ice,
}

impl Phase {
    /// Three-letter prefix used in rendered codes.
    pub const fn prefix(self) -> &'static str {
        match self {
            Phase::Lex => "LEX",
            Phase::Par => "PAR",
            Phase::Drv => "DRV",
            Phase::Nam => "NAM",
            Phase::Sig => "SIG",
            Phase::Loc => "LOC",
            Phase::Typ => "TYP",
            Phase::Mtc => "MTC",
            Phase::Bak => "BAK",
            Phase::L0c => "L0C",
            Phase::Ice => "ICE",
        }
    }
}

/// A stable diagnostic code.
///
/// # Examples
///
/// ```
/// use l0c_util::diagnostic::{DiagnosticCode, Phase};
///
/// let code = DiagnosticCode::new(Phase::Typ, 1);
/// assert_eq!(code.to_string(), "TYP-0001");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosticCode {
    /// Owning phase.
    pub phase: Phase,
    /// Code number within the phase.
    pub number: u16,
}

impl DiagnosticCode {
    /// Create a code.
    pub const fn new(phase: Phase, number: u16) -> Self {
        Self { phase, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.phase.prefix(), self.number)
    }
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

/// Stray character that starts no token.
pub const LEX_UNEXPECTED_CHAR: DiagnosticCode = DiagnosticCode::new(Phase::Lex, 1);
/// String literal missing its closing quote; located at the opening quote.
pub const LEX_UNTERMINATED_STRING: DiagnosticCode = DiagnosticCode::new(Phase::Lex, 2);
/// Invalid escape sequence in a string or byte literal.
pub const LEX_INVALID_ESCAPE: DiagnosticCode = DiagnosticCode::new(Phase::Lex, 3);
/// Malformed byte literal.
pub const LEX_BAD_BYTE_LITERAL: DiagnosticCode = DiagnosticCode::new(Phase::Lex, 4);
/// Malformed integer literal.
pub const LEX_BAD_INT_LITERAL: DiagnosticCode = DiagnosticCode::new(Phase::Lex, 5);

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Token did not fit the grammar at this position.
pub const PAR_UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new(Phase::Par, 1);
/// Expected a top-level declaration.
pub const PAR_EXPECTED_DECL: DiagnosticCode = DiagnosticCode::new(Phase::Par, 2);
/// Malformed `module` header.
pub const PAR_BAD_MODULE_HEADER: DiagnosticCode = DiagnosticCode::new(Phase::Par, 3);
/// `with` header mixes inline `=>` cleanups with plain items.
pub const PAR_MIXED_WITH_CLEANUP: DiagnosticCode = DiagnosticCode::new(Phase::Par, 4);
/// `const` is reserved at the top level but not implemented.
pub const PAR_CONST_RESERVED: DiagnosticCode = DiagnosticCode::new(Phase::Par, 5);
/// Malformed type reference.
pub const PAR_BAD_TYPE_REF: DiagnosticCode = DiagnosticCode::new(Phase::Par, 6);
/// Malformed pattern.
pub const PAR_BAD_PATTERN: DiagnosticCode = DiagnosticCode::new(Phase::Par, 7);
/// Integer literal does not fit the 32-bit signed range.
pub const PAR_INT_OUT_OF_RANGE: DiagnosticCode = DiagnosticCode::new(Phase::Par, 8);

// ---------------------------------------------------------------------------
// Driver / loader
// ---------------------------------------------------------------------------

/// Module source file not found in any search root.
pub const DRV_MODULE_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(Phase::Drv, 1);
/// I/O failure reading a module source file.
pub const DRV_READ_FAILED: DiagnosticCode = DiagnosticCode::new(Phase::Drv, 2);
/// Import cycle; the message names every module on the cycle.
pub const DRV_IMPORT_CYCLE: DiagnosticCode = DiagnosticCode::new(Phase::Drv, 3);
/// Declared `module X;` does not match the name used to load the file.
pub const DRV_MODULE_NAME_MISMATCH: DiagnosticCode = DiagnosticCode::new(Phase::Drv, 4);

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

/// Two top-level declarations share a name in one module.
pub const NAM_DUPLICATE_DEF: DiagnosticCode = DiagnosticCode::new(Phase::Nam, 1);
/// Name imported from more than one module, referenced unqualified.
pub const NAM_AMBIGUOUS: DiagnosticCode = DiagnosticCode::new(Phase::Nam, 2);
/// Qualified reference names a module that is not imported.
pub const NAM_UNKNOWN_MODULE: DiagnosticCode = DiagnosticCode::new(Phase::Nam, 3);
/// Unresolved name.
pub const NAM_UNKNOWN_NAME: DiagnosticCode = DiagnosticCode::new(Phase::Nam, 4);
/// Reference uses more than one `::` segment.
pub const NAM_MULTI_SEGMENT: DiagnosticCode = DiagnosticCode::new(Phase::Nam, 5);

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Type reference names nothing in scope.
pub const SIG_UNKNOWN_TYPE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 1);
/// Symbol used in type position is not a type.
pub const SIG_NOT_A_TYPE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 2);
/// Type alias cycle.
pub const SIG_ALIAS_CYCLE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 3);
/// Struct or enum contains itself by value.
pub const SIG_VALUE_CYCLE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 4);
/// `void` nested inside a container type.
pub const SIG_VOID_IN_TYPE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 5);
/// Duplicate field name within a struct or variant payload.
pub const SIG_DUPLICATE_FIELD: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 6);
/// Duplicate variant name within an enum.
pub const SIG_DUPLICATE_VARIANT: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 7);
/// Nullable marker applied to an already-nullable type.
pub const SIG_DOUBLE_NULLABLE: DiagnosticCode = DiagnosticCode::new(Phase::Sig, 8);

// ---------------------------------------------------------------------------
// Local scopes
// ---------------------------------------------------------------------------

/// Duplicate binding name within one lexical scope.
pub const LOC_DUPLICATE_BINDING: DiagnosticCode = DiagnosticCode::new(Phase::Loc, 1);

// ---------------------------------------------------------------------------
// Type checking
// ---------------------------------------------------------------------------

/// General expected/found type mismatch.
pub const TYP_MISMATCH: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 1);
/// Reference does not resolve to a usable value.
pub const TYP_UNKNOWN_VALUE: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 2);
/// Call target is not a function.
pub const TYP_NOT_CALLABLE: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 3);
/// Call has the wrong number of arguments.
pub const TYP_WRONG_ARITY: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 4);
/// Unary operator applied to an unsupported operand type.
pub const TYP_BAD_UNARY: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 5);
/// Binary operator applied to unsupported operand types.
pub const TYP_BAD_BINARY: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 6);
/// Bitwise and shift operators are reserved pending defined-behavior bounds.
pub const TYP_RESERVED_OPERATOR: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 7);
/// Condition expression must be `bool`.
pub const TYP_CONDITION_NOT_BOOL: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 8);
/// Assignment target is not a place expression.
pub const TYP_NOT_A_PLACE: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 9);
/// Dereference of a non-pointer or nullable pointer.
pub const TYP_BAD_DEREF: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 10);
/// Field access on a non-struct, through `T*?`, or unknown field.
pub const TYP_BAD_FIELD_ACCESS: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 11);
/// Indexing is parsed but not yet supported by any type.
pub const TYP_NO_INDEXING: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 12);
/// Cast between types with no defined conversion.
pub const TYP_BAD_CAST: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 13);
/// `?` applied to a non-nullable operand, or used in a function whose
/// return type is not nullable.
pub const TYP_BAD_TRY: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 14);
/// A non-void function has a control path that does not return.
pub const TYP_MISSING_RETURN: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 15);
/// `return` value does not match the declared function type.
pub const TYP_RETURN_MISMATCH: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 16);
/// Use of a variable after `drop`.
pub const TYP_USE_AFTER_DROP: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 17);
/// `drop` operand must be a pointer or nullable-pointer local.
pub const TYP_BAD_DROP: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 18);
/// `break` or `continue` outside a loop.
pub const TYP_LOOP_CONTROL_OUTSIDE_LOOP: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 19);
/// Top-level `let` initializer must be a literal.
pub const TYP_TOP_LET_NOT_LITERAL: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 20);
/// `null` used where no nullable type is required.
pub const TYP_NULL_CONTEXT: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 21);
/// A `void` result used as a value.
pub const TYP_VOID_VALUE: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 22);
/// `new` target is not a struct type, or its arguments do not match.
pub const TYP_BAD_NEW: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 23);
/// `sizeof` expects a single type argument.
pub const TYP_BAD_SIZEOF: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 24);
/// `return`/`break`/`continue` inside `with` cleanup code.
pub const TYP_CLEANUP_JUMP: DiagnosticCode = DiagnosticCode::new(Phase::Typ, 25);

// ---------------------------------------------------------------------------
// Match / case
// ---------------------------------------------------------------------------

/// Match does not cover every variant and has no wildcard.
pub const MTC_NON_EXHAUSTIVE: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 1);
/// Same variant matched by more than one arm.
pub const MTC_DUPLICATE_ARM: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 2);
/// Arm is unreachable because it follows a wildcard.
pub const MTC_UNREACHABLE_ARM: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 3);
/// Pattern names a variant the scrutinee's enum does not have.
pub const MTC_UNKNOWN_VARIANT: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 4);
/// Pattern binds a different number of variables than the variant has fields.
pub const MTC_PATTERN_ARITY: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 5);
/// Match scrutinee is not an enum value.
pub const MTC_NOT_AN_ENUM: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 6);
/// Duplicate literal in a `case` statement.
pub const MTC_CASE_DUPLICATE: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 7);
/// `case` scrutinee or arm literal has an unsupported type.
pub const MTC_CASE_TYPE: DiagnosticCode = DiagnosticCode::new(Phase::Mtc, 8);

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Backend invoked while error diagnostics exist.
pub const BAK_ERRORS_PRESENT: DiagnosticCode = DiagnosticCode::new(Phase::Bak, 1);
/// Entry `main` must take no parameters.
pub const BAK_MAIN_PARAMS: DiagnosticCode = DiagnosticCode::new(Phase::Bak, 2);

// ---------------------------------------------------------------------------
// Driver orchestration
// ---------------------------------------------------------------------------

/// Failed to write compiler output.
pub const L0C_WRITE_FAILED: DiagnosticCode = DiagnosticCode::new(Phase::L0c, 1);
/// Entry module name is not a valid dotted name.
pub const L0C_BAD_ENTRY_NAME: DiagnosticCode = DiagnosticCode::new(Phase::L0c, 2);

// ---------------------------------------------------------------------------
// Internal consistency
// ---------------------------------------------------------------------------

/// An expression reached the backend without a recorded type.
pub const ICE_MISSING_EXPR_TYPE: DiagnosticCode = DiagnosticCode::new(Phase::Ice, 1);
/// Semantic tables contained an unexpected shape.
pub const ICE_BAD_SHAPE: DiagnosticCode = DiagnosticCode::new(Phase::Ice, 2);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(TYP_MISMATCH.to_string(), "TYP-0001");
        assert_eq!(MTC_NON_EXHAUSTIVE.to_string(), "MTC-0001");
        assert_eq!(LEX_UNTERMINATED_STRING.to_string(), "LEX-0002");
        assert_eq!(ICE_BAD_SHAPE.to_string(), "ICE-0002");
    }

    #[test]
    fn test_code_shape() {
        // Three uppercase letters, a dash, four digits.
        for code in [
            LEX_UNEXPECTED_CHAR,
            PAR_UNEXPECTED_TOKEN,
            DRV_IMPORT_CYCLE,
            NAM_AMBIGUOUS,
            SIG_ALIAS_CYCLE,
            LOC_DUPLICATE_BINDING,
            TYP_USE_AFTER_DROP,
            MTC_CASE_DUPLICATE,
            BAK_MAIN_PARAMS,
            L0C_WRITE_FAILED,
        ] {
            let rendered = code.to_string();
            let (prefix, number) = rendered.split_once('-').unwrap();
            assert_eq!(prefix.len(), 3);
            assert!(prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert_eq!(number.len(), 4);
            assert!(number.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
