use std::fmt;

use wavesel_ir::{DefId, Instr, SourceLoc};

/// Input the selector can't (or won't) handle.
///
/// Broken invariants inside the selector itself are panics, not errors.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum IselError {
    /// Well-formed, but there's no lowering for it on this configuration.
    Unsupported { loc: Option<SourceLoc>, instr: Option<String>, reason: String },
    /// Breaks a rule of the structured IR.
    MalformedInput { loc: Option<SourceLoc>, instr: Option<String>, reason: String },
    NestingTooDeep { depth: usize, limit: usize },
    UndefinedValue { def: DefId },
}

impl IselError {
    pub(crate) fn unsupported(instr: &Instr, reason: impl Into<String>) -> Self {
        Self::Unsupported { loc: instr.loc, instr: Some(instr.to_string()), reason: reason.into() }
    }

    pub(crate) fn malformed(instr: &Instr, reason: impl Into<String>) -> Self {
        Self::MalformedInput { loc: instr.loc, instr: Some(instr.to_string()), reason: reason.into() }
    }

    pub(crate) fn malformed_at(loc: Option<SourceLoc>, reason: impl Into<String>) -> Self {
        Self::MalformedInput { loc, instr: None, reason: reason.into() }
    }
}

fn describe(
    f: &mut fmt::Formatter,
    kind: &str,
    loc: Option<SourceLoc>,
    instr: Option<&str>,
    reason: &str,
) -> fmt::Result {
    write!(f, "{kind}: {reason}")?;

    if let Some(instr) = instr {
        write!(f, ": `{instr}`")?;
    }

    if let Some(loc) = loc {
        write!(f, " ({loc})")?;
    }

    Ok(())
}

impl fmt::Display for IselError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsupported { loc, instr, reason } => {
                describe(f, "unsupported", *loc, instr.as_deref(), reason)
            }

            Self::MalformedInput { loc, instr, reason } => {
                describe(f, "malformed input", *loc, instr.as_deref(), reason)
            }

            Self::NestingTooDeep { depth, limit } => {
                write!(f, "control flow nested {depth} deep exceeds the limit of {limit}")
            }

            Self::UndefinedValue { def } => write!(f, "use of undefined value `{def}`"),
        }
    }
}

impl std::error::Error for IselError {}
