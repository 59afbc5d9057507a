use core::fmt;
use core::str::FromStr;

/// Front-end selection control for a divergent branch.
///
/// Only ever lands on branch metadata, nothing about control flow construction reads it.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub enum BranchHint {
    #[default]
    None,
    Flatten,
    AlwaysTaken,
    NeverTaken,
}

impl BranchHint {
    /// Whether a branch skipping over an arm should be expected to fall through.
    #[must_use]
    pub const fn rarely_taken(self) -> bool {
        matches!(self, Self::Flatten | Self::AlwaysTaken)
    }

    /// the skip branch of an arm that is "always taken" never fires.
    #[must_use]
    pub const fn never_taken(self) -> bool {
        matches!(self, Self::AlwaysTaken)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Flatten => "flatten",
            Self::AlwaysTaken => "always_taken",
            Self::NeverTaken => "never_taken",
        }
    }
}

impl fmt::Display for BranchHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "flatten" => Ok(Self::Flatten),
            "always_taken" => Ok(Self::AlwaysTaken),
            "never_taken" => Ok(Self::NeverTaken),
            _ => Err(format!("unknown branch hint `{s}`")),
        }
    }
}
