//! Execution modes: which kinds of user interaction a sync run may use.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Bitset of interaction capabilities. The empty set is the silent mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExecutionMode(u8);

impl ExecutionMode {
    /// No interaction at all; the run is invisible
    pub const SILENT: Self = Self(0);
    /// The run may ask questions (transfer code, merge choice, setup)
    pub const DIALOGS: Self = Self(1);
    /// The run may show a busy indicator while it works
    pub const BUSY_INDICATOR: Self = Self(1 << 1);
    /// The run belongs to a foreground session and may navigate
    pub const GUI: Self = Self(1 << 2);

    /// Started by the user: everything allowed.
    pub const fn interactive() -> Self {
        Self(Self::GUI.0 | Self::DIALOGS.0 | Self::BUSY_INDICATOR.0)
    }

    /// Background run that shows progress but never asks.
    pub const fn semi_interactive() -> Self {
        Self::BUSY_INDICATOR
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_silent(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ExecutionMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_silent() {
            return f.write_str("ExecutionMode(SILENT)");
        }
        let names: Vec<&str> = [
            (Self::DIALOGS, "DIALOGS"),
            (Self::BUSY_INDICATOR, "BUSY_INDICATOR"),
            (Self::GUI, "GUI"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        write!(f, "ExecutionMode({})", names.join(" | "))
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    /// `gui`, `semi` or `silent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gui" | "interactive" => Ok(Self::interactive()),
            "semi" | "semi-interactive" => Ok(Self::semi_interactive()),
            "silent" | "headless" => Ok(Self::SILENT),
            other => Err(format!("unknown execution mode: {other} (expected gui, semi or silent)")),
        }
    }
}
