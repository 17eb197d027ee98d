//! Transfer codes: the human-copyable secret that encrypts the cloud repository.
//!
//! A device keeps one current code plus a most-recent-first history of codes
//! it used before, so a repository written by a device that has not yet seen
//! a rotation can still be opened.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a generated code is drawn from (no 0/o, 1/l lookalikes).
pub const TRANSFER_CODE_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

/// Length of a generated code.
pub const TRANSFER_CODE_LENGTH: usize = 16;

/// Maximum number of retired codes remembered per device.
pub const MAX_TRANSFER_CODE_HISTORY: usize = 20;

/// Generate a fresh transfer code.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TRANSFER_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..TRANSFER_CODE_ALPHABET.len());
            TRANSFER_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalise user input: drop whitespace and dashes, lowercase the rest.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Group a code in blocks of four for display, e.g. `abcd-efgh-ijkm-npqr`.
pub fn format_for_display(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    chars
        .chunks(4)
        .map(|block| block.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// The current code and the codes retired before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferCodes {
    pub current: Option<String>,
    /// Most recent first, deduplicated, capped at `MAX_TRANSFER_CODE_HISTORY`
    pub history: Vec<String>,
}

impl TransferCodes {
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.history.is_empty()
    }

    /// Make `code` the current code. The previous current code moves to the
    /// front of the history. Returns false when `code` already was current.
    pub fn promote(&mut self, code: &str) -> bool {
        if self.current.as_deref() == Some(code) {
            return false;
        }
        if let Some(previous) = self.current.take() {
            self.history.retain(|c| c != &previous);
            self.history.insert(0, previous);
        }
        self.history.retain(|c| c != code);
        self.history.truncate(MAX_TRANSFER_CODE_HISTORY);
        self.current = Some(code.to_string());
        true
    }

    /// Codes to try when no code was typed in: current first, then history.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.current
            .as_deref()
            .into_iter()
            .chain(self.history.iter().map(String::as_str))
    }
}
