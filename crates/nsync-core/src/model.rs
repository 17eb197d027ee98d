//! Repository model shared by every device.
//!
//! A repository is exchanged as one JSON document inside the encrypted
//! envelope. Notes are deleted in two stages: first they move into the
//! recycling bin (`in_recycling_bin`), then their id is recorded as a
//! tombstone in `deleted_notes` so that a merge with another device does not
//! bring them back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{NsyncError, NsyncResult};

pub type NoteId = Uuid;
pub type SafeId = Uuid;

/// Highest repository revision this build can read.
pub const NEWEST_SUPPORTED_REPOSITORY_REVISION: u32 = 1;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Unix millis
    pub created_at: u64,
    /// Unix millis, drives last-writer-wins during merge
    pub modified_at: u64,
    /// HTML content, or base64 envelope when the note belongs to a safe
    pub html_content: String,
    /// Safe whose key encrypts `html_content`
    #[serde(default)]
    pub safe_id: Option<SafeId>,
    #[serde(default)]
    pub in_recycling_bin: bool,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(html_content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            modified_at: now,
            html_content: html_content.into(),
            safe_id: None,
            in_recycling_bin: false,
            background_color: String::new(),
            pinned: false,
            tags: Vec::new(),
        }
    }

    /// Bump `modified_at` after an edit. Never moves the clock backwards.
    pub fn touch(&mut self) {
        self.modified_at = now_millis().max(self.modified_at + 1);
    }
}

/// An independent encryption domain. Notes reference it through `safe_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safe {
    pub id: SafeId,
    pub created_at: u64,
    pub modified_at: u64,
    /// Safe key sealed under the safe password (base64 envelope)
    pub serialized_key: String,
}

impl Safe {
    pub fn new(serialized_key: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            modified_at: now,
            serialized_key: serialized_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Assigned once when the repository is created
    pub id: Uuid,
    pub revision: u32,
    /// Unix millis of the last change to the note order
    pub order_modified_at: u64,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub deleted_notes: BTreeSet<NoteId>,
    #[serde(default)]
    pub safes: Vec<Safe>,
}

impl Default for RepositorySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositorySnapshot {
    /// Create an empty repository with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            revision: NEWEST_SUPPORTED_REPOSITORY_REVISION,
            order_modified_at: 0,
            notes: Vec::new(),
            deleted_notes: BTreeSet::new(),
            safes: Vec::new(),
        }
    }

    /// Parse a repository document, rejecting revisions from newer builds.
    pub fn from_bytes(data: &[u8]) -> NsyncResult<Self> {
        let repo: RepositorySnapshot = serde_json::from_slice(data)?;
        if repo.revision > NEWEST_SUPPORTED_REPOSITORY_REVISION {
            return Err(NsyncError::UnsupportedRepositoryRevision {
                found: repo.revision,
                supported: NEWEST_SUPPORTED_REPOSITORY_REVISION,
            });
        }
        Ok(repo)
    }

    pub fn to_bytes(&self) -> NsyncResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// BLAKE3 over every mutable field (hex). The repository id is excluded.
    pub fn modification_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.revision.to_le_bytes());
        hasher.update(&self.order_modified_at.to_le_bytes());

        hasher.update(&(self.notes.len() as u64).to_le_bytes());
        for note in &self.notes {
            hasher.update(note.id.as_bytes());
            hasher.update(&note.created_at.to_le_bytes());
            hasher.update(&note.modified_at.to_le_bytes());
            hash_str(&mut hasher, &note.html_content);
            match &note.safe_id {
                Some(id) => {
                    hasher.update(&[1]);
                    hasher.update(id.as_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            hasher.update(&[note.in_recycling_bin as u8, note.pinned as u8]);
            hash_str(&mut hasher, &note.background_color);
            hasher.update(&(note.tags.len() as u64).to_le_bytes());
            for tag in &note.tags {
                hash_str(&mut hasher, tag);
            }
        }

        hasher.update(&(self.deleted_notes.len() as u64).to_le_bytes());
        for id in &self.deleted_notes {
            hasher.update(id.as_bytes());
        }

        hasher.update(&(self.safes.len() as u64).to_le_bytes());
        for safe in &self.safes {
            hasher.update(safe.id.as_bytes());
            hasher.update(&safe.created_at.to_le_bytes());
            hasher.update(&safe.modified_at.to_le_bytes());
            hash_str(&mut hasher, &safe.serialized_key);
        }

        hasher.finalize().to_hex().to_string()
    }

    /// True when both snapshots carry the same content (identity ignored).
    pub fn is_identical(&self, other: &RepositorySnapshot) -> bool {
        self.modification_fingerprint() == other.modification_fingerprint()
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    pub fn note_mut(&mut self, id: &NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| &n.id == id)
    }

    pub fn safe(&self, id: &SafeId) -> Option<&Safe> {
        self.safes.iter().find(|s| &s.id == id)
    }

    /// Insert a note at the top of the list.
    pub fn add_note(&mut self, note: Note) {
        self.notes.insert(0, note);
        self.order_modified_at = now_millis();
    }

    /// Soft-delete: move the note into the recycling bin.
    pub fn move_to_recycling_bin(&mut self, id: &NoteId) -> bool {
        match self.note_mut(id) {
            Some(note) => {
                note.in_recycling_bin = true;
                note.touch();
                true
            }
            None => false,
        }
    }

    /// Hard-delete: remove the note and record its tombstone.
    pub fn delete_note_permanently(&mut self, id: &NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| &n.id != id);
        let removed = self.notes.len() != before;
        if removed {
            self.deleted_notes.insert(*id);
        }
        removed
    }

    /// Hard-delete everything in the recycling bin.
    pub fn empty_recycling_bin(&mut self) -> usize {
        let ids: Vec<NoteId> = self
            .notes
            .iter()
            .filter(|n| n.in_recycling_bin)
            .map(|n| n.id)
            .collect();
        for id in &ids {
            self.delete_note_permanently(id);
        }
        ids.len()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
