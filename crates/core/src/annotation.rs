//! Field annotations: the append-only, attributed entries that make up a
//! field's history.
//!
//! An annotation is immutable once appended. Corrections add, never delete;
//! the visible value of a field is a pure fold over the sequence (see
//! `field::fold_value`). Timestamps are RFC 3339 strings, matching the
//! persisted record shape.

use serde::{Deserialize, Serialize};

/// Quick-response values insertable with a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuickResponseValue {
    Yes,
    No,
    Pass,
    Fail,
}

impl QuickResponseValue {
    pub fn as_str(self) -> &'static str {
        match self {
            QuickResponseValue::Yes => "Yes",
            QuickResponseValue::No => "No",
            QuickResponseValue::Pass => "Pass",
            QuickResponseValue::Fail => "Fail",
        }
    }
}

impl std::fmt::Display for QuickResponseValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backdating metadata attached to an entry whose asserted effective time
/// precedes submission time. The reason is mandatory; validation happens in
/// the engine's late-entry handler before the mutation is built, and the
/// non-empty check is repeated at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateEntry {
    /// RFC 3339 timestamp the entry is asserted to be effective at,
    /// in the document's timezone.
    pub claimed_at: String,
    pub reason: String,
}

/// One immutable, attributed entry in a field's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Free or machine-composed text. `machine_composed` marks entries the
    /// engine inserted on the actor's behalf (quick-entry initials) so
    /// renderers can distinguish them from hand-typed text.
    TextEntry {
        text: String,
        author: String,
        at: String,
        machine_composed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        late: Option<LateEntry>,
    },
    /// A one-way checkbox mark. There is no unmark variant: once a field
    /// holds a `CheckboxMark` it reads checked forever.
    CheckboxMark {
        /// Per (document, participant) sequence number, assigned atomically
        /// at commit.
        marker: u32,
        /// Rendered marker label, e.g. `*1DS`.
        marker_label: String,
        author: String,
        at: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        late: Option<LateEntry>,
    },
    /// Yes/No/Pass/Fail. Overwrites by append: a later response becomes the
    /// visible value while the earlier one stays in history.
    QuickResponse {
        value: QuickResponseValue,
        author: String,
        at: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        late: Option<LateEntry>,
    },
    /// An additive correction. `original_index` points into the field's
    /// annotation sequence; the original entry is retained unmodified.
    Correction {
        original_index: usize,
        replacement: String,
        reason: String,
        author: String,
        at: String,
    },
    /// A reference to another document, resolved through the external
    /// document directory. Only `{reference, display_name}` is stored,
    /// never payload bytes.
    DocumentLink {
        reference: String,
        display_name: String,
        author: String,
        at: String,
    },
}

impl Annotation {
    pub fn author(&self) -> &str {
        match self {
            Annotation::TextEntry { author, .. }
            | Annotation::CheckboxMark { author, .. }
            | Annotation::QuickResponse { author, .. }
            | Annotation::Correction { author, .. }
            | Annotation::DocumentLink { author, .. } => author,
        }
    }

    pub fn at(&self) -> &str {
        match self {
            Annotation::TextEntry { at, .. }
            | Annotation::CheckboxMark { at, .. }
            | Annotation::QuickResponse { at, .. }
            | Annotation::Correction { at, .. }
            | Annotation::DocumentLink { at, .. } => at,
        }
    }

    pub fn late(&self) -> Option<&LateEntry> {
        match self {
            Annotation::TextEntry { late, .. }
            | Annotation::CheckboxMark { late, .. }
            | Annotation::QuickResponse { late, .. } => late.as_ref(),
            Annotation::Correction { .. } | Annotation::DocumentLink { .. } => None,
        }
    }
}

/// Render a checkbox marker label: `*{n}{initials}`, e.g. `*1DS`.
pub fn marker_label(marker: u32, initials: &str) -> String {
    format!("*{}{}", marker, initials)
}
