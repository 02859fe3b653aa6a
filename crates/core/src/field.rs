//! Fields: addressable cells holding an append-only annotation history,
//! and the pure fold that computes the currently visible value.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, QuickResponseValue};

/// What kind of entries a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Checkbox,
    QuickResponse,
    SignatureSlot,
    Link,
}

/// An addressable cell within a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,
    pub label: String,
    pub kind: FieldKind,
    /// Append-only history. Corrections append; nothing is ever removed.
    pub annotations: Vec<Annotation>,
    /// Document version at which this field last changed. Used by the
    /// store's per-field concurrency check.
    pub updated_at_version: u64,
}

impl Field {
    pub fn new(field_id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            field_id: field_id.into(),
            label: label.into(),
            kind,
            annotations: Vec::new(),
            updated_at_version: 0,
        }
    }

    /// Whether the field currently reads checked. Once true, no operation
    /// in the vocabulary can make it false again.
    pub fn is_checked(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::CheckboxMark { .. }))
    }

    /// The currently visible value: a pure fold over the history.
    pub fn value(&self) -> FieldValue {
        fold_value(&self.annotations)
    }
}

/// The folded, currently visible value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Empty,
    Text { text: String },
    Response { value: QuickResponseValue },
    Checked { marker_label: String },
    Link { reference: String, display_name: String },
}

/// Fold an annotation sequence into the visible value.
///
/// Each annotation supersedes the previous visible value; a correction's
/// replacement text becomes visible exactly as a fresh text entry would.
/// A checkbox mark is terminal for checkbox fields; nothing later in the
/// vocabulary reverts it.
pub fn fold_value(annotations: &[Annotation]) -> FieldValue {
    let mut current = FieldValue::Empty;
    for a in annotations {
        match a {
            Annotation::TextEntry { text, .. } => {
                current = FieldValue::Text { text: text.clone() };
            }
            Annotation::QuickResponse { value, .. } => {
                current = FieldValue::Response { value: *value };
            }
            Annotation::CheckboxMark { marker_label, .. } => {
                current = FieldValue::Checked {
                    marker_label: marker_label.clone(),
                };
            }
            Annotation::Correction { replacement, .. } => {
                current = FieldValue::Text {
                    text: replacement.clone(),
                };
            }
            Annotation::DocumentLink {
                reference,
                display_name,
                ..
            } => {
                current = FieldValue::Link {
                    reference: reference.clone(),
                    display_name: display_name.clone(),
                };
            }
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Annotation {
        Annotation::TextEntry {
            text: s.into(),
            author: "u1".into(),
            at: "2026-08-25T10:00:00Z".into(),
            machine_composed: false,
            late: None,
        }
    }

    #[test]
    fn empty_history_folds_to_empty() {
        assert_eq!(fold_value(&[]), FieldValue::Empty);
    }

    #[test]
    fn latest_entry_wins() {
        let h = [text("draft"), text("final")];
        assert_eq!(
            fold_value(&h),
            FieldValue::Text {
                text: "final".into()
            }
        );
    }

    #[test]
    fn correction_supersedes_but_history_remains() {
        let mut field = Field::new("f1", "Result", FieldKind::Text);
        field.annotations.push(text("Pss"));
        field.annotations.push(Annotation::Correction {
            original_index: 0,
            replacement: "Pass".into(),
            reason: "typo".into(),
            author: "u2".into(),
            at: "2026-08-25T11:00:00Z".into(),
        });
        assert_eq!(
            field.value(),
            FieldValue::Text {
                text: "Pass".into()
            }
        );
        // Original entry is untouched in history.
        assert_eq!(
            field.annotations[0],
            text("Pss"),
            "correction must not modify the original"
        );
    }

    #[test]
    fn quick_response_overwrites_by_append() {
        let h = [
            Annotation::QuickResponse {
                value: QuickResponseValue::Fail,
                author: "u1".into(),
                at: "2026-08-25T10:00:00Z".into(),
                late: None,
            },
            Annotation::QuickResponse {
                value: QuickResponseValue::Pass,
                author: "u1".into(),
                at: "2026-08-25T10:05:00Z".into(),
                late: None,
            },
        ];
        assert_eq!(
            fold_value(&h),
            FieldValue::Response {
                value: QuickResponseValue::Pass
            }
        );
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn checked_field_stays_checked() {
        let mut field = Field::new("f2", "Step done", FieldKind::Checkbox);
        field.annotations.push(Annotation::CheckboxMark {
            marker: 1,
            marker_label: "*1DS".into(),
            author: "u1".into(),
            at: "2026-08-25T10:00:00Z".into(),
            late: None,
        });
        assert!(field.is_checked());
        assert_eq!(
            field.value(),
            FieldValue::Checked {
                marker_label: "*1DS".into()
            }
        );
    }
}
