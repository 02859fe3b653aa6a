//! In-memory reference backend.
//!
//! One mutex guards all state, which trivially gives the atomicity the
//! trait demands: `Document::commit` runs on a clone, the audit event is
//! built, and only when both succeeded does the clone replace the stored
//! document and the event land in the log. An injected audit failure (test
//! hook) leaves the stored state untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use signet_core::{AuditEvent, CommitOutcome, Document, DocumentMutation, EngineError};

use crate::traits::{Committed, DocumentChanged, DocumentStore};

/// Broadcast buffer size. Slow subscribers that lag past this see
/// `RecvError::Lagged` and should refetch.
const CHANGE_BUFFER: usize = 256;

struct Entry {
    document: Document,
    audit: Vec<AuditEvent>,
}

/// In-memory `DocumentStore`.
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
    changes: broadcast::Sender<DocumentChanged>,
    /// Test hook: when set, the next audit append fails and the commit
    /// must roll back whole.
    fail_next_audit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        MemoryStore {
            inner: Mutex::new(HashMap::new()),
            changes,
            fail_next_audit: AtomicBool::new(false),
        }
    }

    /// Make the next audit append fail, exercising the Fatal rollback path.
    pub fn inject_audit_failure(&self) {
        self.fail_next_audit.store(true, Ordering::SeqCst);
    }

    fn now_rfc3339() -> String {
        let now = time::OffsetDateTime::now_utc();
        now.format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(&self, document: Document) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.contains_key(&document.document_id) {
            return Err(EngineError::ValidationError(format!(
                "document '{}' already exists",
                document.document_id
            )));
        }
        inner.insert(
            document.document_id.clone(),
            Entry {
                document,
                audit: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Document, EngineError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(document_id)
            .map(|e| e.document.clone())
            .ok_or_else(|| EngineError::NotFound(format!("document '{}'", document_id)))
    }

    async fn commit_mutation(
        &self,
        document_id: &str,
        actor: &str,
        read_version: u64,
        mutation: DocumentMutation,
    ) -> Result<Committed, EngineError> {
        let at = Self::now_rfc3339();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = inner
            .get_mut(document_id)
            .ok_or_else(|| EngineError::NotFound(format!("document '{}'", document_id)))?;

        // Commit onto a clone; the stored document stays untouched until
        // both the mutation and the audit append are known good.
        let mut staged = entry.document.clone();
        let outcome = staged.commit(&mutation, actor, &at, read_version)?;

        match outcome {
            CommitOutcome::NoOp => Ok(Committed {
                outcome,
                document: entry.document.clone(),
                event: None,
            }),
            CommitOutcome::Applied {
                operation,
                version_before,
                version_after,
            } => {
                let event = AuditEvent::next(
                    entry.audit.last(),
                    document_id,
                    version_before,
                    version_after,
                    operation,
                    actor,
                    &at,
                );

                if self.fail_next_audit.swap(false, Ordering::SeqCst) {
                    // Audit durability failure: roll back whole by dropping
                    // the staged clone.
                    return Err(EngineError::Fatal(format!(
                        "audit append failed for document '{}' at seq {}",
                        document_id, event.seq
                    )));
                }

                let audit_seq = event.seq;
                entry.document = staged;
                entry.audit.push(event.clone());
                let committed = Committed {
                    outcome,
                    document: entry.document.clone(),
                    event: Some(event),
                };
                // Publish after the commit is in place; a send error just
                // means nobody is listening.
                let _ = self.changes.send(DocumentChanged {
                    document_id: document_id.to_string(),
                    version: version_after,
                    audit_seq,
                });
                Ok(committed)
            }
        }
    }

    async fn audit_log(&self, document_id: &str) -> Result<Vec<AuditEvent>, EngineError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(document_id)
            .map(|e| e.audit.clone())
            .ok_or_else(|| EngineError::NotFound(format!("document '{}'", document_id)))
    }

    async fn list_documents(&self) -> Result<Vec<String>, EngineError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = inner.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChanged> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::{
        Capability, FieldKind, Participant, SignaturePolicy, Stage,
    };

    fn owner() -> Participant {
        Participant::new(
            "owner",
            "Avery Owner",
            "AO",
            [Capability::Owner, Capability::Executor],
        )
    }

    async fn store_with_doc() -> MemoryStore {
        let store = MemoryStore::new();
        let doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        store.create_document(doc).await.unwrap();
        for (id, label, kind) in [
            ("f1", "Result", FieldKind::Text),
            ("cb1", "Step done", FieldKind::Checkbox),
        ] {
            let doc = store.get_document("doc-1").await.unwrap();
            store
                .commit_mutation(
                    "doc-1",
                    "owner",
                    doc.version,
                    DocumentMutation::AddField {
                        field_id: id.into(),
                        label: label.into(),
                        kind,
                    },
                )
                .await
                .unwrap();
        }
        let doc = store.get_document("doc-1").await.unwrap();
        store
            .commit_mutation(
                "doc-1",
                "owner",
                doc.version,
                DocumentMutation::AdvanceStage {
                    target: Stage::Execution,
                },
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        let doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner());
        store.create_document(doc.clone()).await.unwrap();
        assert!(matches!(
            store.create_document(doc).await,
            Err(EngineError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn commit_appends_audit_and_publishes() {
        let store = store_with_doc().await;
        let mut rx = store.subscribe();
        let doc = store.get_document("doc-1").await.unwrap();
        let committed = store
            .commit_mutation(
                "doc-1",
                "owner",
                doc.version,
                DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "hello".into(),
                    machine_composed: false,
                    late: None,
                },
            )
            .await
            .unwrap();
        let event = committed.event.expect("audit event");
        assert_eq!(event.version_after, committed.document.version);

        let changed = rx.recv().await.unwrap();
        assert_eq!(changed.document_id, "doc-1");
        assert_eq!(changed.version, committed.document.version);

        let audit = store.audit_log("doc-1").await.unwrap();
        assert_eq!(signet_core::verify_chain(&audit), Ok(()));
    }

    #[tokio::test]
    async fn injected_audit_failure_rolls_back() {
        let store = store_with_doc().await;
        let before = store.get_document("doc-1").await.unwrap();
        let audit_before = store.audit_log("doc-1").await.unwrap().len();

        store.inject_audit_failure();
        let err = store
            .commit_mutation(
                "doc-1",
                "owner",
                before.version,
                DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "lost".into(),
                    machine_composed: false,
                    late: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Fatal(_)));

        // No partial state: version, field, and audit log all unchanged.
        let after = store.get_document("doc-1").await.unwrap();
        assert_eq!(after, before);
        assert_eq!(store.audit_log("doc-1").await.unwrap().len(), audit_before);

        // The failure is one-shot; the retried commit lands.
        store
            .commit_mutation(
                "doc-1",
                "owner",
                after.version,
                DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: "retried".into(),
                    machine_composed: false,
                    late: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recheck_noop_writes_no_audit_event() {
        let store = store_with_doc().await;
        let doc = store.get_document("doc-1").await.unwrap();
        let check = DocumentMutation::CheckBox {
            field_id: "cb1".into(),
            late: None,
        };
        store
            .commit_mutation("doc-1", "owner", doc.version, check.clone())
            .await
            .unwrap();
        let audit_len = store.audit_log("doc-1").await.unwrap().len();
        let doc = store.get_document("doc-1").await.unwrap();

        let committed = store
            .commit_mutation("doc-1", "owner", doc.version, check)
            .await
            .unwrap();
        assert_eq!(committed.outcome, CommitOutcome::NoOp);
        assert!(committed.event.is_none());
        assert_eq!(store.audit_log("doc-1").await.unwrap().len(), audit_len);
        assert_eq!(committed.document.version, doc.version);
    }
}
