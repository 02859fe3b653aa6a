//! Conformance test suite for `DocumentStore` implementations.
//!
//! Backend-agnostic tests any `DocumentStore` can run to verify the
//! contract the engine relies on:
//!
//! - **Commit atomicity**: mutation + version bump + audit append are one
//!   unit; an audit failure leaves no partial state
//! - **Audit discipline**: hash chain intact, one event per committed
//!   mutation, none for no-ops
//! - **Concurrency**: per-slot OCC (same slot: exactly one wins; disjoint
//!   slots: all win), gapless marker allocation under races, order-free
//!   parallel signing
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! let report = run_conformance_suite(|| async { MyStore::connect().await }).await;
//! assert_eq!(report.failed, 0, "{report}");
//! ```

mod commit;
mod concurrent;

use std::fmt;
use std::future::Future;

use signet_core::{
    Capability, Document, DocumentMutation, FieldKind, Participant, SignaturePolicy, Stage,
};

use crate::DocumentStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category ("commit", "concurrent").
    pub category: String,
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: true,
                message: None,
            },
            Err(msg) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: false,
                message: Some(msg),
            },
        }
    }
}

/// Aggregated report from a full suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// The `factory` is called once per test to create a fresh, empty store,
/// ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: a seeded document in Execution ─────────────────────────────────

/// Owner who can also fill fields, plus enough fields to race over.
async fn seed_document<S: DocumentStore>(store: &S, checkbox_fields: usize) -> Result<u64, String> {
    let owner = Participant::new(
        "owner",
        "Avery Owner",
        "AO",
        [
            Capability::Owner,
            Capability::Executor,
            Capability::Signer,
            Capability::Verifier,
        ],
    );
    let doc = Document::new("doc-1", 0, SignaturePolicy::default(), owner);
    store
        .create_document(doc)
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut fields: Vec<(String, FieldKind)> = vec![
        ("f1".to_string(), FieldKind::Text),
        ("f2".to_string(), FieldKind::Text),
    ];
    for i in 0..checkbox_fields {
        fields.push((format!("cb{i}"), FieldKind::Checkbox));
    }
    for (field_id, kind) in fields {
        let doc = store
            .get_document("doc-1")
            .await
            .map_err(|e| format!("get: {e}"))?;
        store
            .commit_mutation(
                "doc-1",
                "owner",
                doc.version,
                DocumentMutation::AddField {
                    field_id: field_id.clone(),
                    label: field_id,
                    kind,
                },
            )
            .await
            .map_err(|e| format!("add field: {e}"))?;
    }

    let doc = store
        .get_document("doc-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    let committed = store
        .commit_mutation(
            "doc-1",
            "owner",
            doc.version,
            DocumentMutation::AdvanceStage {
                target: Stage::Execution,
            },
        )
        .await
        .map_err(|e| format!("advance: {e}"))?;
    Ok(committed.document.version)
}
