//! Concurrency tests: real `tokio::spawn` races against the commit path.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use signet_core::{
    Annotation, Capability, DocumentMutation, EngineError, Participant, SignatureRole, Stage,
};

use super::{seed_document, TestResult};
use crate::DocumentStore;

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "same_field_exactly_one_wins",
        same_field_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "disjoint_checkbox_marks_are_gapless",
        disjoint_checkbox_marks_are_gapless(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "same_checkbox_yields_a_single_marker",
        same_checkbox_yields_a_single_marker(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "distinct_roles_sign_in_any_order",
        distinct_roles_sign_in_any_order(factory).await,
    ));

    results
}

// ── Same field: exactly one wins ────────────────────────────────────────────

/// N tasks write the same text field from the same read version. Exactly
/// one commit lands; the rest get ConflictingVersion and would retry.
async fn same_field_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let read_version = seed_document(store.as_ref(), 0).await?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.commit_mutation(
                "doc-1",
                "owner",
                read_version,
                DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: format!("writer {i}"),
                    machine_composed: false,
                    late: None,
                },
            )
            .await
        }));
    }

    let mut winners = 0usize;
    let mut losers = 0usize;
    for handle in handles {
        match handle.await.map_err(|e| format!("task panic: {e}"))? {
            Ok(_) => winners += 1,
            Err(EngineError::ConflictingVersion { .. }) => losers += 1,
            Err(e) => return Err(format!("unexpected error: {e}")),
        }
    }
    if winners != 1 || losers != N - 1 {
        return Err(format!("expected 1 winner / {} losers, got {winners}/{losers}", N - 1));
    }
    Ok(())
}

// ── Marker allocation: gapless under races ──────────────────────────────────

/// N tasks from the same participant each check a distinct box, all holding
/// the same read version. Every commit succeeds (disjoint fields), and the
/// assigned markers are exactly 1..=N with no duplicates and no gaps.
async fn disjoint_checkbox_marks_are_gapless<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let read_version = seed_document(store.as_ref(), N).await?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.commit_mutation(
                "doc-1",
                "owner",
                read_version,
                DocumentMutation::CheckBox {
                    field_id: format!("cb{i}"),
                    late: None,
                },
            )
            .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("check failed: {e}"))?;
    }

    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let mut markers = BTreeSet::new();
    for i in 0..N {
        let field = doc
            .field(&format!("cb{i}"))
            .ok_or_else(|| format!("cb{i} missing"))?;
        for a in &field.annotations {
            if let Annotation::CheckboxMark { marker, .. } = a {
                if !markers.insert(*marker) {
                    return Err(format!("duplicate marker {marker}"));
                }
            }
        }
    }
    let expected: BTreeSet<u32> = (1..=N as u32).collect();
    if markers != expected {
        return Err(format!("markers not consecutive: {markers:?}"));
    }
    Ok(())
}

/// N tasks race to check the same box. The box ends up checked with exactly
/// one marker; later clicks are no-ops, never errors, never unchecks.
async fn same_checkbox_yields_a_single_marker<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let read_version = seed_document(store.as_ref(), 1).await?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.commit_mutation(
                "doc-1",
                "owner",
                read_version,
                DocumentMutation::CheckBox {
                    field_id: "cb0".into(),
                    late: None,
                },
            )
            .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("click errored: {e}"))?;
    }

    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let field = doc.field("cb0").ok_or("cb0 missing")?;
    if !field.is_checked() {
        return Err("box not checked".into());
    }
    let marks = field
        .annotations
        .iter()
        .filter(|a| matches!(a, Annotation::CheckboxMark { .. }))
        .count();
    if marks != 1 {
        return Err(format!("expected exactly one mark, got {marks}"));
    }
    Ok(())
}

// ── Parallel signing ────────────────────────────────────────────────────────

/// Three participants, three roles, all signing from the same read version
/// concurrently. All succeed; there is no enforced order among roles.
async fn distinct_roles_sign_in_any_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    seed_document(store.as_ref(), 0).await?;

    // Roster changes are still allowed in Execution; add the three signers.
    let signers = [
        ("perf", "Pat Perf", "PP", Capability::Signer, SignatureRole::PerformedBy),
        ("ver", "Val Ver", "VV", Capability::Verifier, SignatureRole::VerifiedBy),
        ("exec", "Eve Exec", "EE", Capability::Executor, SignatureRole::Executor),
    ];
    for (user_id, name, initials, capability, _) in &signers {
        let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
        store
            .commit_mutation(
                "doc-1",
                "owner",
                doc.version,
                DocumentMutation::AddParticipant {
                    participant: Participant::new(*user_id, *name, *initials, [*capability]),
                },
            )
            .await
            .map_err(|e| format!("add {user_id}: {e}"))?;
    }

    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let read_version = doc.version;

    let mut handles = Vec::new();
    for (user_id, _, _, _, role) in signers {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.commit_mutation(
                "doc-1",
                user_id,
                read_version,
                DocumentMutation::Sign {
                    role,
                    signature_b64: None,
                    verifying_key_b64: None,
                },
            )
            .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("sign failed: {e}"))?;
    }

    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if doc.signatures.len() != 3 || !doc.fully_executed() {
        return Err(format!(
            "expected 3 signatures and fully executed, got {} / {}",
            doc.signatures.len(),
            doc.fully_executed()
        ));
    }
    if doc.stage != Stage::Execution {
        return Err("stage moved unexpectedly".into());
    }
    Ok(())
}
