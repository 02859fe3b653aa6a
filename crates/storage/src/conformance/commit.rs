//! Commit atomicity and audit discipline tests.

use std::future::Future;

use signet_core::{verify_chain, CommitOutcome, DocumentMutation, EngineError};

use super::{seed_document, TestResult};
use crate::DocumentStore;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "commit",
        "every_commit_appends_one_chained_audit_event",
        every_commit_appends_one_chained_audit_event(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "stale_same_field_write_conflicts",
        stale_same_field_write_conflicts(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "stale_disjoint_field_write_is_accepted",
        stale_disjoint_field_write_is_accepted(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "recheck_is_noop_without_audit_event",
        recheck_is_noop_without_audit_event(factory).await,
    ));

    results
}

async fn every_commit_appends_one_chained_audit_event<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed_document(&store, 0).await?;

    for i in 0..3 {
        let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
        store
            .commit_mutation(
                "doc-1",
                "owner",
                doc.version,
                DocumentMutation::EnterText {
                    field_id: "f1".into(),
                    text: format!("entry {i}"),
                    machine_composed: false,
                    late: None,
                },
            )
            .await
            .map_err(|e| format!("commit {i}: {e}"))?;
    }

    let audit = store.audit_log("doc-1").await.map_err(|e| e.to_string())?;
    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    if audit.len() as u64 != doc.version {
        return Err(format!(
            "expected one audit event per commit: {} events, version {}",
            audit.len(),
            doc.version
        ));
    }
    verify_chain(&audit).map_err(|i| format!("audit chain broken at seq {i}"))
}

async fn stale_same_field_write_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let read_version = seed_document(&store, 0).await?;

    let entry = |text: &str| DocumentMutation::EnterText {
        field_id: "f1".into(),
        text: text.into(),
        machine_composed: false,
        late: None,
    };
    store
        .commit_mutation("doc-1", "owner", read_version, entry("first"))
        .await
        .map_err(|e| format!("first: {e}"))?;

    match store
        .commit_mutation("doc-1", "owner", read_version, entry("second"))
        .await
    {
        Err(EngineError::ConflictingVersion { .. }) => Ok(()),
        Ok(_) => Err("stale same-field write was accepted".into()),
        Err(e) => Err(format!("unexpected error: {e}")),
    }
}

async fn stale_disjoint_field_write_is_accepted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let read_version = seed_document(&store, 0).await?;

    store
        .commit_mutation(
            "doc-1",
            "owner",
            read_version,
            DocumentMutation::EnterText {
                field_id: "f1".into(),
                text: "session A".into(),
                machine_composed: false,
                late: None,
            },
        )
        .await
        .map_err(|e| format!("f1: {e}"))?;

    store
        .commit_mutation(
            "doc-1",
            "owner",
            read_version,
            DocumentMutation::EnterText {
                field_id: "f2".into(),
                text: "session B".into(),
                machine_composed: false,
                late: None,
            },
        )
        .await
        .map_err(|e| format!("disjoint f2 write rejected: {e}"))?;
    Ok(())
}

async fn recheck_is_noop_without_audit_event<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed_document(&store, 1).await?;

    let check = DocumentMutation::CheckBox {
        field_id: "cb0".into(),
        late: None,
    };
    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    store
        .commit_mutation("doc-1", "owner", doc.version, check.clone())
        .await
        .map_err(|e| format!("first check: {e}"))?;
    let audit_len = store.audit_log("doc-1").await.map_err(|e| e.to_string())?.len();

    let doc = store.get_document("doc-1").await.map_err(|e| e.to_string())?;
    let committed = store
        .commit_mutation("doc-1", "owner", doc.version, check)
        .await
        .map_err(|e| format!("recheck: {e}"))?;
    if committed.outcome != CommitOutcome::NoOp || committed.event.is_some() {
        return Err("recheck was not a no-op".into());
    }
    let after = store.audit_log("doc-1").await.map_err(|e| e.to_string())?.len();
    if after != audit_len {
        return Err(format!("no-op wrote an audit event ({audit_len} -> {after})"));
    }
    if !committed
        .document
        .field("cb0")
        .map(|f| f.is_checked())
        .unwrap_or(false)
    {
        return Err("box no longer reads checked".into());
    }
    Ok(())
}
