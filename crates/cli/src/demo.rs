//! `signet demo` -- run a complete document lifecycle in memory.
//!
//! Walks one document from Setup through Complete: field layout, roster,
//! annotations, a correction, all three signature roles (one of them
//! countersigned), and prints the final view plus the audit verification.

use std::sync::Arc;

use signet_core::{Capability, FieldKind, Participant, QuickResponseValue, SignatureRole, Stage};
use signet_engine::{verify_countersignature, Countersigner, DocumentEngine, StaticDirectory};
use signet_storage::MemoryStore;

pub async fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let directory = StaticDirectory::new().with_entry("SOP-042", "Cleaning SOP");
    let engine = DocumentEngine::new(Arc::new(MemoryStore::new()), Arc::new(directory));

    let doc = engine
        .create_document(
            "demo-batch-42",
            0,
            Default::default(),
            Participant::new("alice", "Alice Ogawa", "AO", [Capability::Owner]),
        )
        .await?;
    let mut v = doc.version;
    println!("Created document '{}' at stage {}", doc.document_id, doc.stage);

    // Field layout and roster, during Setup.
    v = engine
        .add_field("demo-batch-42", "alice", v, "f1", "Result", FieldKind::Text)
        .await?
        .document
        .version;
    v = engine
        .add_field(
            "demo-batch-42",
            "alice",
            v,
            "f2",
            "Performed by",
            FieldKind::Text,
        )
        .await?
        .document
        .version;
    v = engine
        .add_field(
            "demo-batch-42",
            "alice",
            v,
            "cb1",
            "Step complete",
            FieldKind::Checkbox,
        )
        .await?
        .document
        .version;
    v = engine
        .add_field(
            "demo-batch-42",
            "alice",
            v,
            "qr1",
            "Outcome",
            FieldKind::QuickResponse,
        )
        .await?
        .document
        .version;
    v = engine
        .add_field(
            "demo-batch-42",
            "alice",
            v,
            "l1",
            "Reference procedure",
            FieldKind::Link,
        )
        .await?
        .document
        .version;

    for participant in [
        Participant::new("dana", "Dana Smith", "DS", [Capability::Executor]),
        Participant::new("vic", "Vic Tran", "VT", [Capability::Verifier]),
        Participant::new("paul", "Paul Reyes", "PR", [Capability::Signer]),
    ] {
        v = engine
            .add_participant("demo-batch-42", "alice", v, participant)
            .await?
            .document
            .version;
    }

    v = engine
        .advance_stage("demo-batch-42", "alice", v, Stage::Execution)
        .await?
        .document
        .version;
    println!("Advanced to execution");

    // Execution: annotations.
    v = engine
        .enter_text(
            "demo-batch-42",
            "dana",
            v,
            "f1",
            "Batch 42 within limits",
            None,
        )
        .await?
        .document
        .version;
    v = engine
        .quick_entry_initials("demo-batch-42", "dana", v, "f2")
        .await?
        .document
        .version;
    v = engine
        .check_box("demo-batch-42", "dana", v, "cb1", None)
        .await?
        .document
        .version;
    v = engine
        .quick_response(
            "demo-batch-42",
            "dana",
            v,
            "qr1",
            QuickResponseValue::Pass,
            None,
        )
        .await?
        .document
        .version;
    v = engine
        .link_document("demo-batch-42", "dana", v, "l1", "SOP-042")
        .await?
        .document
        .version;

    // A verifier corrects the result text; the original stays in history.
    v = engine
        .correct(
            "demo-batch-42",
            "vic",
            v,
            "f1",
            0,
            "Batch 42 within limits (verified)",
            "added verification note",
        )
        .await?
        .document
        .version;

    // Signature protocol: three roles, any order. The performed-by
    // signature carries an Ed25519 countersignature.
    let countersigner = Countersigner::generate();
    v = engine
        .sign("demo-batch-42", "dana", v, SignatureRole::Executor, None)
        .await?
        .document
        .version;
    v = engine
        .sign("demo-batch-42", "vic", v, SignatureRole::VerifiedBy, None)
        .await?
        .document
        .version;
    v = engine
        .sign(
            "demo-batch-42",
            "paul",
            v,
            SignatureRole::PerformedBy,
            Some(&countersigner),
        )
        .await?
        .document
        .version;

    let doc = engine.get_document("demo-batch-42").await?;
    let performed = doc
        .signatures
        .iter()
        .find(|s| s.role == SignatureRole::PerformedBy)
        .ok_or("missing performed-by signature")?;
    let countersig_ok = verify_countersignature("demo-batch-42", performed)?;
    println!(
        "Fully executed: {} (countersignature valid: {})",
        doc.fully_executed(),
        countersig_ok
    );

    v = engine
        .advance_stage("demo-batch-42", "alice", v, Stage::Review)
        .await?
        .document
        .version;
    engine
        .advance_stage("demo-batch-42", "alice", v, Stage::Complete)
        .await?;
    println!("Advanced to complete");

    engine.verify_audit("demo-batch-42").await?;
    let audit = engine.audit_log("demo-batch-42").await?;
    println!("Audit chain verified: {} events", audit.len());

    let view = engine.get_view("demo-batch-42").await?;
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
