//! HTTP route handlers: health, document CRUD, operations, audit, changes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use time::macros::format_description;
use time::{Date, Time};

use signet_core::{
    Capability, CommitOutcome, EngineError, FieldKind, Participant, QuickResponseValue,
    SignaturePolicy, SignatureRole, Stage,
};
use signet_engine::LateClaim;
use signet_storage::{Committed, DocumentStore};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Map an engine error to an HTTP response. `ConflictingVersion` is
/// flagged retryable so clients know to refetch and resubmit.
fn error_response(e: &EngineError) -> Response {
    let status = match e {
        EngineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        EngineError::InvalidStageTransition { .. } => StatusCode::CONFLICT,
        EngineError::ConflictingVersion { .. } => StatusCode::CONFLICT,
        EngineError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({
        "error": e.to_string(),
        "retryable": e.is_retryable(),
    });
    (status, Json(body)).into_response()
}

fn committed_response(committed: &Committed) -> Response {
    let body = match &committed.outcome {
        CommitOutcome::Applied {
            operation,
            version_before,
            version_after,
        } => serde_json::json!({
            "outcome": "applied",
            "operation": operation.as_str(),
            "version_before": version_before,
            "version_after": version_after,
            "audit_seq": committed.event.as_ref().map(|e| e.seq),
            "entry_hash": committed.event.as_ref().map(|e| e.entry_hash.clone()),
        }),
        CommitOutcome::NoOp => serde_json::json!({
            "outcome": "no_op",
            "version": committed.document.version,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ── Document lifecycle ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct CreateDocumentRequest {
    document_id: String,
    /// Fixed UTC offset of the site the document belongs to, in minutes.
    #[serde(default)]
    utc_offset_minutes: i32,
    #[serde(default)]
    policy: Option<SignaturePolicy>,
    owner: Participant,
}

/// POST /documents
pub(crate) async fn handle_create_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentRequest>,
) -> Response {
    let policy = req.policy.unwrap_or_default();
    match state
        .engine
        .create_document(&req.document_id, req.utc_offset_minutes, policy, req.owner)
        .await
    {
        Ok(doc) => {
            let body = serde_json::json!({
                "document_id": doc.document_id,
                "stage": doc.stage,
                "version": doc.version,
            });
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /documents
pub(crate) async fn handle_list_documents(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.list_documents().await {
        Ok(ids) => {
            let body = serde_json::json!({ "documents": ids });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /documents/{id} -- the folded read view.
pub(crate) async fn handle_get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.get_view(&id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /documents/{id}/audit -- the full audit log plus chain verification.
pub(crate) async fn handle_get_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let events = match state.engine.audit_log(&id).await {
        Ok(events) => events,
        Err(e) => return error_response(&e),
    };
    let verified = state.engine.verify_audit(&id).await.is_ok();
    let body = serde_json::json!({ "events": events, "verified": verified });
    (StatusCode::OK, Json(body)).into_response()
}

// ── Change feed ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct ChangesQuery {
    /// Return as soon as the document version exceeds this. Defaults to 0,
    /// which returns immediately for any existing document.
    #[serde(default)]
    since: u64,
    /// Long-poll timeout in seconds, capped at 60. Default 30.
    timeout_secs: Option<u64>,
}

/// GET /documents/{id}/changes?since=N -- long-poll for the next commit.
pub(crate) async fn handle_changes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ChangesQuery>,
) -> Response {
    // Subscribe before the version check so a commit racing with the check
    // is not missed.
    let mut rx = state.engine.subscribe();

    let doc = match state.engine.get_document(&id).await {
        Ok(doc) => doc,
        Err(e) => return error_response(&e),
    };
    if doc.version > q.since {
        let body = serde_json::json!({
            "changed": true,
            "document_id": id,
            "version": doc.version,
        });
        return (StatusCode::OK, Json(body)).into_response();
    }

    let timeout = Duration::from_secs(q.timeout_secs.unwrap_or(30).min(60));
    let waited = tokio::time::timeout(timeout, async {
        loop {
            match rx.recv().await {
                Ok(change) if change.document_id == id && change.version > q.since => {
                    return Some(change)
                }
                Ok(_) => continue,
                // A lagged receiver may have dropped the event it was
                // waiting for; fall back to a fresh read.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => return None,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;

    match waited {
        Ok(Some(change)) => {
            let body = serde_json::json!({
                "changed": true,
                "document_id": change.document_id,
                "version": change.version,
                "audit_seq": change.audit_seq,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        _ => {
            let current = state
                .engine
                .get_document(&id)
                .await
                .map(|d| d.version)
                .unwrap_or(doc.version);
            let body = serde_json::json!({
                "changed": current > q.since,
                "document_id": id,
                "version": current,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
    }
}

// ── Operations ──────────────────────────────────────────────────────────────

/// A backdated effective time in the request body. The date and time are
/// interpreted in the document's timezone.
#[derive(Deserialize)]
pub(crate) struct LateClaimBody {
    /// "YYYY-MM-DD"
    date: String,
    /// "HH:MM"
    time: String,
    reason: String,
}

impl LateClaimBody {
    fn into_claim(self) -> Result<LateClaim, EngineError> {
        let date_format = format_description!("[year]-[month]-[day]");
        let time_format = format_description!("[hour]:[minute]");
        let claimed_date = Date::parse(&self.date, &date_format).map_err(|_| {
            EngineError::ValidationError(format!("invalid late-entry date '{}'", self.date))
        })?;
        let claimed_time = Time::parse(&self.time, &time_format).map_err(|_| {
            EngineError::ValidationError(format!("invalid late-entry time '{}'", self.time))
        })?;
        Ok(LateClaim {
            claimed_date,
            claimed_time,
            reason: self.reason,
        })
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum OperationBody {
    AddField {
        field_id: String,
        label: String,
        kind: FieldKind,
    },
    AddParticipant {
        participant: Participant,
    },
    GrantCapability {
        user_id: String,
        capability: Capability,
    },
    RevokeCapability {
        user_id: String,
        capability: Capability,
    },
    DeactivateParticipant {
        user_id: String,
    },
    EnterText {
        field_id: String,
        text: String,
        late: Option<LateClaimBody>,
    },
    QuickEntryInitials {
        field_id: String,
    },
    QuickResponse {
        field_id: String,
        value: QuickResponseValue,
        late: Option<LateClaimBody>,
    },
    CheckBox {
        field_id: String,
        late: Option<LateClaimBody>,
    },
    Correct {
        field_id: String,
        original_index: usize,
        replacement: String,
        reason: String,
    },
    LinkDocument {
        field_id: String,
        reference: String,
    },
    Sign {
        role: SignatureRole,
        /// Base64 Ed25519 signature produced by the caller's signing key,
        /// covering the standard signing payload.
        signature_b64: Option<String>,
        verifying_key_b64: Option<String>,
    },
    AdvanceStage {
        target: Stage,
    },
    RollbackStage {
        target: Stage,
    },
}

#[derive(Deserialize)]
pub(crate) struct OperationRequest {
    actor: String,
    /// The document version the caller read before building this request.
    read_version: u64,
    #[serde(flatten)]
    operation: OperationBody,
}

/// POST /documents/{id}/operations -- commit one mutation.
pub(crate) async fn handle_operation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OperationRequest>,
) -> Response {
    let engine = &state.engine;
    let actor = req.actor.as_str();
    let v = req.read_version;

    let result = match req.operation {
        OperationBody::AddField {
            field_id,
            label,
            kind,
        } => engine.add_field(&id, actor, v, &field_id, &label, kind).await,
        OperationBody::AddParticipant { participant } => {
            engine.add_participant(&id, actor, v, participant).await
        }
        OperationBody::GrantCapability {
            user_id,
            capability,
        } => engine.grant_capability(&id, actor, v, &user_id, capability).await,
        OperationBody::RevokeCapability {
            user_id,
            capability,
        } => {
            engine
                .revoke_capability(&id, actor, v, &user_id, capability)
                .await
        }
        OperationBody::DeactivateParticipant { user_id } => {
            engine.deactivate_participant(&id, actor, v, &user_id).await
        }
        OperationBody::EnterText {
            field_id,
            text,
            late,
        } => match late.map(LateClaimBody::into_claim).transpose() {
            Ok(late) => engine.enter_text(&id, actor, v, &field_id, &text, late).await,
            Err(e) => Err(e),
        },
        OperationBody::QuickEntryInitials { field_id } => {
            engine.quick_entry_initials(&id, actor, v, &field_id).await
        }
        OperationBody::QuickResponse {
            field_id,
            value,
            late,
        } => match late.map(LateClaimBody::into_claim).transpose() {
            Ok(late) => {
                engine
                    .quick_response(&id, actor, v, &field_id, value, late)
                    .await
            }
            Err(e) => Err(e),
        },
        OperationBody::CheckBox { field_id, late } => {
            match late.map(LateClaimBody::into_claim).transpose() {
                Ok(late) => engine.check_box(&id, actor, v, &field_id, late).await,
                Err(e) => Err(e),
            }
        }
        OperationBody::Correct {
            field_id,
            original_index,
            replacement,
            reason,
        } => {
            engine
                .correct(&id, actor, v, &field_id, original_index, &replacement, &reason)
                .await
        }
        OperationBody::LinkDocument {
            field_id,
            reference,
        } => engine.link_document(&id, actor, v, &field_id, &reference).await,
        OperationBody::Sign {
            role,
            signature_b64,
            verifying_key_b64,
        } => {
            // A caller-supplied signature goes straight into the record;
            // the server never holds client signing keys.
            engine
                .store()
                .commit_mutation(
                    &id,
                    actor,
                    v,
                    signet_core::DocumentMutation::Sign {
                        role,
                        signature_b64,
                        verifying_key_b64,
                    },
                )
                .await
        }
        OperationBody::AdvanceStage { target } => {
            engine.advance_stage(&id, actor, v, target).await
        }
        OperationBody::RollbackStage { target } => {
            engine.rollback_stage(&id, actor, v, target).await
        }
    };

    match result {
        Ok(committed) => committed_response(&committed),
        Err(e) => error_response(&e),
    }
}
