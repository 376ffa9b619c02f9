use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        billing::{BillingGroup, InvoiceQuery, MarkUnpaidRequest},
        user::UserProfile,
    },
    routes::require_teacher,
    services::{
        auth::AuthService,
        billing::{self, BillingService},
        invoice::InvoiceService,
        metrics::INVOICES_COUNTER,
    },
    AppState,
};

/// GET /billing/summary — the pending and history tables in one snapshot.
pub async fn summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let rows = BillingService::billed_classes(&state.db, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    let summary = billing::aggregate(&rows);
    Ok(Json(serde_json::to_value(summary).unwrap()))
}

/// POST /billing/students/{id}/mark-paid — settles every outstanding class
/// for the student; calling it again on a settled student is a no-op.
pub async fn mark_paid(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    BillingService::mark_student_paid(&state.db, user.user_id, student_id)
        .await
        .map(|updated| Json(json!({ "updated": updated })))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /billing/mark-unpaid — reopens exactly the ids of one history group.
pub async fn mark_unpaid(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<MarkUnpaidRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if body.class_ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No classes selected" })),
        ));
    }

    BillingService::mark_classes_unpaid(&state.db, user.user_id, &body.class_ids)
        .await
        .map(|updated| Json(json!({ "updated": updated })))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// The invoice endpoints work on one materialized group: this student's
/// classes with the requested payment status.
async fn load_group(
    state: &AppState,
    teacher_id: Uuid,
    student_id: Uuid,
    status: Option<&str>,
) -> Result<(BillingGroup, UserProfile), (StatusCode, Json<Value>)> {
    let rows = BillingService::billed_classes_for_student(&state.db, teacher_id, student_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    let summary = billing::aggregate(&rows);
    let groups = match status.unwrap_or("pending") {
        "paid" => summary.history,
        _ => summary.pending,
    };
    let group = groups.into_iter().next().ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Nothing to invoice for this student" })),
    ))?;

    let teacher = AuthService::me(&state.db, teacher_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Profile not found" })),
        ))?;

    Ok((group, teacher))
}

/// GET /billing/students/{id}/invoice?status=pending|paid — PDF download.
pub async fn download_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Query(params): Query<InvoiceQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let (group, teacher) =
        load_group(&state, user.user_id, student_id, params.status.as_deref()).await?;

    let issued_on = Utc::now().date_naive();
    let teacher_name = format!("{} {}", teacher.first_name, teacher.last_name);
    let number = InvoiceService::invoice_number(&group, issued_on);
    let pdf = InvoiceService::render_pdf(&group, &teacher_name, &teacher.email, issued_on);

    INVOICES_COUNTER.with_label_values(&["download"]).inc();

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{number}.pdf\""),
            ),
        ],
        pdf,
    ))
}

/// POST /billing/students/{id}/invoice/send — email the same document.
pub async fn send_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Query(params): Query<InvoiceQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let Some(email_svc) = state.email.as_deref() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Email service is not configured" })),
        ));
    };

    let (group, teacher) =
        load_group(&state, user.user_id, student_id, params.status.as_deref()).await?;

    let Some(recipient) = group.student_email.clone() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "This student has no email address on file" })),
        ));
    };

    let issued_on = Utc::now().date_naive();
    let teacher_name = format!("{} {}", teacher.first_name, teacher.last_name);
    let number = InvoiceService::invoice_number(&group, issued_on);
    let pdf = InvoiceService::render_pdf(&group, &teacher_name, &teacher.email, issued_on);

    email_svc
        .send_invoice(
            &recipient,
            &group.student_name,
            &teacher_name,
            &number,
            group.total_amount,
            pdf,
        )
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    INVOICES_COUNTER.with_label_values(&["email"]).inc();

    Ok(Json(json!({ "message": format!("Invoice {number} sent to {recipient}") })))
}
