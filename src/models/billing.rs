use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Charged per class when the student has no configured hourly rate.
pub const DEFAULT_HOURLY_RATE: f64 = 30.0;

/// One class row joined with its student — the aggregator's input shape.
/// Rows with no surviving student never reach it (inner join).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BilledClass {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub paid: bool,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: Option<String>,
    pub subject: Option<String>,
    pub hourly_rate: Option<f64>,
}

/// One line of an invoice / billing table.
#[derive(Debug, Clone, Serialize)]
pub struct BillingLine {
    pub class_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub amount: f64,
}

/// Derived, never persisted: a student's classes sharing one payment status.
/// Grouped by student id — two students sharing a display name stay apart.
#[derive(Debug, Clone, Serialize)]
pub struct BillingGroup {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: Option<String>,
    pub subject: Option<String>,
    /// Effective per-class rate (fallback already applied).
    pub hourly_rate: f64,
    pub classes: Vec<BillingLine>,
    pub total_amount: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct BillingSummary {
    pub pending: Vec<BillingGroup>,
    pub history: Vec<BillingGroup>,
}

/// Body for POST /billing/mark-unpaid — exactly the ids of one materialized
/// history group, never "all paid classes of the student".
#[derive(Debug, Deserialize)]
pub struct MarkUnpaidRequest {
    pub class_ids: Vec<Uuid>,
}

/// Query params for the invoice endpoints.
#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    /// "pending" (default) or "paid".
    pub status: Option<String>,
}
