use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::billing::{
    BilledClass, BillingGroup, BillingLine, BillingSummary, DEFAULT_HOURLY_RATE,
};

/// Partitions class rows into per-student pending/history groups and sums one
/// effective-rate charge per class. Pure over its input: the caller fetches a
/// snapshot, this never touches the store.
///
/// Groups are keyed by student id — two students who happen to share a
/// display name never merge — and emitted sorted by name for rendering.
pub fn aggregate(rows: &[BilledClass]) -> BillingSummary {
    let mut pending: Vec<BillingGroup> = Vec::new();
    let mut history: Vec<BillingGroup> = Vec::new();
    let mut pending_index: HashMap<Uuid, usize> = HashMap::new();
    let mut history_index: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let (groups, index) = if row.paid {
            (&mut history, &mut history_index)
        } else {
            (&mut pending, &mut pending_index)
        };
        let rate = row.hourly_rate.unwrap_or(DEFAULT_HOURLY_RATE);
        let i = *index.entry(row.student_id).or_insert_with(|| {
            groups.push(BillingGroup {
                student_id: row.student_id,
                student_name: row.student_name.clone(),
                student_email: row.student_email.clone(),
                subject: row.subject.clone(),
                hourly_rate: rate,
                classes: Vec::new(),
                total_amount: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[i];
        group.classes.push(BillingLine {
            class_id: row.id,
            title: row.title.clone(),
            date: row.date,
            amount: rate,
        });
        group.total_amount += rate;
    }

    pending.sort_by(|a, b| (&a.student_name, a.student_id).cmp(&(&b.student_name, b.student_id)));
    history.sort_by(|a, b| (&a.student_name, a.student_id).cmp(&(&b.student_name, b.student_id)));

    BillingSummary { pending, history }
}

pub struct BillingService;

impl BillingService {
    /// Snapshot of every class joined with its student. Rows whose student
    /// no longer exists are dropped by the join, not surfaced as errors.
    pub async fn billed_classes(pool: &PgPool, teacher_id: Uuid) -> anyhow::Result<Vec<BilledClass>> {
        let rows = sqlx::query_as::<_, BilledClass>(
            "SELECT c.id, c.title, c.date, c.paid,
                    s.id as student_id, s.name as student_name,
                    s.email as student_email, s.subject, s.hourly_rate
             FROM classes c
             JOIN students s ON s.id = c.student_id
             WHERE c.teacher_id = $1
             ORDER BY c.date, c.created_at",
        )
        .bind(teacher_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Same snapshot restricted to one student (student dashboard, invoices).
    pub async fn billed_classes_for_student(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
    ) -> anyhow::Result<Vec<BilledClass>> {
        let rows = sqlx::query_as::<_, BilledClass>(
            "SELECT c.id, c.title, c.date, c.paid,
                    s.id as student_id, s.name as student_name,
                    s.email as student_email, s.subject, s.hourly_rate
             FROM classes c
             JOIN students s ON s.id = c.student_id
             WHERE c.teacher_id = $1 AND c.student_id = $2
             ORDER BY c.date, c.created_at",
        )
        .bind(teacher_id)
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Settles every outstanding class for one student in a single statement.
    /// Scoped to `paid = FALSE`, so re-invoking on a settled student updates
    /// zero rows and is not an error.
    pub async fn mark_student_paid(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE classes SET paid = TRUE, updated_at = NOW()
             WHERE teacher_id = $1 AND student_id = $2 AND paid = FALSE",
        )
        .bind(teacher_id)
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Reopens exactly the given class ids — one materialized history group —
    /// leaving the student's other paid classes untouched.
    pub async fn mark_classes_unpaid(
        pool: &PgPool,
        teacher_id: Uuid,
        class_ids: &[Uuid],
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE classes SET paid = FALSE, updated_at = NOW()
             WHERE teacher_id = $1 AND id = ANY($2)",
        )
        .bind(teacher_id)
        .bind(class_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn class(
        student_id: Uuid,
        name: &str,
        rate: Option<f64>,
        paid: bool,
        d: u32,
    ) -> BilledClass {
        BilledClass {
            id: Uuid::new_v4(),
            title: format!("{name} lesson"),
            date: day(d),
            paid,
            student_id,
            student_name: name.to_string(),
            student_email: Some(format!("{}@example.com", name.to_lowercase())),
            subject: Some("Math".to_string()),
            hourly_rate: rate,
        }
    }

    #[test]
    fn three_unpaid_classes_sum_to_three_rates() {
        let ana = Uuid::new_v4();
        let rows = vec![
            class(ana, "Ana", Some(20.0), false, 1),
            class(ana, "Ana", Some(20.0), false, 2),
            class(ana, "Ana", Some(20.0), false, 3),
        ];
        let summary = aggregate(&rows);
        assert_eq!(summary.pending.len(), 1);
        assert!(summary.history.is_empty());
        let group = &summary.pending[0];
        assert_eq!(group.classes.len(), 3);
        assert_eq!(group.total_amount, 60.0);
    }

    #[test]
    fn paid_classes_land_in_history() {
        let ana = Uuid::new_v4();
        let rows = vec![
            class(ana, "Ana", Some(20.0), true, 1),
            class(ana, "Ana", Some(20.0), true, 2),
            class(ana, "Ana", Some(20.0), true, 3),
        ];
        let summary = aggregate(&rows);
        assert!(summary.pending.is_empty());
        assert_eq!(summary.history.len(), 1);
        assert_eq!(summary.history[0].total_amount, 60.0);
    }

    #[test]
    fn null_rate_falls_back_to_default() {
        let rows = vec![class(Uuid::new_v4(), "Ben", None, false, 1)];
        let summary = aggregate(&rows);
        assert_eq!(summary.pending[0].total_amount, DEFAULT_HOURLY_RATE);
        assert_eq!(summary.pending[0].hourly_rate, DEFAULT_HOURLY_RATE);
    }

    #[test]
    fn total_is_order_independent() {
        let ana = Uuid::new_v4();
        let ben = Uuid::new_v4();
        let mut rows = vec![
            class(ana, "Ana", Some(20.0), false, 1),
            class(ben, "Ben", Some(35.0), false, 1),
            class(ana, "Ana", Some(20.0), false, 2),
            class(ben, "Ben", Some(35.0), true, 2),
        ];
        let forward = aggregate(&rows);
        rows.reverse();
        let backward = aggregate(&rows);

        assert_eq!(forward.pending.len(), backward.pending.len());
        for (a, b) in forward.pending.iter().zip(backward.pending.iter()) {
            assert_eq!(a.student_id, b.student_id);
            assert_eq!(a.total_amount, b.total_amount);
        }
    }

    #[test]
    fn same_name_different_students_stay_apart() {
        let rows = vec![
            class(Uuid::new_v4(), "Alex Kim", Some(25.0), false, 1),
            class(Uuid::new_v4(), "Alex Kim", Some(40.0), false, 1),
        ];
        let summary = aggregate(&rows);
        assert_eq!(summary.pending.len(), 2);
        let total: f64 = summary.pending.iter().map(|g| g.total_amount).sum();
        assert_eq!(total, 65.0);
    }

    #[test]
    fn empty_input_materializes_no_groups() {
        let summary = aggregate(&[]);
        assert!(summary.pending.is_empty());
        assert!(summary.history.is_empty());
    }

    #[test]
    fn groups_come_out_sorted_by_name() {
        let rows = vec![
            class(Uuid::new_v4(), "Zoe", Some(10.0), false, 1),
            class(Uuid::new_v4(), "Ana", Some(10.0), false, 1),
            class(Uuid::new_v4(), "Mia", Some(10.0), false, 1),
        ];
        let summary = aggregate(&rows);
        let names: Vec<&str> = summary
            .pending
            .iter()
            .map(|g| g.student_name.as_str())
            .collect();
        assert_eq!(names, ["Ana", "Mia", "Zoe"]);
    }

    #[test]
    fn settling_a_student_moves_their_total_to_history() {
        // the mark-paid flow flips the paid flag; aggregation over the new
        // snapshot must move the whole amount across
        let ana = Uuid::new_v4();
        let mut rows = vec![
            class(ana, "Ana", Some(20.0), false, 1),
            class(ana, "Ana", Some(20.0), false, 2),
            class(ana, "Ana", Some(20.0), false, 3),
        ];
        let before = aggregate(&rows);
        assert_eq!(before.pending[0].total_amount, 60.0);

        for row in &mut rows {
            row.paid = true;
        }
        let after = aggregate(&rows);
        assert!(after.pending.is_empty());
        assert_eq!(after.history[0].total_amount, 60.0);
    }
}
