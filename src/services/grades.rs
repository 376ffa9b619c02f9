use sqlx::PgPool;
use uuid::Uuid;

use crate::models::grade::{CreateGradeRequest, Grade, UpdateGradeRequest};

pub struct GradeService;

impl GradeService {
    pub async fn list_for_student(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
    ) -> anyhow::Result<Vec<Grade>> {
        let grades = sqlx::query_as::<_, Grade>(
            "SELECT * FROM grades
             WHERE teacher_id = $1 AND student_id = $2
             ORDER BY date DESC, created_at DESC",
        )
        .bind(teacher_id)
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(grades)
    }

    pub async fn create(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
        req: &CreateGradeRequest,
    ) -> anyhow::Result<Grade> {
        let grade = sqlx::query_as::<_, Grade>(
            "INSERT INTO grades (teacher_id, student_id, title, score, max_score, comment, date)
             VALUES ($1, $2, $3, $4, COALESCE($5, 100), $6, $7)
             RETURNING *",
        )
        .bind(teacher_id)
        .bind(student_id)
        .bind(&req.title)
        .bind(req.score)
        .bind(req.max_score)
        .bind(&req.comment)
        .bind(req.date)
        .fetch_one(pool)
        .await?;
        Ok(grade)
    }

    pub async fn update(
        pool: &PgPool,
        teacher_id: Uuid,
        grade_id: Uuid,
        req: &UpdateGradeRequest,
    ) -> anyhow::Result<Option<Grade>> {
        let grade = sqlx::query_as::<_, Grade>(
            "UPDATE grades
             SET title     = COALESCE($1, title),
                 score     = COALESCE($2, score),
                 max_score = COALESCE($3, max_score),
                 comment   = COALESCE($4, comment),
                 date      = COALESCE($5, date)
             WHERE id = $6 AND teacher_id = $7
             RETURNING *",
        )
        .bind(&req.title)
        .bind(req.score)
        .bind(req.max_score)
        .bind(&req.comment)
        .bind(req.date)
        .bind(grade_id)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        Ok(grade)
    }

    pub async fn delete(pool: &PgPool, teacher_id: Uuid, grade_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM grades WHERE id = $1 AND teacher_id = $2")
            .bind(grade_id)
            .bind(teacher_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Percentage average across a student's grades, None when there are no
    /// scorable entries.
    pub fn average_percent(grades: &[Grade]) -> Option<f64> {
        let scored: Vec<f64> = grades
            .iter()
            .filter(|g| g.max_score > 0.0)
            .map(|g| g.score / g.max_score * 100.0)
            .collect();
        if scored.is_empty() {
            return None;
        }
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn grade(score: f64, max: f64) -> Grade {
        Grade {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            title: "Quiz".to_string(),
            score,
            max_score: max,
            comment: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn average_is_percentage_based() {
        let grades = vec![grade(8.0, 10.0), grade(50.0, 100.0)];
        assert_eq!(GradeService::average_percent(&grades), Some(65.0));
    }

    #[test]
    fn zero_max_scores_are_ignored() {
        let grades = vec![grade(8.0, 10.0), grade(1.0, 0.0)];
        assert_eq!(GradeService::average_percent(&grades), Some(80.0));
    }

    #[test]
    fn no_grades_means_no_average() {
        assert_eq!(GradeService::average_percent(&[]), None);
    }
}
