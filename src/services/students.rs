use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::student::{
    CreateStudentRequest, ImportReport, ImportRowError, Student, UpdateStudentRequest,
};

/// One parsed roster row, before insertion.
#[derive(Debug)]
struct ParsedStudent {
    name: String,
    email: Option<String>,
    subject: Option<String>,
    hourly_rate: Option<f64>,
}

pub struct StudentService;

impl StudentService {
    pub async fn list(
        pool: &PgPool,
        teacher_id: Uuid,
        status: Option<&str>,
    ) -> anyhow::Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students
             WHERE teacher_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY name",
        )
        .bind(teacher_id)
        .bind(status)
        .fetch_all(pool)
        .await?;
        Ok(students)
    }

    pub async fn get(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
    ) -> anyhow::Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE id = $1 AND teacher_id = $2",
        )
        .bind(student_id)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        Ok(student)
    }

    pub async fn create(
        pool: &PgPool,
        teacher_id: Uuid,
        req: &CreateStudentRequest,
    ) -> anyhow::Result<Student> {
        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (teacher_id, name, email, subject, hourly_rate)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(teacher_id)
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.subject)
        .bind(req.hourly_rate)
        .fetch_one(pool)
        .await?;
        Ok(student)
    }

    pub async fn update(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
        req: &UpdateStudentRequest,
    ) -> anyhow::Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "UPDATE students
             SET name        = COALESCE($1, name),
                 email       = COALESCE($2, email),
                 subject     = COALESCE($3, subject),
                 hourly_rate = COALESCE($4, hourly_rate),
                 status      = COALESCE($5, status),
                 updated_at  = NOW()
             WHERE id = $6 AND teacher_id = $7
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.subject)
        .bind(req.hourly_rate)
        .bind(&req.status)
        .bind(student_id)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        Ok(student)
    }

    /// Hard-delete a student. FK cascades remove their classes and grades.
    pub async fn delete(pool: &PgPool, teacher_id: Uuid, student_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1 AND teacher_id = $2")
            .bind(student_id)
            .bind(teacher_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Import a roster from a CSV or XLSX upload. Expected columns:
    /// name, email, subject, hourly_rate. Rows that fail to parse are
    /// reported and skipped; the rows that parsed are still inserted.
    pub async fn import(
        pool: &PgPool,
        teacher_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> anyhow::Result<ImportReport> {
        let parsed = if filename.to_lowercase().ends_with(".xlsx") {
            parse_xlsx(bytes)?
        } else {
            parse_csv(bytes)?
        };

        let mut report = ImportReport::default();
        for (row_no, row) in parsed {
            match row {
                Ok(p) => {
                    let inserted = sqlx::query(
                        "INSERT INTO students (teacher_id, name, email, subject, hourly_rate)
                         VALUES ($1, $2, $3, $4, $5)",
                    )
                    .bind(teacher_id)
                    .bind(&p.name)
                    .bind(&p.email)
                    .bind(&p.subject)
                    .bind(p.hourly_rate)
                    .execute(pool)
                    .await;
                    match inserted {
                        Ok(_) => report.imported += 1,
                        Err(e) => {
                            report.skipped += 1;
                            report.errors.push(ImportRowError {
                                row: row_no,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                Err(message) => {
                    report.skipped += 1;
                    report.errors.push(ImportRowError { row: row_no, message });
                }
            }
        }
        Ok(report)
    }
}

type NumberedRow = (usize, Result<ParsedStudent, String>);

fn parse_row(name: &str, email: &str, subject: &str, rate: &str) -> Result<ParsedStudent, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("missing student name".to_string());
    }
    let hourly_rate = match rate.trim() {
        "" => None,
        raw => Some(
            raw.parse::<f64>()
                .map_err(|_| format!("invalid hourly rate '{raw}'"))?,
        ),
    };
    Ok(ParsedStudent {
        name: name.to_string(),
        email: non_empty(email),
        subject: non_empty(subject),
        hourly_rate,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_csv(bytes: &[u8]) -> anyhow::Result<Vec<NumberedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(bytes));

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row_no = i + 2; // 1-based, after the header row
        match record {
            Ok(rec) => {
                let get = |idx: usize| rec.get(idx).unwrap_or("");
                rows.push((row_no, parse_row(get(0), get(1), get(2), get(3))));
            }
            Err(e) => rows.push((row_no, Err(e.to_string()))),
        }
    }
    Ok(rows)
}

fn parse_xlsx(bytes: &[u8]) -> anyhow::Result<Vec<NumberedRow>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| anyhow::anyhow!("Could not read workbook: {e}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow::anyhow!("Workbook has no sheets"))?
        .map_err(|e| anyhow::anyhow!("Could not read sheet: {e}"))?;

    let mut rows = Vec::new();
    for (i, row) in range.rows().enumerate() {
        // Skip a header row if the sheet carries one.
        if i == 0 && cell_text(row, 0).eq_ignore_ascii_case("name") {
            continue;
        }
        let row_no = i + 1;
        rows.push((
            row_no,
            parse_row(
                &cell_text(row, 0),
                &cell_text(row, 1),
                &cell_text(row, 2),
                &cell_text(row, 3),
            ),
        ));
    }
    Ok(rows)
}

fn cell_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(n)) => n.to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_parse_with_optional_fields() {
        let data = b"name,email,subject,hourly_rate\n\
                     Ana Torres,ana@example.com,Math,20\n\
                     Ben Ito,,,\n";
        let rows = parse_csv(data).unwrap();
        assert_eq!(rows.len(), 2);

        let ana = rows[0].1.as_ref().unwrap();
        assert_eq!(ana.name, "Ana Torres");
        assert_eq!(ana.hourly_rate, Some(20.0));

        let ben = rows[1].1.as_ref().unwrap();
        assert_eq!(ben.email, None);
        assert_eq!(ben.hourly_rate, None);
    }

    #[test]
    fn bad_rate_and_missing_name_are_row_errors() {
        let data = b"name,email,subject,hourly_rate\n\
                     ,x@example.com,Math,20\n\
                     Cleo Park,cleo@example.com,Math,abc\n";
        let rows = parse_csv(data).unwrap();
        assert!(rows[0].1.is_err());
        assert!(rows[1].1.as_ref().unwrap_err().contains("invalid hourly rate"));
    }
}
