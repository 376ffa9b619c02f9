use chrono::{NaiveDate, NaiveTime, Timelike};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::class::{ClassRecord, DEFAULT_CLASS_DURATION_MIN};

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Outcome of a create/update attempt against the calendar. A conflict or a
/// past-midnight slot blocks the write entirely; the caller decides how to
/// surface it.
pub enum ScheduleOutcome {
    Scheduled(ClassRecord),
    Conflict,
    PastMidnight,
}

pub fn minute_of_day(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

/// Parses a "HH:MM" wall-clock time from a booking form.
pub fn parse_class_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Half-open intervals [s1,e1) and [s2,e2) — touching ends do not overlap.
pub fn intervals_overlap(s1: i32, e1: i32, s2: i32, e2: i32) -> bool {
    s1 < e2 && s2 < e1
}

/// A slot whose wall-clock end would pass 24:00 is rejected up front rather
/// than compared with an end before its start.
pub fn crosses_midnight(start: NaiveTime, duration_minutes: i32) -> bool {
    minute_of_day(start) + duration_minutes > MINUTES_PER_DAY
}

/// Returns the id of the first existing slot on the same date that overlaps
/// the candidate interval. Slots missing a time or duration are skipped, and
/// `exclude_id` (the record being edited) is never compared against itself.
pub fn find_conflict<I>(
    start: NaiveTime,
    duration_minutes: i32,
    existing: I,
    exclude_id: Option<Uuid>,
) -> Option<Uuid>
where
    I: IntoIterator<Item = (Uuid, Option<NaiveTime>, Option<i32>)>,
{
    let s1 = minute_of_day(start);
    let e1 = s1 + duration_minutes;

    for (id, slot_time, slot_duration) in existing {
        if Some(id) == exclude_id {
            continue;
        }
        let (Some(t), Some(d)) = (slot_time, slot_duration) else {
            continue;
        };
        let s2 = minute_of_day(t);
        if intervals_overlap(s1, e1, s2, s2 + d) {
            return Some(id);
        }
    }
    None
}

pub struct ScheduleService;

impl ScheduleService {
    pub async fn list(
        pool: &PgPool,
        teacher_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<ClassRecord>> {
        let classes = sqlx::query_as::<_, ClassRecord>(
            "SELECT * FROM classes
             WHERE teacher_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date, time NULLS LAST",
        )
        .bind(teacher_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
        Ok(classes)
    }

    pub async fn get(
        pool: &PgPool,
        teacher_id: Uuid,
        class_id: Uuid,
    ) -> anyhow::Result<Option<ClassRecord>> {
        let class = sqlx::query_as::<_, ClassRecord>(
            "SELECT * FROM classes WHERE id = $1 AND teacher_id = $2",
        )
        .bind(class_id)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        Ok(class)
    }

    /// Snapshot of one day's slots, used as the comparison set for a write.
    async fn day_slots(
        pool: &PgPool,
        teacher_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<(Uuid, Option<NaiveTime>, Option<i32>)>> {
        let slots: Vec<(Uuid, Option<NaiveTime>, Option<i32>)> = sqlx::query_as(
            "SELECT id, time, duration_minutes FROM classes
             WHERE teacher_id = $1 AND date = $2",
        )
        .bind(teacher_id)
        .bind(date)
        .fetch_all(pool)
        .await?;
        Ok(slots)
    }

    /// Inserts a class unless its interval overlaps an existing one on the
    /// same date. The conflict check and the insert run against the same
    /// snapshot; a conflict means nothing is written.
    pub async fn create(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
        title: &str,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: Option<i32>,
    ) -> anyhow::Result<ScheduleOutcome> {
        let duration = duration_minutes.unwrap_or(DEFAULT_CLASS_DURATION_MIN);
        if crosses_midnight(time, duration) {
            return Ok(ScheduleOutcome::PastMidnight);
        }

        let existing = Self::day_slots(pool, teacher_id, date).await?;
        if find_conflict(time, duration, existing, None).is_some() {
            return Ok(ScheduleOutcome::Conflict);
        }

        let class = sqlx::query_as::<_, ClassRecord>(
            "INSERT INTO classes (teacher_id, student_id, title, date, time, duration_minutes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(teacher_id)
        .bind(student_id)
        .bind(title)
        .bind(date)
        .bind(time)
        .bind(duration_minutes)
        .fetch_one(pool)
        .await?;

        Ok(ScheduleOutcome::Scheduled(class))
    }

    /// Reschedules or retitles a class. The merged date/time/duration is
    /// re-checked against that day's other classes, excluding the record
    /// itself. Returns None when the class does not exist for this teacher.
    pub async fn update(
        pool: &PgPool,
        teacher_id: Uuid,
        class_id: Uuid,
        student_id: Option<Uuid>,
        title: Option<&str>,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        duration_minutes: Option<i32>,
    ) -> anyhow::Result<Option<ScheduleOutcome>> {
        let Some(current) = Self::get(pool, teacher_id, class_id).await? else {
            return Ok(None);
        };

        let new_date = date.unwrap_or(current.date);
        let new_time = time.or(current.time);
        let new_duration = duration_minutes.or(current.duration_minutes);

        if let Some(t) = new_time {
            let d = new_duration.unwrap_or(DEFAULT_CLASS_DURATION_MIN);
            if crosses_midnight(t, d) {
                return Ok(Some(ScheduleOutcome::PastMidnight));
            }
            let existing = Self::day_slots(pool, teacher_id, new_date).await?;
            if find_conflict(t, d, existing, Some(class_id)).is_some() {
                return Ok(Some(ScheduleOutcome::Conflict));
            }
        }

        let class = sqlx::query_as::<_, ClassRecord>(
            "UPDATE classes
             SET student_id       = COALESCE($1, student_id),
                 title            = COALESCE($2, title),
                 date             = COALESCE($3, date),
                 time             = COALESCE($4, time),
                 duration_minutes = COALESCE($5, duration_minutes),
                 updated_at       = NOW()
             WHERE id = $6 AND teacher_id = $7
             RETURNING *",
        )
        .bind(student_id)
        .bind(title)
        .bind(date)
        .bind(time)
        .bind(duration_minutes)
        .bind(class_id)
        .bind(teacher_id)
        .fetch_one(pool)
        .await?;

        Ok(Some(ScheduleOutcome::Scheduled(class)))
    }

    /// Upcoming classes for one roster student, soonest first.
    pub async fn upcoming_for_student(
        pool: &PgPool,
        teacher_id: Uuid,
        student_id: Uuid,
        from: NaiveDate,
    ) -> anyhow::Result<Vec<ClassRecord>> {
        let classes = sqlx::query_as::<_, ClassRecord>(
            "SELECT * FROM classes
             WHERE teacher_id = $1 AND student_id = $2 AND date >= $3
             ORDER BY date, time NULLS LAST",
        )
        .bind(teacher_id)
        .bind(student_id)
        .bind(from)
        .fetch_all(pool)
        .await?;
        Ok(classes)
    }

    pub async fn delete(pool: &PgPool, teacher_id: Uuid, class_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1 AND teacher_id = $2")
            .bind(class_id)
            .bind(teacher_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(id: Uuid, h: u32, m: u32, dur: i32) -> (Uuid, Option<NaiveTime>, Option<i32>) {
        (id, Some(t(h, m)), Some(dur))
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            (540, 600, 570, 630),
            (540, 600, 600, 630),
            (0, 60, 30, 45),
            (100, 200, 150, 160),
        ];
        for (s1, e1, s2, e2) in cases {
            assert_eq!(
                intervals_overlap(s1, e1, s2, e2),
                intervals_overlap(s2, e2, s1, e1)
            );
        }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        // 09:00 for 60 min ends exactly when 10:00 starts
        assert!(!intervals_overlap(540, 600, 600, 630));
        // 09:59 for 30 min reaches into the 09:00–10:00 slot
        assert!(intervals_overlap(540, 600, 599, 629));
    }

    #[test]
    fn booking_after_existing_class_is_free() {
        let existing = vec![slot(Uuid::new_v4(), 9, 0, 60)];
        assert_eq!(find_conflict(t(10, 0), 30, existing, None), None);
    }

    #[test]
    fn booking_inside_existing_class_conflicts() {
        let id = Uuid::new_v4();
        let existing = vec![slot(id, 9, 0, 60)];
        assert_eq!(find_conflict(t(9, 30), 15, existing, None), Some(id));
    }

    #[test]
    fn identical_slot_conflicts_unless_it_is_the_record_being_edited() {
        let id = Uuid::new_v4();
        let existing = vec![slot(id, 9, 0, 60)];
        // another record with the same time and duration collides
        assert!(find_conflict(t(9, 0), 60, existing.clone(), None).is_some());
        // the record itself, during an edit, is skipped
        assert!(find_conflict(t(9, 0), 60, existing, Some(id)).is_none());
    }

    #[test]
    fn edit_still_collides_with_other_records() {
        let editing = Uuid::new_v4();
        let other = Uuid::new_v4();
        let existing = vec![slot(editing, 9, 0, 60), slot(other, 11, 0, 60)];
        assert_eq!(
            find_conflict(t(11, 30), 60, existing, Some(editing)),
            Some(other)
        );
    }

    #[test]
    fn slots_missing_time_or_duration_are_skipped() {
        let existing = vec![
            (Uuid::new_v4(), None, Some(60)),
            (Uuid::new_v4(), Some(t(9, 0)), None),
        ];
        assert_eq!(find_conflict(t(9, 0), 60, existing, None), None);
    }

    #[test]
    fn midnight_rollover_is_detected() {
        assert!(crosses_midnight(t(23, 30), 90));
        assert!(!crosses_midnight(t(23, 0), 60));
        assert!(!crosses_midnight(t(9, 0), 60));
    }

    #[test]
    fn class_time_parsing() {
        assert_eq!(parse_class_time("09:30"), Some(t(9, 30)));
        assert_eq!(parse_class_time(" 23:59 "), Some(t(23, 59)));
        assert_eq!(parse_class_time("9h30"), None);
        assert_eq!(parse_class_time("25:00"), None);
        assert_eq!(parse_class_time(""), None);
    }
}
