//! Demo data seed script
//!
//! Seeds a demo teacher account with a realistic working set:
//! - 1 teacher (listed on the marketplace) and 2 student accounts
//! - 5 roster students with mixed hourly rates (one without a rate)
//! - Classes over the last three weeks and the coming week, some paid
//! - Grades for each roster student
//! - Marketplace bookings in every status, one completed with a review
//! - A generated avatar image for the teacher
//!
//! Usage:
//!   DATABASE_URL=... DEMO_PASSWORD=Demo2024! MEDIA_DIR=/data/media ./seed-demo
//!
//! Environment variables:
//!   DATABASE_URL   — PostgreSQL connection string (required)
//!   DEMO_PASSWORD  — Password for all demo accounts (default: Demo2024!)
//!   MEDIA_DIR      — Base directory for media files (default: /data/media)

use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let demo_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());
    let media_dir = env::var("MEDIA_DIR").unwrap_or_else(|_| "/data/media".to_string());

    println!("=== Seed Demo Data ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    tutorspace_api::db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // 1. Clean any previous demo accounts (cascades take the rest)
    println!("Cleaning existing demo data...");
    sqlx::query("DELETE FROM users WHERE email LIKE '%@demo.tutorspace.app'")
        .execute(&pool)
        .await
        .context("Failed to delete demo users")?;

    // 2. Users (cost 10 for seed speed)
    let password_hash =
        bcrypt::hash(&demo_password, 10).context("Failed to hash demo password")?;

    println!("Inserting users...");
    let teacher_id = Uuid::new_v4();
    let learner1_id = Uuid::new_v4();
    let learner2_id = Uuid::new_v4();

    let users = [
        (teacher_id, "lena@demo.tutorspace.app", "Lena", "Moreau", "teacher"),
        (learner1_id, "marco@demo.tutorspace.app", "Marco", "Silva", "student"),
        (learner2_id, "yuki@demo.tutorspace.app", "Yuki", "Tanaka", "student"),
    ];

    for (id, email, first, last, role) in &users {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(email)
        .bind(&password_hash)
        .bind(first)
        .bind(last)
        .bind(role)
        .execute(&pool)
        .await
        .with_context(|| format!("Failed to insert user {email}"))?;
    }

    // 3. Teacher avatar + marketplace profile
    println!("Generating avatar...");
    let avatar_dir = std::path::Path::new(&media_dir).join("avatars");
    std::fs::create_dir_all(&avatar_dir).context("Failed to create avatar dir")?;
    let avatar = make_avatar([56, 132, 255], [240, 244, 255]);
    let avatar_name = format!("{teacher_id}.jpg");
    std::fs::write(avatar_dir.join(&avatar_name), avatar).context("Failed to write avatar")?;

    sqlx::query("UPDATE users SET avatar_url = $1 WHERE id = $2")
        .bind(format!("/media/avatars/{avatar_name}"))
        .bind(teacher_id)
        .execute(&pool)
        .await?;

    sqlx::query(
        "INSERT INTO teacher_profiles (user_id, headline, bio, subject, city, hourly_rate, is_listed)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE)",
    )
    .bind(teacher_id)
    .bind("Patient math tutor for exam preparation")
    .bind("Ten years of one-on-one tutoring, from middle school up to university entrance exams.")
    .bind("Math")
    .bind("Lisbon")
    .bind(32.0)
    .execute(&pool)
    .await
    .context("Failed to insert teacher profile")?;

    // 4. Roster students — one deliberately without a rate
    println!("Inserting roster students...");
    let roster = [
        ("Ana Torres", Some("ana@example.com"), "Math", Some(20.0)),
        ("Ben Ito", Some("ben@example.com"), "Math", Some(25.0)),
        ("Cleo Park", Some("cleo@example.com"), "Physics", Some(30.0)),
        ("Dan Weiss", None, "Math", None),
        ("Emma Costa", Some("emma@example.com"), "Math", Some(22.5)),
    ];

    let mut roster_ids = Vec::new();
    for (name, email, subject, rate) in &roster {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO students (teacher_id, name, email, subject, hourly_rate)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(teacher_id)
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(rate)
        .fetch_one(&pool)
        .await
        .with_context(|| format!("Failed to insert student {name}"))?;
        roster_ids.push(id);
    }

    // 5. Classes: three past weeks (paid for the oldest), plus next week
    println!("Inserting classes...");
    let today = Utc::now().date_naive();
    let mut class_count = 0;
    for week in -3i64..=1 {
        for (i, student_id) in roster_ids.iter().enumerate() {
            let date = today + Duration::days(week * 7 + i as i64 - 2);
            let time = NaiveTime::from_hms_opt(9 + (i as u32 % 4) * 2, 0, 0).unwrap();
            let paid = week <= -2;
            insert_class(&pool, teacher_id, *student_id, "Weekly lesson", date, time, 60, paid)
                .await?;
            class_count += 1;
        }
    }

    // 6. Grades
    println!("Inserting grades...");
    for (i, student_id) in roster_ids.iter().enumerate() {
        for (title, score) in [("Algebra quiz", 62.0 + 7.0 * i as f64), ("Mock exam", 71.0)] {
            sqlx::query(
                "INSERT INTO grades (teacher_id, student_id, title, score, max_score, date)
                 VALUES ($1, $2, $3, $4, 100, $5)",
            )
            .bind(teacher_id)
            .bind(student_id)
            .bind(title)
            .bind(score)
            .bind(today - Duration::days(10 + i as i64))
            .execute(&pool)
            .await?;
        }
    }

    // 7. Marketplace bookings: pending, confirmed, and a completed one with a review
    println!("Inserting bookings...");
    let now = Utc::now();
    let completed_id: Uuid = sqlx::query_scalar(
        "INSERT INTO bookings (student_user_id, teacher_id, scheduled_at, duration_minutes, status, price)
         VALUES ($1, $2, $3, 60, 'completed', 32.0)
         RETURNING id",
    )
    .bind(learner1_id)
    .bind(teacher_id)
    .bind(now - chrono::Duration::days(9))
    .fetch_one(&pool)
    .await?;

    sqlx::query(
        "INSERT INTO bookings (student_user_id, teacher_id, scheduled_at, duration_minutes, status, price)
         VALUES ($1, $2, $3, 60, 'confirmed', 32.0)",
    )
    .bind(learner1_id)
    .bind(teacher_id)
    .bind(now + chrono::Duration::days(3))
    .execute(&pool)
    .await?;

    sqlx::query(
        "INSERT INTO bookings (student_user_id, teacher_id, scheduled_at, duration_minutes, status, price)
         VALUES ($1, $2, $3, 90, 'pending', 32.0)",
    )
    .bind(learner2_id)
    .bind(teacher_id)
    .bind(now + chrono::Duration::days(5))
    .execute(&pool)
    .await?;

    sqlx::query(
        "INSERT INTO reviews (booking_id, teacher_id, student_user_id, rating, comment)
         VALUES ($1, $2, $3, 5, 'Very clear explanations, my grades went up fast.')",
    )
    .bind(completed_id)
    .bind(teacher_id)
    .bind(learner1_id)
    .execute(&pool)
    .await?;

    println!("Done.");
    println!("  Teacher login: lena@demo.tutorspace.app / {demo_password}");
    println!("  Student login: marco@demo.tutorspace.app / {demo_password}");
    println!("  Seeded {class_count} classes, {} roster students", roster_ids.len());

    Ok(())
}

async fn insert_class(
    pool: &PgPool,
    teacher_id: Uuid,
    student_id: Uuid,
    title: &str,
    date: chrono::NaiveDate,
    time: NaiveTime,
    duration: i32,
    paid: bool,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO classes (teacher_id, student_id, title, date, time, duration_minutes, paid)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(teacher_id)
    .bind(student_id)
    .bind(title)
    .bind(date)
    .bind(time)
    .bind(duration)
    .bind(paid)
    .execute(pool)
    .await?;
    Ok(())
}

// ─── Avatar helper ────────────────────────────────────────────────────────────

/// Generate a simple diagonal-gradient JPEG avatar.
fn make_avatar(accent: [u8; 3], bg: [u8; 3]) -> Vec<u8> {
    let mut img = RgbImage::new(256, 256);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let t = (x + y) as f32 / 510.0;
        let r = lerp(bg[0], accent[0], t);
        let g = lerp(bg[1], accent[1], t);
        let b = lerp(bg[2], accent[2], t);
        *pixel = image::Rgb([r, g, b]);
    }

    let dyn_img = DynamicImage::ImageRgb8(img);
    let mut buf = std::io::Cursor::new(Vec::new());
    dyn_img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).clamp(0.0, 255.0) as u8
}
