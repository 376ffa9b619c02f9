use std::path::PathBuf;

use axum::extract::Multipart;
use image::ImageFormat;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::profile::{TeacherProfile, UpdateProfileRequest};

const AVATAR_MAX_EDGE: u32 = 512;

pub struct ProfileService;

impl ProfileService {
    pub async fn get(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<TeacherProfile>> {
        let profile = sqlx::query_as::<_, TeacherProfile>(
            "SELECT * FROM teacher_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    /// Upsert keeps the route idempotent for teachers registered before the
    /// profile row existed.
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        req: &UpdateProfileRequest,
    ) -> anyhow::Result<TeacherProfile> {
        let profile = sqlx::query_as::<_, TeacherProfile>(
            "INSERT INTO teacher_profiles (user_id, headline, bio, subject, city, hourly_rate, is_listed)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, FALSE))
             ON CONFLICT (user_id) DO UPDATE SET
                 headline    = COALESCE($2, teacher_profiles.headline),
                 bio         = COALESCE($3, teacher_profiles.bio),
                 subject     = COALESCE($4, teacher_profiles.subject),
                 city        = COALESCE($5, teacher_profiles.city),
                 hourly_rate = COALESCE($6, teacher_profiles.hourly_rate),
                 is_listed   = COALESCE($7, teacher_profiles.is_listed),
                 updated_at  = NOW()
             RETURNING *",
        )
        .bind(user_id)
        .bind(&req.headline)
        .bind(&req.bio)
        .bind(&req.subject)
        .bind(&req.city)
        .bind(req.hourly_rate)
        .bind(req.is_listed)
        .fetch_one(pool)
        .await?;
        Ok(profile)
    }

    /// Reads the avatar image from the multipart body, downscales it and
    /// stores it under MEDIA_DIR/avatars. Returns the public URL path.
    pub async fn upload_avatar(
        pool: &PgPool,
        user_id: Uuid,
        media_dir: &str,
        mut multipart: Multipart,
    ) -> anyhow::Result<String> {
        let mut file_bytes: Option<Vec<u8>> = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" || name == "avatar" {
                file_bytes = Some(field.bytes().await?.to_vec());
            }
        }

        let bytes = file_bytes.ok_or_else(|| anyhow::anyhow!("No file field in upload"))?;

        let img = image::load_from_memory(&bytes)
            .map_err(|_| anyhow::anyhow!("Unsupported or corrupted image"))?;
        let resized = img.thumbnail(AVATAR_MAX_EDGE, AVATAR_MAX_EDGE);

        let avatar_dir = PathBuf::from(media_dir).join("avatars");
        tokio::fs::create_dir_all(&avatar_dir).await?;

        let filename = format!("{user_id}.jpg");
        let mut buf = std::io::Cursor::new(Vec::new());
        resized.to_rgb8().write_to(&mut buf, ImageFormat::Jpeg)?;
        tokio::fs::write(avatar_dir.join(&filename), buf.into_inner()).await?;

        let url = format!("/media/avatars/{filename}");
        sqlx::query("UPDATE users SET avatar_url = $1, updated_at = NOW() WHERE id = $2")
            .bind(&url)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(url)
    }
}
