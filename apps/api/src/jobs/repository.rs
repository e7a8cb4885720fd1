use anyhow::{anyhow, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{Job, JobRow};

fn to_job(row: JobRow) -> Result<Job> {
    Job::try_from(row).map_err(|e| anyhow!(e))
}

/// Returns the user's jobs, most recent application date first.
pub async fn list_jobs(pool: &PgPool, user_id: Uuid) -> Result<Vec<Job>> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE user_id = $1 ORDER BY date DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(to_job)
        .collect()
}

pub async fn find_job(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<Job>> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(to_job)
        .transpose()
}

pub async fn insert_job(pool: &PgPool, job: &Job) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs
            (id, user_id, company, title, status, date,
             resume_used, notes, job_description, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(job.id)
    .bind(job.owner_id)
    .bind(&job.company)
    .bind(&job.title)
    .bind(job.status.as_str())
    .bind(job.date)
    .bind(&job.resume_used)
    .bind(&job.notes)
    .bind(&job.job_description)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Writes every mutable column of `job`. Returns `false` if the row is gone.
pub async fn update_job(pool: &PgPool, job: &Job) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET company = $1, title = $2, status = $3, date = $4,
            resume_used = $5, notes = $6, job_description = $7, updated_at = $8
        WHERE id = $9 AND user_id = $10
        "#,
    )
    .bind(&job.company)
    .bind(&job.title)
    .bind(job.status.as_str())
    .bind(job.date)
    .bind(&job.resume_used)
    .bind(&job.notes)
    .bind(&job.job_description)
    .bind(job.updated_at)
    .bind(job.id)
    .bind(job.owner_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_job(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
