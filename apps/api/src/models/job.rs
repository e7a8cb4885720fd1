use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Where an application stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
    Saved,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
            JobStatus::Saved => "Saved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Applied" => Some(JobStatus::Applied),
            "Interview" => Some(JobStatus::Interview),
            "Offer" => Some(JobStatus::Offer),
            "Rejected" => Some(JobStatus::Rejected),
            "Saved" => Some(JobStatus::Saved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub title: String,
    pub status: String,
    pub date: DateTime<Utc>,
    pub resume_used: Option<String>,
    pub notes: Option<String>,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tracked job application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub company: String,
    pub title: String,
    pub status: JobStatus,
    pub date: DateTime<Utc>,
    pub resume_used: Option<String>,
    pub notes: Option<String>,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| format!("job {} has unknown status '{}'", row.id, row.status))?;
        Ok(Job {
            id: row.id,
            owner_id: row.user_id,
            company: row.company,
            title: row.title,
            status,
            date: row.date,
            resume_used: row.resume_used,
            notes: row.notes,
            job_description: row.job_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<DateTime<Utc>>,
    pub resume_used: Option<String>,
    pub notes: Option<String>,
    pub job_description: Option<String>,
}

/// Body of `PATCH /api/jobs/:id`. Absent fields are left untouched; an empty
/// string clears an optional text field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub company: Option<String>,
    pub title: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<DateTime<Utc>>,
    pub resume_used: Option<String>,
    pub notes: Option<String>,
    pub job_description: Option<String>,
}

impl NewJob {
    /// Validates and normalizes the payload into a full `Job` owned by `owner_id`.
    pub fn into_job(self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Job, String> {
        Ok(Job {
            id: Uuid::new_v4(),
            owner_id,
            company: required_text("company", &self.company)?,
            title: required_text("title", &self.title)?,
            status: self.status.unwrap_or_default(),
            date: self.date.unwrap_or(now),
            resume_used: optional_text(self.resume_used),
            notes: optional_text(self.notes),
            job_description: optional_text(self.job_description),
            created_at: now,
            updated_at: now,
        })
    }
}

impl JobPatch {
    /// Applies the supplied fields to `job`, re-validating required text.
    pub fn apply(self, job: &mut Job, now: DateTime<Utc>) -> Result<(), String> {
        if let Some(company) = self.company {
            job.company = required_text("company", &company)?;
        }
        if let Some(title) = self.title {
            job.title = required_text("title", &title)?;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(date) = self.date {
            job.date = date;
        }
        if let Some(resume_used) = self.resume_used {
            job.resume_used = optional_text(Some(resume_used));
        }
        if let Some(notes) = self.notes {
            job.notes = optional_text(Some(notes));
        }
        if let Some(job_description) = self.job_description {
            job.job_description = optional_text(Some(job_description));
        }
        job.updated_at = now;
        Ok(())
    }
}

fn required_text(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC),
/// which is what HTML date inputs send.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job_json(json: &str) -> NewJob {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_job_trims_and_defaults_status() {
        let now = Utc::now();
        let job = new_job_json(r#"{"company": "  Acme ", "title": "Engineer", "notes": "   "}"#)
            .into_job(Uuid::new_v4(), now)
            .unwrap();
        assert_eq!(job.company, "Acme");
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(job.date, now);
        assert_eq!(job.notes, None);
    }

    #[test]
    fn test_new_job_requires_company_and_title() {
        let err = new_job_json(r#"{"company": " ", "title": "Engineer"}"#)
            .into_job(Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert_eq!(err, "company is required");

        let err = new_job_json(r#"{"company": "Acme"}"#)
            .into_job(Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert_eq!(err, "title is required");
    }

    #[test]
    fn test_unknown_status_fails_to_deserialize() {
        let result =
            serde_json::from_str::<NewJob>(r#"{"company": "A", "title": "B", "status": "Ghosted"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_date_accepts_plain_date_and_rfc3339() {
        let job = new_job_json(r#"{"company": "A", "title": "B", "date": "2024-05-01"}"#);
        assert_eq!(job.date.unwrap().to_rfc3339(), "2024-05-01T00:00:00+00:00");

        let job = new_job_json(
            r#"{"company": "A", "title": "B", "date": "2024-05-01T12:30:00+02:00"}"#,
        );
        assert_eq!(job.date.unwrap().to_rfc3339(), "2024-05-01T10:30:00+00:00");
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let created = Utc::now();
        let mut job = new_job_json(
            r#"{"company": "Acme", "title": "Engineer", "notes": "referral", "resumeUsed": "Backend CV"}"#,
        )
        .into_job(Uuid::new_v4(), created)
        .unwrap();

        let patch: JobPatch =
            serde_json::from_str(r#"{"status": "Interview", "notes": ""}"#).unwrap();
        let later = created + chrono::Duration::minutes(5);
        patch.apply(&mut job, later).unwrap();

        assert_eq!(job.status, JobStatus::Interview);
        assert_eq!(job.notes, None);
        assert_eq!(job.resume_used.as_deref(), Some("Backend CV"));
        assert_eq!(job.company, "Acme");
        assert_eq!(job.updated_at, later);
        assert_eq!(job.created_at, created);
    }

    #[test]
    fn test_patch_rejects_blank_title() {
        let mut job = new_job_json(r#"{"company": "Acme", "title": "Engineer"}"#)
            .into_job(Uuid::new_v4(), Utc::now())
            .unwrap();
        let patch: JobPatch = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert!(patch.apply(&mut job, Utc::now()).is_err());
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            JobStatus::Applied,
            JobStatus::Interview,
            JobStatus::Offer,
            JobStatus::Rejected,
            JobStatus::Saved,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
    }
}
