//! Resume persistence.

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::resume::ResumeRow;
use crate::parsing::ParsedResume;

/// Which resumes a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeScope {
    All,
    UploadedBy(Uuid),
}

impl ResumeScope {
    /// Bind value for the `($1::uuid IS NULL OR r.uploaded_by = $1)` filter.
    fn owner(self) -> Option<Uuid> {
        match self {
            ResumeScope::All => None,
            ResumeScope::UploadedBy(id) => Some(id),
        }
    }

    pub fn allows(self, row: &ResumeRow) -> bool {
        match self {
            ResumeScope::All => true,
            ResumeScope::UploadedBy(id) => row.uploaded_by == Some(id),
        }
    }
}

const SELECT_RESUMES: &str = r#"
    SELECT r.*, u.email AS uploaded_by_email
    FROM resumes r
    LEFT JOIN users u ON u.id = r.uploaded_by
"#;

/// Unique index that makes content duplicates per uploader impossible.
const CONTENT_HASH_INDEX: &str = "resumes_uploaded_by_hash_key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Stored {
        id: Uuid,
        /// Object key of the row this upload replaced, when it differs from the new one.
        replaced_key: Option<String>,
    },
    /// The uploader already has a resume with these bytes; nothing was written.
    DuplicateContent,
}

/// Fields written on upload.
pub struct NewResume<'a> {
    pub filename: &'a str,
    pub data: &'a ParsedResume,
    pub s3_key: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub content_hash: &'a str,
}

/// Id of this user's resume with identical content, if any.
pub async fn find_duplicate(
    pool: &PgPool,
    user_id: Uuid,
    content_hash: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM resumes WHERE uploaded_by = $1 AND content_hash = $2 LIMIT 1")
        .bind(user_id)
        .bind(content_hash)
        .fetch_optional(pool)
        .await
}

/// Inserts the resume, or replaces the user's existing resume with the same filename.
/// `created_at` of a replaced row is kept. Losing a race against an identical
/// upload under another filename yields [`UpsertOutcome::DuplicateContent`].
pub async fn upsert_resume(
    pool: &PgPool,
    resume: NewResume<'_>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let data = resume.data;
    let ug = data.ug.clone().unwrap_or_default();
    let pg = data.pg.clone().unwrap_or_default();

    let result: Result<(Uuid, Option<String>), sqlx::Error> = sqlx::query_as(
        r#"
        WITH previous AS (
            SELECT s3_key FROM resumes WHERE uploaded_by = $19 AND filename = $1
        )
        INSERT INTO resumes
            (filename, name, email, phone, linkedin, github, skills,
             ug_degree, ug_college, ug_year, pg_degree, pg_college, pg_year,
             total_experience_years, work_experience,
             s3_key, mime_type, size_bytes, uploaded_by, content_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20)
        ON CONFLICT (uploaded_by, filename) DO UPDATE SET
            name = EXCLUDED.name,
            email = EXCLUDED.email,
            phone = EXCLUDED.phone,
            linkedin = EXCLUDED.linkedin,
            github = EXCLUDED.github,
            skills = EXCLUDED.skills,
            ug_degree = EXCLUDED.ug_degree,
            ug_college = EXCLUDED.ug_college,
            ug_year = EXCLUDED.ug_year,
            pg_degree = EXCLUDED.pg_degree,
            pg_college = EXCLUDED.pg_college,
            pg_year = EXCLUDED.pg_year,
            total_experience_years = EXCLUDED.total_experience_years,
            work_experience = EXCLUDED.work_experience,
            s3_key = EXCLUDED.s3_key,
            mime_type = EXCLUDED.mime_type,
            size_bytes = EXCLUDED.size_bytes,
            content_hash = EXCLUDED.content_hash
        RETURNING id, (SELECT s3_key FROM previous) AS previous_key
        "#,
    )
    .bind(resume.filename)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.linkedin)
    .bind(&data.github)
    .bind(&data.skills)
    .bind(&ug.degree)
    .bind(&ug.college)
    .bind(ug.year)
    .bind(&pg.degree)
    .bind(&pg.college)
    .bind(pg.year)
    .bind(&data.total_experience_years)
    .bind(Json(&data.work_experience))
    .bind(resume.s3_key)
    .bind(resume.mime_type)
    .bind(resume.size_bytes)
    .bind(resume.uploaded_by)
    .bind(resume.content_hash)
    .fetch_one(pool)
    .await;

    let (id, previous_key) = match result {
        Ok(row) => row,
        Err(sqlx::Error::Database(e)) if e.constraint() == Some(CONTENT_HASH_INDEX) => {
            info!(
                "Resume {} of user {} duplicates stored content",
                resume.filename, resume.uploaded_by
            );
            return Ok(UpsertOutcome::DuplicateContent);
        }
        Err(e) => return Err(e),
    };

    info!(
        "Stored resume {id} ({}) for user {}",
        resume.filename, resume.uploaded_by
    );
    Ok(UpsertOutcome::Stored {
        id,
        replaced_key: previous_key.filter(|key| key != resume.s3_key),
    })
}

/// Whether any resume row still points at `s3_key`.
pub async fn s3_key_in_use(pool: &PgPool, s3_key: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM resumes WHERE s3_key = $1)")
        .bind(s3_key)
        .fetch_one(pool)
        .await
}

/// Resumes visible in `scope`, newest first.
pub async fn list_resumes(pool: &PgPool, scope: ResumeScope) -> Result<Vec<ResumeRow>, sqlx::Error> {
    let query = format!(
        "{SELECT_RESUMES} WHERE ($1::uuid IS NULL OR r.uploaded_by = $1) ORDER BY r.created_at DESC, r.id DESC"
    );
    sqlx::query_as(&query)
        .bind(scope.owner())
        .fetch_all(pool)
        .await
}

pub async fn get_resume(pool: &PgPool, id: Uuid) -> Result<Option<ResumeRow>, sqlx::Error> {
    let query = format!("{SELECT_RESUMES} WHERE r.id = $1");
    sqlx::query_as(&query).bind(id).fetch_optional(pool).await
}

/// Skill lists of every stored resume, regardless of uploader.
pub async fn all_skill_lists(pool: &PgPool) -> Result<Vec<Vec<String>>, sqlx::Error> {
    sqlx::query_scalar("SELECT skills FROM resumes")
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::users::tests::create_test_user;
    use chrono::{DateTime, Utc};

    async fn store(pool: &PgPool, user: Uuid, filename: &str, hash: &str, name: &str) -> UpsertOutcome {
        let data = ParsedResume {
            name: Some(name.to_string()),
            skills: vec!["Rust".to_string()],
            ..ParsedResume::default()
        };
        let s3_key = format!("resumes/{user}/{hash}");
        upsert_resume(
            pool,
            NewResume {
                filename,
                data: &data,
                s3_key: &s3_key,
                mime_type: "application/pdf",
                size_bytes: 1024,
                uploaded_by: user,
                content_hash: hash,
            },
        )
        .await
        .unwrap()
    }

    fn stored_id(outcome: &UpsertOutcome) -> Uuid {
        match outcome {
            UpsertOutcome::Stored { id, .. } => *id,
            UpsertOutcome::DuplicateContent => panic!("expected the resume to be stored"),
        }
    }

    async fn backdate(pool: &PgPool, id: Uuid, hours: i32) -> DateTime<Utc> {
        sqlx::query_scalar(
            "UPDATE resumes SET created_at = created_at - make_interval(hours => $2) WHERE id = $1 RETURNING created_at",
        )
        .bind(id)
        .bind(hours)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_same_filename_updates_in_place(pool: PgPool) {
        let user = create_test_user(&pool, "ana@example.com", false).await;

        let first = store(&pool, user.id, "cv.pdf", "hash-1", "Ana").await;
        assert_eq!(
            first,
            UpsertOutcome::Stored {
                id: stored_id(&first),
                replaced_key: None
            }
        );
        let created_at = backdate(&pool, stored_id(&first), 24).await;

        let second = store(&pool, user.id, "cv.pdf", "hash-2", "Ana Lima").await;
        assert_eq!(
            second,
            UpsertOutcome::Stored {
                id: stored_id(&first),
                replaced_key: Some(format!("resumes/{}/hash-1", user.id)),
            }
        );

        let row = get_resume(&pool, stored_id(&first)).await.unwrap().unwrap();
        assert_eq!(row.name.as_deref(), Some("Ana Lima"));
        assert_eq!(row.content_hash, "hash-2");
        assert_eq!(row.created_at, created_at);
        assert!(!s3_key_in_use(&pool, &format!("resumes/{}/hash-1", user.id)).await.unwrap());
        assert!(s3_key_in_use(&pool, &row.s3_key).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_content_writes_nothing(pool: PgPool) {
        let ana = create_test_user(&pool, "ana@example.com", false).await;
        let ben = create_test_user(&pool, "ben@example.com", false).await;

        let first = store(&pool, ana.id, "cv.pdf", "hash-1", "Ana").await;
        assert_eq!(
            find_duplicate(&pool, ana.id, "hash-1").await.unwrap(),
            Some(stored_id(&first))
        );
        assert_eq!(find_duplicate(&pool, ben.id, "hash-1").await.unwrap(), None);

        // Same bytes under a new name: the unique index rejects it even without the lookup
        let copy = store(&pool, ana.id, "copy.pdf", "hash-1", "Ana").await;
        assert_eq!(copy, UpsertOutcome::DuplicateContent);
        let ana_rows = list_resumes(&pool, ResumeScope::UploadedBy(ana.id)).await.unwrap();
        assert_eq!(ana_rows.len(), 1);
        assert_eq!(ana_rows[0].filename, "cv.pdf");

        // Another uploader may store the same file
        let other = store(&pool, ben.id, "cv.pdf", "hash-1", "Ana").await;
        assert!(matches!(other, UpsertOutcome::Stored { .. }));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_listing_is_scoped_newest_first_with_uploader_email(pool: PgPool) {
        let ana = create_test_user(&pool, "ana@example.com", false).await;
        let ben = create_test_user(&pool, "ben@example.com", false).await;

        let old = store(&pool, ana.id, "old.pdf", "hash-1", "Ana").await;
        backdate(&pool, stored_id(&old), 2).await;
        store(&pool, ana.id, "new.pdf", "hash-2", "Ana").await;
        let bens = store(&pool, ben.id, "ben.pdf", "hash-3", "Ben").await;
        backdate(&pool, stored_id(&bens), 1).await;

        let own = list_resumes(&pool, ResumeScope::UploadedBy(ana.id)).await.unwrap();
        let names: Vec<&str> = own.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["new.pdf", "old.pdf"]);
        assert!(own
            .iter()
            .all(|r| r.uploaded_by_email.as_deref() == Some("ana@example.com")));

        let all = list_resumes(&pool, ResumeScope::All).await.unwrap();
        let names: Vec<&str> = all.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["new.pdf", "ben.pdf", "old.pdf"]);
        assert_eq!(all[1].uploaded_by_email.as_deref(), Some("ben@example.com"));

        let mut skills = all_skill_lists(&pool).await.unwrap();
        skills.dedup();
        assert_eq!(skills, vec![vec!["Rust".to_string()]]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_resume_respects_scope(pool: PgPool) {
        let ana = create_test_user(&pool, "ana@example.com", false).await;
        let ben = create_test_user(&pool, "ben@example.com", false).await;
        let id = stored_id(&store(&pool, ana.id, "cv.pdf", "hash-1", "Ana").await);

        let row = get_resume(&pool, id).await.unwrap().unwrap();
        assert!(ResumeScope::UploadedBy(ana.id).allows(&row));
        assert!(!ResumeScope::UploadedBy(ben.id).allows(&row));
        assert!(ResumeScope::All.allows(&row));

        assert!(get_resume(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
