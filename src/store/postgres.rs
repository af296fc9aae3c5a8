//! Postgres store backend
//!
//! Expected schema (managed outside this crate):
//!
//! ```text
//! languages              (language_id bigserial PK, code text UNIQUE, name text)
//! translation_projects   (project_id bigserial PK, name text, source_lang_id bigint,
//!                         target_lang_id bigint, metadata jsonb, active boolean)
//! translation_sentences  (project_id bigint, sentence_id bigint, surrogate_id text,
//!                         sentence text, draft text, draft_meta jsonb, version bigint,
//!                         PRIMARY KEY (project_id, sentence_id))
//! translation_memory     (source_lang text, target_lang text NULL, token text,
//!                         translations jsonb, metadata jsonb,
//!                         UNIQUE (source_lang, target_lang, token))
//! <name>_bible           (ref_id bigint PK, book_id bigint, chapter bigint,
//!                         verse bigint, text text)   -- one table per version
//! ```
//!
//! Draft writes use a version-guarded UPDATE; memory writes take a row
//! lock (`SELECT … FOR UPDATE`) inside one transaction so concurrent
//! confirmations of the same token serialize instead of losing counts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::draft::Segment;
use crate::error::{EngineError, Result};

use super::models::{
    book_code, Language, ProjectFilter, ProjectMetadata, ProjectRow, SentenceRow,
    SentenceSelector, TranslationMemoryRow, TranslationStats, VerseRecord,
};
use super::TranslationStore;

/// sqlx-backed [`TranslationStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn sentence_from_row(row: &sqlx::postgres::PgRow) -> Result<SentenceRow> {
        let draft_meta: serde_json::Value = row.try_get("draft_meta")?;
        let draft_meta: Vec<Segment> = serde_json::from_value(draft_meta)?;
        Ok(SentenceRow {
            project_id: row.try_get("project_id")?,
            sentence_id: row.try_get("sentence_id")?,
            surrogate_id: row.try_get("surrogate_id")?,
            sentence: row.try_get("sentence")?,
            draft: row.try_get("draft")?,
            draft_meta,
            version: row.try_get("version")?,
        })
    }

    fn project_from_row(row: &sqlx::postgres::PgRow) -> Result<ProjectRow> {
        let metadata: serde_json::Value = row.try_get("metadata")?;
        let metadata: ProjectMetadata = serde_json::from_value(metadata)?;
        Ok(ProjectRow {
            id: row.try_get("project_id")?,
            name: row.try_get("name")?,
            source: Language {
                id: row.try_get("src_id")?,
                code: row.try_get("src_code")?,
                name: row.try_get("src_name")?,
            },
            target: Language {
                id: row.try_get("trg_id")?,
                code: row.try_get("trg_code")?,
                name: row.try_get("trg_name")?,
            },
            metadata,
            active: row.try_get("active")?,
        })
    }
}

const PROJECT_SELECT: &str = r#"
    SELECT p.project_id, p.name, p.metadata, p.active,
           s.language_id AS src_id, s.code AS src_code, s.name AS src_name,
           t.language_id AS trg_id, t.code AS trg_code, t.name AS trg_name
    FROM translation_projects p
    JOIN languages s ON s.language_id = p.source_lang_id
    JOIN languages t ON t.language_id = p.target_lang_id
"#;

/// Validate a caller-supplied Bible version name before it is interpolated
/// as a table identifier.
fn bible_table(bible: &str) -> Result<&str> {
    if !bible.ends_with("_bible") {
        return Err(EngineError::TypeMismatch(
            "operation only supported on Bible tables".into(),
        ));
    }
    if !bible
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(EngineError::MalformedInput(format!(
            "invalid Bible table name: {bible}"
        )));
    }
    Ok(bible)
}

#[async_trait]
impl TranslationStore for PgStore {
    async fn language(&self, code: &str) -> Result<Option<Language>> {
        let row = sqlx::query("SELECT language_id, code, name FROM languages WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok(Language {
                id: r.try_get("language_id")?,
                code: r.try_get("code")?,
                name: r.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn add_language(&self, code: &str, name: &str) -> Result<Language> {
        let row = sqlx::query(
            "INSERT INTO languages (code, name) VALUES ($1, $2) RETURNING language_id",
        )
        .bind(code)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(Language {
            id: row.try_get("language_id")?,
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    async fn memory_tokens(&self, src_code: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT token FROM translation_memory WHERE source_lang = $1 ORDER BY token",
        )
        .bind(src_code)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("token").map_err(EngineError::from))
            .collect()
    }

    async fn memory_row(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
    ) -> Result<Option<TranslationMemoryRow>> {
        let row = sqlx::query(
            r#"SELECT translations, metadata FROM translation_memory
               WHERE source_lang = $1 AND target_lang = $2 AND token = $3"#,
        )
        .bind(src_code)
        .bind(trg_code)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            let translations: serde_json::Value = r.try_get("translations")?;
            let translations: BTreeMap<String, TranslationStats> =
                serde_json::from_value(translations)?;
            Ok(TranslationMemoryRow {
                src_lang: src_code.to_string(),
                trg_lang: Some(trg_code.to_string()),
                token: token.to_string(),
                translations,
                metadata: r.try_get("metadata")?,
            })
        })
        .transpose()
    }

    async fn cross_target_metadata(
        &self,
        src_code: &str,
        token: &str,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query(
            r#"SELECT metadata FROM translation_memory
               WHERE source_lang = $1 AND token = $2 AND metadata IS NOT NULL
               LIMIT 1"#,
        )
        .bind(src_code)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|r| r.try_get::<serde_json::Value, _>("metadata"))
            .transpose()?)
    }

    async fn add_translation(
        &self,
        src_code: &str,
        trg_code: &str,
        token: &str,
        translation: &str,
        occurrences: u64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(
            r#"SELECT translations FROM translation_memory
               WHERE source_lang = $1 AND target_lang = $2 AND token = $3
               FOR UPDATE"#,
        )
        .bind(src_code)
        .bind(trg_code)
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(row) => {
                let translations: serde_json::Value = row.try_get("translations")?;
                let mut translations: BTreeMap<String, TranslationStats> =
                    serde_json::from_value(translations)?;
                translations
                    .entry(translation.to_string())
                    .or_insert(TranslationStats { frequency: 0 })
                    .frequency += occurrences;
                sqlx::query(
                    r#"UPDATE translation_memory SET translations = $4
                       WHERE source_lang = $1 AND target_lang = $2 AND token = $3"#,
                )
                .bind(src_code)
                .bind(trg_code)
                .bind(token)
                .bind(serde_json::to_value(&translations)?)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                let metadata = sqlx::query(
                    r#"SELECT metadata FROM translation_memory
                       WHERE source_lang = $1 AND token = $2 AND metadata IS NOT NULL
                       LIMIT 1"#,
                )
                .bind(src_code)
                .bind(token)
                .fetch_optional(&mut *tx)
                .await?
                .map(|r| r.try_get::<serde_json::Value, _>("metadata"))
                .transpose()?;
                let mut translations = BTreeMap::new();
                translations.insert(
                    translation.to_string(),
                    TranslationStats {
                        frequency: occurrences,
                    },
                );
                sqlx::query(
                    r#"INSERT INTO translation_memory
                       (source_lang, target_lang, token, translations, metadata)
                       VALUES ($1, $2, $3, $4, $5)"#,
                )
                .bind(src_code)
                .bind(trg_code)
                .bind(token)
                .bind(serde_json::to_value(&translations)?)
                .bind(metadata)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        debug!(token, translation, occurrences, "recorded confirmed translation");
        Ok(())
    }

    async fn create_project(&self, project: ProjectRow) -> Result<ProjectRow> {
        let row = sqlx::query(
            r#"INSERT INTO translation_projects
               (name, source_lang_id, target_lang_id, metadata, active)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING project_id"#,
        )
        .bind(&project.name)
        .bind(project.source.id)
        .bind(project.target.id)
        .bind(serde_json::to_value(&project.metadata)?)
        .bind(project.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(ProjectRow {
            id: row.try_get("project_id")?,
            ..project
        })
    }

    async fn project(&self, project_id: i64) -> Result<Option<ProjectRow>> {
        let sql = format!("{PROJECT_SELECT} WHERE p.project_id = $1");
        let row = sqlx::query(&sql)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::project_from_row(&r)).transpose()
    }

    async fn update_project(&self, project: &ProjectRow) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE translation_projects
               SET metadata = $2, active = $3
               WHERE project_id = $1"#,
        )
        .bind(project.id)
        .bind(serde_json::to_value(&project.metadata)?)
        .bind(project.active)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotAvailable(format!(
                "project with id, {}, not found",
                project.id
            )));
        }
        Ok(())
    }

    async fn projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRow>> {
        let mut sql = format!("{PROJECT_SELECT} WHERE 1 = 1");
        let mut next_param = 0;
        let mut param = |column: &str| {
            next_param += 1;
            format!(" AND {column} = ${next_param}")
        };
        if filter.name.is_some() {
            sql.push_str(&param("p.name"));
        }
        if filter.source_code.is_some() {
            sql.push_str(&param("s.code"));
        }
        if filter.target_code.is_some() {
            sql.push_str(&param("t.code"));
        }
        if filter.active.is_some() {
            sql.push_str(&param("p.active"));
        }
        sql.push_str(" ORDER BY p.project_id");

        let mut query = sqlx::query(&sql);
        if let Some(name) = &filter.name {
            query = query.bind(name);
        }
        if let Some(code) = &filter.source_code {
            query = query.bind(code);
        }
        if let Some(code) = &filter.target_code {
            query = query.bind(code);
        }
        if let Some(active) = filter.active {
            query = query.bind(active);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::project_from_row).collect()
    }

    async fn insert_sentences(&self, rows: Vec<SentenceRow>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"INSERT INTO translation_sentences
                   (project_id, sentence_id, surrogate_id, sentence, draft, draft_meta, version)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                   ON CONFLICT (project_id, sentence_id) DO NOTHING"#,
            )
            .bind(row.project_id)
            .bind(row.sentence_id)
            .bind(&row.surrogate_id)
            .bind(&row.sentence)
            .bind(&row.draft)
            .bind(serde_json::to_value(&row.draft_meta)?)
            .bind(row.version)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn sentences(
        &self,
        project_id: i64,
        selector: &SentenceSelector,
    ) -> Result<Vec<SentenceRow>> {
        let mut clauses: Vec<String> = Vec::new();
        if let Some(books) = &selector.books {
            let mut ranges = Vec::new();
            for code in books {
                let id = super::models::book_id(code).ok_or_else(|| {
                    EngineError::NotAvailable(format!("book, {code}, not in database"))
                })?;
                let start = id * 1_000_000;
                ranges.push(format!(
                    "sentence_id BETWEEN {start} AND {}",
                    start + 999_999
                ));
            }
            clauses.push(format!("({})", ranges.join(" OR ")));
        } else if let Some((lo, hi)) = selector.id_range {
            clauses.push(format!("sentence_id BETWEEN {lo} AND {hi}"));
        } else if let Some(list) = &selector.id_list {
            if list.is_empty() {
                return Ok(Vec::new());
            }
            let ids: Vec<String> = list.iter().map(i64::to_string).collect();
            clauses.push(format!("sentence_id IN ({})", ids.join(", ")));
        }
        let mut sql = String::from(
            r#"SELECT project_id, sentence_id, surrogate_id, sentence, draft, draft_meta, version
               FROM translation_sentences WHERE project_id = $1"#,
        );
        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY sentence_id");
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::sentence_from_row).collect()
    }

    async fn sentence(&self, project_id: i64, sentence_id: i64) -> Result<Option<SentenceRow>> {
        let row = sqlx::query(
            r#"SELECT project_id, sentence_id, surrogate_id, sentence, draft, draft_meta, version
               FROM translation_sentences
               WHERE project_id = $1 AND sentence_id = $2"#,
        )
        .bind(project_id)
        .bind(sentence_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::sentence_from_row(&r)).transpose()
    }

    async fn save_sentence(&self, row: &SentenceRow) -> Result<i64> {
        let updated = sqlx::query(
            r#"UPDATE translation_sentences
               SET draft = $4, draft_meta = $5, version = version + 1
               WHERE project_id = $1 AND sentence_id = $2 AND version = $3
               RETURNING version"#,
        )
        .bind(row.project_id)
        .bind(row.sentence_id)
        .bind(row.version)
        .bind(&row.draft)
        .bind(serde_json::to_value(&row.draft_meta)?)
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(r) => Ok(r.try_get("version")?),
            None => {
                let exists = sqlx::query(
                    "SELECT version FROM translation_sentences WHERE project_id = $1 AND sentence_id = $2",
                )
                .bind(row.project_id)
                .bind(row.sentence_id)
                .fetch_optional(&self.pool)
                .await?;
                match exists {
                    Some(r) => {
                        let stored: i64 = r.try_get("version")?;
                        Err(EngineError::Conflict(format!(
                            "sentence {} was updated concurrently (stored version {stored}, caller had {})",
                            row.sentence_id, row.version
                        )))
                    }
                    None => Err(EngineError::NotAvailable(format!(
                        "sentence id, {}, not found for the selected project",
                        row.sentence_id
                    ))),
                }
            }
        }
    }

    async fn bible_verses(&self, bible: &str, book_id: i64) -> Result<Vec<VerseRecord>> {
        let table = bible_table(bible)?;
        let start = book_id * 1_000_000;
        let sql = format!(
            r#"SELECT ref_id, book_id, chapter, verse, text FROM {table}
               WHERE ref_id BETWEEN $1 AND $2 ORDER BY ref_id"#,
        );
        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(start + 999_999)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                let book_id: i64 = r.try_get("book_id")?;
                Ok(VerseRecord {
                    book_code: book_code(book_id)
                        .ok_or_else(|| {
                            EngineError::NotAvailable(format!(
                                "book number {book_id} not a valid one"
                            ))
                        })?
                        .to_string(),
                    book_id,
                    chapter: r.try_get("chapter")?,
                    verse: r.try_get("verse")?,
                    text: r.try_get("text")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bible_table_names_are_validated() {
        assert!(bible_table("hin_irv_1_bible").is_ok());
        assert!(matches!(
            bible_table("hin_irv"),
            Err(EngineError::TypeMismatch(_))
        ));
        assert!(matches!(
            bible_table("hin; DROP TABLE x; _bible"),
            Err(EngineError::MalformedInput(_))
        ));
    }
}
