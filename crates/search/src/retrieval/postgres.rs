//! PostgreSQL [`ChunkStore`] using pgvector and full-text search
//!
//! Reads `project_doc_chunks`. Vector search ranks by the pgvector cosine
//! distance operator `<=>`; keyword search ranks with `ts_rank_cd`.

use super::{ChunkStore, RetrievalMode, RetrievedChunk};
use async_trait::async_trait;
use bouwrag_common::db::models::{format_embedding, parse_embedding};
use bouwrag_common::db::DbPool;
use bouwrag_common::errors::Result;
use sea_orm::{DbBackend, FromQueryResult, Statement};
use std::sync::Arc;
use uuid::Uuid;

const CHUNK_COLUMNS: &str =
    "id, project_id, file_id, chunk_index, text, source_file, page_number, section_title";

/// Chunk store backed by Postgres
pub struct PgChunkStore {
    db: Arc<DbPool>,
    text_search_config: String,
}

impl PgChunkStore {
    /// Create a store; `text_search_config` names the Postgres text search
    /// configuration (e.g. `dutch`)
    pub fn new(db: Arc<DbPool>, text_search_config: impl Into<String>) -> Self {
        Self {
            db,
            text_search_config: text_search_config.into(),
        }
    }

    async fn query_chunks(
        &self,
        sql: &str,
        values: Vec<sea_orm::Value>,
        mode: RetrievalMode,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = ChunkRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            values,
        ))
        .all(self.db.read())
        .await?;

        Ok(rows.into_iter().map(|row| row.into_chunk(mode)).collect())
    }
}

/// Query result row
#[derive(Debug, FromQueryResult)]
struct ChunkRow {
    id: Uuid,
    project_id: Uuid,
    file_id: Uuid,
    chunk_index: i32,
    text: String,
    source_file: String,
    page_number: Option<i32>,
    section_title: Option<String>,
    score: f64,
}

impl ChunkRow {
    fn into_chunk(self, mode: RetrievalMode) -> RetrievedChunk {
        let similarity = match mode {
            // ts_rank_cd is unbounded; squash into [0, 1)
            RetrievalMode::Keyword => normalize_text_rank(self.score),
            _ => self.score as f32,
        };
        RetrievedChunk {
            chunk_id: self.id,
            project_id: self.project_id,
            file_id: self.file_id,
            text: self.text,
            chunk_index: self.chunk_index,
            source_file: self.source_file,
            page_number: self.page_number,
            section_title: self.section_title,
            similarity,
            retrieval_mode: mode,
            metadata: Default::default(),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct EmbeddingRow {
    embedding: Option<String>,
}

fn normalize_text_rank(score: f64) -> f32 {
    let score = score.max(0.0);
    (score / (score + 1.0)) as f32
}

#[async_trait]
impl ChunkStore for PgChunkStore {
    async fn vector_search(
        &self,
        project_id: Uuid,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let sql = format!(
            r#"
            SELECT {CHUNK_COLUMNS},
                   1 - (embedding <=> CAST($2 AS vector)) AS score
            FROM project_doc_chunks
            WHERE project_id = $1
              AND embedding IS NOT NULL
              AND 1 - (embedding <=> CAST($2 AS vector)) >= $3
            ORDER BY embedding <=> CAST($2 AS vector)
            LIMIT $4
            "#
        );

        self.query_chunks(
            &sql,
            vec![
                project_id.into(),
                format_embedding(embedding).into(),
                (min_similarity as f64).into(),
                (limit as i64).into(),
            ],
            RetrievalMode::Vector,
        )
        .await
    }

    async fn keyword_search(
        &self,
        project_id: Uuid,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            r#"
            SELECT {CHUNK_COLUMNS},
                   ts_rank_cd(
                       to_tsvector(CAST($3 AS regconfig), text),
                       plainto_tsquery(CAST($3 AS regconfig), $2)
                   )::float8 AS score
            FROM project_doc_chunks
            WHERE project_id = $1
              AND to_tsvector(CAST($3 AS regconfig), text) @@ plainto_tsquery(CAST($3 AS regconfig), $2)
            ORDER BY score DESC
            LIMIT $4
            "#
        );

        self.query_chunks(
            &sql,
            vec![
                project_id.into(),
                query.to_string().into(),
                self.text_search_config.clone().into(),
                (limit as i64).into(),
            ],
            RetrievalMode::Keyword,
        )
        .await
    }

    async fn chunk_embedding(&self, project_id: Uuid, chunk_id: Uuid) -> Result<Option<Vec<f32>>> {
        let row = EmbeddingRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT embedding::text AS embedding FROM project_doc_chunks WHERE project_id = $1 AND id = $2",
            vec![project_id.into(), chunk_id.into()],
        ))
        .one(self.db.read())
        .await?;

        Ok(row
            .and_then(|r| r.embedding)
            .and_then(|raw| parse_embedding(&raw)))
    }

    async fn nearest_to_chunk(
        &self,
        project_id: Uuid,
        chunk_id: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let sql = format!(
            r#"
            SELECT {CHUNK_COLUMNS},
                   1 - (embedding <=> CAST($3 AS vector)) AS score
            FROM project_doc_chunks
            WHERE project_id = $1
              AND id <> $2
              AND embedding IS NOT NULL
            ORDER BY embedding <=> CAST($3 AS vector)
            LIMIT $4
            "#
        );

        self.query_chunks(
            &sql,
            vec![
                project_id.into(),
                chunk_id.into(),
                format_embedding(embedding).into(),
                (limit as i64).into(),
            ],
            RetrievalMode::Vector,
        )
        .await
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
