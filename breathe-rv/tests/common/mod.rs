//! Shared test fixtures: in-memory database, tempdir content store,
//! file-backed user directory, and a scripted scorer.

#![allow(dead_code)]

use async_trait::async_trait;
use breathe_common::{Error, Result};
use breathe_rv::services::content_store::ContentStore;
use breathe_rv::services::scorer::{ScoreOutcome, Scorer};
use breathe_rv::services::user_directory::JsonUserDirectory;
use breathe_rv::services::verification::VerificationPipeline;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

pub const USERS_JSON: &str = r#"[
    {"name": "alice", "email": "alice@example.com", "password": "x", "role": "citizen"},
    {"name": "bob", "email": "bob@example.com", "password": "y", "role": "citizen"}
]"#;

/// Scorer returning fixed confidences, or failing on demand
pub struct StubScorer {
    pub pollution_confidence: f64,
    pub description_match_confidence: f64,
    pub awarded_credits: i64,
    pub fail: bool,
}

impl StubScorer {
    pub fn returning(pollution: f64, description: f64) -> Self {
        Self {
            pollution_confidence: pollution,
            description_match_confidence: description,
            awarded_credits: 100,
            fail: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            pollution_confidence: 0.0,
            description_match_confidence: 0.0,
            awarded_credits: 0,
            fail: true,
        }
    }
}

#[async_trait]
impl Scorer for StubScorer {
    async fn score(
        &self,
        _image: &[u8],
        _filename: &str,
        _description: &str,
    ) -> Result<ScoreOutcome> {
        if self.fail {
            return Err(Error::ScorerUnavailable("stub scorer offline".to_string()));
        }

        let mut details = serde_json::Map::new();
        details.insert("edge_density_score".to_string(), json!("61.20%"));

        Ok(ScoreOutcome {
            pollution_confidence: self.pollution_confidence,
            description_match_confidence: self.description_match_confidence,
            awarded_credits: self.awarded_credits,
            details,
        })
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub store: Arc<ContentStore>,
    pub users: Arc<JsonUserDirectory>,
}

pub async fn test_env() -> TestEnv {
    let dir = TempDir::new().unwrap();

    let users_path = dir.path().join("data").join("users.json");
    std::fs::create_dir_all(users_path.parent().unwrap()).unwrap();
    std::fs::write(&users_path, USERS_JSON).unwrap();

    let pool = SqlitePool::connect(":memory:").await.unwrap();
    breathe_rv::db::init_tables(&pool).await.unwrap();

    TestEnv {
        store: Arc::new(ContentStore::new(dir.path().join("uploads")).unwrap()),
        users: Arc::new(JsonUserDirectory::new(users_path)),
        pool,
        dir,
    }
}

pub fn pipeline(env: &TestEnv, scorer: impl Scorer + 'static) -> VerificationPipeline {
    VerificationPipeline::new(
        env.pool.clone(),
        env.store.clone(),
        Arc::new(scorer),
        env.users.clone(),
    )
}
