use cucumber::World;
use ledger_engine::{
    db_types::RequestMetadata,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    IngestReport,
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
    pub last_report: Option<IngestReport>,
}

#[derive(Debug)]
pub struct LedgerSystem {
    pub db_path: String,
    pub api: ReconciliationApi<SqliteDatabase>,
}

impl LedgerWorld {
    pub fn api(&self) -> &ReconciliationApi<SqliteDatabase> {
        &self.system.as_ref().expect("ReconciliationApi not initialised").api
    }

    pub fn meta() -> RequestMetadata {
        RequestMetadata::new(Some("198.51.100.20"), Some("cucumber"))
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 2).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let api = ReconciliationApi::new(db, Default::default());
        Self { db_path: url, api }
    }
}
