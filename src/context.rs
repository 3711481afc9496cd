/// Application context and dependency injection
use crate::{
    account::{Catalog, IntakeWorkflow, UpdateWorkflow, Worklist},
    auth::Authenticator,
    config::ServerConfig,
    error::PortalResult,
    record_store::{self, RecordStore},
    session::SessionStore,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub record_store: Arc<dyn RecordStore>,
    pub sessions: SessionStore,
    // Workflows
    pub authenticator: Arc<Authenticator>,
    pub intake: Arc<IntakeWorkflow>,
    pub updates: Arc<UpdateWorkflow>,
    pub worklist: Arc<Worklist>,
    pub catalog: Arc<Catalog>,
    offset: FixedOffset,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PortalResult<Self> {
        // Validate configuration
        config.validate()?;

        let record_store = record_store::from_config(&config.record_store).await?;
        Self::with_store(config, record_store)
    }

    /// Create a context around an already constructed record store
    pub fn with_store(
        config: ServerConfig,
        record_store: Arc<dyn RecordStore>,
    ) -> PortalResult<Self> {
        let offset = config.business_offset()?;
        let idle_timeout = config.idle_timeout()?;

        let authenticator = Arc::new(Authenticator::new(record_store.clone()));
        let intake = Arc::new(IntakeWorkflow::new(record_store.clone()));
        let updates = Arc::new(UpdateWorkflow::new(
            record_store.clone(),
            config.activity.clone(),
        ));
        let worklist = Arc::new(Worklist::new(record_store.clone(), config.worklist.limit));
        let catalog = Arc::new(Catalog::new(record_store.clone()));

        Ok(Self {
            config: Arc::new(config),
            record_store,
            sessions: SessionStore::new(idle_timeout),
            authenticator,
            intake,
            updates,
            worklist,
            catalog,
            offset,
        })
    }

    /// Current time in the business time zone
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Current date in the business time zone
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
