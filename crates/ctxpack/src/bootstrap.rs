//! Application bootstrap and service wiring
//!
//! Assembles the core services behind one `App` handle: configuration,
//! home layout, tracing, the Postgres store, the materializer, search, the
//! job scheduler, the update checker, and the agent driver. The chat model
//! is an external capability and gets injected by the caller.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use ctxpack_agent::{AgentDriver, ChatModel, ResearchRunner};
use ctxpack_chunking::Chunker;
use ctxpack_common::{ensure_home_layout, init_tracing_with_file, initialize_environment};
use ctxpack_config::{ApplicationConfig, Validate};
use ctxpack_embeddings::{Embedder, HttpEmbedder};
use ctxpack_git::Materializer;
use ctxpack_indexing::{EmbedderResolver, Indexer, JobScheduler, Supervisor, UpdateChecker};
use ctxpack_search::SearchService;
use ctxpack_store::{PgStore, initialize_database};

/// The assembled core services
pub struct App {
    pub config: ApplicationConfig,
    pub store: Arc<PgStore>,
    pub materializer: Materializer,
    pub search: Arc<SearchService>,
    pub scheduler: JobScheduler,
    pub supervisor: Arc<Supervisor>,
    pub update_checker: UpdateChecker,
    pub driver: AgentDriver,
    pub research: ResearchRunner,
    /// Keeps the rolling log writer alive for the process lifetime
    _log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Build the embedder resolver the scheduler uses for per-request overrides
pub fn build_embedder_resolver(config: &ApplicationConfig) -> EmbedderResolver {
    let embedding_config = config.embedding.clone();
    Arc::new(move |overrides| {
        HttpEmbedder::new(&embedding_config, overrides).map(|e| Arc::new(e) as Arc<dyn Embedder>)
    })
}

/// Build the materializer over the configured repos root
pub fn build_materializer(config: &ApplicationConfig) -> Materializer {
    Materializer::new(
        config.home.repos_dir(),
        config.indexing.git_timeout(),
        config.indexing.git_ls_remote_timeout(),
    )
}

/// Bootstrap the core with an injected chat model
///
/// Loads configuration from the environment, validates it, creates the home
/// layout, installs tracing with a file layer under `<home>/logs`, connects
/// (and migrates) the database, and wires every service.
///
/// # Errors
///
/// Returns configuration validation failures, home-directory IO errors, and
/// database connection/migration failures.
pub async fn bootstrap(chat: Arc<dyn ChatModel>) -> Result<App> {
    initialize_environment();

    let config = ApplicationConfig::from_env();
    config.validate()?;

    ensure_home_layout(&config.home.root)?;
    let log_guard = init_tracing_with_file("ctxpack", &config.home.logs_dir());
    info!(home = %config.home.root.display(), "ctxpack core starting");

    let pool = initialize_database(&config.database).await?;
    let store = Arc::new(PgStore::new(pool));

    let materializer = build_materializer(&config);
    let resolver = build_embedder_resolver(&config);

    // The process-default embedder backs query embedding for search
    let default_embedder = (*resolver)(None)?;
    let search = Arc::new(SearchService::new(
        store.clone(),
        default_embedder,
        config.home.repos_dir(),
        config.search.clone(),
    ));

    let indexer = Indexer::new(
        store.clone(),
        materializer.clone(),
        Chunker::new(config.indexing.max_chunk_size),
        config.indexing.clone(),
    );
    let scheduler = JobScheduler::new(store.clone(), indexer, resolver);

    let supervisor = Arc::new(Supervisor::new());
    let update_checker = UpdateChecker::new(
        store.clone(),
        materializer.clone(),
        Arc::clone(&supervisor),
    );

    let driver = AgentDriver::new(
        store.clone(),
        Arc::clone(&search),
        chat,
        materializer.clone(),
        config.home.repos_dir(),
        config.chat.clone(),
    )
    .with_update_checker(update_checker.clone());

    let research = ResearchRunner::new(driver.clone(), store.clone(), Arc::clone(&supervisor));

    info!("ctxpack core ready");
    Ok(App {
        config,
        store,
        materializer,
        search,
        scheduler,
        supervisor,
        update_checker,
        driver,
        research,
        _log_guard: log_guard,
    })
}
