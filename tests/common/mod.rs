//! Shared harness for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use course_catalog::catalog::{CatalogService, CourseDraft, CourseId, CourseRecord, ValidationConfig};
use course_catalog::config::{CatalogConfig, StoreBackend};
use course_catalog::lifecycle::Shutdown;
use course_catalog::observability::metrics::MetricsAggregator;
use course_catalog::observability::tracing::{InMemoryExporter, Tracer};
use course_catalog::observability::Instrumentation;
use course_catalog::store::{CourseStore, MemoryStore, StoreError};
use course_catalog::HttpServer;
use tokio::net::TcpListener;

/// A running server plus handles to inspect what it recorded.
pub struct TestServer {
    pub addr: SocketAddr,
    pub spans: InMemoryExporter,
    pub catalog: CatalogService,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build a catalog service over `store` that records spans in memory.
pub fn catalog_with(store: Arc<dyn CourseStore>) -> (CatalogService, InMemoryExporter) {
    let spans = InMemoryExporter::new();
    let instrumentation = Instrumentation::new(
        Tracer::new(Arc::new(spans.clone())),
        Arc::new(MetricsAggregator::new()),
    );
    let catalog = CatalogService::new(store, ValidationConfig::default(), instrumentation);
    (catalog, spans)
}

/// Start a server on an ephemeral port.
pub async fn start_server_with(store: Arc<dyn CourseStore>) -> TestServer {
    let (catalog, spans) = catalog_with(store);

    let mut config = CatalogConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.store.backend = StoreBackend::Memory;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, catalog.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    TestServer {
        addr,
        spans,
        catalog,
        client,
        shutdown,
    }
}

pub async fn start_server() -> TestServer {
    start_server_with(Arc::new(MemoryStore::new())).await
}

/// A store whose every call fails.
pub struct FailingStore;

impl CourseStore for FailingStore {
    fn create(&self, _draft: CourseDraft) -> Result<CourseRecord, StoreError> {
        Err(StoreError::Unavailable("injected failure".into()))
    }

    fn list(&self) -> Result<Vec<CourseRecord>, StoreError> {
        Err(StoreError::Unavailable("injected failure".into()))
    }

    fn get(&self, _id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
        Err(StoreError::Unavailable("injected failure".into()))
    }

    fn delete(&self, _id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
        Err(StoreError::Unavailable("injected failure".into()))
    }
}
