#![allow(dead_code)]

use boardzapp::model::Dataset;
use boardzapp::provider::DataProvider;
use boardzapp::store::backend::StorageBackend;
use boardzapp::store::board_store::BoardStore;
use boardzapp::store::document_backend::DocumentBackend;
use boardzapp::store::indexed_backend::{IndexedBackend, DATABASE_FILE};
use boardzapp::store::remote_backend::{RemoteBackend, DATA_PATH};
use boardzapp::store::slot::FileSlot;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// A board server that remembers the last document posted to it.
pub struct FakeServer {
    pub server: MockServer,
    pub state: Arc<Mutex<Value>>,
}

struct ServeState(Arc<Mutex<Value>>);

impl Respond for ServeState {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let state = self.0.lock().unwrap().clone();
        ResponseTemplate::new(200).set_body_json(state)
    }
}

struct StoreState(Arc<Mutex<Value>>);

impl Respond for StoreState {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        match serde_json::from_slice::<Value>(&request.body) {
            Ok(body) => {
                *self.0.lock().unwrap() = body;
                ResponseTemplate::new(204)
            }
            Err(_) => ResponseTemplate::new(400),
        }
    }
}

impl FakeServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(
            serde_json::to_value(Dataset::default()).unwrap(),
        ));

        Mock::given(method("GET"))
            .and(path(DATA_PATH))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ServeState(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DATA_PATH))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(StoreState(state.clone()))
            .mount(&server)
            .await;
        // Anything without the right token.
        Mock::given(path(DATA_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .with_priority(10)
            .mount(&server)
            .await;

        Self { server, state }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn dataset(&self) -> Dataset {
        serde_json::from_value(self.state.lock().unwrap().clone()).unwrap()
    }
}

/// One provider under test, with raw access to its backend and whatever
/// keeps its substrate alive.
pub struct Harness {
    pub name: &'static str,
    pub raw: Arc<dyn StorageBackend>,
    pub provider: BoardStore<Arc<dyn StorageBackend>>,
    _dir: Option<TempDir>,
    _server: Option<FakeServer>,
}

impl Harness {
    fn new(
        name: &'static str,
        raw: Arc<dyn StorageBackend>,
        dir: Option<TempDir>,
        server: Option<FakeServer>,
    ) -> Self {
        Self {
            name,
            provider: BoardStore::with_backend(raw.clone()),
            raw,
            _dir: dir,
            _server: server,
        }
    }

    pub async fn local() -> Self {
        let dir = TempDir::new().unwrap();
        let raw = Arc::new(DocumentBackend::new(FileSlot::new(dir.path())));
        let harness = Self::new("local", raw, Some(dir), None);
        harness.provider.initialize().await.unwrap();
        harness
    }

    pub async fn indexed() -> Self {
        let dir = TempDir::new().unwrap();
        let raw = Arc::new(IndexedBackend::open(dir.path().join(DATABASE_FILE)));
        let harness = Self::new("indexed", raw, Some(dir), None);
        harness.provider.initialize().await.unwrap();
        harness
    }

    pub async fn remote() -> Self {
        let server = FakeServer::start().await;
        let raw = Arc::new(RemoteBackend::new(server.uri(), TOKEN));
        let harness = Self::new("remote", raw, None, Some(server));
        harness.provider.initialize().await.unwrap();
        harness
    }

    pub fn as_provider(&self) -> &dyn DataProvider {
        &self.provider
    }
}

/// One harness per backend kind.
pub async fn all_backends() -> Vec<Harness> {
    vec![
        Harness::local().await,
        Harness::indexed().await,
        Harness::remote().await,
    ]
}
