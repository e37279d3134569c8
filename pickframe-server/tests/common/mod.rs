#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use pickframe_config::{ConfigLoad, ConfigLoader, EnvConfig};
use pickframe_core::{
    ImageMetadata, ImageTransformer, InventoryScanner, MetadataError, MetadataExtractor,
    ScanError, TransformError, TransformedImage,
};
use pickframe_server::infra::config::Config;
use pickframe_server::infra::startup::{Collaborators, build_state};
use pickframe_server::{AppState, create_app};

pub const ROOT: &str = "/photos";

pub fn photo(relative: &str) -> PathBuf {
    Path::new(ROOT).join(relative)
}

/// First scan returns `initial`, every later scan returns `rescan`.
pub struct FakeScanner {
    initial: Vec<PathBuf>,
    rescan: Vec<PathBuf>,
    pub calls: AtomicUsize,
}

impl FakeScanner {
    pub fn new(initial: Vec<PathBuf>, rescan: Vec<PathBuf>) -> Self {
        Self {
            initial,
            rescan,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InventoryScanner for FakeScanner {
    async fn scan(&self, _root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(self.initial.clone())
        } else {
            Ok(self.rescan.clone())
        }
    }
}

/// Fails the first `fail_first` calls, optionally sleeping before answering.
pub struct FakeTransformer {
    fail_first: usize,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeTransformer {
    pub fn ok() -> Self {
        Self::failing(0)
    }

    pub fn failing(fail_first: usize) -> Self {
        Self {
            fail_first,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            fail_first: 0,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageTransformer for FakeTransformer {
    async fn transform(
        &self,
        path: &Path,
        _cancel: CancellationToken,
    ) -> Result<TransformedImage, TransformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.fail_first {
            return Err(TransformError::Worker(format!("cannot decode {}", path.display())));
        }
        Ok(TransformedImage {
            path: path.to_path_buf(),
            bytes: b"fake-jpeg-bytes".to_vec(),
            mime: "image/jpeg".into(),
        })
    }
}

/// `Some` answers with that capture date, `None` fails like a file without EXIF.
pub struct FakeExtractor(pub Option<&'static str>);

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, _path: &Path) -> Result<ImageMetadata, MetadataError> {
        match self.0 {
            Some(date) => Ok(ImageMetadata {
                capture_date: Some(date.to_string()),
            }),
            None => Err(MetadataError::Io(std::io::Error::other("no exif block"))),
        }
    }
}

/// Config rooted at [`ROOT`] with refill disabled unless overridden.
pub fn test_config(overrides: EnvConfig) -> Config {
    let mut env = overrides;
    env.root_folder.get_or_insert_with(|| PathBuf::from(ROOT));
    env.refill_watermark.get_or_insert_with(|| "0".into());

    let ConfigLoad { config, .. } = ConfigLoader::compose(env);
    config
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub scanner: Arc<FakeScanner>,
    pub transformer: Arc<FakeTransformer>,
}

pub async fn spawn_app(
    config: Config,
    scanner: FakeScanner,
    transformer: FakeTransformer,
    extractor: FakeExtractor,
) -> TestApp {
    let scanner = Arc::new(scanner);
    let transformer = Arc::new(transformer);
    let collaborators = Collaborators {
        scanner: scanner.clone(),
        transformer: transformer.clone(),
        extractor: Arc::new(extractor),
    };

    let state = build_state(Arc::new(config), collaborators)
        .await
        .expect("state builds");
    let server = TestServer::new(create_app(state.clone())).expect("test server");

    TestApp {
        server,
        state,
        scanner,
        transformer,
    }
}
