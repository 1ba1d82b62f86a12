use crate::cue::{CaptionSet, Cue};
use crate::error::{CaptionError, Result};
use crate::parser::parse_srt;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

pub type LoadFuture = Pin<Box<dyn Future<Output = Result<CaptionSet>> + Send>>;

/// Where caption sets come from.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<CaptionSet>;
}

/// The caption service: `GET <base>/api/caption?hash=<video id>` answering a
/// JSON array of cues.
pub struct HttpCaptionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCaptionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/caption", self.base_url)
    }
}

#[async_trait]
impl CaptionSource for HttpCaptionSource {
    async fn fetch(&self, video_id: &str) -> Result<CaptionSet> {
        debug!(video_id, url = %self.endpoint(), "requesting captions");
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("hash", video_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        CaptionSet::from_json(video_id, &body)
    }
}

/// A local SubRip file, served for whatever video is asked for.
pub struct SrtCaptionSource {
    path: PathBuf,
}

impl SrtCaptionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptionSource for SrtCaptionSource {
    async fn fetch(&self, video_id: &str) -> Result<CaptionSet> {
        debug!(video_id, path = %self.path.display(), "reading captions");
        let data = tokio::fs::read_to_string(&self.path).await?;
        parse_srt(video_id, &data)
    }
}

/// Holds the caption set of the current video.
pub struct CaptionStore {
    source: Arc<dyn CaptionSource>,
    current: CaptionSet,
}

impl CaptionStore {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self {
            source,
            current: CaptionSet::default(),
        }
    }

    /// Starts fetching the captions of `video_id`. The store is untouched
    /// until the result is handed to [`CaptionStore::replace`].
    pub fn load(&self, video_id: impl Into<String>) -> LoadFuture {
        let source = Arc::clone(&self.source);
        let video_id = video_id.into();
        Box::pin(async move { source.fetch(&video_id).await })
    }

    pub fn replace(&mut self, set: CaptionSet) {
        info!(video_id = set.video_id(), cues = set.len(), "captions loaded");
        self.current = set;
    }

    pub fn current_set(&self) -> &CaptionSet {
        &self.current
    }

    pub fn cues(&self) -> &[Cue] {
        self.current.cues()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_cues_from_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/caption"))
            .and(query_param("hash", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"start":0,"end":1000,"text":"a"},{"start":1000,"end":2500,"text":"b"}]"#,
            ))
            .mount(&server)
            .await;

        let source = HttpCaptionSource::new(format!("{}/", server.uri()));
        let set = source.fetch("dQw4w9WgXcQ").await.unwrap();

        assert_eq!(set.video_id(), "dQw4w9WgXcQ");
        assert_eq!(set.cues(), &[Cue::new(0, 1000, "a"), Cue::new(1000, 2500, "b")]);
    }

    #[tokio::test]
    async fn error_status_is_a_load_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = HttpCaptionSource::new(server.uri()).fetch("x").await.unwrap_err();
        assert!(matches!(err, CaptionError::Status(404)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_load_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"oops\": true}"))
            .mount(&server)
            .await;

        let err = HttpCaptionSource::new(server.uri()).fetch("x").await.unwrap_err();
        assert!(matches!(err, CaptionError::Payload(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_load_failure() {
        let err = HttpCaptionSource::new("http://127.0.0.1:9")
            .fetch("x")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::Network(_)));
    }

    #[tokio::test]
    async fn reads_local_srt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\n00:00:00,000 --> 00:00:01,000\nlocal\n").unwrap();

        let set = SrtCaptionSource::new(file.path()).fetch("any").await.unwrap();
        assert_eq!(set.cues(), &[Cue::new(0, 1000, "local")]);

        let err = SrtCaptionSource::new("/nonexistent/captions.srt")
            .fetch("any")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::Io(_)));
    }

    #[tokio::test]
    async fn store_keeps_last_loaded_set() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\n00:00:00,000 --> 00:00:01,000\nlocal\n").unwrap();
        let mut store = CaptionStore::new(Arc::new(SrtCaptionSource::new(file.path())));
        assert!(store.current_set().is_empty());

        let set = store.load("v1").await.unwrap();
        assert!(store.cues().is_empty());
        store.replace(set);

        assert_eq!(store.current_set().video_id(), "v1");
        assert_eq!(store.cues().len(), 1);
    }
}
