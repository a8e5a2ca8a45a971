use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use super::title::TitleFetcher;

/// Canned titles keyed by URL. Unknown URLs fail like an unreachable page.
#[derive(Debug, Default)]
pub struct StubFetcher {
    titles: Mutex<HashMap<String, String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(self, url: &str, title: &str) -> Self {
        self.set_title(url, title);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_title(&self, url: &str, title: &str) {
        self.titles
            .lock()
            .unwrap()
            .insert(url.to_string(), title.to_string());
    }

    /// Make every later fetch of `url` fail.
    pub fn fail(&self, url: &str) {
        self.titles.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TitleFetcher for StubFetcher {
    async fn fetch_title(&self, url: &Url) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.titles.lock().unwrap().get(url.as_str()).cloned()
    }
}
