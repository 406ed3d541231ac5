//! Radio show archive, served under `/zifim` on the `www` host.
//!
//! The list of shows is polled from the archive's GitHub repository every
//! [`REFRESH_INTERVAL`] by a single background task and published through a [`watch`]
//! channel. Request handlers only ever read the latest published [`ShowList`] snapshot.
//! A failed or shorter poll keeps the last published list.
//!
//! # Endpoints
//!
//! * `GET /zifim/shows`: JSON array of show ids (`yy-mm-dd`), oldest first.
//! * `GET /zifim/view/:date`: HTML fragment with the show's player and a lazy link to the
//!   previous show. `latest` selects the newest show.
//! * `GET /zifim/show/:date`: the show's track list, one track per line.

mod model;
mod routes;

pub use routes::routes;

use crate::error::Error;
use model::Tree;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const TREE_URL: &str = "https://api.github.com/repos/shmul/zifim/git/trees/HEAD?recursive=true";
pub const RAW_URL: &str = "https://raw.githubusercontent.com/shmul/zifim/master";
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);
const USER_AGENT: &str = concat!("bekind/", env!("CARGO_PKG_VERSION"));

/// Read side of the show list.
#[derive(Clone)]
pub struct ShowList {
    rx: watch::Receiver<Arc<Vec<String>>>,
}

impl ShowList {
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.rx.borrow().clone()
    }
}

/// Write side of the show list. There's exactly one.
pub struct ShowPublisher {
    tx: watch::Sender<Arc<Vec<String>>>,
}

impl ShowPublisher {
    /// Publish `shows` if it's longer than the current list. Returns whether it was published.
    pub fn publish(&self, shows: Vec<String>) -> bool {
        self.tx.send_if_modified(|current| {
            if shows.len() > current.len() {
                *current = Arc::new(shows);
                true
            } else {
                false
            }
        })
    }
}

#[must_use]
pub fn channel() -> (ShowPublisher, ShowList) {
    let (tx, rx) = watch::channel(Arc::new(Vec::new()));
    (ShowPublisher { tx }, ShowList { rx })
}

/// Where show lists and track lists are fetched from.
#[derive(Clone)]
pub struct ShowSource {
    client: reqwest::Client,
    tree_url: String,
    raw_url: String,
}

impl ShowSource {
    pub fn new() -> Result<Self, Error> {
        Self::with_urls(TREE_URL, RAW_URL)
    }

    pub fn with_urls(tree_url: impl Into<String>, raw_url: impl Into<String>) -> Result<Self, Error> {
        Ok(ShowSource {
            client: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            tree_url: tree_url.into(),
            raw_url: raw_url.into(),
        })
    }

    pub async fn fetch_shows(&self) -> Result<Vec<String>, Error> {
        let tree: Tree = self
            .client
            .get(&self.tree_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if tree.truncated {
            warn!("show tree listing is truncated");
        }
        Ok(tree.show_ids())
    }

    /// Fetch the raw track list of the show `date` (`yy-mm-dd`).
    pub async fn fetch_tracks(&self, date: &str) -> Result<String, Error> {
        let year = date.split_once('-').map_or(date, |(year, _)| year);
        let url = format!("{}/20{year}/{date}.txt", self.raw_url);
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

/// Poll `source` and publish the results until `shutdown` is cancelled.
pub async fn refresh(source: ShowSource, publisher: ShowPublisher, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => match source.fetch_shows().await {
                Ok(shows) => {
                    let count = shows.len();
                    if publisher.publish(shows) {
                        info!(shows = count, "show list updated");
                    }
                }
                Err(err) => warn!(error = %err, "show list refresh failed"),
            },
            () = shutdown.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn keeps_last_known_good() {
        let (publisher, shows) = channel();
        assert!(shows.snapshot().is_empty());

        assert!(publisher.publish(ids(&["23-01-01", "23-01-08"])));
        assert_eq!(*shows.snapshot(), ids(&["23-01-01", "23-01-08"]));

        // failed or partial fetches don't replace a longer list
        assert!(!publisher.publish(Vec::new()));
        assert!(!publisher.publish(ids(&["23-01-15"])));
        assert_eq!(shows.snapshot().len(), 2);

        assert!(publisher.publish(ids(&["23-01-01", "23-01-08", "23-01-15"])));
        assert_eq!(shows.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn refresh_stops_on_shutdown() {
        let (publisher, _shows) = channel();
        let source = ShowSource::with_urls("http://127.0.0.1:1/tree", "http://127.0.0.1:1").unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(refresh(source, publisher, shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("refresh task didn't stop")
            .unwrap();
    }
}
