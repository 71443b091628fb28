//! Download tiles with bounded concurrency, tolerating the loss of individual tiles.

use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};

use crate::error::Result;

/// Where a tile lands on the canvas, in pixels. May lie partially or entirely outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A tile URL together with its destination on the canvas.
#[derive(Debug, Clone)]
pub(crate) struct TileDescriptor {
    pub url: String,
    pub dest: PixelBox,
}

/// Body of a successfully downloaded tile.
#[derive(Debug, Clone)]
pub(crate) struct FetchedTile {
    pub url: String,
    pub dest: PixelBox,
    pub body: Bytes,
}

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("mapsnap", "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected content type {0:?}")]
    ContentType(String),
}

/// Downloads tiles and marker icons. One instance per render; the underlying client keeps its
/// connection pool across all requests of that render.
pub(crate) struct TileFetcher {
    client: reqwest::Client,
    limit: usize,
}

impl TileFetcher {
    pub fn new(timeout: Duration, headers: &HeaderMap, limit: usize) -> Result<Self> {
        let mut headers = headers.clone();
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, limit })
    }

    /// Download all tiles, in sequential batches of the configured concurrency limit. Every
    /// batch is awaited in full before the next one starts; tile servers run fair-use caps on
    /// concurrent connections per client.
    /// <https://operations.osmfoundation.org/policies/tiles/#technical-usage-requirements>
    ///
    /// A limit of zero disables batching and issues everything at once.
    ///
    /// Failed tiles are dropped from the result. The returned tiles keep the descriptor order,
    /// so compositing stays deterministic no matter how downloads interleave.
    pub async fn fetch_tiles(&self, descriptors: Vec<TileDescriptor>) -> Vec<FetchedTile> {
        let total = descriptors.len();
        let mut tiles = Vec::with_capacity(total);

        if self.limit == 0 {
            let fetched = join_all(descriptors.into_iter().map(|d| self.fetch_tile(d))).await;
            tiles.extend(fetched.into_iter().flatten());
        } else {
            for batch in descriptors.chunks(self.limit) {
                let fetched = join_all(batch.iter().cloned().map(|d| self.fetch_tile(d))).await;
                tiles.extend(fetched.into_iter().flatten());
            }
        }

        log::debug!("Downloaded {}/{} tiles.", tiles.len(), total);
        tiles
    }

    /// Download one tile. Any failure - connection, timeout, HTTP status, wrong content type -
    /// is logged and turns into `None`; a missing tile must not take the whole render down.
    async fn fetch_tile(&self, descriptor: TileDescriptor) -> Option<FetchedTile> {
        match self.try_fetch(&descriptor.url).await {
            Ok(body) => Some(FetchedTile {
                url: descriptor.url,
                dest: descriptor.dest,
                body,
            }),
            Err(e) => {
                log::warn!("Could not download '{}': {}", descriptor.url, e);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        if let Some(content_type) = content_type {
            if !content_type.starts_with("image/") {
                return Err(FetchError::ContentType(content_type.to_owned()));
            }
        }

        Ok(response.bytes().await?)
    }

    /// Download arbitrary bytes (marker icons). Unlike tiles, failures propagate to the
    /// caller.
    pub async fn fetch_bytes(&self, url: &str) -> std::result::Result<Bytes, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.bytes().await
    }
}
