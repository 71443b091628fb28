//! Tile server URL templates.

use rand::Rng as _;

use crate::mercator::TileId;

/// Default tile source.
/// <https://www.openstreetmap.org/about>
pub(crate) const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Expands a URL template into per-tile URLs.
///
/// Supported tokens: `{z}`, `{x}`, `{y}`, `{quadkey}` (Bing-style tile addressing), and `{s}`,
/// which picks a random entry from the configured subdomains per tile.
#[derive(Debug, Clone)]
pub(crate) struct TileServer {
    template: String,
    subdomains: Vec<String>,
}

impl TileServer {
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
        }
    }

    pub fn tile_url(&self, tile_id: TileId) -> String {
        let mut url = self
            .template
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string());

        if url.contains("{quadkey}") {
            url = url.replace("{quadkey}", &quadkey(tile_id));
        }

        if !self.subdomains.is_empty() && url.contains("{s}") {
            let pick = rand::rng().random_range(0..self.subdomains.len());
            url = url.replace("{s}", &self.subdomains[pick]);
        }

        url
    }
}

/// Encode a tile address as a base-4 quadkey, one digit per zoom level, most significant
/// level first: digit = 2 * y-bit + x-bit.
/// <https://learn.microsoft.com/en-us/bingmaps/articles/bing-maps-tile-system>
fn quadkey(tile_id: TileId) -> String {
    let mut key = String::with_capacity(tile_id.zoom as usize);
    for level in (1..=tile_id.zoom).rev() {
        let mask = 1u32 << (level - 1);
        let mut digit = 0;
        if tile_id.x & mask != 0 {
            digit += 1;
        }
        if tile_id.y & mask != 0 {
            digit += 2;
        }
        key.push(char::from(b'0' + digit));
    }
    key
}
