use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// A single catalog entry for a tag's top-tracks chart. `playcount` is absent
/// for some entries; callers treat that as zero weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub artist: String,
    pub title: String,
    pub playcount: Option<u64>,
}

/// Seam over the external music tagging catalog.
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    /// Top tracks carrying the given mood/genre tag, chart order.
    async fn top_tracks_for_tag(&self, tag: &str, limit: usize) -> Result<Vec<CatalogTrack>>;

    /// Top descriptive tags attached to one track.
    async fn track_tags(&self, artist: &str, title: &str, limit: usize) -> Result<Vec<String>>;
}

/// Client configuration for the audioscrobbler-style catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

/// Last.fm-compatible catalog client (the `2.0` audioscrobbler JSON API).
#[derive(Debug, Clone)]
pub struct LastfmClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TagTopTracksResponse {
    tracks: TagTracks,
}

#[derive(Debug, Deserialize)]
struct TagTracks {
    #[serde(default)]
    track: Vec<TagTrack>,
}

#[derive(Debug, Deserialize)]
struct TagTrack {
    name: String,
    artist: TrackArtist,
    #[serde(default)]
    playcount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackTopTagsResponse {
    toptags: TopTags,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Vec<TopTag>,
}

#[derive(Debug, Deserialize)]
struct TopTag {
    name: String,
}

impl LastfmClient {
    /// # Errors
    /// Fails when the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: CatalogClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build catalog HTTP client")?;
        let base_url = Url::parse(&config.base_url).context("invalid catalog base URL")?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join("2.0/")
            .context("failed to build catalog endpoint URL")
    }

    /// Cheap reachability probe used by the readiness endpoint. The API has
    /// no dedicated health method, so this asks for a single chart entry of
    /// a tag that always exists.
    ///
    /// # Errors
    /// Fails when the catalog is unreachable or returns an error status.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .get(self.endpoint()?)
            .query(&[
                ("method", "tag.gettoptracks"),
                ("tag", "rock"),
                ("limit", "1"),
                ("api_key", &self.api_key),
                ("format", "json"),
            ])
            .send()
            .await
            .context("catalog ping request failed")?
            .error_for_status()
            .context("catalog ping returned error status")?;

        Ok(())
    }
}

#[async_trait]
impl MusicCatalog for LastfmClient {
    async fn top_tracks_for_tag(&self, tag: &str, limit: usize) -> Result<Vec<CatalogTrack>> {
        debug!(tag, limit, "fetching top tracks for tag");

        let response = self
            .client
            .get(self.endpoint()?)
            .query(&[
                ("method", "tag.gettoptracks"),
                ("tag", tag),
                ("limit", &limit.to_string()),
                ("api_key", &self.api_key),
                ("format", "json"),
            ])
            .send()
            .await
            .with_context(|| format!("catalog top-tracks request failed for tag {tag:?}"))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("catalog returned error status {status} for tag {tag:?}: {error_body}");
        }

        let parsed: TagTopTracksResponse = response
            .json()
            .await
            .with_context(|| format!("failed to deserialize top-tracks response for {tag:?}"))?;

        Ok(parsed
            .tracks
            .track
            .into_iter()
            .map(|track| CatalogTrack {
                artist: track.artist.name,
                title: track.name,
                playcount: track.playcount.and_then(|raw| raw.parse().ok()),
            })
            .collect())
    }

    async fn track_tags(&self, artist: &str, title: &str, limit: usize) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint()?)
            .query(&[
                ("method", "track.gettoptags"),
                ("artist", artist),
                ("track", title),
                ("api_key", &self.api_key),
                ("format", "json"),
            ])
            .send()
            .await
            .with_context(|| format!("catalog track-tags request failed for {artist} - {title}"))?
            .error_for_status()
            .with_context(|| format!("catalog track-tags error status for {artist} - {title}"))?;

        let parsed: TrackTopTagsResponse = response
            .json()
            .await
            .context("failed to deserialize track-tags response")?;

        Ok(parsed
            .toptags
            .tag
            .into_iter()
            .take(limit)
            .map(|tag| tag.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> CatalogClientConfig {
        CatalogClientConfig {
            base_url,
            api_key: "lfm-test".to_string(),
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(15),
        }
    }

    #[tokio::test]
    async fn top_tracks_parses_chart_order_and_playcount() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .and(query_param("method", "tag.gettoptracks"))
            .and(query_param("tag", "melancholy"))
            .and(query_param("api_key", "lfm-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tracks": {
                    "track": [
                        {"name": "Holocene", "artist": {"name": "Bon Iver"}, "playcount": "120345"},
                        {"name": "Motion Picture Soundtrack", "artist": {"name": "Radiohead"}}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        let tracks = client
            .top_tracks_for_tag("melancholy", 10)
            .await
            .expect("fetch should succeed");

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, "Bon Iver");
        assert_eq!(tracks[0].title, "Holocene");
        assert_eq!(tracks[0].playcount, Some(120_345));
        assert_eq!(tracks[1].playcount, None);
    }

    #[tokio::test]
    async fn top_tracks_tolerates_missing_track_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"tracks": {}})),
            )
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        let tracks = client
            .top_tracks_for_tag("obscure-tag", 5)
            .await
            .expect("empty chart should not error");

        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn top_tracks_surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        let error = client
            .top_tracks_for_tag("happy", 5)
            .await
            .expect_err("should fail on 503");

        assert!(error.to_string().contains("503"));
    }

    #[tokio::test]
    async fn ping_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .and(query_param("method", "tag.gettoptracks"))
            .and(query_param("limit", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"tracks": {}})),
            )
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        client.ping().await.expect("ping should succeed");
    }

    #[tokio::test]
    async fn ping_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        let error = client.ping().await.expect_err("ping should fail");
        assert!(error.to_string().contains("error status"));
    }

    #[tokio::test]
    async fn track_tags_returns_names_up_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2.0/"))
            .and(query_param("method", "track.gettoptags"))
            .and(query_param("artist", "Bon Iver"))
            .and(query_param("track", "Holocene"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "toptags": {
                    "tag": [
                        {"name": "indie folk", "count": 100},
                        {"name": "melancholy", "count": 80},
                        {"name": "winter", "count": 60}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = LastfmClient::new(test_config(server.uri())).expect("client should build");
        let tags = client
            .track_tags("Bon Iver", "Holocene", 2)
            .await
            .expect("fetch should succeed");

        assert_eq!(tags, vec!["indie folk".to_string(), "melancholy".to_string()]);
    }
}
