/// Now-playing information from an MPRIS media player over D-Bus
///
/// The D-Bus query sits behind `PlayerBackend` so the timeout and
/// completeness rules live in one place regardless of how the player is
/// reached. Any failure, missing field or timeout is reported as
/// `Sample::Unavailable`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use zbus::dbus_proxy;
use zbus::zvariant::{OwnedValue, Value};

use super::{MetricSnapshot, MetricSource, Sample};

/// Default bus name of the player to query
pub const DEFAULT_PLAYER_SERVICE: &str = "org.mpris.MediaPlayer2.spotify";
const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub art_url: Option<String>,
}

/// Something that can tell us what is currently playing.
///
/// `Ok(None)` means the player answered but its metadata was incomplete.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    async fn now_playing(&self) -> Result<Option<Track>>;
}

#[dbus_proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2"
)]
trait MprisPlayer {
    #[dbus_proxy(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Session-bus MPRIS client for one player service
pub struct MprisBackend {
    service: String,
}

impl MprisBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl PlayerBackend for MprisBackend {
    async fn now_playing(&self) -> Result<Option<Track>> {
        let connection = zbus::Connection::session()
            .await
            .context("No D-Bus session bus")?;

        let player = MprisPlayerProxy::builder(&connection)
            .destination(self.service.as_str())?
            .path(MPRIS_PATH)?
            .build()
            .await
            .with_context(|| format!("Failed to reach player {}", self.service))?;

        let metadata = player
            .metadata()
            .await
            .with_context(|| format!("Failed to read metadata from {}", self.service))?;

        Ok(track_from_metadata(&metadata))
    }
}

/// Pull the fields we display out of an MPRIS metadata map
pub fn track_from_metadata(metadata: &HashMap<String, OwnedValue>) -> Option<Track> {
    let text = |key: &str| -> Option<String> {
        let value = match &**metadata.get(key)? {
            Value::Str(s) => Some(s.as_str().to_string()),
            // xesam:artist is a list; only the first entry is shown
            Value::Array(items) => items.get().iter().find_map(|item| match item {
                Value::Str(s) => Some(s.as_str().to_string()),
                _ => None,
            }),
            _ => None,
        };
        value.filter(|s| !s.is_empty())
    };

    Some(Track {
        title: text("xesam:title")?,
        artist: text("xesam:artist")?,
        album: text("xesam:album"),
        art_url: text("mpris:artUrl"),
    })
}

pub struct NowPlayingSource {
    backend: Box<dyn PlayerBackend>,
    timeout: Duration,
}

impl NowPlayingSource {
    pub fn new(backend: Box<dyn PlayerBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn mpris(service: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Box::new(MprisBackend::new(service)), timeout)
    }
}

#[async_trait]
impl MetricSource for NowPlayingSource {
    async fn sample(&self) -> Sample {
        tracing::debug!("querying media player");

        match tokio::time::timeout(self.timeout, self.backend.now_playing()).await {
            Ok(Ok(Some(track))) => Sample::Data(MetricSnapshot::NowPlaying(track)),
            Ok(Ok(None)) => Sample::unavailable("now playing: incomplete metadata"),
            Ok(Err(e)) => Sample::unavailable(format!("now playing: {:#}", e)),
            Err(_) => Sample::unavailable(format!(
                "now playing: no answer within {}",
                humantime::format_duration(self.timeout)
            )),
        }
    }
}
