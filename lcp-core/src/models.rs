//! Payload models published by the integrations.
//!
//! These are plain data: the cache only needs them to satisfy
//! [`CacheData`](crate::CacheData). Field names are the wire names.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of tracks previewed in a playlist summary.
pub const PLAYLIST_PREVIEW_TRACKS: usize = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// APPLE MUSIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything cached for Apple Music.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicCache {
    /// Recently played songs, newest first
    pub recently_played: Vec<AppleMusicSong>,
    /// Tracked playlists with all their tracks
    pub playlists: Vec<AppleMusicPlaylist>,
}

/// One song.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicSong {
    pub track: String,
    pub artist: String,
    pub duration_in_millis: u64,
    pub album_art_url: String,
    pub album_art_blurhash: Option<String>,
    pub url: String,
    pub id: String,
}

/// A playlist with its full track list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicPlaylist {
    pub name: String,
    pub tracks: Vec<AppleMusicSong>,
    pub last_modified: DateTime<Utc>,
    pub url: String,
    pub id: String,
}

/// Compact view of a playlist for the summary payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicPlaylistSummary {
    pub name: String,
    pub track_count: usize,
    pub first_four_tracks: Vec<AppleMusicSong>,
    pub id: String,
}

/// Wire payload served for Apple Music instead of the raw cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicSummary {
    pub playlist_summaries: Vec<AppleMusicPlaylistSummary>,
    pub recently_played: Vec<AppleMusicSong>,
}

impl From<&AppleMusicPlaylist> for AppleMusicPlaylistSummary {
    fn from(playlist: &AppleMusicPlaylist) -> Self {
        Self {
            name: playlist.name.clone(),
            track_count: playlist.tracks.len(),
            first_four_tracks: playlist
                .tracks
                .iter()
                .take(PLAYLIST_PREVIEW_TRACKS)
                .cloned()
                .collect(),
            id: playlist.id.clone(),
        }
    }
}

impl AppleMusicCache {
    /// Reshapes the cache into the summary payload.
    pub fn summarize(&self) -> AppleMusicSummary {
        AppleMusicSummary {
            playlist_summaries: self.playlists.iter().map(Into::into).collect(),
            recently_played: self.recently_played.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GITHUB
// ═══════════════════════════════════════════════════════════════════════════════

/// A pinned repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub name: String,
    pub owner: String,
    pub language: String,
    pub language_color: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
    pub id: String,
    pub url: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEAM
// ═══════════════════════════════════════════════════════════════════════════════

/// A recently played game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SteamGame {
    pub name: String,
    pub app_id: i32,
    pub icon_url: String,
    pub rtime_last_played: Option<DateTime<Utc>>,
    pub playtime_forever: i32,
    pub url: String,
    pub header_url: String,
    pub library_url: Option<String>,
    pub achievement_progress: Option<f32>,
    pub achievements: Option<Vec<SteamAchievement>>,
}

/// One achievement of a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteamAchievement {
    pub api_name: String,
    pub achieved: bool,
    pub icon: String,
    pub display_name: String,
    pub description: Option<String>,
    pub unlock_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> AppleMusicSong {
        AppleMusicSong {
            track: format!("track {id}"),
            artist: "artist".into(),
            id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_previews_first_four_tracks() {
        let cache = AppleMusicCache {
            recently_played: vec![song("r1")],
            playlists: vec![AppleMusicPlaylist {
                name: "chill".into(),
                tracks: (0..6).map(|i| song(&i.to_string())).collect(),
                last_modified: Utc::now(),
                url: "https://music.apple.com/p".into(),
                id: "p.chill".into(),
            }],
        };

        let summary = cache.summarize();
        assert_eq!(summary.recently_played, cache.recently_played);
        assert_eq!(summary.playlist_summaries.len(), 1);
        let chill = &summary.playlist_summaries[0];
        assert_eq!(chill.track_count, 6);
        assert_eq!(chill.first_four_tracks.len(), PLAYLIST_PREVIEW_TRACKS);
        assert_eq!(chill.first_four_tracks[0].id, "0");
    }

    #[test]
    fn test_steam_game_wire_names() {
        let game = SteamGame {
            name: "Portal 2".into(),
            app_id: 620,
            ..Default::default()
        };
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["app_id"], 620);
        assert!(json["library_url"].is_null());
    }
}
