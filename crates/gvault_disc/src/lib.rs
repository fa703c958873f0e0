//! Disc image handling for gvault.
//!
//! - [`ChdManager`] creates, extracts, verifies and mounts CHD containers
//! - [`playlist`] reads, writes and generates multi-disc `.m3u` playlists

pub mod chd;
pub mod playlist;

pub use chd::{ChdManager, ContainerState, DiscKind, VERIFY_SUCCESS_MARKER};
pub use playlist::{
    generate_local_playlists, generate_playlist, playlist_entries, read_playlist, write_playlist,
    GenerateOptions, PlaylistEntries, PLAYLIST_EXTENSION,
};
