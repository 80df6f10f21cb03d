//! The arena a [`Section`] looks its parent [`Song`] up through. Sections
//! store only a `SongId`; this registry is the immutable index that turns
//! that id back into tempo, sample rate, and the rest of the song's fields
//! during scoring and synthesis. Back-pointers are lookups, never
//! ownership.

use std::collections::HashMap;

use setlist_types::{Section, Song, SongId};

#[derive(Debug, Default)]
pub struct SongRegistry {
    songs: HashMap<SongId, Song>,
}

impl SongRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, song: Song) {
        self.songs.insert(song.id.clone(), song);
    }

    #[must_use]
    pub fn get(&self, id: &SongId) -> Option<&Song> {
        self.songs.get(id)
    }

    /// Resolves a [`Section`] back to its parent [`Song`].
    #[must_use]
    pub fn parent_of<'a>(&'a self, section: &Section) -> Option<&'a Song> {
        self.get(&section.song_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_types::{Key, Mode};

    fn song(id: &str) -> Song {
        Song {
            id: SongId::new(id),
            source_filename: format!("{id}.mp3"),
            duration_seconds: 200.0,
            tempo_bpm: 118.0,
            key: Key::G,
            mode: Mode::Major,
            key_confidence: 0.8,
            loudness_db: -12.0,
            spectral_centroid_hz: 1900.0,
            beats: vec![],
            downbeats: vec![],
            sections: vec![],
        }
    }

    #[test]
    fn section_resolves_through_registry() {
        let mut reg = SongRegistry::new();
        reg.insert(song("a".repeat(32).as_str()));

        let section = Section {
            song_id: SongId::new("a".repeat(32)),
            index: 0,
            label: "verse".to_owned(),
            start_seconds: 0.0,
            end_seconds: 30.0,
            tempo_bpm: 118.0,
            key: "G".to_owned(),
            energy: 50.0,
            loudness_db: -12.0,
            spectral_centroid_hz: 1900.0,
        };

        let parent = reg.parent_of(&section).expect("parent present");
        assert_eq!(parent.tempo_bpm, 118.0);
    }

    #[test]
    fn unknown_song_id_resolves_to_none() {
        let reg = SongRegistry::new();
        assert!(reg.get(&SongId::new("z".repeat(32))).is_none());
    }
}
