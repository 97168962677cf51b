//! Canonical metadata.
//!
//! Every backend reports its metadata through the same eleven keys in the same
//! order. Keys without a native counterpart are still present, with an empty
//! value, so that hosts splitting the delimited form always find each key at
//! the same position.

pub mod gd3;
pub mod utf16;

use serde::ser::{Serialize, SerializeMap, Serializer};

pub use gd3::parse_gd3;

/// Separator used by [`CanonicalTagSet::to_delimited`].
pub const TAG_SEPARATOR: &str = "|||";

/// Number of canonical keys.
pub const TAG_COUNT: usize = 11;

/// Canonical tag keys, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    /// Track title (Latin script).
    Title,
    /// Track title in the original script.
    TitleNative,
    /// Game or album.
    Game,
    /// Game in the original script.
    GameNative,
    /// System or hardware.
    System,
    /// System in the original script.
    SystemNative,
    /// Composer or artist.
    Artist,
    /// Artist in the original script.
    ArtistNative,
    /// Release date.
    Date,
    /// Person or tool that produced the file.
    EncodedBy,
    /// Free-form notes.
    Comment,
}

impl TagKey {
    /// All keys in canonical order.
    pub const ALL: [TagKey; TAG_COUNT] = [
        TagKey::Title,
        TagKey::TitleNative,
        TagKey::Game,
        TagKey::GameNative,
        TagKey::System,
        TagKey::SystemNative,
        TagKey::Artist,
        TagKey::ArtistNative,
        TagKey::Date,
        TagKey::EncodedBy,
        TagKey::Comment,
    ];

    /// Key name as exposed to hosts.
    pub fn as_str(self) -> &'static str {
        match self {
            TagKey::Title => "TITLE",
            TagKey::TitleNative => "TITLE_NATIVE",
            TagKey::Game => "GAME",
            TagKey::GameNative => "GAME_NATIVE",
            TagKey::System => "SYSTEM",
            TagKey::SystemNative => "SYSTEM_NATIVE",
            TagKey::Artist => "ARTIST",
            TagKey::ArtistNative => "ARTIST_NATIVE",
            TagKey::Date => "DATE",
            TagKey::EncodedBy => "ENCODED_BY",
            TagKey::Comment => "COMMENT",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Fully populated, ordered tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalTagSet {
    values: [String; TAG_COUNT],
}

impl CanonicalTagSet {
    /// All keys present, all values empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `key`. Trailing NULs and surrounding whitespace are trimmed.
    pub fn set(&mut self, key: TagKey, value: impl Into<String>) {
        self.values[key.index()] = value.into().trim_end_matches('\0').trim().to_string();
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: TagKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key` only if `value` is present.
    pub fn set_opt(&mut self, key: TagKey, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Value for `key` (empty when the backend had nothing to report).
    pub fn get(&self, key: TagKey) -> &str {
        &self.values[key.index()]
    }

    /// Whether every value is empty.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(String::is_empty)
    }

    /// Iterate `(key, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (TagKey, &str)> + '_ {
        TagKey::ALL
            .iter()
            .map(move |&key| (key, self.values[key.index()].as_str()))
    }

    /// Render as `KEY|||VALUE|||` for every key, trailing separator included.
    ///
    /// Every `|` inside a value becomes `/`. A trailing `|` would otherwise
    /// merge with the following separator and shift every later field.
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            out.push_str(key.as_str());
            out.push_str(TAG_SEPARATOR);
            out.push_str(&value.replace('|', "/"));
            out.push_str(TAG_SEPARATOR);
        }
        out
    }
}

impl Serialize for CanonicalTagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TAG_COUNT))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}
