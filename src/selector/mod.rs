//! Tag-matching policy that decides which volumes are backed up.
//!
//! A volume is eligible when any of its tag values contains the backup word,
//! compared case-insensitively as a plain substring; the first matching value
//! ends the scan. Eligible volumes carry a display name taken from the first
//! tag whose key contains `Name`, independent of tag order relative to the
//! match, falling back to the volume id. Selection is pure: it reports
//! exclusions instead of printing them.

use std::collections::BTreeMap;
use std::fmt;

use crate::provider::Volume;

/// Substring that marks a tag key as carrying the display name.
pub const NAME_TAG_KEY: &str = "Name";

/// Why a volume was left out of the backup set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExclusionReason {
    /// The volume carries no tags at all.
    NoTags,
    /// None of the tag values contains the backup word.
    WordNotFound {
        /// Backup word that was searched for.
        word: String,
    },
}

/// A volume that will not be backed up, with the reason.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exclusion {
    /// Identifier of the excluded volume.
    pub volume_id: String,
    /// Why the volume was excluded.
    pub reason: ExclusionReason,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ExclusionReason::NoTags => {
                write!(f, "Volume [{}]: no tags found", self.volume_id)
            }
            ExclusionReason::WordNotFound { word } => write!(
                f,
                "Volume [{}]: backup word '{word}' not found in tags",
                self.volume_id
            ),
        }
    }
}

/// Outcome of applying the tag-matching policy to a set of volumes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Selection {
    /// Eligible volumes keyed by volume id, mapped to their display name.
    pub eligible: BTreeMap<String, String>,
    /// Volumes that were considered and left out.
    pub excluded: Vec<Exclusion>,
}

impl Selection {
    /// Identifiers of the eligible volumes.
    #[must_use]
    pub fn volume_ids(&self) -> Vec<String> {
        self.eligible.keys().cloned().collect()
    }

    /// Returns `true` when `volume_id` was selected.
    #[must_use]
    pub fn contains(&self, volume_id: &str) -> bool {
        self.eligible.contains_key(volume_id)
    }

    /// Returns `true` when no volume was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }
}

/// Applies the backup-word policy to provider volumes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeSelector {
    word: String,
    needle: String,
}

impl VolumeSelector {
    /// Creates a selector for `backup_word`.
    #[must_use]
    pub fn new(backup_word: impl Into<String>) -> Self {
        let word = backup_word.into();
        let needle = word.to_lowercase();
        Self { word, needle }
    }

    /// Backup word as configured.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Returns `true` when `value` contains the backup word, ignoring case.
    #[must_use]
    pub fn matches_value(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }

    /// Splits `volumes` into eligible volumes and exclusions.
    ///
    /// Every tag of every volume is examined; no provider-side filtering is
    /// assumed. When a volume id appears twice the first occurrence wins.
    #[must_use]
    pub fn select(&self, volumes: &[Volume]) -> Selection {
        let mut selection = Selection::default();
        for volume in volumes {
            match self.classify(volume) {
                Ok(display_name) => {
                    selection
                        .eligible
                        .entry(volume.volume_id.clone())
                        .or_insert(display_name);
                }
                Err(reason) => selection.excluded.push(Exclusion {
                    volume_id: volume.volume_id.clone(),
                    reason,
                }),
            }
        }
        selection
    }

    fn classify(&self, volume: &Volume) -> Result<String, ExclusionReason> {
        if volume.tags.is_empty() {
            return Err(ExclusionReason::NoTags);
        }
        // First match wins; later tags are not inspected for eligibility.
        if !volume.tags.iter().any(|tag| self.matches_value(&tag.value)) {
            return Err(ExclusionReason::WordNotFound {
                word: self.word.clone(),
            });
        }
        Ok(display_name(volume))
    }
}

/// Display name for snapshots of `volume`: the value of the first tag whose
/// key contains `Name`, wherever it sits in the tag list, or the volume id.
#[must_use]
pub fn display_name(volume: &Volume) -> String {
    volume
        .tags
        .iter()
        .find(|tag| tag.key.contains(NAME_TAG_KEY))
        .map_or_else(|| volume.volume_id.clone(), |tag| tag.value.clone())
}

/// Convenience wrapper around [`VolumeSelector::select`].
#[must_use]
pub fn select(volumes: &[Volume], backup_word: &str) -> Selection {
    VolumeSelector::new(backup_word).select(volumes)
}
