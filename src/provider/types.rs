//! Resource shapes exchanged with the snapshot provider.
//!
//! Field names follow the EC2 JSON wire format so the same types deserialise
//! straight from `aws ec2 describe-*` output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key/value pair attached to a volume or snapshot.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct Tag {
    /// Tag key.
    #[serde(rename = "Key")]
    pub key: String,
    /// Tag value.
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    /// Creates a tag from a key and a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Block storage volume as reported by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Volume {
    /// Provider-assigned identifier.
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
    /// Tags in the order the provider returned them.
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl Volume {
    /// Creates a volume description.
    #[must_use]
    pub fn new(volume_id: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            volume_id: volume_id.into(),
            tags,
        }
    }
}

/// Point-in-time copy of a volume.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Snapshot {
    /// Provider-assigned identifier.
    #[serde(rename = "SnapshotId")]
    pub snapshot_id: String,
    /// Volume the snapshot was taken from.
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
    /// Instant the snapshot was started.
    #[serde(rename = "StartTime")]
    pub created_at: DateTime<Utc>,
    /// Tags attached to the snapshot.
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl Snapshot {
    /// Creates a snapshot description without tags.
    #[must_use]
    pub fn new(
        snapshot_id: impl Into<String>,
        volume_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            volume_id: volume_id.into(),
            created_at,
            tags: Vec::new(),
        }
    }
}
