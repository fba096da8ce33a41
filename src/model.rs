#![forbid(unsafe_code)]

//! Entity types persisted by the hub.
//!
//! All structs in this module mirror how the collections are serialized at
//! rest: camelCase JSON arrays and maps, identical to what the original web
//! client kept in browser storage, so an exported snapshot stays readable by
//! both sides. Identifiers are opaque strings, timestamps are ISO-8601
//! strings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mapping from one entity's id to a list of related ids. Used for every
/// many-to-many relationship the hub tracks.
pub type EdgeMap = HashMap<String, Vec<String>>;

/// subscriber user id -> ids of the channels they follow.
pub type SubscriptionMap = EdgeMap;

/// video id -> ids of the users who liked it.
pub type LikeMap = EdgeMap;

/// user id -> video ids saved for later.
pub type WatchLaterMap = EdgeMap;

/// Registered account. `subscribers` is a stored aggregate over the
/// subscription map; `Store` recomputes it on every subscribe/unsubscribe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_digest: String,
    pub channel_name: String,
    pub subscribers: u64,
    pub joined: String,
}

/// Uploaded video. `channel_name` is a copy of the owner's name taken at
/// upload time and `likes` duplicates the like-edge length; both exist so
/// feed rendering never needs a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub category: String,
    /// Media file path relative to the media root, e.g. `uploads/<id>.mp4`.
    pub video_file: String,
    /// Inline `data:image/...;base64,` URL.
    pub thumbnail: String,
    /// Display duration such as `4:07` or `1:12:33`.
    pub duration: String,
    pub user_id: String,
    pub channel_name: String,
    pub views: u64,
    pub likes: u64,
    pub upload_date: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub channel_name: String,
    pub text: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewUpload,
    Like,
    Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    pub timestamp: String,
    pub read: bool,
}

/// One watch-history row. Lists are kept most-recent-first and deduplicated
/// by video id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    pub watched_at: String,
}

/// The fixed category set uploads must pick from. Stored videos keep their
/// category string as-is even if it is no longer in this list, so renaming a
/// category never breaks old data.
pub const CATEGORIES: &[&str] = &[
    "builds",
    "dyno",
    "racing",
    "drift",
    "offroad",
    "restoration",
    "reviews",
    "meets",
];

/// Returns whether `value` is an accepted upload category.
pub fn is_known_category(value: &str) -> bool {
    CATEGORIES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_accept_mixed_case_and_whitespace() {
        assert!(is_known_category("drift"));
        assert!(is_known_category("  Drift "));
        assert!(is_known_category("RACING"));
        assert!(!is_known_category("cooking"));
        assert!(!is_known_category(""));
    }

    #[test]
    fn video_serializes_with_camel_case_keys() {
        let video = Video {
            id: "v1".into(),
            title: "S13 turbo swap".into(),
            description: String::new(),
            category: "builds".into(),
            video_file: "uploads/v1.mp4".into(),
            thumbnail: "data:image/jpeg;base64,AA==".into(),
            duration: "4:07".into(),
            user_id: "u1".into(),
            channel_name: "Garage 31".into(),
            views: 3,
            likes: 1,
            upload_date: "2024-03-01T10:00:00+00:00".into(),
            tags: vec!["nissan".into()],
        };

        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["videoFile"], "uploads/v1.mp4");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["channelName"], "Garage 31");
        assert_eq!(json["uploadDate"], "2024-03-01T10:00:00+00:00");
        // Empty description is dropped entirely rather than stored as "".
        assert!(json.get("description").is_none());
    }

    #[test]
    fn notification_kind_uses_snake_case_type_field() {
        let notification = Notification {
            id: "n1".into(),
            kind: NotificationKind::NewUpload,
            video_id: "v1".into(),
            channel_id: Some("u1".into()),
            channel_name: Some("Garage 31".into()),
            video_title: Some("S13 turbo swap".into()),
            timestamp: "2024-03-01T10:00:00+00:00".into(),
            read: false,
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "new_upload");

        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, NotificationKind::NewUpload);
    }

    #[test]
    fn history_entry_round_trips() {
        let entry = HistoryEntry {
            video_id: "v9".into(),
            watched_at: "2024-04-05T08:30:00+00:00".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"videoId\":\"v9\""));
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.video_id, "v9");
    }
}
