#![forbid(unsafe_code)]

//! The hub's relational core.
//!
//! Eight collections are loaded once when the store opens and live in memory
//! behind one lock from then on; every mutation rewrites the affected
//! collections through the key-value adapter in a single batch, so the
//! durable snapshot never contains half a mutation. Denormalized aggregates
//! (`video.likes`, `user.subscribers`) are recomputed by exactly one
//! function each, called from every path that can move them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth;
use crate::media::MediaError;
use crate::model::{
    Comment, HistoryEntry, LikeMap, Notification, NotificationKind, SubscriptionMap, User, Video,
    WatchLaterMap, is_known_category,
};
use crate::storage::{KvStorage, STORE_DB_FILE};
use crate::views::{self, ViewRequest};

// The fixed namespaced keys the collections persist under. The names match
// what the web client used, so an imported browser-storage dump lands in the
// right rows.
pub const USERS_KEY: &str = "streettube.users";
pub const VIDEOS_KEY: &str = "streettube.videos";
pub const SUBSCRIPTIONS_KEY: &str = "streettube.subscriptions";
pub const LIKES_KEY: &str = "streettube.likes";
pub const WATCH_HISTORY_KEY: &str = "streettube.watchHistory";
pub const COMMENTS_KEY: &str = "streettube.comments";
pub const WATCH_LATER_KEY: &str = "streettube.watchLater";
pub const NOTIFICATIONS_KEY: &str = "streettube.notifications";

/// Watch history keeps at most this many entries per user.
pub const WATCH_HISTORY_LIMIT: usize = 100;

/// Per-user notification cap, newest first.
pub const NOTIFICATION_LIMIT: usize = 50;

/// Everything the hub knows, in memory. The field layout is exactly the set
/// of persisted collections.
#[derive(Debug, Default)]
pub struct HubState {
    pub users: Vec<User>,
    pub videos: Vec<Video>,
    pub subscriptions: SubscriptionMap,
    pub likes: LikeMap,
    pub watch_history: HashMap<String, Vec<HistoryEntry>>,
    pub comments: Vec<Comment>,
    pub watch_later: WatchLaterMap,
    pub notifications: HashMap<String, Vec<Notification>>,
}

/// Domain failures a caller can act on. Persistence problems never show up
/// here; those are swallowed by the adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("unknown video: {0}")]
    UnknownVideo(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("only the owner can modify this video")]
    NotOwner,
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Draft for a new video; the media fields arrive from the upload pipeline.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: String,
}

/// Partial edit applied by the owner. `None` fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// One step of the video-delete cascade: the collection it cleans and the
/// storage key that must be rewritten afterwards.
struct CleanupStep {
    key: &'static str,
    run: fn(&mut HubState, &str),
}

/// Cleanup steps run when a video disappears. Adding a related collection is
/// one registration here. Notifications are deliberately not registered:
/// existing entries keep referencing the deleted video.
const VIDEO_CLEANUP: &[CleanupStep] = &[
    CleanupStep {
        key: LIKES_KEY,
        run: |state, video_id| {
            state.likes.remove(video_id);
        },
    },
    CleanupStep {
        key: COMMENTS_KEY,
        run: |state, video_id| {
            state.comments.retain(|comment| comment.video_id != video_id);
        },
    },
    CleanupStep {
        key: WATCH_LATER_KEY,
        run: |state, video_id| {
            for saved in state.watch_later.values_mut() {
                saved.retain(|id| id != video_id);
            }
            state.watch_later.retain(|_, saved| !saved.is_empty());
        },
    },
    CleanupStep {
        key: WATCH_HISTORY_KEY,
        run: |state, video_id| {
            for entries in state.watch_history.values_mut() {
                entries.retain(|entry| entry.video_id != video_id);
            }
            state.watch_history.retain(|_, entries| !entries.is_empty());
        },
    },
];

pub struct Store {
    storage: KvStorage,
    state: RwLock<HubState>,
}

impl Store {
    /// Opens the backing database under `data_root` and loads every
    /// collection exactly once. Missing or unreadable collections start
    /// empty.
    pub async fn open(data_root: &Path) -> Result<Self> {
        let storage = KvStorage::open(&data_root.join(STORE_DB_FILE)).await?;
        let state = HubState {
            users: storage.load(USERS_KEY, Vec::new()).await,
            videos: storage.load(VIDEOS_KEY, Vec::new()).await,
            subscriptions: storage.load(SUBSCRIPTIONS_KEY, HashMap::new()).await,
            likes: storage.load(LIKES_KEY, HashMap::new()).await,
            watch_history: storage.load(WATCH_HISTORY_KEY, HashMap::new()).await,
            comments: storage.load(COMMENTS_KEY, Vec::new()).await,
            watch_later: storage.load(WATCH_LATER_KEY, HashMap::new()).await,
            notifications: storage.load(NOTIFICATIONS_KEY, HashMap::new()).await,
        };
        Ok(Self {
            storage,
            state: RwLock::new(state),
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.state
            .read()
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let wanted = email.trim();
        self.state
            .read()
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(wanted))
            .cloned()
    }

    pub fn video(&self, video_id: &str) -> Option<Video> {
        self.state
            .read()
            .videos
            .iter()
            .find(|video| video.id == video_id)
            .cloned()
    }

    /// Relative media paths referenced by the collection; the orphan sweep
    /// keeps exactly these.
    pub fn media_files(&self) -> HashSet<String> {
        self.state
            .read()
            .videos
            .iter()
            .map(|video| video.video_file.clone())
            .collect()
    }

    /// A channel's uploads, newest first.
    pub fn videos_by(&self, user_id: &str) -> Vec<Video> {
        let state = self.state.read();
        let mut videos: Vec<Video> = state
            .videos
            .iter()
            .filter(|video| video.user_id == user_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        videos
    }

    /// Comments on a video in the order they were posted.
    pub fn comments_for(&self, video_id: &str) -> Vec<Comment> {
        self.state
            .read()
            .comments
            .iter()
            .filter(|comment| comment.video_id == video_id)
            .cloned()
            .collect()
    }

    /// Runs the derived-view selector against the live collections.
    pub fn select_videos(&self, request: &ViewRequest) -> Vec<Video> {
        views::select_videos(&self.state.read(), request)
    }

    pub fn is_liked(&self, user_id: &str, video_id: &str) -> bool {
        self.state
            .read()
            .likes
            .get(video_id)
            .is_some_and(|users| users.iter().any(|id| id == user_id))
    }

    pub fn is_saved_for_later(&self, user_id: &str, video_id: &str) -> bool {
        self.state
            .read()
            .watch_later
            .get(user_id)
            .is_some_and(|saved| saved.iter().any(|id| id == video_id))
    }

    pub fn is_subscribed(&self, user_id: &str, channel_id: &str) -> bool {
        self.state
            .read()
            .subscriptions
            .get(user_id)
            .is_some_and(|followed| followed.iter().any(|id| id == channel_id))
    }

    /// A user's notifications, newest first.
    pub fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        self.state
            .read()
            .notifications
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unread_notifications(&self, user_id: &str) -> usize {
        self.state
            .read()
            .notifications
            .get(user_id)
            .map(|list| list.iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub async fn sign_up(
        &self,
        email: &str,
        channel_name: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        let email = email.trim();
        let channel_name = channel_name.trim();
        if email.is_empty() {
            return Err(StoreError::MissingField("email"));
        }
        if channel_name.is_empty() {
            return Err(StoreError::MissingField("channel name"));
        }
        if password.is_empty() {
            return Err(StoreError::MissingField("password"));
        }

        let (user, payload) = {
            let mut state = self.state.write();
            if state
                .users
                .iter()
                .any(|existing| existing.email.eq_ignore_ascii_case(email))
            {
                return Err(StoreError::EmailTaken);
            }
            let user = User {
                id: new_id(),
                email: email.to_string(),
                password_digest: auth::hash_password(password),
                channel_name: channel_name.to_string(),
                subscribers: 0,
                joined: now_timestamp(),
            };
            state.users.push(user.clone());
            (user, snapshot(&state, &[USERS_KEY]))
        };

        self.storage.save_batch(&payload).await;
        Ok(user)
    }

    /// Verifies credentials. A wrong password and an unknown email fail the
    /// same way so the response does not reveal which accounts exist.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let user = self
            .user_by_email(email)
            .ok_or(StoreError::InvalidCredentials)?;
        if !auth::verify_password(password, &user.password_digest) {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates the video entity and fans a `new_upload` notification out to
    /// every user whose subscription list includes the uploader.
    pub async fn upload_video(&self, caller: &str, draft: NewVideo) -> Result<Video, StoreError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::MissingField("title"));
        }
        if draft.video_file.trim().is_empty() {
            return Err(StoreError::Media(MediaError::MissingFile));
        }
        let category = draft.category.trim().to_ascii_lowercase();
        if !is_known_category(&category) {
            return Err(StoreError::UnknownCategory(draft.category));
        }

        let (video, payload) = {
            let mut state = self.state.write();
            let owner = find_user(&state, caller)?.clone();
            let video = Video {
                id: new_id(),
                title,
                description: draft.description.trim().to_string(),
                category,
                video_file: draft.video_file,
                thumbnail: draft.thumbnail,
                duration: draft.duration,
                user_id: owner.id.clone(),
                channel_name: owner.channel_name.clone(),
                views: 0,
                likes: 0,
                upload_date: now_timestamp(),
                tags: draft
                    .tags
                    .into_iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect(),
            };
            state.videos.push(video.clone());

            let followers: Vec<String> = state
                .subscriptions
                .iter()
                .filter(|(_, followed)| followed.iter().any(|id| id == &owner.id))
                .map(|(subscriber, _)| subscriber.clone())
                .collect();
            for follower in followers {
                push_notification(
                    &mut state,
                    &follower,
                    new_notification(NotificationKind::NewUpload, &video, &owner),
                );
            }

            (video, snapshot(&state, &[VIDEOS_KEY, NOTIFICATIONS_KEY]))
        };

        self.storage.save_batch(&payload).await;
        Ok(video)
    }

    /// Flips the caller's membership in the video's like edge and recomputes
    /// the denormalized counter. A fresh like on someone else's video also
    /// notifies the owner. Returns whether the video is liked afterwards.
    pub async fn toggle_like(&self, caller: &str, video_id: &str) -> Result<bool, StoreError> {
        let (now_liked, payload) = {
            let mut state = self.state.write();
            let actor = find_user(&state, caller)?.clone();
            let video = find_video(&state, video_id)?.clone();

            let now_liked = {
                let users = state.likes.entry(video_id.to_string()).or_default();
                match users.iter().position(|id| id == caller) {
                    Some(existing) => {
                        users.remove(existing);
                        false
                    }
                    None => {
                        users.push(caller.to_string());
                        true
                    }
                }
            };
            state.likes.retain(|_, users| !users.is_empty());
            recompute_like_count(&mut state, video_id);

            if now_liked && video.user_id != caller {
                push_notification(
                    &mut state,
                    &video.user_id,
                    new_notification(NotificationKind::Like, &video, &actor),
                );
            }

            (
                now_liked,
                snapshot(&state, &[LIKES_KEY, VIDEOS_KEY, NOTIFICATIONS_KEY]),
            )
        };

        self.storage.save_batch(&payload).await;
        Ok(now_liked)
    }

    /// Flips the caller's subscription to a channel and recomputes that
    /// channel's subscriber counter. Returns whether the caller is
    /// subscribed afterwards.
    pub async fn toggle_subscribe(
        &self,
        caller: &str,
        channel_id: &str,
    ) -> Result<bool, StoreError> {
        let (now_subscribed, payload) = {
            let mut state = self.state.write();
            find_user(&state, caller)?;
            find_user(&state, channel_id)?;

            let now_subscribed = {
                let followed = state.subscriptions.entry(caller.to_string()).or_default();
                match followed.iter().position(|id| id == channel_id) {
                    Some(existing) => {
                        followed.remove(existing);
                        false
                    }
                    None => {
                        followed.push(channel_id.to_string());
                        true
                    }
                }
            };
            state.subscriptions.retain(|_, followed| !followed.is_empty());
            recompute_subscriber_count(&mut state, channel_id);

            (
                now_subscribed,
                snapshot(&state, &[SUBSCRIPTIONS_KEY, USERS_KEY]),
            )
        };

        self.storage.save_batch(&payload).await;
        Ok(now_subscribed)
    }

    /// Flips the video's membership in the caller's watch-later list. No
    /// counter to maintain. Returns whether the video is saved afterwards.
    pub async fn toggle_watch_later(
        &self,
        caller: &str,
        video_id: &str,
    ) -> Result<bool, StoreError> {
        let (now_saved, payload) = {
            let mut state = self.state.write();
            find_user(&state, caller)?;
            find_video(&state, video_id)?;

            let now_saved = {
                let saved = state.watch_later.entry(caller.to_string()).or_default();
                match saved.iter().position(|id| id == video_id) {
                    Some(existing) => {
                        saved.remove(existing);
                        false
                    }
                    None => {
                        saved.push(video_id.to_string());
                        true
                    }
                }
            };
            state.watch_later.retain(|_, saved| !saved.is_empty());

            (now_saved, snapshot(&state, &[WATCH_LATER_KEY]))
        };

        self.storage.save_batch(&payload).await;
        Ok(now_saved)
    }

    /// Appends a comment and notifies the video owner unless they wrote it
    /// themselves.
    pub async fn submit_comment(
        &self,
        caller: &str,
        video_id: &str,
        text: &str,
    ) -> Result<Comment, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::MissingField("comment text"));
        }

        let (comment, payload) = {
            let mut state = self.state.write();
            let author = find_user(&state, caller)?.clone();
            let video = find_video(&state, video_id)?.clone();

            let comment = Comment {
                id: new_id(),
                video_id: video_id.to_string(),
                user_id: author.id.clone(),
                channel_name: author.channel_name.clone(),
                text: text.to_string(),
                timestamp: now_timestamp(),
            };
            state.comments.push(comment.clone());

            if video.user_id != caller {
                push_notification(
                    &mut state,
                    &video.user_id,
                    new_notification(NotificationKind::Comment, &video, &author),
                );
            }

            (comment, snapshot(&state, &[COMMENTS_KEY, NOTIFICATIONS_KEY]))
        };

        self.storage.save_batch(&payload).await;
        Ok(comment)
    }

    /// Player-open semantics: the view counter increments no matter who is
    /// watching; the watch-history entry exists only for signed-in viewers
    /// (and re-watching moves it to the front instead of duplicating it).
    /// Returns the new view count.
    pub async fn record_view(
        &self,
        video_id: &str,
        viewer: Option<&str>,
    ) -> Result<u64, StoreError> {
        let (views, payload) = {
            let mut state = self.state.write();
            let position = state
                .videos
                .iter()
                .position(|video| video.id == video_id)
                .ok_or_else(|| StoreError::UnknownVideo(video_id.to_string()))?;
            state.videos[position].views += 1;
            let views = state.videos[position].views;

            let mut keys = vec![VIDEOS_KEY];
            if let Some(viewer) = viewer {
                if state.users.iter().any(|user| user.id == viewer) {
                    let entries = state.watch_history.entry(viewer.to_string()).or_default();
                    entries.retain(|entry| entry.video_id != video_id);
                    entries.insert(
                        0,
                        HistoryEntry {
                            video_id: video_id.to_string(),
                            watched_at: now_timestamp(),
                        },
                    );
                    entries.truncate(WATCH_HISTORY_LIMIT);
                    keys.push(WATCH_HISTORY_KEY);
                }
            }

            (views, snapshot(&state, &keys))
        };

        self.storage.save_batch(&payload).await;
        Ok(views)
    }

    /// Applies an owner edit. Ownership is an identity comparison, nothing
    /// stronger; this store is not a security boundary.
    pub async fn edit_video(
        &self,
        caller: &str,
        video_id: &str,
        edit: VideoEdit,
    ) -> Result<Video, StoreError> {
        let (video, payload) = {
            let mut state = self.state.write();
            let position = state
                .videos
                .iter()
                .position(|video| video.id == video_id)
                .ok_or_else(|| StoreError::UnknownVideo(video_id.to_string()))?;
            if state.videos[position].user_id != caller {
                return Err(StoreError::NotOwner);
            }

            if let Some(title) = &edit.title {
                if title.trim().is_empty() {
                    return Err(StoreError::MissingField("title"));
                }
            }
            if let Some(category) = &edit.category {
                if !is_known_category(category) {
                    return Err(StoreError::UnknownCategory(category.clone()));
                }
            }

            let video = &mut state.videos[position];
            if let Some(title) = edit.title {
                video.title = title.trim().to_string();
            }
            if let Some(description) = edit.description {
                video.description = description.trim().to_string();
            }
            if let Some(category) = edit.category {
                video.category = category.trim().to_ascii_lowercase();
            }
            if let Some(tags) = edit.tags {
                video.tags = tags
                    .into_iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
            }
            let video = video.clone();

            (video, snapshot(&state, &[VIDEOS_KEY]))
        };

        self.storage.save_batch(&payload).await;
        Ok(video)
    }

    /// Removes a video and everything that referenced it, driven by the
    /// cleanup table. Returns the removed entity so the caller can delete
    /// the media file it pointed at.
    pub async fn delete_video(&self, caller: &str, video_id: &str) -> Result<Video, StoreError> {
        let (removed, payload) = {
            let mut state = self.state.write();
            let position = state
                .videos
                .iter()
                .position(|video| video.id == video_id)
                .ok_or_else(|| StoreError::UnknownVideo(video_id.to_string()))?;
            if state.videos[position].user_id != caller {
                return Err(StoreError::NotOwner);
            }

            let removed = state.videos.remove(position);
            for step in VIDEO_CLEANUP {
                (step.run)(&mut state, video_id);
            }

            let mut keys = vec![VIDEOS_KEY];
            keys.extend(VIDEO_CLEANUP.iter().map(|step| step.key));
            (removed, snapshot(&state, &keys))
        };

        self.storage.save_batch(&payload).await;
        Ok(removed)
    }

    /// Marks one notification as read. Returns whether anything changed.
    pub async fn mark_notification_read(
        &self,
        caller: &str,
        notification_id: &str,
    ) -> Result<bool, StoreError> {
        let (changed, payload) = {
            let mut state = self.state.write();
            find_user(&state, caller)?;
            let mut changed = false;
            if let Some(list) = state.notifications.get_mut(caller) {
                for notification in list.iter_mut() {
                    if notification.id == notification_id && !notification.read {
                        notification.read = true;
                        changed = true;
                    }
                }
            }
            (changed, snapshot(&state, &[NOTIFICATIONS_KEY]))
        };

        if changed {
            self.storage.save_batch(&payload).await;
        }
        Ok(changed)
    }

    /// Marks every notification as read and returns how many flipped.
    pub async fn mark_all_notifications_read(&self, caller: &str) -> Result<usize, StoreError> {
        let (flipped, payload) = {
            let mut state = self.state.write();
            find_user(&state, caller)?;
            let mut flipped = 0;
            if let Some(list) = state.notifications.get_mut(caller) {
                for notification in list.iter_mut() {
                    if !notification.read {
                        notification.read = true;
                        flipped += 1;
                    }
                }
            }
            (flipped, snapshot(&state, &[NOTIFICATIONS_KEY]))
        };

        if flipped > 0 {
            self.storage.save_batch(&payload).await;
        }
        Ok(flipped)
    }
}

// ----------------------------------------------------------------------
// Invariant maintenance
// ----------------------------------------------------------------------

/// The one place `video.likes` is written: set it to the like-edge length.
fn recompute_like_count(state: &mut HubState, video_id: &str) {
    let count = state
        .likes
        .get(video_id)
        .map(|users| users.len() as u64)
        .unwrap_or(0);
    if let Some(video) = state.videos.iter_mut().find(|video| video.id == video_id) {
        video.likes = count;
    }
}

/// The one place `user.subscribers` is written: count the subscription
/// lists containing this channel.
fn recompute_subscriber_count(state: &mut HubState, channel_id: &str) {
    let count = state
        .subscriptions
        .values()
        .filter(|followed| followed.iter().any(|id| id == channel_id))
        .count() as u64;
    if let Some(user) = state.users.iter_mut().find(|user| user.id == channel_id) {
        user.subscribers = count;
    }
}

/// Prepends a notification and enforces the per-user cap.
fn push_notification(state: &mut HubState, recipient: &str, notification: Notification) {
    let list = state.notifications.entry(recipient.to_string()).or_default();
    list.insert(0, notification);
    list.truncate(NOTIFICATION_LIMIT);
}

fn new_notification(kind: NotificationKind, video: &Video, actor: &User) -> Notification {
    Notification {
        id: new_id(),
        kind,
        video_id: video.id.clone(),
        channel_id: Some(actor.id.clone()),
        channel_name: Some(actor.channel_name.clone()),
        video_title: Some(video.title.clone()),
        timestamp: now_timestamp(),
        read: false,
    }
}

fn find_user<'a>(state: &'a HubState, user_id: &str) -> Result<&'a User, StoreError> {
    state
        .users
        .iter()
        .find(|user| user.id == user_id)
        .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
}

fn find_video<'a>(state: &'a HubState, video_id: &str) -> Result<&'a Video, StoreError> {
    state
        .videos
        .iter()
        .find(|video| video.id == video_id)
        .ok_or_else(|| StoreError::UnknownVideo(video_id.to_string()))
}

/// Serializes the named collections for a batched write. A collection that
/// fails to serialize is skipped with a warning; the in-memory copy stays
/// authoritative either way.
fn snapshot(state: &HubState, keys: &[&'static str]) -> Vec<(&'static str, String)> {
    keys.iter().filter_map(|key| encode_key(state, key)).collect()
}

fn encode_key(state: &HubState, key: &'static str) -> Option<(&'static str, String)> {
    let encoded = match key {
        USERS_KEY => serde_json::to_string(&state.users),
        VIDEOS_KEY => serde_json::to_string(&state.videos),
        SUBSCRIPTIONS_KEY => serde_json::to_string(&state.subscriptions),
        LIKES_KEY => serde_json::to_string(&state.likes),
        WATCH_HISTORY_KEY => serde_json::to_string(&state.watch_history),
        COMMENTS_KEY => serde_json::to_string(&state.comments),
        WATCH_LATER_KEY => serde_json::to_string(&state.watch_later),
        NOTIFICATIONS_KEY => serde_json::to_string(&state.notifications),
        _ => return None,
    };
    match encoded {
        Ok(raw) => Some((key, raw)),
        Err(err) => {
            eprintln!("Warning: could not serialize {key}: {err}");
            None
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}
