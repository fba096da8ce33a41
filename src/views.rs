#![forbid(unsafe_code)]

//! Derived feed selection.
//!
//! Every navigation surface of the client (home, trending, subscriptions,
//! history, liked, watch later, search) is a pure function of the in-memory
//! collections. Nothing in this module mutates; the store calls in here
//! under a read lock.

use crate::model::Video;
use crate::store::HubState;

/// Maximum number of videos the trending feed returns.
pub const TRENDING_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Home,
    Trending,
    Subscriptions,
    History,
    Liked,
    WatchLater,
    Search,
}

impl ViewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "home" => Some(Self::Home),
            "trending" => Some(Self::Trending),
            "subscriptions" => Some(Self::Subscriptions),
            "history" => Some(Self::History),
            "liked" => Some(Self::Liked),
            "watchlater" | "watch_later" => Some(Self::WatchLater),
            "search" => Some(Self::Search),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Trending => "trending",
            Self::Subscriptions => "subscriptions",
            Self::History => "history",
            Self::Liked => "liked",
            Self::WatchLater => "watchlater",
            Self::Search => "search",
        }
    }
}

/// Parameters for one feed selection.
#[derive(Debug, Clone, Default)]
pub struct ViewRequest {
    pub mode: Option<ViewMode>,
    /// Category filter, only honored on the home feed.
    pub category: Option<String>,
    /// Authenticated viewer, when there is one. Viewer-scoped feeds return
    /// nothing without it.
    pub viewer: Option<String>,
    /// Search text, only honored in search mode.
    pub query: String,
}

/// Computes the ordered video list for `request`. Missing mode falls back to
/// the home feed, matching how the client boots.
pub fn select_videos(state: &HubState, request: &ViewRequest) -> Vec<Video> {
    let viewer = request.viewer.as_deref();
    match request.mode.unwrap_or(ViewMode::Home) {
        ViewMode::Home => home_feed(state, request.category.as_deref()),
        ViewMode::Trending => trending_feed(state),
        ViewMode::Subscriptions => subscriptions_feed(state, viewer),
        ViewMode::History => history_feed(state, viewer),
        ViewMode::Liked => liked_feed(state, viewer),
        ViewMode::WatchLater => watch_later_feed(state, viewer),
        ViewMode::Search => search_feed(state, &request.query),
    }
}

fn home_feed(state: &HubState, category: Option<&str>) -> Vec<Video> {
    let mut videos: Vec<Video> = state
        .videos
        .iter()
        .filter(|video| match category {
            Some(wanted) => video.category.eq_ignore_ascii_case(wanted.trim()),
            None => true,
        })
        .cloned()
        .collect();
    sort_newest_first(&mut videos);
    videos
}

fn trending_feed(state: &HubState) -> Vec<Video> {
    let mut videos: Vec<Video> = state.videos.to_vec();
    // Stable sort: videos with equal view counts keep collection order.
    videos.sort_by(|a, b| b.views.cmp(&a.views));
    videos.truncate(TRENDING_LIMIT);
    videos
}

fn subscriptions_feed(state: &HubState, viewer: Option<&str>) -> Vec<Video> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };
    let Some(followed) = state.subscriptions.get(viewer) else {
        return Vec::new();
    };
    let mut videos: Vec<Video> = state
        .videos
        .iter()
        .filter(|video| followed.iter().any(|channel| channel == &video.user_id))
        .cloned()
        .collect();
    sort_newest_first(&mut videos);
    videos
}

fn history_feed(state: &HubState, viewer: Option<&str>) -> Vec<Video> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };
    let Some(entries) = state.watch_history.get(viewer) else {
        return Vec::new();
    };
    // History order is authoritative (most recently watched first); entries
    // whose video is gone are dropped without a trace.
    entries
        .iter()
        .filter_map(|entry| find_video(state, &entry.video_id))
        .collect()
}

fn liked_feed(state: &HubState, viewer: Option<&str>) -> Vec<Video> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };
    state
        .videos
        .iter()
        .filter(|video| {
            state
                .likes
                .get(&video.id)
                .is_some_and(|users| users.iter().any(|user| user == viewer))
        })
        .cloned()
        .collect()
}

fn watch_later_feed(state: &HubState, viewer: Option<&str>) -> Vec<Video> {
    let Some(viewer) = viewer else {
        return Vec::new();
    };
    let Some(saved) = state.watch_later.get(viewer) else {
        return Vec::new();
    };
    saved
        .iter()
        .filter_map(|video_id| find_video(state, video_id))
        .collect()
}

fn search_feed(state: &HubState, query: &str) -> Vec<Video> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        // The idle search page is a client concern; an empty query matches
        // nothing here.
        return Vec::new();
    }
    state
        .videos
        .iter()
        .filter(|video| matches_query(video, &needle))
        .cloned()
        .collect()
}

fn matches_query(video: &Video, needle: &str) -> bool {
    video.title.to_lowercase().contains(needle)
        || video.description.to_lowercase().contains(needle)
        || video.channel_name.to_lowercase().contains(needle)
        || video.category.to_lowercase().contains(needle)
        || video
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

fn find_video(state: &HubState, video_id: &str) -> Option<Video> {
    state
        .videos
        .iter()
        .find(|video| video.id == video_id)
        .cloned()
}

fn sort_newest_first(videos: &mut [Video]) {
    // Upload dates are RFC 3339 strings with a fixed UTC offset, so plain
    // string comparison orders them chronologically.
    videos.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
}
