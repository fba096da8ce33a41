#![forbid(unsafe_code)]

//! Axum backend exposing the StreetTube store to the web client.
//!
//! Every route is a thin wrapper over `streettube::store::Store`; the
//! interesting behavior (validation, invariants, cascades, notification
//! fan-out) lives in the library. The binary only adds HTTP plumbing,
//! media streaming and the upload pipeline.

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mime_guess::MimeGuess;
use serde::{Deserialize, Serialize};
use streettube::auth::ensure_not_root;
use streettube::config::{RuntimeOverrides, resolve_runtime_config};
use streettube::media::{self, MediaError};
use streettube::model::{Comment, Notification, User, Video};
use streettube::store::{NewVideo, Store, StoreError, VideoEdit};
use streettube::views::{ViewMode, ViewRequest};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
    signal,
};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct BackendArgs {
    data_root: Option<PathBuf>,
    media_root: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
}

impl BackendArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(std::env::args().skip(1))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self {
            data_root: None,
            media_root: None,
            port: None,
            host: None,
        };
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline_value) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            let mut value = || -> Result<String> {
                match inline_value.clone() {
                    Some(value) => Ok(value),
                    None => args
                        .next()
                        .ok_or_else(|| anyhow!("{flag} requires a value")),
                }
            };
            match flag.as_str() {
                "--data-root" => parsed.data_root = Some(PathBuf::from(value()?)),
                "--media-root" => parsed.media_root = Some(PathBuf::from(value()?)),
                "--port" => {
                    parsed.port = Some(
                        value()?
                            .parse::<u16>()
                            .context("expected a numeric port between 0 and 65535")?,
                    )
                }
                "--host" => parsed.host = Some(value()?),
                other => return Err(anyhow!("unknown argument: {other}")),
            }
        }
        Ok(parsed)
    }
}

/// Shared state injected into every handler.
#[derive(Clone)]
struct AppState {
    store: Arc<Store>,
    media_root: Arc<PathBuf>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::MissingField(_)
            | StoreError::UnknownCategory(_)
            | StoreError::Media(_) => StatusCode::BAD_REQUEST,
            StoreError::EmailTaken => StatusCode::CONFLICT,
            // An unknown caller id means "not signed in" as far as the
            // client is concerned: it answers by opening the sign-in flow.
            StoreError::InvalidCredentials | StoreError::UnknownUser(_) => {
                StatusCode::UNAUTHORIZED
            }
            StoreError::UnknownVideo(_) => StatusCode::NOT_FOUND,
            StoreError::NotOwner => StatusCode::FORBIDDEN,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ----------------------------------------------------------------------
// Wire types
// ----------------------------------------------------------------------

/// A user as the API exposes it: everything except the credential digest.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    id: String,
    email: String,
    channel_name: String,
    subscribers: u64,
    joined: String,
}

impl From<User> for ApiUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            channel_name: user.channel_name,
            subscribers: user.subscribers,
            joined: user.joined,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest {
    email: String,
    channel_name: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FeedQuery {
    view: Option<String>,
    category: Option<String>,
    q: Option<String>,
    user: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerQuery {
    user: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    user_id: String,
    title: String,
    #[serde(default)]
    description: String,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    file_name: String,
    /// Base64-encoded file contents.
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorRequest {
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditRequest {
    user_id: String,
    #[serde(flatten)]
    edit: VideoEdit,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    user_id: String,
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PlaybackRequest {
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadRequest {
    user_id: String,
    id: Option<String>,
    #[serde(default)]
    all: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleResponse {
    active: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaybackResponse {
    views: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetail {
    #[serde(flatten)]
    video: Video,
    liked: bool,
    saved_for_later: bool,
    subscribed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResponse {
    channel: ApiUser,
    videos: Vec<Video>,
    subscribed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationsResponse {
    notifications: Vec<Notification>,
    unread: usize,
}

// ----------------------------------------------------------------------
// Entry point
// ----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = BackendArgs::parse()?;
    ensure_not_root("backend")?;

    let config = resolve_runtime_config(RuntimeOverrides {
        data_root: args.data_root,
        media_root: args.media_root,
        port: args.port,
        host: args.host,
        env_path: None,
    })?;
    let host: IpAddr = config
        .host
        .parse()
        .context("expected a valid IPv4 or IPv6 address for --host/STREETTUBE_HOST")?;

    let store = Arc::new(Store::open(&config.data_root).await?);

    let removed = media::sweep_orphans(&config.media_root, &store.media_files())?;
    if removed > 0 {
        println!("Removed {removed} orphaned media file(s)");
    }

    let state = AppState {
        store,
        media_root: Arc::new(config.media_root),
    };

    let app = router(state);
    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    println!("StreetTube backend listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/videos", get(list_videos).post(upload_video))
        .route(
            "/api/videos/{id}",
            get(get_video).put(edit_video).delete(delete_video),
        )
        .route("/api/videos/{id}/view", post(record_view))
        .route("/api/videos/{id}/like", post(toggle_like))
        .route("/api/videos/{id}/watchlater", post(toggle_watch_later))
        .route(
            "/api/videos/{id}/comments",
            get(list_comments).post(submit_comment),
        )
        .route("/api/videos/{id}/stream", get(stream_video))
        .route("/api/channels/{id}", get(get_channel))
        .route("/api/channels/{id}/subscribe", post(toggle_subscribe))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read", post(mark_notifications_read))
        .with_state(state)
}

async fn shutdown_signal() {
    // Losing the handler only loses graceful shutdown; the process still
    // dies when Ctrl+C fires.
    if let Err(err) = signal::ctrl_c().await {
        eprintln!("Failed to install Ctrl+C handler: {err}");
    }
}

// ----------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------

async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> ApiResult<Json<ApiUser>> {
    let user = state
        .store
        .sign_up(&payload.email, &payload.channel_name, &payload.password)
        .await?;
    Ok(Json(user.into()))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<Json<ApiUser>> {
    let user = state.store.sign_in(&payload.email, &payload.password)?;
    Ok(Json(user.into()))
}

async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<Video>>> {
    let mode = match &query.view {
        Some(raw) => Some(
            ViewMode::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown view: {raw}")))?,
        ),
        None => None,
    };
    let videos = state.store.select_videos(&ViewRequest {
        mode,
        category: query.category,
        viewer: query.user,
        query: query.q.unwrap_or_default(),
    });
    Ok(Json(videos))
}

async fn upload_video(
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> ApiResult<Json<Video>> {
    // Reject unknown uploaders before any bytes land on disk.
    if state.store.user(&payload.user_id).is_none() {
        return Err(StoreError::UnknownUser(payload.user_id).into());
    }

    let data = BASE64
        .decode(payload.data.as_bytes())
        .map_err(|_| ApiError::bad_request("file data is not valid base64"))?;
    media::validate_upload(&payload.file_name, data.len() as u64)?;

    let file_id = Uuid::new_v4().to_string();
    let relative = media::save_media_file(&state.media_root, &file_id, &payload.file_name, &data)
        .await
        .map_err(|err| ApiError::internal(format!("could not store upload: {err}")))?;

    let probed = match media::probe(&state.media_root.join(&relative)).await {
        Ok(info) => info,
        Err(err) => {
            // The file is unusable; do not leave it for the sweep.
            media::remove_media_file(&state.media_root, &relative);
            return Err(err.into());
        }
    };

    let draft = NewVideo {
        title: payload.title,
        description: payload.description,
        category: payload.category,
        tags: payload.tags,
        video_file: relative.clone(),
        thumbnail: probed.thumbnail,
        duration: probed.duration_text,
    };
    match state.store.upload_video(&payload.user_id, draft).await {
        Ok(video) => Ok(Json(video)),
        Err(err) => {
            media::remove_media_file(&state.media_root, &relative);
            Err(err.into())
        }
    }
}

async fn get_video(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<VideoDetail>> {
    let video = state
        .store
        .video(&video_id)
        .ok_or_else(|| ApiError::not_found("video not found"))?;
    let (liked, saved_for_later, subscribed) = match &query.user {
        Some(user) => (
            state.store.is_liked(user, &video_id),
            state.store.is_saved_for_later(user, &video_id),
            state.store.is_subscribed(user, &video.user_id),
        ),
        None => (false, false, false),
    };
    Ok(Json(VideoDetail {
        video,
        liked,
        saved_for_later,
        subscribed,
    }))
}

async fn edit_video(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<EditRequest>,
) -> ApiResult<Json<Video>> {
    let video = state
        .store
        .edit_video(&payload.user_id, &video_id, payload.edit)
        .await?;
    Ok(Json(video))
}

async fn delete_video(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<ActorRequest>,
) -> ApiResult<StatusCode> {
    let removed = state
        .store
        .delete_video(&payload.user_id, &video_id)
        .await?;
    media::remove_media_file(&state.media_root, &removed.video_file);
    Ok(StatusCode::NO_CONTENT)
}

async fn record_view(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<PlaybackRequest>,
) -> ApiResult<Json<PlaybackResponse>> {
    let views = state
        .store
        .record_view(&video_id, payload.user_id.as_deref())
        .await?;
    Ok(Json(PlaybackResponse { views }))
}

async fn toggle_like(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<ActorRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let active = state.store.toggle_like(&payload.user_id, &video_id).await?;
    Ok(Json(ToggleResponse { active }))
}

async fn toggle_watch_later(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<ActorRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let active = state
        .store
        .toggle_watch_later(&payload.user_id, &video_id)
        .await?;
    Ok(Json(ToggleResponse { active }))
}

async fn list_comments(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    if state.store.video(&video_id).is_none() {
        return Err(ApiError::not_found("video not found"));
    }
    Ok(Json(state.store.comments_for(&video_id)))
}

async fn submit_comment(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = state
        .store
        .submit_comment(&payload.user_id, &video_id, &payload.text)
        .await?;
    Ok(Json(comment))
}

async fn get_channel(
    State(state): State<AppState>,
    AxumPath(channel_id): AxumPath<String>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<ChannelResponse>> {
    let channel = state
        .store
        .user(&channel_id)
        .ok_or_else(|| ApiError::not_found("channel not found"))?;
    let subscribed = query
        .user
        .as_deref()
        .is_some_and(|user| state.store.is_subscribed(user, &channel_id));
    Ok(Json(ChannelResponse {
        channel: channel.into(),
        videos: state.store.videos_by(&channel_id),
        subscribed,
    }))
}

async fn toggle_subscribe(
    State(state): State<AppState>,
    AxumPath(channel_id): AxumPath<String>,
    Json(payload): Json<ActorRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let active = state
        .store
        .toggle_subscribe(&payload.user_id, &channel_id)
        .await?;
    Ok(Json(ToggleResponse { active }))
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<NotificationsResponse>> {
    let user = query
        .user
        .ok_or_else(|| ApiError::bad_request("user is required"))?;
    Ok(Json(NotificationsResponse {
        notifications: state.store.notifications_for(&user),
        unread: state.store.unread_notifications(&user),
    }))
}

async fn mark_notifications_read(
    State(state): State<AppState>,
    Json(payload): Json<MarkReadRequest>,
) -> ApiResult<StatusCode> {
    if payload.all {
        state
            .store
            .mark_all_notifications_read(&payload.user_id)
            .await?;
    } else {
        let id = payload
            .id
            .ok_or_else(|| ApiError::bad_request("id or all is required"))?;
        state
            .store
            .mark_notification_read(&payload.user_id, &id)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------
// Streaming
// ----------------------------------------------------------------------

async fn stream_video(
    State(state): State<AppState>,
    AxumPath(video_id): AxumPath<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let video = state
        .store
        .video(&video_id)
        .ok_or_else(|| ApiError::not_found("video not found"))?;
    stream_file(state.media_root.join(&video.video_file), &headers).await
}

async fn stream_file(path: PathBuf, headers: &HeaderMap) -> ApiResult<Response> {
    let mut file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("media file not found"))?;
    let size = file
        .metadata()
        .await
        .map_err(|_| ApiError::not_found("media file not found"))?
        .len();

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_range(value, size));

    let mut response = match range {
        Some((start, _)) if start >= size => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
            response.headers_mut().insert(
                header::CONTENT_RANGE,
                format!("bytes */{size}").parse().unwrap(),
            );
            response
        }
        Some((start, end)) => {
            let end = end.min(size.saturating_sub(1));
            let length = end - start + 1;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|_| ApiError::not_found("media file not found"))?;
            let mut response =
                Body::from_stream(ReaderStream::new(file.take(length))).into_response();
            *response.status_mut() = StatusCode::PARTIAL_CONTENT;
            response.headers_mut().insert(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{size}").parse().unwrap(),
            );
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, length.to_string().parse().unwrap());
            response
        }
        None => Body::from_stream(ReaderStream::new(file)).into_response(),
    };

    response
        .headers_mut()
        .insert(header::ACCEPT_RANGES, "bytes".parse().unwrap());
    if let Some(mime) = MimeGuess::from_path(&path).first()
        && let Ok(value) = mime.to_string().parse()
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

/// Parses a `bytes=` range header against a file of `size` bytes. Returns
/// `None` for anything unusable, which downgrades the request to a full
/// response rather than erroring.
fn parse_range(value: &str, size: u64) -> Option<(u64, u64)> {
    let ranges = value.trim().strip_prefix("bytes=")?.trim();
    let (start_raw, end_raw) = ranges.split_once('-')?;

    if start_raw.is_empty() {
        // Suffix form "-N": the last N bytes.
        let suffix: u64 = end_raw.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        let start = size.saturating_sub(suffix);
        return Some((start, size.saturating_sub(1)));
    }

    let start: u64 = start_raw.parse().ok()?;
    let end: u64 = if end_raw.is_empty() {
        size.saturating_sub(1)
    } else {
        end_raw.parse().ok()?
    };
    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn args_from(values: &[&str]) -> Result<BackendArgs> {
        BackendArgs::from_iter(values.iter().map(|value| value.to_string()))
    }

    async fn test_state() -> Result<(TempDir, AppState)> {
        let dir = tempdir()?;
        let store = Store::open(&dir.path().join("data")).await?;
        let media_root = dir.path().join("media");
        Ok((
            dir,
            AppState {
                store: Arc::new(store),
                media_root: Arc::new(media_root),
            },
        ))
    }

    async fn seeded_user(state: &AppState, email: &str, channel: &str) -> User {
        state
            .store
            .sign_up(email, channel, "wastegate")
            .await
            .expect("sign up succeeds")
    }

    async fn seeded_video(state: &AppState, owner: &User, title: &str) -> Video {
        state
            .store
            .upload_video(
                &owner.id,
                NewVideo {
                    title: title.into(),
                    description: String::new(),
                    category: "racing".into(),
                    tags: Vec::new(),
                    video_file: format!("uploads/{title}.mp4"),
                    thumbnail: media::placeholder_thumbnail(),
                    duration: "1:00".into(),
                },
            )
            .await
            .expect("upload succeeds")
    }

    #[test]
    fn backend_args_accept_both_flag_forms() {
        let args = args_from(&[
            "--data-root=/srv/hub",
            "--port",
            "9000",
            "--host=0.0.0.0",
        ])
        .unwrap();
        assert_eq!(args.data_root, Some(PathBuf::from("/srv/hub")));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.media_root, None);
    }

    #[test]
    fn backend_args_reject_unknown_and_incomplete_flags() {
        assert!(args_from(&["--port"]).is_err());
        assert!(args_from(&["--port", "not-a-number"]).is_err());
        assert!(args_from(&["--frobnicate"]).is_err());
    }

    #[test]
    fn parse_range_covers_the_header_forms() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some((0, 99)));
        assert_eq!(parse_range("bytes=500-", 1000), Some((500, 999)));
        assert_eq!(parse_range("bytes=-100", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=-2000", 1000), Some((0, 999)));
        assert_eq!(parse_range("bytes=9-3", 1000), None);
        assert_eq!(parse_range("items=0-5", 1000), None);
        assert_eq!(parse_range("bytes=", 1000), None);
    }

    #[test]
    fn store_errors_map_to_meaningful_statuses() {
        let cases = [
            (
                ApiError::from(StoreError::MissingField("title")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StoreError::Media(MediaError::MissingFile)),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(StoreError::EmailTaken), StatusCode::CONFLICT),
            (
                ApiError::from(StoreError::InvalidCredentials),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(StoreError::UnknownUser("x".into())),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(StoreError::UnknownVideo("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::from(StoreError::NotOwner), StatusCode::FORBIDDEN),
        ];
        for (api, expected) in cases {
            assert_eq!(api.status, expected, "for {}", api.message);
        }
    }

    #[tokio::test]
    async fn signup_and_signin_round_trip_through_handlers() -> Result<()> {
        let (_dir, state) = test_state().await?;

        let signed_up = sign_up(
            State(state.clone()),
            Json(SignUpRequest {
                email: "kei@example.com".into(),
                channel_name: "Touge Nights".into(),
                password: "wastegate".into(),
            }),
        )
        .await
        .expect("signup succeeds");
        assert_eq!(signed_up.0.channel_name, "Touge Nights");

        let signed_in = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "kei@example.com".into(),
                password: "wastegate".into(),
            }),
        )
        .await
        .expect("signin succeeds");
        assert_eq!(signed_in.0.id, signed_up.0.id);

        let rejected = sign_in(
            State(state),
            Json(SignInRequest {
                email: "kei@example.com".into(),
                password: "wrong".into(),
            }),
        )
        .await;
        assert!(matches!(rejected, Err(err) if err.status == StatusCode::UNAUTHORIZED));
        Ok(())
    }

    #[tokio::test]
    async fn feed_handler_parses_view_modes() -> Result<()> {
        let (_dir, state) = test_state().await?;
        let owner = seeded_user(&state, "b@example.com", "B").await;
        seeded_video(&state, &owner, "pikes-peak").await;

        let feed = list_videos(
            State(state.clone()),
            Query(FeedQuery {
                view: Some("trending".into()),
                ..FeedQuery::default()
            }),
        )
        .await
        .expect("trending feed");
        assert_eq!(feed.0.len(), 1);

        let bogus = list_videos(
            State(state),
            Query(FeedQuery {
                view: Some("foryou".into()),
                ..FeedQuery::default()
            }),
        )
        .await;
        assert!(matches!(bogus, Err(err) if err.status == StatusCode::BAD_REQUEST));
        Ok(())
    }

    #[tokio::test]
    async fn video_detail_carries_viewer_flags() -> Result<()> {
        let (_dir, state) = test_state().await?;
        let owner = seeded_user(&state, "b@example.com", "B").await;
        let fan = seeded_user(&state, "a@example.com", "A").await;
        let video = seeded_video(&state, &owner, "onboard").await;

        state.store.toggle_like(&fan.id, &video.id).await?;
        state.store.toggle_subscribe(&fan.id, &owner.id).await?;

        let detail = get_video(
            State(state.clone()),
            AxumPath(video.id.clone()),
            Query(ViewerQuery {
                user: Some(fan.id.clone()),
            }),
        )
        .await
        .expect("detail");
        assert!(detail.0.liked);
        assert!(detail.0.subscribed);
        assert!(!detail.0.saved_for_later);

        let anonymous = get_video(
            State(state),
            AxumPath(video.id),
            Query(ViewerQuery { user: None }),
        )
        .await
        .expect("detail without viewer");
        assert!(!anonymous.0.liked);
        Ok(())
    }

    #[tokio::test]
    async fn delete_handler_removes_video_and_media_file() -> Result<()> {
        let (_dir, state) = test_state().await?;
        let owner = seeded_user(&state, "b@example.com", "B").await;
        let video = seeded_video(&state, &owner, "to-delete").await;

        let media_path = state.media_root.join(&video.video_file);
        std::fs::create_dir_all(media_path.parent().unwrap())?;
        std::fs::write(&media_path, b"bytes")?;

        let status = delete_video(
            State(state.clone()),
            AxumPath(video.id.clone()),
            Json(ActorRequest {
                user_id: owner.id.clone(),
            }),
        )
        .await
        .expect("delete succeeds");
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.store.video(&video.id).is_none());
        assert!(!media_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_handler_rejects_bad_payloads_before_writing() -> Result<()> {
        let (_dir, state) = test_state().await?;
        let owner = seeded_user(&state, "b@example.com", "B").await;

        let unknown_user = upload_video(
            State(state.clone()),
            Json(UploadRequest {
                user_id: "ghost".into(),
                title: "x".into(),
                description: String::new(),
                category: "builds".into(),
                tags: Vec::new(),
                file_name: "clip.mp4".into(),
                data: BASE64.encode(b"bytes"),
            }),
        )
        .await;
        assert!(matches!(unknown_user, Err(err) if err.status == StatusCode::UNAUTHORIZED));

        let wrong_type = upload_video(
            State(state.clone()),
            Json(UploadRequest {
                user_id: owner.id.clone(),
                title: "x".into(),
                description: String::new(),
                category: "builds".into(),
                tags: Vec::new(),
                file_name: "notes.txt".into(),
                data: BASE64.encode(b"bytes"),
            }),
        )
        .await;
        assert!(matches!(wrong_type, Err(err) if err.status == StatusCode::BAD_REQUEST));

        let bad_encoding = upload_video(
            State(state.clone()),
            Json(UploadRequest {
                user_id: owner.id,
                title: "x".into(),
                description: String::new(),
                category: "builds".into(),
                tags: Vec::new(),
                file_name: "clip.mp4".into(),
                data: "not base64 ***".into(),
            }),
        )
        .await;
        assert!(matches!(bad_encoding, Err(err) if err.status == StatusCode::BAD_REQUEST));

        // Nothing may have landed in the media root.
        assert!(!state.media_root.join(media::UPLOADS_SUBDIR).exists());
        Ok(())
    }

    #[tokio::test]
    async fn notifications_endpoint_requires_a_user() -> Result<()> {
        let (_dir, state) = test_state().await?;
        let missing = list_notifications(
            State(state.clone()),
            Query(ViewerQuery { user: None }),
        )
        .await;
        assert!(matches!(missing, Err(err) if err.status == StatusCode::BAD_REQUEST));

        let owner = seeded_user(&state, "b@example.com", "B").await;
        let fan = seeded_user(&state, "a@example.com", "A").await;
        let video = seeded_video(&state, &owner, "clip").await;
        state.store.toggle_like(&fan.id, &video.id).await?;

        let inbox = list_notifications(
            State(state),
            Query(ViewerQuery {
                user: Some(owner.id),
            }),
        )
        .await
        .expect("notifications");
        assert_eq!(inbox.0.notifications.len(), 1);
        assert_eq!(inbox.0.unread, 1);
        Ok(())
    }
}
