//! Engagement handlers: views, votes, and aggregate queries

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use chapterhouse_common::{
    auth::AuthContext,
    db::Repository,
    engagement::{ChapterEngagement, EngagementService, StoryEngagement, VoteStatus},
    errors::Result,
};

#[derive(Serialize)]
pub struct ViewResponse {
    pub total_views: i64,
}

/// Record a view event for a chapter
///
/// Anonymous viewers are counted too; only the IP is kept for them.
pub async fn record_view(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<ViewResponse>> {
    let ip = client_ip(&headers);

    let service = EngagementService::new(Repository::new(state.db.clone()));
    let total_views = service.record_view(chapter_id, auth.user_id, &ip).await?;

    Ok(Json(ViewResponse { total_views }))
}

/// Toggle the caller's vote on a chapter
pub async fn toggle_vote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<VoteStatus>> {
    let service = EngagementService::new(Repository::new(state.db.clone()));
    let status = service.toggle_vote(chapter_id, auth.user_id).await?;

    Ok(Json(status))
}

/// Get a chapter's engagement totals plus the caller's vote status
pub async fn chapter_engagement(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<ChapterEngagement>> {
    let service = EngagementService::new(Repository::new(state.db.clone()));
    let engagement = service.chapter_engagement(chapter_id, auth.user_id).await?;

    Ok(Json(engagement))
}

/// Get a story's engagement totals
pub async fn story_engagement(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<StoryEngagement>> {
    let service = EngagementService::new(Repository::new(state.db.clone()));
    let engagement = service.story_engagement(story_id).await?;

    Ok(Json(engagement))
}

/// Best-effort client IP from proxy headers
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers), "198.51.100.2");
    }

    #[test]
    fn test_client_ip_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");
    }
}
