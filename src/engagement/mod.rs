//! Article engagement: who is liking, and the counter payloads.
//!
//! The counters themselves are mutated by the repository inside single store
//! transactions (see `db::articles`), which keeps `likes == |likedBy|`.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Longest accepted caller-supplied identity.
pub const MAX_IDENTITY_LEN: usize = 128;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Opaque "who liked this" key stored in an article's like set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with("anon:")
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network origin of a request, as best as it can be determined.
///
/// Reads the first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket
/// peer address when the server was started with connect info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOrigin(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_ip = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        };

        let ip = header_ip(FORWARDED_FOR)
            .or_else(|| header_ip(REAL_IP))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            });

        Ok(RequestOrigin(ip))
    }
}

/// Resolve the identity a like/unlike is recorded under.
///
/// An explicit user id wins and is used verbatim (after trimming). Without
/// one, an anonymous identity is derived from the origin address when
/// `allow_anonymous` is set; it is stable per address but shared by every
/// caller behind the same NAT or proxy.
pub fn identity_for(
    user_id: Option<&str>,
    origin: RequestOrigin,
    allow_anonymous: bool,
) -> Result<Identity, AppError> {
    if let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) {
        if user_id.chars().count() > MAX_IDENTITY_LEN {
            return Err(AppError::Validation(format!(
                "userId cannot exceed {} characters",
                MAX_IDENTITY_LEN
            )));
        }
        return Ok(Identity(user_id.to_string()));
    }

    if !allow_anonymous {
        return Err(AppError::Validation("userId is required".to_string()));
    }

    match origin.0 {
        Some(ip) => Ok(Identity(format!("anon:{}", ip))),
        None => Err(AppError::Validation(
            "userId is required when the caller address is unknown".to_string(),
        )),
    }
}

/// Optional body of like/unlike requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Query string carrying an optional user id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Result of a successful like or unlike.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub article_id: String,
    pub likes: i64,
    pub liked: bool,
}

/// Whether an identity currently likes an article.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub article_id: String,
    pub liked: bool,
    pub likes: i64,
}

/// Like counters of an article.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStats {
    pub article_id: String,
    pub title: String,
    pub likes: i64,
    /// Size of the like set; always equal to `likes`
    pub unique_likers: i64,
}

/// View counter of an article.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStats {
    pub article_id: String,
    pub title: String,
    pub views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn origin(ip: &str) -> RequestOrigin {
        RequestOrigin(Some(ip.parse().unwrap()))
    }

    #[test]
    fn test_explicit_user_id_is_verbatim() {
        let id = identity_for(Some("  user-42 "), origin("10.0.0.1"), true).unwrap();
        assert_eq!(id.as_str(), "user-42");
        assert!(!id.is_anonymous());
    }

    #[test]
    fn test_anonymous_identity_is_stable_per_origin() {
        let a = identity_for(None, origin("10.0.0.1"), true).unwrap();
        let b = identity_for(Some("   "), origin("10.0.0.1"), true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "anon:10.0.0.1");
        assert!(a.is_anonymous());

        let other = identity_for(None, origin("10.0.0.2"), true).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_anonymous_disallowed() {
        assert!(matches!(
            identity_for(None, origin("10.0.0.1"), false),
            Err(AppError::Validation(_))
        ));
        assert!(identity_for(Some("u1"), origin("10.0.0.1"), false).is_ok());
    }

    #[test]
    fn test_unknown_origin_requires_user_id() {
        assert!(identity_for(None, RequestOrigin(None), true).is_err());
    }

    #[test]
    fn test_overlong_identity_rejected() {
        let long = "u".repeat(MAX_IDENTITY_LEN + 1);
        assert!(identity_for(Some(long.as_str()), RequestOrigin(None), true).is_err());
    }

    #[tokio::test]
    async fn test_origin_prefers_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let RequestOrigin(ip) = RequestOrigin::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_origin_falls_back_to_connect_info() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 5], 4000))));
        let (mut parts, _) = request.into_parts();
        let RequestOrigin(ip) = RequestOrigin::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ip, Some("192.0.2.5".parse().unwrap()));
    }
}
