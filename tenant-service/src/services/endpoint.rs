//! Back-end REST URLs built segment by segment.
//!
//! Every identifier is percent-encoded as a single path segment, so a
//! name containing `/`, `?` or `#` can never address another resource.

use super::outcome::{Outcome, ServiceError};
use reqwest::Url;

/// `base` followed by `segments`, each encoded as one path segment.
///
/// `.` and `..` do not name any back-end object and yield
/// [`ServiceError::NotFound`].
pub fn endpoint(base: &str, segments: &[&str]) -> Outcome<Url> {
    if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
        tracing::warn!(segment = %segment, "Rejected relative path segment");
        return Err(ServiceError::NotFound);
    }

    let mut url = Url::parse(base).map_err(|e| {
        ServiceError::exception(anyhow::anyhow!("Invalid back-end URL {}: {}", base, e))
    })?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::exception(anyhow::anyhow!("Back-end URL {} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_are_encoded() {
        let url = endpoint("http://kc:8080/", &["admin", "groups", "../users/victim?x#y"]).unwrap();
        assert_eq!(url.path(), "/admin/groups/..%2Fusers%2Fvictim%3Fx%23y");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_base_path_is_kept() {
        let url = endpoint("http://kc:8080/auth", &["realms", "t1.admin"]).unwrap();
        assert_eq!(url.as_str(), "http://kc:8080/auth/realms/t1.admin");
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for segment in [".", ".."] {
            assert!(matches!(
                endpoint("http://kc:8080", &["groups", segment]),
                Err(ServiceError::NotFound)
            ));
        }
    }

    #[test]
    fn test_placeholder_role_name_is_allowed() {
        let url = endpoint("http://kc:8080", &["roles", "t1."]).unwrap();
        assert_eq!(url.path(), "/roles/t1.");
    }
}
