//! Anchor requests and their preconditions.
//!
//! Requests arrive from callers with optional fields; validation turns them
//! into the checked forms providers receive. A failed precondition is a
//! caller error and is reported before any provider is touched.

use chrono::{DateTime, Duration, Utc};

use crate::anchor::{AnchorId, AnchorTarget, Pose};

/// Result type for request validation.
pub type Result<T> = std::result::Result<T, RequestError>;

/// Caller errors rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Anchor target is required")]
    MissingTarget,

    #[error("Time to live must expire in the future (expires at {expires_at})")]
    InvalidTimeToLive { expires_at: DateTime<Utc> },

    #[error("Time to live of {requested_secs}s exceeds the {max_secs}s limit")]
    TimeToLiveTooLong { requested_secs: i64, max_secs: u64 },

    #[error("Anchor id is required")]
    MissingAnchorId,

    #[error("At least one non-empty anchor id is required")]
    NoAnchorIds,

    #[error("Move requires the currently anchored target")]
    MissingMoveTarget,
}

/// Request to create an anchor for a target at a pose.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAnchorRequest {
    pub target: Option<AnchorTarget>,
    pub pose: Pose,
    /// Absolute expiry handed to the backend as its cache retention timeout.
    pub expires_at: DateTime<Utc>,
}

impl CreateAnchorRequest {
    pub fn new(target: impl Into<AnchorTarget>, pose: Pose, expires_at: DateTime<Utc>) -> Self {
        Self {
            target: Some(target.into()),
            pose,
            expires_at,
        }
    }

    /// Create request expiring `time_to_live` from now.
    pub fn expiring_in(target: impl Into<AnchorTarget>, pose: Pose, time_to_live: Duration) -> Self {
        Self::new(target, pose, Utc::now() + time_to_live)
    }

    /// Check preconditions against `now` and an optional lifetime ceiling.
    pub fn validate(
        self,
        now: DateTime<Utc>,
        max_time_to_live_secs: Option<u64>,
    ) -> Result<AnchorPlacement> {
        let target = match self.target {
            Some(target) if !target.is_blank() => target,
            _ => return Err(RequestError::MissingTarget),
        };

        if self.expires_at <= now {
            return Err(RequestError::InvalidTimeToLive {
                expires_at: self.expires_at,
            });
        }

        if let Some(max_secs) = max_time_to_live_secs {
            let requested_secs = (self.expires_at - now).num_seconds();
            if requested_secs > i64::try_from(max_secs).unwrap_or(i64::MAX) {
                return Err(RequestError::TimeToLiveTooLong {
                    requested_secs,
                    max_secs,
                });
            }
        }

        Ok(AnchorPlacement {
            target,
            pose: self.pose,
            expires_at: self.expires_at,
        })
    }
}

/// Validated create request as seen by providers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPlacement {
    pub target: AnchorTarget,
    pub pose: Pose,
    pub expires_at: DateTime<Utc>,
}

/// Request to move an already anchored target to a new pose.
///
/// Moving without the cached cloud id discards the cloud position of the
/// object; providers re-anchor it from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnchorRequest {
    pub target: Option<AnchorTarget>,
    pub pose: Pose,
    pub anchor_id: Option<AnchorId>,
}

impl MoveAnchorRequest {
    pub fn new(target: impl Into<AnchorTarget>, pose: Pose) -> Self {
        Self {
            target: Some(target.into()),
            pose,
            anchor_id: None,
        }
    }

    pub fn with_anchor_id(mut self, id: impl Into<AnchorId>) -> Self {
        self.anchor_id = Some(id.into());
        self
    }

    pub fn validate(self) -> Result<AnchorMove> {
        let target = match self.target {
            Some(target) if !target.is_blank() => target,
            _ => return Err(RequestError::MissingMoveTarget),
        };

        Ok(AnchorMove {
            target,
            pose: self.pose,
            anchor_id: self.anchor_id.filter(|id| !id.is_blank()),
        })
    }
}

/// Validated move request as seen by providers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMove {
    pub target: AnchorTarget,
    pub pose: Pose,
    pub anchor_id: Option<AnchorId>,
}

/// Require a single non-blank identity.
pub fn require_id(id: &AnchorId) -> Result<()> {
    if id.is_blank() {
        return Err(RequestError::MissingAnchorId);
    }
    Ok(())
}

/// Keep the non-blank identities, rejecting the call if none remain.
pub fn non_blank_ids(ids: &[AnchorId]) -> Result<Vec<AnchorId>> {
    let kept: Vec<AnchorId> = ids.iter().filter(|id| !id.is_blank()).cloned().collect();
    if kept.is_empty() {
        return Err(RequestError::NoAnchorIds);
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn future(secs: i64) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(secs)
    }

    #[test]
    fn test_create_requires_target() {
        let request = CreateAnchorRequest {
            target: None,
            pose: Pose::default(),
            expires_at: future(60),
        };
        assert_eq!(
            request.validate(Utc::now(), None),
            Err(RequestError::MissingTarget)
        );
    }

    #[test]
    fn test_create_rejects_blank_target() {
        let request = CreateAnchorRequest::new("  ", Pose::default(), future(60));
        assert_eq!(
            request.validate(Utc::now(), None),
            Err(RequestError::MissingTarget)
        );
    }

    #[test]
    fn test_create_rejects_expired_ttl() {
        let now = Utc::now();
        let request = CreateAnchorRequest::new("chair", Pose::default(), now);
        assert!(matches!(
            request.validate(now, None),
            Err(RequestError::InvalidTimeToLive { .. })
        ));
    }

    #[test]
    fn test_create_enforces_ttl_ceiling() {
        let now = Utc::now();
        let request =
            CreateAnchorRequest::new("chair", Pose::default(), now + Duration::seconds(7200));
        assert_eq!(
            request.validate(now, Some(3600)),
            Err(RequestError::TimeToLiveTooLong {
                requested_secs: 7200,
                max_secs: 3600,
            })
        );
    }

    #[test]
    fn test_create_with_huge_ttl_ceiling() {
        let now = Utc::now();
        let request = CreateAnchorRequest::new("chair", Pose::default(), now + Duration::days(365));
        assert!(request.validate(now, Some(u64::MAX)).is_ok());
    }

    #[test]
    fn test_create_valid() {
        let now = Utc::now();
        let placement = CreateAnchorRequest::new("chair", Pose::default(), now + Duration::hours(1))
            .validate(now, Some(7200))
            .unwrap();
        assert_eq!(placement.target.key(), "chair");
    }

    #[test]
    fn test_move_requires_target() {
        let request = MoveAnchorRequest {
            target: None,
            pose: Pose::default(),
            anchor_id: Some(AnchorId::new("cloud-1")),
        };
        assert_eq!(request.validate(), Err(RequestError::MissingMoveTarget));
    }

    #[test]
    fn test_move_drops_blank_anchor_id() {
        let moved = MoveAnchorRequest::new("lamp", Pose::default())
            .with_anchor_id("")
            .validate()
            .unwrap();
        assert!(moved.anchor_id.is_none());
    }

    #[test]
    fn test_non_blank_ids() {
        assert_eq!(non_blank_ids(&[]), Err(RequestError::NoAnchorIds));
        assert_eq!(
            non_blank_ids(&[AnchorId::new(""), AnchorId::new(" ")]),
            Err(RequestError::NoAnchorIds)
        );

        let kept = non_blank_ids(&[AnchorId::new(""), AnchorId::new("a")]).unwrap();
        assert_eq!(kept, vec![AnchorId::new("a")]);
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(&AnchorId::new("")), Err(RequestError::MissingAnchorId));
        assert!(require_id(&AnchorId::new("a")).is_ok());
    }
}
