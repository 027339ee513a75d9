use crate::domain::{MovieId, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tag distinguishing the two provider-generated edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    ProviderRecommendation,
    ProviderSimilar,
}

impl RelationType {
    pub const ALL: [Self; 2] = [Self::ProviderRecommendation, Self::ProviderSimilar];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderRecommendation => "provider_recommendation",
            Self::ProviderSimilar => "provider_similar",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider_recommendation" => Ok(Self::ProviderRecommendation),
            "provider_similar" => Ok(Self::ProviderSimilar),
            other => Err(format!("unknown relation type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOrigin {
    Provider,
    Internal,
}

impl RelationOrigin {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Internal => "internal",
        }
    }
}

impl FromStr for RelationOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider" => Ok(Self::Provider),
            "internal" => Ok(Self::Internal),
            other => Err(format!("unknown relation origin: {other}")),
        }
    }
}

/// An edge the reconciler refuses to persist.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelationshipIntegrityError {
    #[error("movie {0} cannot be related to itself")]
    SelfEdge(MovieId),

    #[error("edge {source_movie} -> {target_movie} ({relation_type}) already exists")]
    Duplicate {
        source_movie: MovieId,
        target_movie: MovieId,
        relation_type: RelationType,
    },

    #[error("internal edges require a confidence score")]
    ConfidenceRequired,

    #[error("provider edges must not carry a confidence score")]
    ConfidenceForbidden,

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRelationship {
    pub source: MovieId,
    pub target: MovieId,
    pub relation_type: RelationType,
    pub confidence: Option<f64>,
    pub origin: RelationOrigin,
}

impl NewRelationship {
    #[must_use]
    pub const fn from_provider(source: MovieId, target: MovieId, relation_type: RelationType) -> Self {
        Self {
            source,
            target,
            relation_type,
            confidence: None,
            origin: RelationOrigin::Provider,
        }
    }

    pub fn validate(&self) -> Result<(), RelationshipIntegrityError> {
        if self.source == self.target {
            return Err(RelationshipIntegrityError::SelfEdge(self.source));
        }

        match (self.origin, self.confidence) {
            (RelationOrigin::Provider, Some(_)) => {
                Err(RelationshipIntegrityError::ConfidenceForbidden)
            }
            (RelationOrigin::Internal, None) => Err(RelationshipIntegrityError::ConfidenceRequired),
            (RelationOrigin::Internal, Some(c)) if !(0.0..=1.0).contains(&c) => {
                Err(RelationshipIntegrityError::ConfidenceOutOfRange(c))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRelationship {
    pub id: i32,
    pub source_movie_id: MovieId,
    pub target_movie_id: MovieId,
    pub relation_type: RelationType,
    pub confidence: Option<f64>,
    pub origin: RelationOrigin,
    pub created_at: DateTime<Utc>,
}

/// Outcome of replacing one relation type's edges for a source movie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipSyncReport {
    pub linked: usize,
    pub skipped_missing: Vec<ProviderId>,
    pub rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_edge_rejected() {
        let edge = NewRelationship::from_provider(
            MovieId::new(4),
            MovieId::new(4),
            RelationType::ProviderSimilar,
        );
        assert_eq!(
            edge.validate(),
            Err(RelationshipIntegrityError::SelfEdge(MovieId::new(4)))
        );
    }

    #[test]
    fn test_confidence_rules_follow_origin() {
        let mut edge = NewRelationship::from_provider(
            MovieId::new(1),
            MovieId::new(2),
            RelationType::ProviderRecommendation,
        );
        assert!(edge.validate().is_ok());

        edge.confidence = Some(0.4);
        assert_eq!(
            edge.validate(),
            Err(RelationshipIntegrityError::ConfidenceForbidden)
        );

        edge.origin = RelationOrigin::Internal;
        assert!(edge.validate().is_ok());

        edge.confidence = None;
        assert_eq!(
            edge.validate(),
            Err(RelationshipIntegrityError::ConfidenceRequired)
        );

        edge.confidence = Some(1.5);
        assert_eq!(
            edge.validate(),
            Err(RelationshipIntegrityError::ConfidenceOutOfRange(1.5))
        );
    }

    #[test]
    fn test_relation_type_round_trips_through_storage_name() {
        for relation_type in RelationType::ALL {
            assert_eq!(relation_type.as_str().parse(), Ok(relation_type));
        }
    }
}
