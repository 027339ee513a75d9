//! Integration tests for genre assignment and relationship maintenance.

mod common;

use common::{Harness, detail_payload, harness};
use movie_nexus::domain::{MovieId, ProviderId};
use movie_nexus::models::{
    Movie, NewRelationship, RelationOrigin, RelationType, RelationshipIntegrityError,
};
use movie_nexus::services::{CatalogService, SyncError};

async fn synced(h: &Harness, id: i32, title: &str) -> Movie {
    h.provider
        .respond(&format!("movie/{id}"), detail_payload(id, title));
    h.service
        .get_or_sync(ProviderId::new(id), false)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_set_primary_leaves_exactly_one_primary() {
    let h = harness("set-primary").await;
    let movie = synced(&h, 603, "The Matrix").await;
    let reconciler = h.service.reconciler();

    let genre = reconciler.set_primary(&movie, 878).await.unwrap();
    assert_eq!(genre.name, "Science Fiction");

    reconciler.set_primary(&movie, 878).await.unwrap();

    let assignments = reconciler.genres_for(&movie).await.unwrap();
    assert_eq!(assignments.iter().filter(|a| a.is_primary).count(), 1);
    assert_eq!(assignments[0].genre.provider_id, 878);
    assert!((assignments[0].weight - 1.0).abs() < f64::EPSILON);

    let primary = reconciler.primary_genre(&movie).await.unwrap().unwrap();
    assert_eq!(primary.provider_id, 878);
}

#[tokio::test]
async fn test_set_primary_adds_missing_genre() {
    let h = harness("set-primary-new").await;
    let movie = synced(&h, 603, "The Matrix").await;
    let reconciler = h.service.reconciler();

    let genre = reconciler.set_primary(&movie, 18).await.unwrap();
    assert_eq!(genre.slug, "genre-18");

    let assignments = reconciler.genres_for(&movie).await.unwrap();
    assert_eq!(assignments.len(), 3);
    assert_eq!(assignments[0].genre.provider_id, 18);
    assert_eq!(assignments.iter().filter(|a| a.is_primary).count(), 1);
}

#[tokio::test]
async fn test_assign_genres_replaces_and_dedupes() {
    let h = harness("assign").await;
    let movie = synced(&h, 603, "The Matrix").await;
    let reconciler = h.service.reconciler();

    let assigned = reconciler.assign_genres(&movie, &[12, 12, 28]).await.unwrap();
    let ids: Vec<i32> = assigned.iter().map(|a| a.genre.provider_id).collect();
    assert_eq!(ids, vec![12, 28]);
    assert!(assigned[0].is_primary);

    reconciler.assign_genres(&movie, &[]).await.unwrap();
    assert!(reconciler.genres_for(&movie).await.unwrap().is_empty());
    assert!(reconciler.primary_genre(&movie).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sync_relationships_reports_skips_and_rejections() {
    let h = harness("sync-edges").await;
    let matrix = synced(&h, 603, "The Matrix").await;
    synced(&h, 604, "The Matrix Reloaded").await;
    synced(&h, 605, "The Matrix Revolutions").await;

    let ids: Vec<ProviderId> = [604, 605, 777, 604, 603]
        .into_iter()
        .map(ProviderId::new)
        .collect();
    let report = h
        .service
        .reconciler()
        .sync_relationships(&matrix, &ids, RelationType::ProviderSimilar)
        .await
        .unwrap();

    assert_eq!(report.linked, 2);
    assert_eq!(report.skipped_missing, vec![ProviderId::new(777)]);
    assert_eq!(report.rejected, 2);

    let targets = h
        .store
        .related_targets(matrix.id, RelationType::ProviderSimilar)
        .await
        .unwrap();
    let target_ids: Vec<i32> = targets.iter().map(|m| m.provider_id.value()).collect();
    assert_eq!(target_ids, vec![604, 605]);

    let report = h
        .service
        .reconciler()
        .sync_relationships(&matrix, &[], RelationType::ProviderSimilar)
        .await
        .unwrap();
    assert_eq!(report.linked, 0);
    assert!(
        h.store
            .related_targets(matrix.id, RelationType::ProviderSimilar)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_add_relationship_enforces_integrity() {
    let h = harness("add-edge").await;
    let matrix = synced(&h, 603, "The Matrix").await;
    let reloaded = synced(&h, 604, "The Matrix Reloaded").await;
    let reconciler = h.service.reconciler();

    let edge = NewRelationship {
        source: matrix.id,
        target: reloaded.id,
        relation_type: RelationType::ProviderRecommendation,
        confidence: Some(0.8),
        origin: RelationOrigin::Internal,
    };
    let stored = reconciler.add_relationship(edge.clone()).await.unwrap();
    assert_eq!(stored.origin, RelationOrigin::Internal);
    assert_eq!(stored.confidence, Some(0.8));

    let err = reconciler.add_relationship(edge).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Relationship(RelationshipIntegrityError::Duplicate { .. })
    ));

    let self_edge = NewRelationship::from_provider(
        matrix.id,
        matrix.id,
        RelationType::ProviderSimilar,
    );
    let err = reconciler.add_relationship(self_edge).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Relationship(RelationshipIntegrityError::SelfEdge(_))
    ));

    let dangling = NewRelationship::from_provider(
        matrix.id,
        MovieId::new(9_999),
        RelationType::ProviderSimilar,
    );
    let err = reconciler.add_relationship(dangling).await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownMovie(id) if id == MovieId::new(9_999)));

    assert_eq!(
        h.store
            .count_relationships(RelationOrigin::Internal)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_resync_keeps_internal_edges() {
    let h = harness("internal-edges").await;
    let matrix = synced(&h, 603, "The Matrix").await;
    let reloaded = synced(&h, 604, "The Matrix Reloaded").await;

    h.service
        .reconciler()
        .add_relationship(NewRelationship {
            source: matrix.id,
            target: reloaded.id,
            relation_type: RelationType::ProviderSimilar,
            confidence: Some(0.5),
            origin: RelationOrigin::Internal,
        })
        .await
        .unwrap();

    h.service
        .get_or_sync(ProviderId::new(603), true)
        .await
        .unwrap();

    assert_eq!(
        h.store
            .count_relationships(RelationOrigin::Internal)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_popular_genres_rank_by_active_movies() {
    let h = harness("popular-genres").await;
    synced(&h, 603, "The Matrix").await;
    let reloaded = synced(&h, 604, "The Matrix Reloaded").await;
    let hidden = synced(&h, 605, "The Matrix Revolutions").await;
    let reconciler = h.service.reconciler();

    reconciler.assign_genres(&reloaded, &[28, 12]).await.unwrap();
    reconciler.assign_genres(&hidden, &[18]).await.unwrap();
    h.service.deactivate(ProviderId::new(605)).await.unwrap();

    let ranked = reconciler.popular_genres(10).await.unwrap();
    let names: Vec<(&str, u64)> = ranked
        .iter()
        .map(|g| (g.genre.name.as_str(), g.movie_count))
        .collect();
    assert_eq!(
        names,
        vec![("Action", 2), ("Genre 12", 1), ("Science Fiction", 1)]
    );

    let top = reconciler.popular_genres(1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].genre.provider_id, 28);

    assert!(matches!(
        reconciler.popular_genres(0).await,
        Err(SyncError::Validation(_))
    ));
}
