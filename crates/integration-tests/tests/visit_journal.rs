//! Visit logging against a real database: create, edit, delete, stats.
//!
//! Run with: cargo test -p cafe-passport-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use cafe_passport_core::{PhotoRef, StickerTransform, VisitId};
use cafe_passport_integration_tests::{TempMedia, create_cafe, create_user, validated};
use cafe_passport_server::db::visits::DeleteOutcome;
use cafe_passport_server::db::{StatsRepository, StickerRepository, VisitRepository};
use cafe_passport_server::services::stats::summarize;
use cafe_passport_server::services::visit_submission::{
    Mode, SubmissionError, create_visit, update_visit,
};

fn blue_bottle_visit() -> serde_json::Value {
    json!({
        "date_visited": "2025-03-14",
        "rating": 4.5,
        "amount_spent": "12.50",
        "notes": "Bright and busy",
        "photos": [{"file_key": "counter", "caption": "The counter"}],
        "favorite_items": [{
            "name": "New Orleans Iced Coffee",
            "price": "6.25",
            "rating": 5,
            "photos": [{"file_key": "nola"}]
        }]
    })
}

async fn count(pool: &PgPool, sql: &str, visit_id: VisitId) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(visit_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_log_visit_with_photos_items_and_sticker(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let cafe = create_cafe(
        &pool,
        "Blue Bottle",
        "300 Webster St, Oakland",
        &["Pour Over", "Wifi"],
        Some(&alice),
    )
    .await;

    let visit = validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]);
    let receipt = create_visit(&pool, &media.store, alice.id, cafe.id, visit)
        .await
        .unwrap();
    assert_eq!(receipt.visit_photo_ids.len(), 1);
    assert_eq!(receipt.favorite_items.len(), 1);
    assert_eq!(receipt.favorite_items[0].item_photo_ids.len(), 1);
    assert_eq!(media.file_count(), 2);

    let visits = VisitRepository::new(&pool);
    assert_eq!(visits.owner(receipt.visit_id).await.unwrap(), Some(alice.id));

    let detail = visits.detail(receipt.visit_id).await.unwrap().unwrap();
    assert_eq!(detail.cafe_name, "Blue Bottle");
    assert_eq!(detail.visit.amount_spent.amount(), Decimal::from_str("12.50").unwrap());
    assert_eq!(detail.photos[0].caption, "The counter");
    assert!(detail.photos[0].url.starts_with("/media/visit_photos/"));
    assert_eq!(detail.favorite_items[0].item.name, "New Orleans Iced Coffee");

    // the visit photo is the cover on the profile list
    let summaries = visits.summaries(alice.id, None).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].cover_image, detail.photos[0].url);

    let stickers = StickerRepository::new(&pool);
    let heart = stickers
        .upsert_type("heart", "stickers/heart.png")
        .await
        .unwrap();
    let placed = stickers
        .create(
            PhotoRef::Visit(receipt.visit_photo_ids[0]),
            heart.id,
            StickerTransform::at(25.0, 75.0).unwrap(),
        )
        .await
        .unwrap();

    let detail = visits.detail(receipt.visit_id).await.unwrap().unwrap();
    assert_eq!(detail.photos[0].stickers, vec![placed]);
    assert!(detail.favorite_items[0].photos[0].stickers.is_empty());

    let stats = summarize(StatsRepository::new(&pool).raw(alice.id).await.unwrap());
    assert_eq!(stats.visits.total_visits, 1);
    assert_eq!(stats.wishlist.total, 1);
    assert_eq!(stats.wishlist.visited, 1);
    assert!((stats.wishlist.conversion_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(stats.favorite_items.total_items, 1);
    let tags: Vec<_> = stats.top_tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, vec!["Pour Over", "Wifi"]);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_oat_latte_visit_rows_and_stats(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let cafe = create_cafe(&pool, "Blue Bottle", "Oakland", &[], None).await;

    let payload = json!({
        "date_visited": "2025-01-01",
        "rating": 4,
        "amount_spent": "12.50",
        "photos": [{"file_key": "photo-0"}],
        "favorite_items": [{
            "name": "Oat Latte", "price": "5.50", "rating": 4.5,
            "photos": [{"file_key": "item-0-0"}]
        }]
    });
    let receipt = create_visit(
        &pool,
        &media.store,
        alice.id,
        cafe.id,
        validated(Mode::Create, &payload, &["photo-0", "item-0-0"]),
    )
    .await
    .unwrap();

    let id = receipt.visit_id;
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM passport.visit WHERE id = $1", id).await, 1);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM passport.visit_photo WHERE visit_id = $1", id).await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM passport.favorite_item WHERE visit_id = $1", id).await,
        1
    );
    assert_eq!(
        count(
            &pool,
            r"SELECT COUNT(*) FROM passport.item_photo ip
              JOIN passport.favorite_item fi ON fi.id = ip.item_id
              WHERE fi.visit_id = $1",
            id
        )
        .await,
        1
    );

    let stats = summarize(StatsRepository::new(&pool).raw(alice.id).await.unwrap());
    assert_eq!(stats.visits.avg_spend, Some(Decimal::from_str("12.50").unwrap()));
    assert!((stats.visits.avg_rating.unwrap() - 4.0).abs() < f64::EPSILON);
    // nothing wishlisted yet
    assert!(stats.wishlist.conversion_rate.abs() < f64::EPSILON);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_write_leaves_nothing_behind(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let cafe = create_cafe(&pool, "Blue Bottle", "Oakland", &[], None).await;

    // item photos are written after the visit photo; make the item photo insert fail
    sqlx::query(
        "ALTER TABLE passport.item_photo ADD CONSTRAINT reject_boom CHECK (caption <> 'boom')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let mut payload = blue_bottle_visit();
    payload["favorite_items"][0]["photos"][0]["caption"] = json!("boom");
    let visit = validated(Mode::Create, &payload, &["counter", "nola"]);

    let err = create_visit(&pool, &media.store, alice.id, cafe.id, visit)
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Repository(_)));

    let visits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passport.visit")
        .fetch_one(&pool)
        .await
        .unwrap();
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passport.favorite_item")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(visits, 0);
    assert_eq!(items, 0);
    assert_eq!(media.file_count(), 0);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_visit_to_missing_cafe_is_not_found(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;

    let visit = validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]);
    let err = create_visit(
        &pool,
        &media.store,
        alice.id,
        cafe_passport_core::CafeId::new(4242),
        visit,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SubmissionError::NotFound));
    assert_eq!(media.file_count(), 0);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_edit_replaces_photos_and_items(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let cafe = create_cafe(&pool, "Blue Bottle", "Oakland", &[], None).await;

    let created = create_visit(
        &pool,
        &media.store,
        alice.id,
        cafe.id,
        validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]),
    )
    .await
    .unwrap();
    let old_photo = created.visit_photo_ids[0];
    let item = created.favorite_items[0].id;

    let edit = json!({
        "date_visited": "2025-03-15",
        "rating": 3,
        "amount_spent": "8",
        "remove_photo_ids": [old_photo],
        "photos": [{"file_key": "patio"}],
        "favorite_items": [
            {"id": item, "delete": true},
            {"name": "Kyoto Cold Brew", "price": "5", "rating": 4}
        ]
    });
    let receipt = update_visit(
        &pool,
        &media.store,
        alice.id,
        created.visit_id,
        validated(Mode::Update, &edit, &["patio"]),
    )
    .await
    .unwrap();
    assert_eq!(receipt.deleted_item_ids, vec![item]);

    let detail = VisitRepository::new(&pool)
        .detail(created.visit_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.photos.len(), 1);
    assert_eq!(detail.photos[0].id, receipt.visit_photo_ids[0]);
    assert_eq!(detail.favorite_items.len(), 1);
    assert_eq!(detail.favorite_items[0].item.name, "Kyoto Cold Brew");
    // the removed visit photo and the deleted item's photo are gone from disk
    assert_eq!(media.file_count(), 1);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_edit_rejects_foreign_ids_and_keeps_state(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let cafe = create_cafe(&pool, "Blue Bottle", "Oakland", &[], None).await;

    let alices = create_visit(
        &pool,
        &media.store,
        alice.id,
        cafe.id,
        validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]),
    )
    .await
    .unwrap();
    let bobs = create_visit(
        &pool,
        &media.store,
        bob.id,
        cafe.id,
        validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]),
    )
    .await
    .unwrap();

    // bob cannot edit alice's visit
    let err = update_visit(
        &pool,
        &media.store,
        bob.id,
        alices.visit_id,
        validated(Mode::Update, &blue_bottle_visit(), &["counter", "nola"]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SubmissionError::Forbidden));

    // alice cannot remove bob's photo through her own visit
    let edit = json!({
        "date_visited": "2025-03-14",
        "rating": 1,
        "amount_spent": "1",
        "remove_photo_ids": [bobs.visit_photo_ids[0]]
    });
    let err = update_visit(
        &pool,
        &media.store,
        alice.id,
        alices.visit_id,
        validated(Mode::Update, &edit, &[]),
    )
    .await
    .unwrap_err();
    let SubmissionError::Invalid(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert!(errors.contains("remove_photo_ids"));

    let detail = VisitRepository::new(&pool)
        .detail(alices.visit_id)
        .await
        .unwrap()
        .unwrap();
    assert!((detail.visit.rating.value() - 4.5).abs() < f64::EPSILON);
    assert_eq!(media.file_count(), 4);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_delete_visit_returns_images(pool: PgPool) {
    let media = TempMedia::new();
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let cafe = create_cafe(&pool, "Blue Bottle", "Oakland", &[], None).await;
    let created = create_visit(
        &pool,
        &media.store,
        alice.id,
        cafe.id,
        validated(Mode::Create, &blue_bottle_visit(), &["counter", "nola"]),
    )
    .await
    .unwrap();

    let visits = VisitRepository::new(&pool);
    assert!(matches!(
        visits.delete(created.visit_id, bob.id).await.unwrap(),
        DeleteOutcome::Forbidden
    ));
    assert!(matches!(
        visits.delete(VisitId::new(9999), alice.id).await.unwrap(),
        DeleteOutcome::NotFound
    ));

    let DeleteOutcome::Deleted { images } = visits.delete(created.visit_id, alice.id).await.unwrap()
    else {
        panic!("expected the visit to be deleted");
    };
    assert_eq!(images.len(), 2);
    assert!(visits.detail(created.visit_id).await.unwrap().is_none());

    let stats = summarize(StatsRepository::new(&pool).raw(alice.id).await.unwrap());
    assert_eq!(stats.visits.total_visits, 0);
    assert!(stats.visits.avg_rating.is_none());
}
