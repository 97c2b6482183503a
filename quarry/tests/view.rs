mod common;

use common::{Purchase, Recorder, database, purchase};
use mongodb::options::{Acknowledgment, ReadPreference, WriteConcern};
use quarry::{
    Error, Iterable, Order,
    bson::{Document, doc},
    operation::{
        CursorFlag, Modification, ReadOperation, ReturnDocument, SINGLE_BATCH, WriteOperation,
    },
};
use std::time::Duration;

fn remove_multi(operation: &WriteOperation) -> bool {
    let WriteOperation::Remove(batch) = operation else {
        panic!("expected a remove, got {operation:?}");
    };
    batch.requests[0].multi
}

fn update_multi(operation: &WriteOperation) -> bool {
    let WriteOperation::Update(batch) = operation else {
        panic!("expected an update, got {operation:?}");
    };
    batch.requests[0].multi
}

#[tokio::test]
async fn remove_without_limit_applies_to_every_match() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    purchases.find(doc! { "status": "X" }).remove().await.unwrap();

    assert!(remove_multi(&recorder.last_write()));
}

#[tokio::test]
async fn remove_with_limit_one_applies_to_a_single_match() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    purchases
        .find(doc! { "status": "A" })
        .limit(1)
        .remove()
        .await
        .unwrap();

    assert!(!remove_multi(&recorder.last_write()));
}

#[tokio::test]
async fn remove_with_limit_zero_applies_to_every_match() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    purchases.find(doc! {}).limit(0).remove().await.unwrap();

    assert!(remove_multi(&recorder.last_write()));
}

#[tokio::test]
async fn other_limits_are_rejected_before_anything_is_sent() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.limit(2);

    let removed = view.remove().await;
    assert!(matches!(removed, Err(Error::InvalidLimit(2))));

    let updated = view.update(doc! { "$set": { "status": "B" } }).await;
    assert!(matches!(updated, Err(Error::InvalidLimit(2))));

    assert!(recorder.submissions().is_empty());
}

#[tokio::test]
async fn singular_forms_ignore_the_limit() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.limit(5);

    view.remove_one().await.unwrap();
    assert!(!remove_multi(&recorder.last_write()));

    view.update_one(doc! { "$inc": { "amt": 1 } }).await.unwrap();
    assert!(!update_multi(&recorder.last_write()));
}

#[tokio::test]
async fn update_follows_the_limit_and_carries_upsert() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.upsert();
    view.update(doc! { "$set": { "status": "B" } }).await.unwrap();

    let WriteOperation::Update(batch) = recorder.last_write() else {
        panic!("expected an update");
    };
    let request = &batch.requests[0];
    assert_eq!(request.filter, doc! { "status": "A" });
    assert_eq!(request.update, doc! { "$set": { "status": "B" } });
    assert!(request.upsert);
    assert!(request.multi);
    assert!(batch.ordered);
}

#[tokio::test]
async fn get_copies_the_query_into_the_find() {
    let recorder = Recorder::new();
    recorder.with_documents([doc! { "status": "A", "amt": 3 }]);
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.sort_by([(purchase::Fields::Amount, Order::Desc)])
        .fields_only(&["status", "amt"])
        .skip(4)
        .limit(10)
        .batch_size(50)
        .max_time(Duration::from_secs(2))
        .cursor_flag(CursorFlag::NoCursorTimeout)
        .with_read_preference(ReadPreference::SecondaryPreferred {
            options: Default::default(),
        });

    let found = view.to_vec().await.unwrap();
    assert_eq!(found, [Purchase::new("A", 3)]);

    let (ReadOperation::Find(find), read_preference) = recorder.last_read() else {
        panic!("expected a find");
    };
    assert_eq!(find.namespace.db, "shop");
    assert_eq!(find.namespace.coll, "purchases");
    assert_eq!(find.criteria, doc! { "status": "A" });
    assert_eq!(find.sort, Some(doc! { "amt": -1 }));
    assert_eq!(
        find.projection,
        Some(doc! { "status": 1, "amt": 1, "_id": 0 })
    );
    assert_eq!(find.skip, 4);
    assert_eq!(find.limit, 10);
    assert_eq!(find.batch_size, 50);
    assert_eq!(find.max_time, Some(Duration::from_secs(2)));
    assert!(find.cursor_flags.contains(&CursorFlag::NoCursorTimeout));
    assert!(matches!(
        read_preference,
        ReadPreference::SecondaryPreferred { .. }
    ));
}

#[tokio::test]
async fn get_one_asks_for_a_single_batch_and_closes() {
    let recorder = Recorder::new();
    recorder.with_documents([
        doc! { "status": "A", "amt": 1 },
        doc! { "status": "A", "amt": 2 },
    ]);
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.batch_size(100);

    let first = view.get_one().await.unwrap();
    assert_eq!(first, Some(Purchase::new("A", 1)));

    let (ReadOperation::Find(find), _) = recorder.last_read() else {
        panic!("expected a find");
    };
    assert_eq!(find.batch_size, SINGLE_BATCH);
    assert_eq!(recorder.closes(), 1);

    assert_eq!(view.find_operation().batch_size, 100);
}

#[tokio::test]
async fn get_one_without_matches_is_none() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    assert_eq!(purchases.find_all().get_one().await.unwrap(), None);
}

#[tokio::test]
async fn count_ignores_projection_and_sort() {
    let recorder = Recorder::new();
    recorder.with_count(7);
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.sort(doc! { "amt": 1 })
        .projection(doc! { "status": 1 })
        .skip(1)
        .limit(5);

    assert_eq!(view.count().await.unwrap(), 7);

    let (ReadOperation::Count(count), _) = recorder.last_read() else {
        panic!("expected a count");
    };
    assert_eq!(count.criteria, doc! { "status": "A" });
    assert_eq!(count.skip, 1);
    assert_eq!(count.limit, 5);
}

#[tokio::test]
async fn write_concern_override_reaches_the_batch() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let majority = WriteConcern::builder()
        .w(Acknowledgment::Majority)
        .build();

    purchases
        .with_write_concern(majority)
        .filter(doc! { "status": "A" })
        .remove()
        .await
        .unwrap();

    let WriteOperation::Remove(batch) = recorder.last_write() else {
        panic!("expected a remove");
    };
    assert_eq!(batch.write_concern.w, Some(Acknowledgment::Majority));
}

#[tokio::test]
async fn replace_targets_a_single_document() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let replacement = Purchase::new("B", 9);
    purchases
        .find(doc! { "status": "A" })
        .replace(&replacement)
        .await
        .unwrap();

    let WriteOperation::Replace(batch) = recorder.last_write() else {
        panic!("expected a replace");
    };
    let request = &batch.requests[0];
    assert_eq!(request.filter, doc! { "status": "A" });
    assert_eq!(request.replacement, doc! { "status": "B", "amt": 9_i64 });
    assert!(!request.upsert);
}

#[tokio::test]
async fn find_and_modify_variants_select_the_returned_image() {
    let recorder = Recorder::new();
    recorder.with_modified(doc! { "status": "B", "amt": 4 });
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.sort(doc! { "amt": 1 }).upsert();

    let updated = view
        .update_one_and_get(doc! { "$set": { "status": "B" } })
        .await
        .unwrap();
    assert_eq!(updated, Some(Purchase::new("B", 4)));

    let WriteOperation::FindAndModify(operation) = recorder.last_write() else {
        panic!("expected a find-and-modify");
    };
    assert_eq!(operation.filter, doc! { "status": "A" });
    assert_eq!(operation.sort, Some(doc! { "amt": 1 }));
    assert_eq!(
        operation.modification,
        Modification::Update(doc! { "$set": { "status": "B" } })
    );
    assert!(operation.upsert);
    assert_eq!(operation.return_document, ReturnDocument::After);

    view.get_one_and_replace(&Purchase::new("C", 1)).await.unwrap();
    let WriteOperation::FindAndModify(operation) = recorder.last_write() else {
        panic!("expected a find-and-modify");
    };
    assert_eq!(
        operation.modification,
        Modification::Replace(doc! { "status": "C", "amt": 1_i64 })
    );
    assert_eq!(operation.return_document, ReturnDocument::Before);

    view.get_one_and_remove().await.unwrap();
    let WriteOperation::FindAndModify(operation) = recorder.last_write() else {
        panic!("expected a find-and-modify");
    };
    assert_eq!(operation.modification, Modification::Remove);
    assert!(!operation.upsert);
    assert_eq!(operation.return_document, ReturnDocument::Before);
}

#[tokio::test]
async fn find_and_modify_without_match_is_none() {
    let recorder = Recorder::new();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let removed = purchases
        .find(doc! { "status": "Z" })
        .get_one_and_remove()
        .await
        .unwrap();

    assert_eq!(removed, None);
}

#[tokio::test]
async fn one_view_serves_several_terminal_calls() {
    let recorder = Recorder::new();
    recorder.with_count(2);
    let purchases = database(&recorder).collection::<Document>("purchases");

    let mut view = purchases.find(doc! { "status": "A" });
    view.limit(1);

    view.count().await.unwrap();
    view.limit(0);
    view.remove().await.unwrap();

    assert_eq!(recorder.names(), ["count", "delete"]);
    assert!(remove_multi(&recorder.last_write()));
}

#[tokio::test]
async fn execution_errors_are_returned_unchanged() {
    let recorder = Recorder::new();
    recorder.failing_writes();
    let purchases = database(&recorder).collection::<Purchase>("purchases");

    let error = purchases
        .find(doc! { "status": "A" })
        .update_one(doc! { "$set": { "status": "B" } })
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Execution(_)));
    assert_eq!(error.to_string(), "command execution failed: write rejected");
    assert_eq!(recorder.submissions().len(), 1);
}
