//! Concurrent catalog access.

use std::sync::Arc;
use std::thread;

use course_catalog::catalog::{routes, CourseCandidate};
use course_catalog::observability::metrics::OutcomeKind;
use course_catalog::store::{CourseStore, JsonFileStore, MemoryStore};

mod common;

#[test]
fn test_concurrent_adds_and_rejections_are_counted_exactly() {
    let (catalog, spans) = common::catalog_with(Arc::new(MemoryStore::new()));
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    let code = format!("T{t}-{i}");
                    catalog
                        .add_course(CourseCandidate::new("Course", code.as_str(), 3, "Dr. A"))
                        .unwrap();
                    let _ = catalog.add_course(CourseCandidate::new("Course", code.as_str(), 0, "Dr. A"));
                    catalog.list_courses().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (threads * per_thread) as u64;
    let snapshot = catalog.instrumentation().metrics().snapshot();
    let add = snapshot.route(routes::ADD_COURSE);
    assert_eq!(add.count(OutcomeKind::Success), expected);
    assert_eq!(add.count(OutcomeKind::ClientError), expected);
    assert_eq!(snapshot.route(routes::LIST_COURSES).total(), expected);

    assert_eq!(catalog.list_courses().unwrap().len(), expected as usize);
    // adds, rejections, lists, plus the final list above
    assert_eq!(spans.len(), 3 * expected as usize + 1);
}

#[test]
fn test_concurrent_deletes_remove_each_record_once() {
    let (catalog, _) = common::catalog_with(Arc::new(MemoryStore::new()));
    let id = catalog
        .add_course(CourseCandidate::new("Algo", "CS101", 4, "Dr. A"))
        .unwrap()
        .course
        .id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let catalog = catalog.clone();
            let id = id.clone();
            thread::spawn(move || catalog.delete_course(&id).is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|deleted| *deleted)
        .count();

    assert_eq!(successes, 1);
    let delete = catalog.instrumentation().metrics().snapshot().route(routes::DELETE_COURSE);
    assert_eq!(delete.count(OutcomeKind::Success), 1);
    assert_eq!(delete.count(OutcomeKind::ClientError), 7);
    assert_eq!(delete.errors.get("not_found"), Some(&7));
}

#[test]
fn test_file_store_under_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("course_catalog.json");
    let (catalog, _) = common::catalog_with(Arc::new(JsonFileStore::open(&path).unwrap()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    catalog
                        .add_course(CourseCandidate::new("Course", format!("F{t}-{i}"), 2, "Dr. A"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.list().unwrap().len(), 40);
}
