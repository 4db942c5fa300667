//! Integration tests: personal-cabinet isolation and branch lifecycle.
//!
//! A personal branch must contain exactly the files of its bound document,
//! no matter what else lives on the shared line before or after creation,
//! and creating the same cabinet twice must be a no-op.

mod common;

use bindery::EngineError;
use common::{TestRepo, doc_id, user_id};

// ---------------------------------------------------------------------------
// Isolation: unrelated documents never reach a personal branch
// ---------------------------------------------------------------------------

#[test]
fn personal_cabinet_sees_only_its_bound_document() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");
    t.seed_main("beta", "B1");

    let cabinet = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), true)
        .unwrap();

    let docs = cabinet.documents().unwrap();
    assert_eq!(docs, vec![doc_id("alpha")]);
}

#[test]
fn documents_added_to_main_later_stay_invisible() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");

    let cabinet = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), true)
        .unwrap();
    t.seed_main("gamma", "G1");

    assert_eq!(cabinet.documents().unwrap(), vec![doc_id("alpha")]);
}

#[test]
fn parts_of_the_bound_document_coexist_with_the_body() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");
    t.seed_main("beta", "B1");

    let carol_cab = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("carol"), true)
        .unwrap();
    carol_cab.create(Some("notes"), b"margin notes").unwrap();

    assert!(carol_cab.exists(Some("notes")).unwrap());
    assert!(carol_cab.exists(None).unwrap());
    assert_eq!(carol_cab.documents().unwrap(), vec![doc_id("alpha")]);
}

#[test]
fn shared_parts_of_other_documents_stay_out_of_new_cabinets() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");
    t.seed_main("beta", "B1");

    // Publish a part of alpha to the shared line.
    let carol_cab = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("carol"), true)
        .unwrap();
    carol_cab.create(Some("notes"), b"margin notes").unwrap();
    carol_cab.document().unwrap().share("publish notes").unwrap();

    // A cabinet for beta must not see alpha or its part; sharing from it
    // must not disturb them on the shared line either.
    let bob_cab = t
        .repo
        .cabinet(&doc_id("beta"), &user_id("bob"), true)
        .unwrap();
    assert_eq!(bob_cab.documents().unwrap(), vec![doc_id("beta")]);

    let mut beta = bob_cab.document().unwrap();
    beta.write(b"B2".to_vec());
    beta.commit("B2", "bob").unwrap();
    beta.share("publish beta").unwrap();

    assert_eq!(t.main_content("alpha"), "A1");
    let dave_cab = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("dave"), true)
        .unwrap();
    assert_eq!(
        dave_cab.retrieve(Some("notes")).unwrap().read().unwrap(),
        b"margin notes"
    );
}

#[test]
fn missing_document_gets_an_empty_placeholder() {
    let t = TestRepo::new();

    // "ghost" was never created on the shared line.
    let cabinet = t
        .repo
        .cabinet(&doc_id("ghost"), &user_id("bob"), true)
        .unwrap();

    assert!(cabinet.exists(None).unwrap());
    let content = cabinet.document().unwrap().read().unwrap();
    assert!(content.is_empty());
}

// ---------------------------------------------------------------------------
// Idempotent creation
// ---------------------------------------------------------------------------

#[test]
fn creating_a_cabinet_twice_yields_the_same_tip() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");

    let first = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), true)
        .unwrap()
        .shelf()
        .unwrap()
        .revision();
    let second = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), true)
        .unwrap()
        .shelf()
        .unwrap()
        .revision();

    assert_eq!(first, second);
}

#[test]
fn missing_cabinet_without_create_fails() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");

    let err = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), false)
        .unwrap_err();
    assert!(matches!(err, EngineError::CabinetNotFound { .. }));
}

#[test]
fn distinct_users_get_distinct_branches() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");

    let bob = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("bob"), true)
        .unwrap();
    let carol = t
        .repo
        .cabinet(&doc_id("alpha"), &user_id("carol"), true)
        .unwrap();

    assert_ne!(bob.branch(), carol.branch());

    // Bob's edits stay on bob's branch.
    t.edit_personal("alpha", "bob", "bob's draft", "draft");
    let carol_content = carol.document().unwrap().read().unwrap();
    assert_eq!(carol_content, b"A1");
}

// ---------------------------------------------------------------------------
// Selector semantics
// ---------------------------------------------------------------------------

#[test]
fn main_cabinet_requires_a_selector() {
    let t = TestRepo::new();
    let err = t.repo.main_cabinet().retrieve(None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation { .. }));
}

#[test]
fn retrieving_a_missing_document_fails() {
    let t = TestRepo::new();
    let err = t.repo.main_cabinet().retrieve(Some("nope")).unwrap_err();
    assert!(matches!(err, EngineError::DocumentNotFound { .. }));
}

#[test]
fn creating_a_document_twice_fails() {
    let t = TestRepo::new();
    t.seed_main("alpha", "A1");
    let err = t
        .repo
        .main_cabinet()
        .create(Some("alpha"), b"again")
        .unwrap_err();
    assert!(matches!(err, EngineError::DocumentExists { .. }));
}

#[test]
fn shared_line_lists_documents_sorted_by_creation() {
    let t = TestRepo::new();
    t.seed_main("beta", "B1");
    t.seed_main("alpha", "A1");

    let mut docs = t.repo.main_cabinet().documents().unwrap();
    docs.sort();
    assert_eq!(docs, vec![doc_id("alpha"), doc_id("beta")]);
}
