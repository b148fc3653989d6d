// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use europharm_app::{
    BrochureFormInput, ItemId, ItemListController, ItemPatch, ItemQuery, ItemStore, NewItem,
    PAGE_SIZE, run_fetch, run_toggle,
};
use europharm_db::{Store, evict_stale_cache, validate_db_path};
use europharm_testkit::{PharmaFaker, temp_db_path};
use std::fs;
use time::{Date, Month};

fn bootstrapped() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

fn insert(store: &Store, code: &str, name: &str) -> Result<ItemId> {
    store.insert_item(&NewItem {
        code: code.to_owned(),
        name: name.to_owned(),
        is_active: true,
    })
}

fn is_active(store: &Store, id: &ItemId) -> Result<bool> {
    let page = store.query_items(&ItemQuery {
        limit: 1000,
        ..ItemQuery::for_page("", 1)
    })?;
    page.rows
        .into_iter()
        .find(|item| &item.id == id)
        .map(|item| item.is_active)
        .ok_or_else(|| anyhow!("item {id} missing"))
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/europharm.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        insert(&store, "AMX-500", "Amoxicillin")?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(store.count_items()?, 1);
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = bootstrapped()?;
    store.raw_connection().execute_batch(
        "
        DROP TABLE items;
        CREATE TABLE items (
          id INTEGER PRIMARY KEY,
          code TEXT NOT NULL,
          name TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );
        ",
    )?;

    let error = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = error.to_string();
    assert!(message.contains("table `items` is missing required columns"));
    assert!(message.contains("is_active"));
    Ok(())
}

#[test]
fn query_pages_newest_first_with_exact_total() -> Result<()> {
    let store = bootstrapped()?;
    let mut faker = PharmaFaker::new(31);
    for _ in 0..23 {
        store.insert_item(&faker.new_item())?;
    }
    let newest = insert(&store, "NEW-1", "Newest")?;

    let first = store.query_items(&ItemQuery::for_page("", 1))?;
    assert_eq!(first.total, 24);
    assert_eq!(first.rows.len(), PAGE_SIZE);
    assert_eq!(first.rows[0].id, newest);

    let last = store.query_items(&ItemQuery::for_page("", 3))?;
    assert_eq!(last.rows.len(), 4);
    assert_eq!(last.rows[3].id, ItemId::new("1"));
    Ok(())
}

#[test]
fn search_matches_code_or_name_ignoring_case() -> Result<()> {
    let store = bootstrapped()?;
    insert(&store, "AMX-500", "Amoxicillin Capsules")?;
    insert(&store, "IBU-400", "Ibuprofen Tablets")?;
    insert(&store, "ORS-1", "Rehydration amx blend")?;

    let page = store.query_items(&ItemQuery::for_page("amx", 1))?;
    assert_eq!(page.total, 2);
    let codes: Vec<&str> = page.rows.iter().map(|row| row.code.as_str()).collect();
    assert_eq!(codes, vec!["ORS-1", "AMX-500"]);

    let none = store.query_items(&ItemQuery::for_page("zzz", 1))?;
    assert_eq!(none.total, 0);
    assert!(none.rows.is_empty());
    Ok(())
}

#[test]
fn search_treats_wildcards_literally() -> Result<()> {
    let store = bootstrapped()?;
    insert(&store, "PCT-50%", "Paracetamol promo")?;
    insert(&store, "PCT-500", "Paracetamol")?;
    insert(&store, "A_B", "Underscore")?;
    insert(&store, "AXB", "Lookalike")?;

    assert_eq!(store.query_items(&ItemQuery::for_page("50%", 1))?.total, 1);
    assert_eq!(store.query_items(&ItemQuery::for_page("a_b", 1))?.total, 1);
    Ok(())
}

#[test]
fn search_folds_non_ascii_case() -> Result<()> {
    let store = bootstrapped()?;
    insert(&store, "AM-01", "Ärztemuster")?;
    insert(&store, "EPO-4000", "Érythropoïétine")?;
    insert(&store, "AMX-500", "Amoxicillin")?;

    for term in ["ärzte", "ÄRZTE", "Ärzte"] {
        let page = store.query_items(&ItemQuery::for_page(term, 1))?;
        assert_eq!(page.total, 1, "term {term:?}");
        assert_eq!(page.rows[0].name, "Ärztemuster");
    }
    assert_eq!(store.query_items(&ItemQuery::for_page("éry", 1))?.total, 1);
    assert_eq!(store.query_items(&ItemQuery::for_page("POÏÉ", 1))?.total, 1);
    Ok(())
}

#[test]
fn update_flips_is_active_and_rejects_unknown_rows() -> Result<()> {
    let store = bootstrapped()?;
    let id = insert(&store, "AMX-500", "Amoxicillin")?;

    store.update_item(&id, ItemPatch::IsActive(false))?;
    assert!(!is_active(&store, &id)?);

    let missing = store
        .update_item(&ItemId::new("999"), ItemPatch::IsActive(true))
        .expect_err("unknown id");
    assert!(missing.to_string().contains("not found"));

    let foreign = store
        .update_item(
            &ItemId::new("2b1f6c3e-0000-4000-8000-000000000000"),
            ItemPatch::IsActive(true),
        )
        .expect_err("non-numeric id");
    assert!(foreign.to_string().contains("not a local row id"));
    Ok(())
}

#[test]
fn controller_drives_sqlite_store() -> Result<()> {
    let store = bootstrapped()?;
    store.seed_demo_data()?;

    let mut controller = ItemListController::new();
    let request = controller.set_search_term("tablets");
    run_fetch(&mut controller, &store, request);
    assert!(controller.total() > PAGE_SIZE);
    assert_eq!(controller.total_pages(), controller.total().div_ceil(PAGE_SIZE));

    let id = controller.rows()[0].id.clone();
    let before = controller.rows()[0].is_active;
    run_toggle(&mut controller, &store, &id);
    assert_eq!(is_active(&store, &id)?, !before);
    Ok(())
}

#[test]
fn brochure_crud_and_search() -> Result<()> {
    let store = bootstrapped()?;
    let id = store.create_brochure(&BrochureFormInput {
        title: " Vaccine Information ".to_owned(),
        description: "Protocols".to_owned(),
        category: "Immunization".to_owned(),
    })?;
    store.create_brochure(&BrochureFormInput {
        title: "Statin Dosage Guide".to_owned(),
        description: "Titration tables".to_owned(),
        category: "Cardiology".to_owned(),
    })?;

    assert_eq!(store.get_brochure(id)?.title, "Vaccine Information");
    assert_eq!(store.list_brochures("immun")?.len(), 1);
    assert_eq!(store.list_brochures("")?.len(), 2);

    store.update_brochure(
        id,
        &BrochureFormInput {
            title: "Vaccine Schedules".to_owned(),
            description: "Protocols".to_owned(),
            category: "Immunization".to_owned(),
        },
    )?;
    assert_eq!(store.get_brochure(id)?.title, "Vaccine Schedules");

    let invalid = store.create_brochure(&BrochureFormInput::default());
    assert!(invalid.is_err());

    store.delete_brochure(id)?;
    assert!(store.get_brochure(id).is_err());
    assert!(store.delete_brochure(id).is_err());
    Ok(())
}

#[test]
fn brochure_attachment_enforces_limit_and_extracts() -> Result<()> {
    let mut store = bootstrapped()?;
    store.set_max_brochure_size(16)?;
    let id = store.create_brochure(&PharmaFaker::new(4).brochure())?;

    let too_big = store
        .attach_brochure_file(id, "big.pdf", &[0_u8; 32])
        .expect_err("over the limit");
    assert!(too_big.to_string().contains("max allowed is 16"));

    let cache = tempfile::tempdir()?;
    assert!(store.extract_brochure_to(id, cache.path()).is_err());

    store.attach_brochure_file(id, "leaflet.pdf", b"%PDF-1.4 demo")?;
    let brochure = store.get_brochure(id)?;
    assert_eq!(brochure.file_name.as_deref(), Some("leaflet.pdf"));
    assert_eq!(brochure.size_bytes, 13);
    let checksum = brochure.checksum_sha256.expect("checksum recorded");

    let path = store.extract_brochure_to(id, cache.path())?;
    assert_eq!(fs::read(&path)?, b"%PDF-1.4 demo");
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    assert_eq!(name, format!("{checksum}-leaflet.pdf"));
    Ok(())
}

#[test]
fn attach_from_path_uses_file_name() -> Result<()> {
    let store = bootstrapped()?;
    let id = store.create_brochure(&PharmaFaker::new(5).brochure())?;
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("dosage-guide.pdf");
    fs::write(&source, b"dosage")?;

    store.attach_brochure_path(id, &source)?;
    assert_eq!(
        store.get_brochure(id)?.file_name.as_deref(),
        Some("dosage-guide.pdf")
    );
    Ok(())
}

#[test]
fn cycles_list_newest_start_first_and_validate() -> Result<()> {
    let store = bootstrapped()?;
    let mut faker = PharmaFaker::new(8);
    let mut first = faker.cycle(2026);
    first.date_from = Date::from_calendar_date(2026, Month::January, 1)?;
    first.date_to = Date::from_calendar_date(2026, Month::January, 31)?;
    let mut second = faker.cycle(2026);
    second.date_from = Date::from_calendar_date(2026, Month::March, 1)?;
    second.date_to = Date::from_calendar_date(2026, Month::March, 15)?;
    store.create_cycle(&first)?;
    store.create_cycle(&second)?;

    let cycles = store.list_cycles()?;
    assert_eq!(cycles.len(), 2);
    assert_eq!(cycles[0].date_from, second.date_from);
    assert_eq!(cycles[1].days(), 31);

    let mut inverted = faker.cycle(2026);
    inverted.date_to = Date::from_calendar_date(2025, Month::December, 1)?;
    inverted.date_from = Date::from_calendar_date(2026, Month::January, 1)?;
    assert!(store.create_cycle(&inverted).is_err());
    Ok(())
}

#[test]
fn demo_seed_fills_every_section() -> Result<()> {
    let store = bootstrapped()?;
    store.seed_demo_data()?;
    assert_eq!(store.count_items()?, 24);
    assert_eq!(store.list_brochures("")?.len(), 5);
    assert_eq!(store.list_cycles()?.len(), 6);
    Ok(())
}

#[test]
fn evict_stale_cache_skips_fresh_files_and_bad_ttl() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("fresh.pdf"), b"fresh")?;
    assert_eq!(evict_stale_cache(dir.path(), 30)?, 0);
    assert_eq!(evict_stale_cache(dir.path(), 0)?, 0);
    assert_eq!(evict_stale_cache(&dir.path().join("missing"), 30)?, 0);
    assert!(dir.path().join("fresh.pdf").exists());
    Ok(())
}
