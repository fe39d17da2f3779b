mod common;

use common::seed;
use datareg_core::browse::Browser;
use datareg_core::db::open_db_in_memory;
use datareg_core::model::object::Source;
use datareg_core::service::issue_service::target_of;
use datareg_core::{EntityKind, IssueService, RepoError, SqliteEntityRepository};
use serde_json::json;

#[test]
fn index_summarizes_object_types_alphabetically() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let index = Browser::new(&conn).index().unwrap();
    let names = index
        .objects
        .iter()
        .map(|object| object.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "dataproducts",
            "dataproductversions",
            "dataproductversioncomponents",
            "datastores",
            "models",
            "modelruns",
            "modelversions",
            "processingscripts",
            "processingscriptversions",
            "sources",
            "sourceversions",
        ]
    );

    let sources = index
        .objects
        .iter()
        .find(|object| object.name == "sources")
        .unwrap();
    assert_eq!(sources.display_name, "source");
    assert_eq!(sources.count, 1);
    assert!(!sources.doc.is_empty());
    assert!(index.issues.is_empty());
}

#[test]
fn list_page_links_each_object() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);

    let page = Browser::new(&conn).list_page("sourceversions").unwrap();
    assert_eq!(page.model_name, "sourceversion");
    assert_eq!(page.display_name, "source versions");
    assert_eq!(page.objects.len(), 1);
    assert_eq!(page.objects[0].name, "Journal X (version 0.1.0)");
    assert_eq!(
        page.objects[0].url,
        format!("/sourceversions/{}/", fixture.source_version)
    );
}

#[test]
fn detail_page_carries_record_and_its_issues() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    IssueService::new(SqliteEntityRepository::new(&conn))
        .attach(target_of::<Source>(fixture.source), 4, "wrong licence", &fixture.actor)
        .unwrap();

    let browser = Browser::new(&conn);
    let page = browser.detail_page("sources", fixture.source).unwrap();
    assert_eq!(page.object["name"], json!("Journal X"));
    assert_eq!(page.list_display_name, "sources");
    assert_eq!(page.issues.len(), 1);
    assert_eq!(page.issues[0].target_name, "Journal X");
    assert_eq!(page.issues[0].name, "wrong licence [Severity 4]");

    let index = browser.index().unwrap();
    assert_eq!(index.issues.len(), 1);
    assert_eq!(
        index.issues[0].target_url,
        format!("/sources/{}/", fixture.source)
    );

    let issue = browser.issue_detail_page(index.issues[0].id).unwrap();
    assert_eq!(issue.target_type, EntityKind::Source);
    assert_eq!(browser.issue_list_page().unwrap(), index.issues);
}

#[test]
fn non_object_types_have_no_browse_pages() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let browser = Browser::new(&conn);

    assert!(matches!(
        browser.list_page("storagetypes"),
        Err(RepoError::UnknownType(_))
    ));
    assert!(matches!(
        browser.list_page("nothing"),
        Err(RepoError::UnknownType(_))
    ));
    assert!(matches!(
        browser.detail_page("sources", fixture.source + 100),
        Err(RepoError::NotFound { .. })
    ));
}
