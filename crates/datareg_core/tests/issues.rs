mod common;

use common::{catalog, seed};
use datareg_core::db::open_db_in_memory;
use datareg_core::model::issue::{Issue, IssueTarget};
use datareg_core::model::object::{DataStore, Source};
use datareg_core::service::issue_service::target_of;
use datareg_core::{EntityKind, FilterSet, IssueService, RepoError, SqliteEntityRepository};
use rusqlite::params;

fn issues(conn: &rusqlite::Connection) -> IssueService<SqliteEntityRepository<'_>> {
    IssueService::new(SqliteEntityRepository::new(conn))
}

#[test]
fn attached_issues_are_listed_per_target_and_globally() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    let first = service
        .attach(target_of::<Source>(fixture.source), 1, "Test Issue 1", &fixture.actor)
        .unwrap();
    assert_eq!(first.name, "Test Issue 1 [Severity 1]");
    service
        .attach(
            target_of::<DataStore>(fixture.data_store),
            6,
            "Test Issue 2",
            &fixture.actor,
        )
        .unwrap();

    let on_source = service.list_for(target_of::<Source>(fixture.source)).unwrap();
    assert_eq!(on_source.len(), 1);
    assert_eq!(on_source[0].id(), first.id());

    let all = service
        .list_all()
        .unwrap()
        .into_iter()
        .map(|issue| issue.name)
        .collect::<Vec<_>>();
    assert_eq!(
        all,
        vec!["Test Issue 1 [Severity 1]", "Test Issue 2 [Severity 6]"]
    );

    assert_eq!(service.target_name(&first).unwrap(), "Journal X");
}

#[test]
fn issues_attach_by_type_name() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    let issue = service
        .attach_to("SourceVersion", fixture.source_version, 3, "stale", &fixture.actor)
        .unwrap();
    assert_eq!(issue.record().target_type, EntityKind::SourceVersion);
    assert_eq!(
        service.target_name(&issue).unwrap(),
        "Journal X (version 0.1.0)"
    );

    let err = service
        .attach_to("sourceversion", fixture.source_version, 3, "case", &fixture.actor)
        .unwrap_err();
    assert!(matches!(err, RepoError::UnregisteredType(ref name) if name == "sourceversion"));
    assert!(err.is_reference());
}

#[test]
fn attaching_to_missing_record_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    let err = service
        .attach(IssueTarget::new(EntityKind::Source, 999), 1, "ghost", &fixture.actor)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference {
            field: "target",
            kind: EntityKind::Source,
            id: 999
        }
    ));

    let err = service
        .list_for(IssueTarget::new(EntityKind::Source, 999))
        .unwrap_err();
    assert!(err.is_reference());
}

#[test]
fn deleting_target_removes_its_issues() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    service
        .attach(target_of::<Source>(fixture.source), 2, "bad source", &fixture.actor)
        .unwrap();
    service
        .attach_to("SourceVersion", fixture.source_version, 2, "bad version", &fixture.actor)
        .unwrap();
    let kept = service
        .attach(target_of::<DataStore>(fixture.data_store), 2, "bad store", &fixture.actor)
        .unwrap();

    catalog(&conn).delete::<Source>(fixture.source).unwrap();

    let remaining = service.list_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), kept.id());
}

#[test]
fn dangling_targets_are_reported_not_dropped() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    conn.execute(
        "INSERT INTO issues (target_type, target_id, severity, \"desc\", updated_by, last_updated)
         VALUES ('Source', 31337, 1, 'orphan', ?1, '2020-01-01');",
        params![fixture.user.id],
    )
    .unwrap();

    let err = service.list_all().unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference {
            field: "target",
            kind: EntityKind::Source,
            id: 31337
        }
    ));

    let issue = catalog(&conn)
        .list::<Issue>(&FilterSet::new().exact("desc", "orphan"))
        .unwrap()
        .remove(0);
    assert!(service.target_name(&issue).unwrap_err().is_reference());
}

#[test]
fn severity_filter_matches_exactly() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    for (severity, desc) in [(1, "minor"), (6, "major"), (6, "also major")] {
        service
            .attach(target_of::<Source>(fixture.source), severity, desc, &fixture.actor)
            .unwrap();
    }

    let major = catalog(&conn)
        .list::<Issue>(&FilterSet::new().with("severity", "6"))
        .unwrap();
    assert_eq!(major.len(), 2);
    assert!(major.iter().all(|issue| issue.record().severity == 6));
}

#[test]
fn deleting_an_issue_leaves_target_intact() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = issues(&conn);

    let issue = service
        .attach(target_of::<Source>(fixture.source), 1, "transient", &fixture.actor)
        .unwrap();
    service.delete(issue.id()).unwrap();

    assert!(service.list_all().unwrap().is_empty());
    assert!(catalog(&conn).find::<Source>(fixture.source).unwrap().is_some());
}
