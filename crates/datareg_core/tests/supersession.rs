mod common;

use common::{catalog, seed, source_version};
use datareg_core::db::open_db_in_memory;
use datareg_core::model::version::SourceVersion;
use datareg_core::service::issue_service::target_of;
use datareg_core::{
    EntityKind, IssueService, RepoError, SqliteEntityRepository, ValidationError,
};

#[test]
fn successors_are_listed_and_branching_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let first = fixture.source_version;
    let second = service
        .create(&source_version(&fixture, "0.2.0", Some(first)), &fixture.actor)
        .unwrap();
    let branch = service
        .create(&source_version(&fixture, "0.2.0-alt", Some(first)), &fixture.actor)
        .unwrap();

    assert_eq!(
        service.superseded_by::<SourceVersion>(first).unwrap(),
        vec![second, branch]
    );
    assert!(service.superseded_by::<SourceVersion>(second).unwrap().is_empty());
}

#[test]
fn history_walks_predecessors_nearest_first() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let first = fixture.source_version;
    let second = service
        .create(&source_version(&fixture, "0.2.0", Some(first)), &fixture.actor)
        .unwrap();
    let third = service
        .create(&source_version(&fixture, "0.3.0", Some(second)), &fixture.actor)
        .unwrap();

    assert_eq!(
        service.supersession_history::<SourceVersion>(third).unwrap(),
        vec![second, first]
    );
    assert!(service
        .supersession_history::<SourceVersion>(first)
        .unwrap()
        .is_empty());
}

#[test]
fn update_rejects_supersession_cycles() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let first = fixture.source_version;
    let second = service
        .create(&source_version(&fixture, "0.2.0", Some(first)), &fixture.actor)
        .unwrap();

    let looped = source_version(&fixture, "0.1.0", Some(second));
    let err = service.update(first, &looped, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SupersessionCycle {
            kind: EntityKind::SourceVersion,
            ..
        })
    ));

    let self_loop = source_version(&fixture, "0.1.0", Some(first));
    let err = service.update(first, &self_loop, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SupersessionCycle { .. })
    ));

    assert_eq!(
        service.get::<SourceVersion>(first).unwrap().record().supersedes,
        None
    );
}

#[test]
fn deleting_a_predecessor_removes_successors_and_their_issues() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);
    let issues = IssueService::new(SqliteEntityRepository::new(&conn));

    let first = fixture.source_version;
    let second = service
        .create(&source_version(&fixture, "0.2.0", Some(first)), &fixture.actor)
        .unwrap();
    let third = service
        .create(&source_version(&fixture, "0.3.0", Some(second)), &fixture.actor)
        .unwrap();
    issues
        .attach(target_of::<SourceVersion>(third), 2, "late release", &fixture.actor)
        .unwrap();

    service.delete::<SourceVersion>(first).unwrap();

    assert!(service.find::<SourceVersion>(second).unwrap().is_none());
    assert!(service.find::<SourceVersion>(third).unwrap().is_none());
    assert!(issues.list_all().unwrap().is_empty());
}

#[test]
fn successors_of_unknown_record_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = catalog(&conn);

    let err = service.superseded_by::<SourceVersion>(321).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 321, .. }));
}
