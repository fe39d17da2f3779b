mod common;

use common::{catalog, date, seed, source_version};
use datareg_core::db::open_db_in_memory;
use datareg_core::model::object::{ModelRun, Source};
use datareg_core::model::reference::StorageType;
use datareg_core::model::version::{DataProductVersion, ModelVersion, SourceVersion};
use datareg_core::{EntityKind, FilterSet, RepoError, ValidationError};

#[test]
fn create_stamps_attribution_and_get_returns_record() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let source = service.get::<Source>(fixture.source).unwrap();
    assert_eq!(source.name, "Journal X");
    assert_eq!(source.stored.updated_by, fixture.user.id);
    assert_eq!(source.record().store, fixture.data_store);
    assert_eq!(
        source.stored.last_updated,
        chrono::Utc::now().date_naive()
    );
}

#[test]
fn unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = catalog(&conn);

    let err = service.get::<Source>(999).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Source,
            id: 999
        }
    ));
    assert!(service.find::<Source>(999).unwrap().is_none());
}

#[test]
fn duplicate_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let err = service
        .create(
            &StorageType {
                name: "git".to_string(),
                description: None,
            },
            &fixture.actor,
        )
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::Duplicate { fields }) => {
            assert_eq!(fields, vec!["name"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn version_identifier_is_unique_per_parent() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let err = service
        .create(&source_version(&fixture, "0.1.0", None), &fixture.actor)
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::Duplicate { fields }) => {
            assert_eq!(fields, vec!["source", "version_identifier"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let other_source = service
        .create(
            &Source {
                name: "Journal Y".to_string(),
                responsible_person: fixture.user.id,
                store: fixture.data_store,
                source_type: fixture.source_type,
                description: "second journal".to_string(),
            },
            &fixture.actor,
        )
        .unwrap();
    let mut same_identifier = source_version(&fixture, "0.1.0", None);
    same_identifier.source = other_source;
    service.create(&same_identifier, &fixture.actor).unwrap();
}

#[test]
fn model_runs_are_unique_per_version_and_date() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let run = service.get::<ModelRun>(fixture.model_run).unwrap();
    assert_eq!(run.name, "SIR (version 0.2.0) (Run 2020-05-01)");
    assert_eq!(run.record().inputs, vec![fixture.component]);
    assert_eq!(run.record().outputs, vec![fixture.product_version]);

    let mut rerun = run.record().clone();
    rerun.inputs.clear();
    let err = service.create(&rerun, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Duplicate { .. })
    ));

    rerun.release_date = date("2020-05-02");
    service.create(&rerun, &fixture.actor).unwrap();
}

#[test]
fn missing_references_are_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let mut orphan = source_version(&fixture, "9.9.9", None);
    orphan.source = 4242;
    let err = service.create(&orphan, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference {
            field: "source",
            kind: EntityKind::Source,
            id: 4242
        }
    ));

    let mut bad_person = source_version(&fixture, "9.9.9", None);
    bad_person.responsible_person = 77;
    let err = service.create(&bad_person, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::MissingPrincipal {
            field: "responsible_person",
            id: 77
        }
    ));

    let mut bad_link = service
        .get::<DataProductVersion>(fixture.product_version)
        .unwrap()
        .record()
        .clone();
    bad_link.version_identifier = "0.2.0".to_string();
    bad_link.source_versions = vec![fixture.source_version, 555];
    let err = service.create(&bad_link, &fixture.actor).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Reference {
            field: "source_versions",
            id: 555,
            ..
        }
    ));

    assert_eq!(service.list::<SourceVersion>(&FilterSet::new()).unwrap().len(), 1);
}

#[test]
fn blank_required_fields_are_validation_errors() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let err = service
        .create(
            &StorageType {
                name: "  ".to_string(),
                description: None,
            },
            &fixture.actor,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Required("name"))
    ));
}

#[test]
fn derived_names_follow_parent_renames() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    assert_eq!(
        service.name_of::<SourceVersion>(fixture.source_version).unwrap(),
        "Journal X (version 0.1.0)"
    );

    let mut source = service.get::<Source>(fixture.source).unwrap().record().clone();
    source.name = "Journal Z".to_string();
    service.update(fixture.source, &source, &fixture.actor).unwrap();

    assert_eq!(
        service.get::<SourceVersion>(fixture.source_version).unwrap().name,
        "Journal Z (version 0.1.0)"
    );
    let parent = service.parent_of::<SourceVersion>(fixture.source_version).unwrap();
    assert_eq!(parent.id(), fixture.source);
    assert_eq!(parent.name, "Journal Z");
}

#[test]
fn update_of_missing_record_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let record = source_version(&fixture, "2.0.0", None);
    let err = service.update(404, &record, &fixture.actor).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 404, .. }));
}

#[test]
fn listing_orders_by_name_then_id() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    for name in ["zeta", "alpha", "Beta"] {
        service
            .create(
                &StorageType {
                    name: name.to_string(),
                    description: None,
                },
                &fixture.actor,
            )
            .unwrap();
    }

    let names = service
        .list::<StorageType>(&FilterSet::new())
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Beta", "alpha", "git", "zeta"]);
}

#[test]
fn deleting_a_parent_cascades_to_its_versions() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    service.delete::<Source>(fixture.source).unwrap();
    assert!(service
        .find::<SourceVersion>(fixture.source_version)
        .unwrap()
        .is_none());

    let product_version = service
        .get::<DataProductVersion>(fixture.product_version)
        .unwrap();
    assert!(product_version.record().source_versions.is_empty());

    let err = service.delete::<Source>(fixture.source).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn model_version_names_use_model_parent() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = catalog(&conn);

    let version = service.get::<ModelVersion>(fixture.model_version).unwrap();
    assert_eq!(version.name, "SIR (version 0.2.0)");
}
