#![allow(dead_code)]

use chrono::NaiveDate;
use datareg_core::model::object::{
    DataProduct, DataProductVersionComponent, DataStore, Model, ModelRun, ProcessingScript, Source,
};
use datareg_core::model::reference::{
    Accessibility, DataProductDataType, DataProductType, SourceType, StorageRoot, StorageType,
};
use datareg_core::model::version::{
    DataProductVersion, ModelVersion, ProcessingScriptVersion, SourceVersion,
};
use datareg_core::{
    AuthService, CatalogService, EntityId, Principal, SqliteEntityRepository,
    SqliteUserRepository, User,
};
use rusqlite::Connection;

/// Ids of one small, fully linked provenance graph.
pub struct Fixture {
    pub user: User,
    pub actor: Principal,
    pub token: String,
    pub storage_type: EntityId,
    pub storage_root: EntityId,
    pub data_store: EntityId,
    pub accessibility: EntityId,
    pub source_type: EntityId,
    pub source: EntityId,
    pub source_version: EntityId,
    pub script: EntityId,
    pub script_version: EntityId,
    pub product_type: EntityId,
    pub data_type: EntityId,
    pub product: EntityId,
    pub product_version: EntityId,
    pub component: EntityId,
    pub model: EntityId,
    pub model_version: EntityId,
    pub model_run: EntityId,
}

pub fn register(conn: &Connection, username: &str) -> (User, String) {
    let auth = AuthService::new(SqliteUserRepository::new(conn));
    let user = auth.register_user(username).unwrap();
    let token = auth.issue_token(&user).unwrap();
    (user, token)
}

pub fn catalog(conn: &Connection) -> CatalogService<SqliteEntityRepository<'_>> {
    CatalogService::new(SqliteEntityRepository::new(conn))
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn source_version(fixture: &Fixture, identifier: &str, supersedes: Option<EntityId>) -> SourceVersion {
    SourceVersion {
        responsible_person: fixture.user.id,
        version_identifier: identifier.to_string(),
        supersedes,
        source: fixture.source,
        store: fixture.data_store,
        description: format!("release {identifier}"),
        accessibility: fixture.accessibility,
    }
}

pub fn seed(conn: &Connection) -> Fixture {
    let (user, token) = register(conn, "Test User");
    let actor = Principal::from(&user);
    let service = catalog(conn);
    let person = user.id;

    let storage_type = service
        .create(
            &StorageType {
                name: "git".to_string(),
                description: Some("git hosting".to_string()),
            },
            &actor,
        )
        .unwrap();
    let storage_root = service
        .create(
            &StorageRoot {
                name: "github".to_string(),
                storage_type,
                description: None,
                uri: "https://github.com".to_string(),
            },
            &actor,
        )
        .unwrap();
    let data_store = service
        .create(
            &DataStore {
                name: "SCRC/human/infection".to_string(),
                responsible_person: person,
                store_root: storage_root,
                description: None,
                path: Some("master/SCRC/human/infection/0.1.0.toml".to_string()),
                hash: Some("43faf6d048b92ed1820db2e662ba403eb0e371fb".to_string()),
                local_cache_url: None,
            },
            &actor,
        )
        .unwrap();
    let accessibility = service
        .create(
            &Accessibility {
                name: "public".to_string(),
                description: None,
                access_info: "open access".to_string(),
            },
            &actor,
        )
        .unwrap();
    let source_type = service
        .create(
            &SourceType {
                name: "journal".to_string(),
                description: "peer reviewed journal".to_string(),
            },
            &actor,
        )
        .unwrap();
    let source = service
        .create(
            &Source {
                name: "Journal X".to_string(),
                responsible_person: person,
                store: data_store,
                source_type,
                description: "source journal".to_string(),
            },
            &actor,
        )
        .unwrap();

    let mut fixture = Fixture {
        user,
        actor,
        token,
        storage_type,
        storage_root,
        data_store,
        accessibility,
        source_type,
        source,
        source_version: 0,
        script: 0,
        script_version: 0,
        product_type: 0,
        data_type: 0,
        product: 0,
        product_version: 0,
        component: 0,
        model: 0,
        model_version: 0,
        model_run: 0,
    };
    let actor = fixture.actor.clone();

    fixture.source_version = service
        .create(&source_version(&fixture, "0.1.0", None), &actor)
        .unwrap();
    fixture.script = service
        .create(
            &ProcessingScript {
                name: "process.py".to_string(),
                responsible_person: person,
                store: data_store,
            },
            &actor,
        )
        .unwrap();
    fixture.script_version = service
        .create(
            &ProcessingScriptVersion {
                responsible_person: person,
                version_identifier: "1.0.0".to_string(),
                supersedes: None,
                processing_script: fixture.script,
                store: data_store,
                accessibility,
            },
            &actor,
        )
        .unwrap();
    fixture.product_type = service
        .create(
            &DataProductType {
                name: "table".to_string(),
                description: "tabular data".to_string(),
            },
            &actor,
        )
        .unwrap();
    fixture.data_type = service
        .create(
            &DataProductDataType {
                name: "csv".to_string(),
                description: "comma separated".to_string(),
                product_type: fixture.product_type,
            },
            &actor,
        )
        .unwrap();
    fixture.product = service
        .create(
            &DataProduct {
                name: "cases".to_string(),
                responsible_person: person,
                description: "daily case counts".to_string(),
            },
            &actor,
        )
        .unwrap();
    fixture.product_version = service
        .create(
            &DataProductVersion {
                responsible_person: person,
                version_identifier: "0.1.0".to_string(),
                supersedes: None,
                data_product: fixture.product,
                data_type: fixture.data_type,
                description: "first cut".to_string(),
                store: data_store,
                accessibility,
                processing_script_version: fixture.script_version,
                source_versions: vec![fixture.source_version],
            },
            &actor,
        )
        .unwrap();
    fixture.component = service
        .create(
            &DataProductVersionComponent {
                name: "cases/total".to_string(),
                responsible_person: person,
                data_product_version: fixture.product_version,
            },
            &actor,
        )
        .unwrap();
    fixture.model = service
        .create(
            &Model {
                name: "SIR".to_string(),
                responsible_person: person,
                store: data_store,
                description: "compartment model".to_string(),
            },
            &actor,
        )
        .unwrap();
    fixture.model_version = service
        .create(
            &ModelVersion {
                responsible_person: person,
                version_identifier: "0.2.0".to_string(),
                supersedes: None,
                model: fixture.model,
                store: data_store,
                description: "calibrated".to_string(),
                accessibility,
            },
            &actor,
        )
        .unwrap();
    fixture.model_run = service
        .create(
            &ModelRun {
                responsible_person: person,
                model_version: fixture.model_version,
                release_date: date("2020-05-01"),
                description: Some("baseline".to_string()),
                model_config: None,
                submission_script: None,
                supersedes: None,
                inputs: vec![fixture.component],
                outputs: vec![fixture.product_version],
            },
            &actor,
        )
        .unwrap();

    fixture
}
