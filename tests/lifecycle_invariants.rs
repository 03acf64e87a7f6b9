//! End-to-end lifecycle coverage through the service facade: backup,
//! restore to production and temp, promotion, and archive management.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use univault::config::ServerConfig;
use univault::entity::{EntityCollection, EntityType, Faculty, Subject};
use univault::reconcile::TransferStrategy;
use univault::registry::TenantState;
use univault::schema::{SchemaKind, SchemaManifest};
use univault::service::LifecycleService;

fn service_in(dir: &TempDir) -> LifecycleService {
    let config = ServerConfig {
        data_dir: dir.path().join("data"),
        ..ServerConfig::default()
    };
    LifecycleService::open(&config).unwrap()
}

fn faculties(codes: &[&str]) -> EntityCollection {
    EntityCollection::Faculties(
        codes
            .iter()
            .map(|code| Faculty {
                id: 0,
                code: code.to_string(),
                name: format!("Faculty {}", code),
                description: None,
            })
            .collect(),
    )
}

fn subjects(rows: &[(&str, &str)]) -> EntityCollection {
    EntityCollection::Subjects(
        rows.iter()
            .map(|(faculty, code)| Subject {
                id: 0,
                faculty_code: faculty.to_string(),
                code: code.to_string(),
                name: format!("Subject {}", code),
                semester: 1,
                espb: 6,
            })
            .collect(),
    )
}

fn seed(service: &LifecycleService, tenant: uuid::Uuid, codes: &[&str]) {
    service
        .import_entities(
            tenant,
            SchemaKind::Production,
            faculties(codes),
            TransferStrategy::Merge,
        )
        .unwrap();
}

fn prod_faculty_count(service: &LifecycleService, tenant: uuid::Uuid) -> usize {
    service.entity_counts(tenant, SchemaKind::Production).unwrap()[&EntityType::Faculties]
}

fn tenant_root(dir: &TempDir, tenant: uuid::Uuid) -> PathBuf {
    dir.path()
        .join("data")
        .join("tenants")
        .join(tenant.to_string())
}

/// Every file under `root` with its content, keyed by relative path.
fn dir_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned();
                files.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[test]
fn restore_returns_exact_backup_content() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    seed(&service, tenant.id, &["FIT"]);
    service
        .import_entities(
            tenant.id,
            SchemaKind::Production,
            subjects(&[("FIT", "CS101")]),
            TransferStrategy::Merge,
        )
        .unwrap();

    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();

    seed(&service, tenant.id, &["FON", "FPE"]);
    assert_eq!(prod_faculty_count(&service, tenant.id), 3);

    service.restore(tenant.id, &backup.archive_id, false).unwrap();

    let counts = service
        .entity_counts(tenant.id, SchemaKind::Production)
        .unwrap();
    assert_eq!(counts[&EntityType::Faculties], 1);
    assert_eq!(counts[&EntityType::Subjects], 1);
}

#[test]
fn production_restore_always_leaves_safety_backup() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();
    let before = service.list_backups(tenant.id).unwrap().len();

    let outcome = service.restore(tenant.id, &backup.archive_id, false).unwrap();

    let safety = outcome.safety_archive_id.expect("safety backup taken");
    let after = service.list_backups(tenant.id).unwrap();
    assert_eq!(after.len(), before + 1);
    assert!(after.iter().any(|m| m.archive_id == safety));
}

#[test]
fn temp_restore_leaves_production_untouched() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    seed(&service, tenant.id, &["FIT"]);
    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();
    seed(&service, tenant.id, &["FON"]);

    let outcome = service.restore(tenant.id, &backup.archive_id, true).unwrap();

    assert!(outcome.safety_archive_id.is_none());
    assert_eq!(prod_faculty_count(&service, tenant.id), 2);

    let temp_counts = service
        .entity_counts(tenant.id, SchemaKind::Temporary)
        .unwrap();
    assert_eq!(temp_counts[&EntityType::Faculties], 1);
}

#[test]
fn promotion_swaps_and_consumes_temp() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    seed(&service, tenant.id, &["FIT"]);
    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();
    seed(&service, tenant.id, &["FON", "FPE"]);

    service.restore(tenant.id, &backup.archive_id, true).unwrap();
    let outcome = service.promote(tenant.id).unwrap();

    // Production now holds the promoted content; temp no longer exists
    assert_eq!(prod_faculty_count(&service, tenant.id), 1);
    assert_eq!(
        service.tenant_status(tenant.id).unwrap().state,
        TenantState::ProdOnly
    );
    assert!(service.promote(tenant.id).is_err());

    // The replaced production content survives in the safety archive
    service
        .restore(tenant.id, &outcome.safety_archive_id, false)
        .unwrap();
    assert_eq!(prod_faculty_count(&service, tenant.id), 3);
}

#[test]
fn promote_without_temp_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();
    seed(&service, tenant.id, &["FIT", "FON"]);

    let prod = tenant_root(&dir, tenant.id).join("prod");
    let before = dir_snapshot(&prod);

    assert!(service.promote(tenant.id).is_err());
    assert_eq!(dir_snapshot(&prod), before);

    assert!(service.discard_temp(tenant.id).is_err());
    assert_eq!(dir_snapshot(&prod), before);
}

#[test]
fn discard_temp_reverts_to_prod_only() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    seed(&service, tenant.id, &["FIT"]);
    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();
    service.restore(tenant.id, &backup.archive_id, true).unwrap();

    service.discard_temp(tenant.id).unwrap();

    assert_eq!(
        service.tenant_status(tenant.id).unwrap().state,
        TenantState::ProdOnly
    );
    assert!(service
        .entity_counts(tenant.id, SchemaKind::Temporary)
        .is_err());
}

#[test]
fn archive_metadata_edits_never_touch_payload() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    seed(&service, tenant.id, &["FIT"]);
    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();

    let updated = service
        .set_backup_meta(
            tenant.id,
            &backup.archive_id,
            Some("term start".to_string()),
            None,
        )
        .unwrap();

    assert_eq!(updated.checksum, backup.checksum);
    assert_eq!(updated.size_bytes, backup.size_bytes);
    assert_eq!(updated.title.as_deref(), Some("term start"));

    // The archive still restores after the edit
    service.restore(tenant.id, &backup.archive_id, false).unwrap();
}

#[test]
fn upload_then_local_delete_keeps_remote_entry() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let tenant = service.create_tenant("uni").unwrap();

    let backup = service
        .create_backup(tenant.id, SchemaKind::Production)
        .unwrap();

    let uploaded = service.upload_backup(tenant.id, &backup.archive_id).unwrap();
    assert!(uploaded.local && uploaded.remote);

    service
        .delete_backup(tenant.id, &backup.archive_id, false)
        .unwrap();

    let remaining = service.get_backup(tenant.id, &backup.archive_id).unwrap();
    assert!(!remaining.local);
    assert!(remaining.remote);

    // Removing the remote copy as well drops the entry
    service
        .delete_backup(tenant.id, &backup.archive_id, true)
        .unwrap();
    assert!(service.get_backup(tenant.id, &backup.archive_id).is_err());
}

#[test]
fn state_survives_service_reopen() {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        data_dir: dir.path().join("data"),
        ..ServerConfig::default()
    };

    let tenant = {
        let service = LifecycleService::open(&config).unwrap();
        let tenant = service.create_tenant("uni").unwrap();
        seed(&service, tenant.id, &["FIT"]);
        let backup = service
            .create_backup(tenant.id, SchemaKind::Production)
            .unwrap();
        service.restore(tenant.id, &backup.archive_id, true).unwrap();
        tenant
    };

    let reopened = LifecycleService::open(&config).unwrap();
    let status = reopened.tenant_status(tenant.id).unwrap();
    assert_eq!(status.state, TenantState::ProdPlusTemp);
    assert_eq!(reopened.list_backups(tenant.id).unwrap().len(), 1);

    reopened.promote(tenant.id).unwrap();
}

fn random_archive(
    service: &LifecycleService,
    tenant: uuid::Uuid,
    rng: &mut StdRng,
) -> Option<String> {
    let list = service.list_backups(tenant).unwrap();
    if list.is_empty() {
        return None;
    }
    Some(list[rng.gen_range(0..list.len())].archive_id.clone())
}

/// The registry/disk state-machine invariant: exactly one valid production
/// schema, at most one temporary schema, both agreeing with what is on disk.
fn assert_schema_invariant(service: &LifecycleService, dir: &TempDir, tenant: uuid::Uuid) {
    let status = service.tenant_status(tenant).unwrap();
    let root = tenant_root(dir, tenant);
    let prod = root.join("prod");
    let temp = root.join("temp");

    assert!(prod.is_dir());
    assert!(status.prod.valid);
    assert_eq!(
        SchemaManifest::read_from_dir(&prod).unwrap().kind,
        SchemaKind::Production
    );

    match status.state {
        TenantState::ProdOnly => {
            assert!(status.temp.is_none());
            assert!(!temp.exists());
        }
        TenantState::ProdPlusTemp => {
            assert!(status.temp.is_some());
            assert_eq!(
                SchemaManifest::read_from_dir(&temp).unwrap().kind,
                SchemaKind::Temporary
            );
        }
    }
}

#[test]
fn random_operation_sequences_preserve_schema_invariant() {
    for seed_value in 0..4u64 {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let tenant = service.create_tenant("uni").unwrap();
        seed(&service, tenant.id, &["FIT"]);

        let mut rng = StdRng::seed_from_u64(seed_value);
        for _ in 0..40 {
            // Operations whose preconditions do not hold fail; the
            // invariant must survive either way
            match rng.gen_range(0..6) {
                0 => {
                    let _ = service.create_backup(tenant.id, SchemaKind::Production);
                }
                1 | 2 => {
                    if let Some(id) = random_archive(&service, tenant.id, &mut rng) {
                        let to_temp = rng.gen_bool(0.5);
                        let _ = service.restore(tenant.id, &id, to_temp);
                    }
                }
                3 => {
                    let _ = service.promote(tenant.id);
                }
                4 => {
                    let _ = service.discard_temp(tenant.id);
                }
                _ => {
                    let code = format!("F{}", rng.gen_range(0..9));
                    seed(&service, tenant.id, &[code.as_str()]);
                }
            }
            assert_schema_invariant(&service, &dir, tenant.id);
        }
    }
}

#[test]
fn tenants_are_isolated() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let a = service.create_tenant("uni-a").unwrap();
    let b = service.create_tenant("uni-b").unwrap();

    seed(&service, a.id, &["FIT"]);
    let backup_a = service.create_backup(a.id, SchemaKind::Production).unwrap();

    // Tenant B never sees A's archives or content
    assert!(service.list_backups(b.id).unwrap().is_empty());
    assert!(service.restore(b.id, &backup_a.archive_id, false).is_err());
    assert_eq!(prod_faculty_count(&service, b.id), 0);
}
