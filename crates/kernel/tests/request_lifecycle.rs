//! 请求生命周期集成测试
//!
//! 通过注册表写入租户，再以独立请求上下文解析，验证写入后的新请求立即可见、
//! 旧版布局锁定以及并发读写下不会读到半写文件。

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use tenancy_common::config::HostConfig;
use tenancy_common::storage::{
    FileMappingStore, Installer, MappingStore, PathResolver, PrefixHandle, StructureKind,
    TablePrefix, UploadArea,
};
use tenancy_common::tenant::TenantRegistry;
use tenancy_kernel::{Phase, RequestContext, RequestInput, bootstrap};

fn host(temp: &TempDir) -> HostConfig {
    HostConfig {
        content_dir: temp.path().to_path_buf(),
        content_url: "https://main.example.com/wp-content".to_string(),
        ..Default::default()
    }
}

fn request(temp: &TempDir, host_header: &str) -> RequestContext {
    let host = host(temp);
    let store = FileMappingStore::new(PathResolver::new(host.clone()).mappings_file_path());
    RequestContext::new(RequestInput::web(host_header), host, Arc::new(store))
}

fn registry(temp: &TempDir) -> TenantRegistry<FileMappingStore> {
    let resolver = PathResolver::new(host(temp));
    let store = FileMappingStore::new(resolver.mappings_file_path());
    TenantRegistry::new(store, resolver)
}

#[test]
fn test_created_tenant_resolves_on_next_request() {
    let temp = TempDir::new().unwrap();
    Installer::install(&PathResolver::new(host(&temp))).unwrap();

    let before = request(&temp, "shop.example.com");
    assert_eq!(bootstrap(&before, &mut TablePrefix::new("wp_")).phase, Phase::Validate);

    let tenant = registry(&temp)
        .create(&["shop.example.com".to_string()])
        .unwrap();

    let after = request(&temp, "shop.example.com");
    let mut db = TablePrefix::new("wp_");
    let outcome = bootstrap(&after, &mut db);
    assert_eq!(outcome.phase, Phase::Ready);
    assert_eq!(outcome.tenant_id.as_deref(), Some(tenant.id()));
    assert_eq!(db.prefix(), format!("{}_", tenant.id()));

    let uploads = after.upload_dir();
    assert!(uploads.basedir.ends_with(format!("{}/uploads", tenant.id())));
}

#[test]
fn test_deleted_tenant_falls_back_to_shared_site() {
    let temp = TempDir::new().unwrap();
    let registry = registry(&temp);
    let tenant = registry.create(&["gone.example.com".to_string()]).unwrap();
    registry.delete(tenant.id()).unwrap();

    let ctx = request(&temp, "gone.example.com");
    bootstrap(&ctx, &mut TablePrefix::new("wp_"));
    assert!(!ctx.is_tenant());
}

#[test]
fn test_legacy_installation_stays_legacy_for_new_tenants() {
    let temp = TempDir::new().unwrap();
    let legacy = temp.path().join("grabwp");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(legacy.join("tenants.json"), r#"{"ab12cd":["old.example.com"]}"#).unwrap();

    let registry = registry(&temp);
    assert_eq!(registry.resolver().structure_kind(), StructureKind::Legacy);

    let fresh = registry.create(&["new.example.com".to_string()]).unwrap();
    assert!(legacy.join(fresh.id()).join("uploads").is_dir());

    for (domain, id) in [("old.example.com", "ab12cd"), ("new.example.com", fresh.id())] {
        let ctx = request(&temp, domain);
        bootstrap(&ctx, &mut TablePrefix::new("wp_"));
        assert_eq!(ctx.get_tenant_id(), id);
        assert_eq!(
            ctx.get_tenant_storage_dir().unwrap(),
            legacy.join(id).join("uploads")
        );
        assert_eq!(
            ctx.get_tenant_storage_url().unwrap(),
            format!("https://main.example.com/wp-content/grabwp/{id}/uploads")
        );
    }
}

#[test]
fn test_concurrent_readers_never_see_partial_mappings() {
    let temp = TempDir::new().unwrap();
    let resolver = PathResolver::new(host(&temp));
    let path = resolver.mappings_file_path();
    let registry = registry(&temp);
    registry.create(&["stable.example.com".to_string()]).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let store = FileMappingStore::new(&path);
                for _ in 0..200 {
                    let mappings = store.load();
                    // 每次读取要么是完整的旧映射，要么是完整的新映射
                    assert!(
                        mappings
                            .iter()
                            .any(|(_, domains)| domains.iter().any(|d| d == "stable.example.com"))
                    );
                }
            })
        })
        .collect();

    for i in 0..20 {
        registry
            .create(&[format!("site{i}.example.com")])
            .unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(FileMappingStore::new(&path).load().len(), 21);
}
