//! 一次性运维命令
//!
//! 结果以 JSON 输出到 stdout，日志写到 stderr。

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use tenancy_broker::AdminTokenBroker;
use tenancy_common::storage::{
    FileMappingStore, Installer, MappingStore, PathResolver, PrefixHandle, TablePrefix,
};
use tenancy_common::tenant::TenantRegistry;
use tenancy_common::{TenancyConfig, TenantError};
use tenancy_kernel::{Diagnostics, RequestContext, RequestInput, bootstrap};

use crate::cli::{Commands, TenantCommands};
use crate::error::{Error, Result};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn registry(config: &TenancyConfig) -> TenantRegistry<FileMappingStore> {
    let resolver = PathResolver::new(config.host.clone());
    let store = FileMappingStore::new(resolver.mappings_file_path());
    TenantRegistry::new(store, resolver)
}

fn https_indicator(config: &TenancyConfig) -> &'static str {
    if config.host.https { "on" } else { "off" }
}

pub(crate) fn run(command: Commands, config: &TenancyConfig) -> Result<()> {
    match command {
        Commands::Install => install(config),
        Commands::Status => status(config),
        Commands::Resolve { host, tenant } => resolve(config, host, tenant),
        Commands::Tenant { command } => tenant(config, command),
        Commands::AdminUrl { id } => admin_url(config, &id),
        Commands::Test { .. } | Commands::Serve => Err(Error::custom(
            "command must be dispatched by the launcher",
        )),
    }
}

fn install(config: &TenancyConfig) -> Result<()> {
    let resolver = PathResolver::new(config.host.clone());
    let report = Installer::install(&resolver)?;
    info!(base = %report.base_path.display(), "Storage installed");
    print_json(&report)
}

fn status(config: &TenancyConfig) -> Result<()> {
    let resolver = PathResolver::new(config.host.clone());
    let store = FileMappingStore::new(resolver.mappings_file_path());
    let broker = AdminTokenBroker::from_config(config, &resolver);

    let notices: Vec<_> = Diagnostics::collect(&resolver, true)
        .into_iter()
        .map(|notice| {
            let (severity, message) = (notice.severity(), notice.message());
            json!({
                "kind": notice,
                "severity": severity,
                "message": message,
            })
        })
        .collect();

    print_json(&json!({
        "paths": resolver.path_status(),
        "tenant_count": store.load().len(),
        "token_state": broker.token_state().to_string(),
        "notices": notices,
    }))
}

fn resolve(config: &TenancyConfig, host: Option<String>, tenant: Option<String>) -> Result<()> {
    let input = match (host, tenant) {
        (host, Some(tenant)) => RequestInput {
            host_header: host,
            ..RequestInput::preset(tenant)
        },
        (Some(host), None) => RequestInput::web(host),
        (None, None) => return Err(Error::custom("either --host or --tenant is required")),
    }
    .with_https(https_indicator(config));

    let resolver = PathResolver::new(config.host.clone());
    let store: Arc<dyn MappingStore> =
        Arc::new(FileMappingStore::new(resolver.mappings_file_path()));
    let ctx = RequestContext::new(input, config.host.clone(), store);
    let mut db = TablePrefix::new(config.host.default_table_prefix.clone());
    let outcome = bootstrap(&ctx, &mut db);

    print_json(&json!({
        "phase": outcome.phase,
        "host": ctx.server_info().host,
        "is_tenant": ctx.is_tenant(),
        "tenant_id": ctx.get_tenant_id(),
        "binding": ctx.binding(),
        "table_prefix": db.prefix(),
        "original_prefix": ctx.original_prefix(),
        "storage_dir": ctx.get_tenant_storage_dir(),
        "storage_url": ctx.get_tenant_storage_url(),
        "write_protection": ctx.write_protection(),
        "notices": ctx.notices(),
    }))
}

fn tenant(config: &TenancyConfig, command: TenantCommands) -> Result<()> {
    let registry = registry(config);
    match command {
        TenantCommands::Create { domains } => {
            let tenant = registry.create(&domains)?;
            print_json(&tenant)
        }
        TenantCommands::Update { id, domains } => {
            let tenant = registry.update(&id, &domains)?;
            print_json(&tenant)
        }
        TenantCommands::Delete { id } => {
            registry.delete(&id)?;
            print_json(&json!({ "deleted": id }))
        }
        TenantCommands::List => {
            let summaries: Vec<_> = registry.list().iter().map(|t| t.info()).collect();
            print_json(&summaries)
        }
        TenantCommands::Show { id } => {
            let tenant = registry.get(&id).ok_or(TenantError::NotFound(id))?;
            print_json(&tenant)
        }
    }
}

fn admin_url(config: &TenancyConfig, id: &str) -> Result<()> {
    let registry = registry(config);
    let tenant = registry
        .get(id)
        .ok_or_else(|| TenantError::NotFound(id.to_string()))?;
    let broker = AdminTokenBroker::from_config(config, registry.resolver());
    println!("{}", broker.build_admin_url(&tenant)?);
    Ok(())
}
