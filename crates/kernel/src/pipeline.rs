//! 启动流水线
//!
//! 每个请求在最早阶段运行一次，阶段依次为：
//! detect → validate → configure-db → configure-storage → ready。
//! 每个阶段只依赖上一阶段的输出；任一阶段失败时请求按共享站点继续处理。

use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use tenancy_common::storage::PrefixHandle;
use tenancy_common::tenant::validate_id;

use crate::context::{BindingSource, RequestContext, TenantBinding, WriteProtection};
use crate::identify::identify;
use crate::isolation::{configure_database, configure_storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Detect,
    Validate,
    ConfigureDb,
    ConfigureStorage,
    Ready,
}

/// detect 阶段输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// 已清洗的 host，可能为空
    pub host: String,
    /// 预设租户 ID（未校验）
    pub preset: Option<String>,
}

/// validate 阶段输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Shared,
    Tenant(TenantBinding),
}

impl Resolution {
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            Resolution::Shared => None,
            Resolution::Tenant(binding) => Some(&binding.tenant_id),
        }
    }
}

/// 流水线结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapOutcome {
    /// 到达的最后阶段
    pub phase: Phase,
    pub tenant_id: Option<String>,
}

pub fn detect(ctx: &RequestContext) -> Detection {
    let preset = ctx
        .input()
        .preset_tenant_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    Detection {
        host: ctx.server_info().host.clone(),
        preset,
    }
}

/// 预设租户优先；否则按 host 查映射
pub fn validate(ctx: &RequestContext, detection: Detection) -> Resolution {
    if let Some(preset) = detection.preset {
        if !validate_id(&preset) {
            warn!(tenant_id = %preset, "Ignoring invalid preset tenant ID");
            return Resolution::Shared;
        }
        return Resolution::Tenant(TenantBinding {
            domain: ctx.cli_domain(&preset),
            tenant_id: preset,
            source: BindingSource::Preset,
        });
    }

    let Some(tenant_id) = identify(&detection.host, ctx.mappings()) else {
        return Resolution::Shared;
    };

    // 映射文件可能被手工编辑，ID 在使用前重新校验
    if !validate_id(tenant_id) {
        warn!(tenant_id = %tenant_id, host = %detection.host, "Mapping contains an invalid tenant ID");
        return Resolution::Shared;
    }

    Resolution::Tenant(TenantBinding {
        tenant_id: tenant_id.to_string(),
        domain: detection.host,
        source: BindingSource::Domain,
    })
}

pub fn configure_db(
    ctx: &RequestContext,
    db: &mut dyn PrefixHandle,
    resolution: Resolution,
) -> Resolution {
    let Some(tenant_id) = resolution.tenant_id() else {
        return resolution;
    };
    match configure_database(ctx, db, tenant_id) {
        Ok(_) => resolution,
        Err(e) => {
            warn!("Database isolation failed, serving shared site: {e}");
            Resolution::Shared
        }
    }
}

pub fn configure_storage_root(ctx: &RequestContext, resolution: Resolution) -> Resolution {
    let Some(tenant_id) = resolution.tenant_id() else {
        return resolution;
    };
    match configure_storage(ctx, tenant_id) {
        Ok(_) => resolution,
        Err(e) => {
            warn!("Storage isolation failed, serving shared site: {e}");
            Resolution::Shared
        }
    }
}

/// 运行完整流水线
///
/// 可在同一请求上重复调用，已固定的绑定与隔离状态不会被改变。
pub fn bootstrap(ctx: &RequestContext, db: &mut dyn PrefixHandle) -> BootstrapOutcome {
    ctx.bootstrapped.set(true);

    if let Some(binding) = ctx.binding() {
        // 重复调用：只把已固定的前缀重新应用到句柄上
        let resolution = Resolution::Tenant(binding.clone());
        let resolution = configure_storage_root(ctx, configure_db(ctx, db, resolution));
        return outcome(resolution, Phase::Ready);
    }

    let detection = detect(ctx);
    debug!(host = %detection.host, preset = ?detection.preset, "Tenancy detect phase");

    let resolution = validate(ctx, detection);
    let Resolution::Tenant(binding) = &resolution else {
        return outcome(resolution, Phase::Validate);
    };
    let binding = binding.clone();

    let resolution = configure_db(ctx, db, resolution);
    if resolution == Resolution::Shared {
        return outcome(resolution, Phase::ConfigureDb);
    }

    let resolution = configure_storage_root(ctx, resolution);
    if resolution == Resolution::Shared {
        return outcome(resolution, Phase::ConfigureStorage);
    }

    let protection = match binding.source {
        BindingSource::Preset => WriteProtection::automation(),
        BindingSource::Domain => WriteProtection::web(),
    };
    let _ = ctx.write_protection.set(protection);
    let _ = ctx.binding.set(binding);

    outcome(resolution, Phase::Ready)
}

fn outcome(resolution: Resolution, phase: Phase) -> BootstrapOutcome {
    BootstrapOutcome {
        phase,
        tenant_id: resolution.tenant_id().map(str::to_string),
    }
}
