use std::fs;
use tenancy_common::config::{LogConfig, ObservabilityConfig};
use tenancy_common::TenancyConfig;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::error::Result;

/// 日志文件名
const LOG_FILE_NAME: &str = "tenancy.log";

/// Guard for the non-blocking log writer
#[derive(Default)]
pub struct ObservabilityGuard {
    _log_guard: Option<WorkerGuard>,
}

/// Initialize logging for the long-running gateway
pub fn init_observability(config: &TenancyConfig) -> Result<ObservabilityGuard> {
    let mut guard = ObservabilityGuard::default();
    let observability_config = &config.observability;

    if observability_config.is_console_logging() {
        init_subscriber_with_writer(std::io::stdout, true, observability_config);
    } else {
        fs::create_dir_all(&observability_config.log.path)?;
        let (non_blocking, worker_guard) = build_file_writer(
            &observability_config.log,
            observability_config.should_rotate_logs(),
        )?;
        guard._log_guard = Some(worker_guard);

        init_subscriber_with_writer(non_blocking, false, observability_config);
    }

    Ok(guard)
}

/// 一次性命令：日志写到 stderr，stdout 留给命令输出
pub fn init_cli_observability(config: &ObservabilityConfig) {
    init_subscriber_with_writer(std::io::stderr, false, config);
}

/// Create an EnvFilter from config, with RUST_LOG taking precedence
fn create_env_filter(config: &ObservabilityConfig) -> EnvFilter {
    let directive = config.get_filter_level();

    EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!(
            "Failed to parse filter directive: {}. Falling back to default: info",
            directive
        );
        EnvFilter::new("info")
    })
}

fn init_subscriber_with_writer<W>(writer: W, use_ansi: bool, config: &ObservabilityConfig)
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(use_ansi)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(create_env_filter(config))
        .with(fmt_layer)
        .try_init()
        .ok();
}

fn build_file_writer(log_config: &LogConfig, rotate: bool) -> Result<(NonBlocking, WorkerGuard)> {
    if rotate {
        println!("日志写入模式: 文件");
        println!("  - 路径: {}", log_config.path);
        println!("  - 轮转: 开启（按天）");
        let file_appender = tracing_appender::rolling::daily(&log_config.path, LOG_FILE_NAME);
        Ok(tracing_appender::non_blocking(file_appender))
    } else {
        let log_file_path = std::path::Path::new(&log_config.path).join(LOG_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)?;
        Ok(tracing_appender::non_blocking(file))
    }
}
