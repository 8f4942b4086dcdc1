//! tenancy 主程序
//!
//! 运维命令（安装、状态、租户管理、登录链接）与 HTTP 网关入口

mod cli;
mod commands;
mod error;
mod observability;

use clap::Parser;
use observability::{init_cli_observability, init_observability};
use std::path::{Path, PathBuf};
use tenancy::gateway::{self, GatewayState};
use tenancy_common::config::fatal_errors;
use tenancy_common::storage::PathResolver;
use tenancy_common::{ConfigError, TenancyConfig};

use tracing::{error, info};

// 启动阶段日志系统尚未初始化，直接写 stderr，stdout 留给命令输出
macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// 默认配置文件名
const DEFAULT_CONFIG: &str = "tenancy.toml";

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        Some(Commands::Serve) | None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            // Create Tokio runtime（before running the application）
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_gateway(&config_path))
        }
        Some(command) => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;
            let config = ApplicationLauncher::load_config(&config_path)?;
            init_cli_observability(&config.observability);
            commands::run(command, &config)
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        // If the provided path is not the default, it must exist
        if provided_path != Path::new(DEFAULT_CONFIG) {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = vec![
            // 1. Current working directory
            PathBuf::from(DEFAULT_CONFIG),
            // 2. System config directory
            PathBuf::from("/etc/tenancy/tenancy.toml"),
        ];

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: tenancy --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        let config = Self::load_config(config_path)?;
        println!(
            "✅ 配置验证通过: {:?} (name={}, env={}, base={})",
            config_path,
            config.name,
            config.env,
            PathResolver::new(config.host.clone()).base_path().display()
        );
        Ok(())
    }

    /// 加载并校验配置，存在非警告问题时拒绝继续
    fn load_config(config_path: &Path) -> Result<TenancyConfig> {
        let config = TenancyConfig::from_file(config_path).map_err(|e| {
            bootstrap_error!("❌ 配置加载失败: {}", e);
            Error::from(e)
        })?;

        let Err(issues) = config.validate() else {
            return Ok(config);
        };

        bootstrap_error!("配置检查发现 {} 个问题:", issues.len());
        for (i, issue) in issues.iter().enumerate() {
            match issue.strip_prefix("Warning:") {
                Some(warning) => {
                    bootstrap_info!("  {}. ⚠️ {}", i + 1, warning.trim());
                }
                None => {
                    bootstrap_error!("  {}. ❌ {}", i + 1, issue);
                }
            }
        }

        let fatal: Vec<String> = fatal_errors(&issues).into_iter().cloned().collect();
        if fatal.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(fatal).into())
        }
    }

    /// 运行 HTTP 网关
    async fn run_gateway(config_path: &Path) -> Result<()> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);
        let config = Self::load_config(config_path)?;

        let _observability_guard = init_observability(&config)?;

        info!("🚀 启动 tenancy 网关: {}", config.name);
        let state = GatewayState::connect(config)
            .await
            .map_err(|e| Error::service_startup(format!("网关初始化失败: {e}")))?;

        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(4);
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        gateway::serve(state, shutdown_tx).await?;

        info!("🛑 网关已安全关闭");
        Ok(())
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}
