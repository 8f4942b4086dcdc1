//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和选项
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tenancy")]
#[command(version)]
#[command(about = "Tenant resolution and isolation kernel for a shared site installation")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = "tenancy.toml", global = true)]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to tenancy.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },

    /// Create the storage base directory, access rules and an empty mapping file
    Install,

    /// Show storage layout, token state and operator notices
    Status,

    /// Resolve a request the way the kernel would
    Resolve {
        /// Host header of the simulated request
        #[arg(long)]
        host: Option<String>,

        /// Pre-set tenant id (automation override, bypasses domain lookup)
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },

    /// Print a one-click admin login URL for a tenant
    AdminUrl {
        /// Tenant id
        id: String,
    },

    /// Run the HTTP gateway
    Serve,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TenantCommands {
    /// Create a tenant owning the given domains
    Create {
        #[arg(required = true)]
        domains: Vec<String>,
    },

    /// Replace the domain list of a tenant
    Update {
        id: String,
        #[arg(required = true)]
        domains: Vec<String>,
    },

    /// Delete a tenant and its storage
    Delete { id: String },

    /// List all tenants
    List,

    /// Show one tenant
    Show { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tenant_create() {
        let cli = Cli::try_parse_from([
            "tenancy",
            "--config",
            "/tmp/t.toml",
            "tenant",
            "create",
            "shop.example.com",
            "www.shop.example.com",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/t.toml"));
        match cli.command {
            Some(Commands::Tenant {
                command: TenantCommands::Create { domains },
            }) => assert_eq!(domains, vec!["shop.example.com", "www.shop.example.com"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_create_requires_domains() {
        assert!(Cli::try_parse_from(["tenancy", "tenant", "create"]).is_err());
    }

    #[test]
    fn test_resolve_flags() {
        let cli = Cli::try_parse_from(["tenancy", "resolve", "--tenant", "ab12cd"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Resolve { host: None, tenant: Some(ref t) }) if t == "ab12cd"
        ));
    }
}
