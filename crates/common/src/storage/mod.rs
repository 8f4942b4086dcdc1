//! 存储模块
//!
//! 映射文件存储、路径解析、上传目录抽象、站点数据库句柄与安装初始化

pub mod db;
pub mod installer;
pub mod mapping;
pub mod paths;
pub mod uploads;

pub use db::{PrefixHandle, SiteDatabase, TablePrefix};
pub use installer::{InstallReport, Installer};
pub use mapping::{FileMappingStore, MappingStore, TenantMappings};
pub use paths::{LEGACY_MAPPINGS_FILE, MAPPINGS_FILE, PathResolver, PathStatus, StructureKind};
pub use uploads::{SharedUploads, UploadArea, UploadDir};
