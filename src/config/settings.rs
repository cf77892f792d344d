// ==========================================
// 参数注册表 - 运行配置
// ==========================================
// 来源: 环境变量，未设置时取默认值
// - PARAM_REGISTRY_SCHEMA: 参数表文件（默认使用内置参数表）
// - PARAM_REGISTRY_DB: 预设库路径（默认用户数据目录）
// - PARAM_REGISTRY_PRESET: 当前预设名（默认 Default）
// ==========================================

use crate::config::error::StoreResult;
use crate::config::value_store::ValueStore;
use crate::importer::SchemaResult;
use crate::registry::ParameterRegistry;
use serde::Serialize;
use std::path::PathBuf;

pub const SCHEMA_ENV: &str = "PARAM_REGISTRY_SCHEMA";
pub const DB_ENV: &str = "PARAM_REGISTRY_DB";
pub const PRESET_ENV: &str = "PARAM_REGISTRY_PRESET";

pub const DEFAULT_PRESET: &str = "Default";
const DB_FILE_NAME: &str = "param_values.db";
const DATA_DIR_NAME: &str = "param-registry";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrySettings {
    /// None 表示使用内置参数表
    pub schema_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub preset: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            schema_path: None,
            db_path: default_db_path(),
            preset: DEFAULT_PRESET.to_string(),
        }
    }
}

impl RegistrySettings {
    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意变量来源读取（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            schema_path: var(SCHEMA_ENV).map(PathBuf::from),
            db_path: var(DB_ENV).map(PathBuf::from).unwrap_or_else(default_db_path),
            preset: var(PRESET_ENV).unwrap_or_else(|| DEFAULT_PRESET.to_string()),
        }
    }

    /// 按配置加载参数表
    pub fn load_registry(&self) -> SchemaResult<ParameterRegistry> {
        match &self.schema_path {
            Some(path) => ParameterRegistry::load(path),
            None => ParameterRegistry::builtin(),
        }
    }

    /// 打开预设库（自动创建父目录）
    pub fn open_store(&self) -> StoreResult<ValueStore> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        ValueStore::new(&self.db_path)
    }
}

/// 默认预设库路径
///
/// 使用用户数据目录；无法获取时回退到当前目录
pub fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join(DATA_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(".").join(DB_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let settings = RegistrySettings::from_lookup(|_| None);
        assert_eq!(settings.schema_path, None);
        assert_eq!(settings.preset, "Default");
        assert!(settings.db_path.ends_with(DB_FILE_NAME));
    }

    #[test]
    fn test_values_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (SCHEMA_ENV, "/tmp/params.csv"),
            (DB_ENV, " /tmp/values.db "),
            (PRESET_ENV, "   "),
        ]
        .into_iter()
        .collect();
        let settings = RegistrySettings::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.schema_path, Some(PathBuf::from("/tmp/params.csv")));
        assert_eq!(settings.db_path, PathBuf::from("/tmp/values.db"));
        assert_eq!(settings.preset, DEFAULT_PRESET);
    }

    #[test]
    fn test_open_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RegistrySettings {
            db_path: dir.path().join("nested").join(DB_FILE_NAME),
            ..RegistrySettings::default()
        };
        let store = settings.open_store().unwrap();
        assert!(store.list_presets().unwrap().is_empty());
        assert!(settings.db_path.exists());
    }
}
