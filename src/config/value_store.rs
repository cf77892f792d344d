// ==========================================
// 参数注册表 - 预设存储
// ==========================================
// 职责: 将注册表当前值按预设名称持久化、加载、复制、删除
// 存储: param_preset / param_value 表（value_json 为带类型标签的 JSON）
// ==========================================

use crate::config::error::{StoreError, StoreResult};
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::registry::{LoadReport, ParameterRegistry};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// 预设概要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetInfo {
    pub name: String,
    pub updated_at: NaiveDateTime,
    pub value_count: usize,
}

// ==========================================
// ValueStore - 预设存储
// ==========================================
pub struct ValueStore {
    conn: Arc<Mutex<Connection>>,
}

impl ValueStore {
    /// 打开（或创建）预设库
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 全部预设（按名称排序）
    pub fn list_presets(&self) -> StoreResult<Vec<PresetInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.name, p.updated_at, COUNT(v.key)
             FROM param_preset p LEFT JOIN param_value v ON v.preset = p.name
             GROUP BY p.name, p.updated_at
             ORDER BY p.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(PresetInfo {
                name: row.get(0)?,
                updated_at: row.get(1)?,
                value_count: row.get::<_, i64>(2)? as usize,
            })
        })?;

        let mut presets = Vec::new();
        for row in rows {
            presets.push(row?);
        }
        Ok(presets)
    }

    /// 预设是否存在
    pub fn has_preset(&self, name: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        preset_exists(&conn, name)
    }

    /// 保存注册表当前值到预设（整体替换）
    ///
    /// # 返回
    /// - Ok(usize): 写入的条目数（含 Func 表达式文本）
    pub fn save_preset(&self, name: &str, registry: &ParameterRegistry) -> StoreResult<usize> {
        let name = checked_name(name)?;
        let values = registry.dump_values()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let count = replace_values(&tx, name, &values)?;
        tx.commit()?;

        info!(preset = name, count, "预设已保存");
        Ok(count)
    }

    /// 读取预设的原始值映射
    pub fn read_preset(&self, name: &str) -> StoreResult<Map<String, JsonValue>> {
        let conn = self.lock()?;
        if !preset_exists(&conn, name)? {
            return Err(StoreError::PresetNotFound(name.to_string()));
        }

        let mut stmt =
            conn.prepare("SELECT key, value_json FROM param_value WHERE preset = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut values = Map::new();
        for row in rows {
            let (key, raw) = row?;
            values.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(values)
    }

    /// 将预设载入注册表
    pub fn load_preset(
        &self,
        name: &str,
        registry: &mut ParameterRegistry,
    ) -> StoreResult<LoadReport> {
        let values = self.read_preset(name)?;
        let report = registry.load_values(&values);
        info!(
            preset = name,
            loaded = report.loaded.len(),
            rejected = report.rejected.len(),
            "预设已载入"
        );
        Ok(report)
    }

    /// 删除预设
    pub fn delete_preset(&self, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM param_preset WHERE name = ?1", params![name])?;
        if affected == 0 {
            return Err(StoreError::PresetNotFound(name.to_string()));
        }
        info!(preset = name, "预设已删除");
        Ok(())
    }

    /// 复制预设（目标存在时整体覆盖）
    pub fn copy_preset(&self, from: &str, to: &str) -> StoreResult<usize> {
        let to = checked_name(to)?;
        let mut conn = self.lock()?;
        if !preset_exists(&conn, from)? {
            return Err(StoreError::PresetNotFound(from.to_string()));
        }
        if from == to {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        touch_preset(&tx, to)?;
        tx.execute("DELETE FROM param_value WHERE preset = ?1", params![to])?;
        let count = tx.execute(
            "INSERT INTO param_value (preset, key, value_json)
             SELECT ?1, key, value_json FROM param_value WHERE preset = ?2",
            params![to, from],
        )?;
        tx.commit()?;

        info!(from, to, count, "预设已复制");
        Ok(count)
    }

    /// 全部预设的快照（JSON 格式: 预设名 → 值映射）
    pub fn get_snapshot(&self) -> StoreResult<String> {
        let names: Vec<String> = self
            .list_presets()?
            .into_iter()
            .map(|preset| preset.name)
            .collect();

        let mut snapshot = Map::new();
        for name in names {
            let values = self.read_preset(&name)?;
            snapshot.insert(name, JsonValue::Object(values));
        }
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// 从快照恢复（快照中的预设整体覆盖，其它预设不动）
    ///
    /// # 返回
    /// - Ok(usize): 写入的条目数
    pub fn restore_from_snapshot(&self, snapshot_json: &str) -> StoreResult<usize> {
        let snapshot: Map<String, JsonValue> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        for (name, values) in &snapshot {
            let name = checked_name(name)?;
            let values = values.as_object().ok_or_else(|| {
                StoreError::Format(format!("预设 {} 的值必须为 JSON 对象", name))
            })?;
            count += replace_values(&tx, name, values)?;
        }
        tx.commit()?;

        info!(presets = snapshot.len(), count, "预设快照已恢复");
        Ok(count)
    }
}

fn checked_name(name: &str) -> StoreResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPresetName(name.to_string()));
    }
    Ok(trimmed)
}

fn preset_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM param_preset WHERE name = ?1",
            params![name],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

fn touch_preset(conn: &Connection, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO param_preset (name, updated_at) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET updated_at = ?2",
        params![name, chrono::Local::now().naive_local()],
    )?;
    Ok(())
}

fn replace_values(
    conn: &Connection,
    name: &str,
    values: &Map<String, JsonValue>,
) -> StoreResult<usize> {
    touch_preset(conn, name)?;
    conn.execute("DELETE FROM param_value WHERE preset = ?1", params![name])?;

    let mut stmt =
        conn.prepare("INSERT INTO param_value (preset, key, value_json) VALUES (?1, ?2, ?3)")?;
    let mut count = 0;
    for (key, value) in values {
        count += stmt.execute(params![name, key, serde_json::to_string(value)?])?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::ParamValue;
    use tempfile::NamedTempFile;

    const SCHEMA: &str = "\
key;alias;group;default;unit;description;gui_type;gui_args
lowpass;;Filter;30;Hz;;Float;{'min_val': 0}
ica_method;;ICA;'fastica';;;Combo;{'options': ['fastica', 'picard']}
";

    fn store() -> (NamedTempFile, ValueStore) {
        let file = NamedTempFile::new().unwrap();
        let store = ValueStore::new(file.path()).unwrap();
        (file, store)
    }

    #[test]
    fn test_save_and_load_preset() {
        let (_file, store) = store();
        let mut reg = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        reg.set("lowpass", ParamValue::Float(40.0)).unwrap();
        assert_eq!(store.save_preset("Default", &reg).unwrap(), 2);

        let mut fresh = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        let report = store.load_preset("Default", &mut fresh).unwrap();
        assert!(report.is_clean());
        assert_eq!(fresh.get("lowpass").unwrap(), &ParamValue::Float(40.0));

        let presets = store.list_presets().unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].value_count, 2);
    }

    #[test]
    fn test_missing_preset() {
        let (_file, store) = store();
        let mut reg = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        assert!(matches!(
            store.load_preset("nope", &mut reg),
            Err(StoreError::PresetNotFound(_))
        ));
        assert!(matches!(
            store.delete_preset("nope"),
            Err(StoreError::PresetNotFound(_))
        ));
        assert!(matches!(
            store.save_preset("  ", &reg),
            Err(StoreError::InvalidPresetName(_))
        ));
    }

    #[test]
    fn test_copy_delete_and_snapshot() {
        let (_file, store) = store();
        let reg = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        store.save_preset("Default", &reg).unwrap();
        assert_eq!(store.copy_preset("Default", "Strict").unwrap(), 2);
        assert!(store.has_preset("Strict").unwrap());

        let snapshot = store.get_snapshot().unwrap();
        store.delete_preset("Default").unwrap();
        store.delete_preset("Strict").unwrap();
        assert!(store.list_presets().unwrap().is_empty());

        assert_eq!(store.restore_from_snapshot(&snapshot).unwrap(), 4);
        assert_eq!(store.list_presets().unwrap().len(), 2);
        assert_eq!(store.read_preset("Strict").unwrap()["ica_method"], "fastica");
    }
}
