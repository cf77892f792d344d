// ==========================================
// 参数注册表 - 并发宿主适配
// ==========================================
// 读写锁包装: 写操作（set / reset / load_values）持写锁，查询持读锁
// ==========================================

use crate::domain::value::ParamValue;
use crate::registry::error::{RegistryError, RegistryResult};
use crate::registry::persist::LoadReport;
use crate::registry::reader::ValueSnapshot;
use crate::registry::store::ParameterRegistry;
use serde_json::{Map, Value as JsonValue};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<ParameterRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: ParameterRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, ParameterRegistry>> {
        self.inner
            .read()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> RegistryResult<RwLockWriteGuard<'_, ParameterRegistry>> {
        self.inner
            .write()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))
    }

    /// 在读锁内执行查询
    pub fn with_read<R>(&self, f: impl FnOnce(&ParameterRegistry) -> R) -> RegistryResult<R> {
        Ok(f(&*self.read()?))
    }

    /// 在写锁内执行修改
    pub fn with_write<R>(&self, f: impl FnOnce(&mut ParameterRegistry) -> R) -> RegistryResult<R> {
        Ok(f(&mut *self.write()?))
    }

    pub fn get(&self, key: &str) -> RegistryResult<ParamValue> {
        self.read()?.get(key).cloned()
    }

    pub fn by_group(&self, group: &str) -> RegistryResult<Vec<String>> {
        Ok(self.read()?.by_group(group).to_vec())
    }

    pub fn set(&self, key: &str, value: ParamValue) -> RegistryResult<()> {
        self.write()?.set(key, value)
    }

    pub fn set_from_text(&self, key: &str, text: &str) -> RegistryResult<()> {
        self.write()?.set_from_text(key, text)
    }

    pub fn reset_to_default(&self, key: &str) -> RegistryResult<()> {
        self.write()?.reset_to_default(key)
    }

    pub fn reset_all(&self) -> RegistryResult<()> {
        self.write()?.reset_all();
        Ok(())
    }

    pub fn load_values(&self, map: &Map<String, JsonValue>) -> RegistryResult<LoadReport> {
        Ok(self.write()?.load_values(map))
    }

    /// 当前值的独立快照，不持有锁
    pub fn snapshot(&self) -> RegistryResult<ValueSnapshot> {
        Ok(self.read()?.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::reader::ParameterReader;
    use std::thread;

    const SCHEMA: &str = "\
key;alias;group;default;unit;description;gui_type;gui_args
n_jobs;;General;1;;;Int;{'min_val': 1, 'max_val': 64}
";

    #[test]
    fn test_concurrent_writes_are_serialized() {
        let shared =
            SharedRegistry::new(ParameterRegistry::from_schema_str(SCHEMA).unwrap());

        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || shared.set("n_jobs", ParamValue::Int(n)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let value = shared.get("n_jobs").unwrap().as_i64().unwrap();
        assert!((1..=8).contains(&value));
        assert!(shared.set("n_jobs", ParamValue::Int(100)).is_err());
        assert_eq!(shared.snapshot().unwrap().get_i64("n_jobs").unwrap(), value);
        assert_eq!(shared.by_group("General").unwrap(), vec!["n_jobs"]);

        shared.reset_all().unwrap();
        assert_eq!(shared.get("n_jobs").unwrap(), ParamValue::Int(1));
    }
}
