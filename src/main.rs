// ==========================================
// 参数注册表 - 命令行入口
// ==========================================
// 用法:
//   param-registry <command> [args]
//
// 配置见 RegistrySettings（PARAM_REGISTRY_SCHEMA / PARAM_REGISTRY_DB / PARAM_REGISTRY_PRESET）
// 修改类命令（set / reset / import）会写回当前预设
// ==========================================

use anyhow::{bail, Context, Result};
use param_registry::config::{RegistrySettings, ValueStore};
use param_registry::logging;
use param_registry::registry::{LoadReport, ParameterRegistry};
use std::fs;

const USAGE: &str = "\
用法: param-registry <command> [args]

命令:
  check               校验参数表
  groups              列出分组
  list [group]        列出参数当前值
  show <key>          显示参数视图（JSON）
  set <key> <text>    按文本设置参数值
  reset [key]         恢复默认值（不带 key 时全部恢复）
  presets             列出已保存的预设
  export [file]       导出当前值（JSON）
  import <file>       导入参数值文件";

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let settings = RegistrySettings::from_env();
    tracing::debug!(?settings, "运行配置");

    let mut registry = settings.load_registry().with_context(|| match &settings.schema_path {
        Some(path) => format!("参数表加载失败: {}", path.display()),
        None => "内置参数表加载失败".to_string(),
    })?;

    match command {
        "check" => {
            println!(
                "参数表有效: {} 个参数, {} 个分组",
                registry.len(),
                registry.groups().count()
            );
        }
        "groups" => {
            for group in registry.groups() {
                println!("{} ({})", group, registry.by_group(group).len());
            }
        }
        "list" => {
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            list(&registry, rest.first().map(String::as_str))?;
        }
        "show" => {
            let key = required(rest, 0, "key")?;
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            let view = registry.view(key)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
            if let Some(text) = registry.expression(key) {
                println!("expression: {}", text);
            }
        }
        "set" => {
            let key = required(rest, 0, "key")?;
            if rest.len() < 2 {
                bail!("缺少参数: text\n\n{}", USAGE);
            }
            let text = rest[1..].join(" ");
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            registry.set_from_text(key, &text)?;
            store.save_preset(&settings.preset, &registry)?;
            println!("{} = {}", key, registry.get(key)?);
        }
        "reset" => {
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            match rest.first() {
                Some(key) => {
                    registry.reset_to_default(key)?;
                    println!("{} = {}", key, registry.get(key)?);
                }
                None => {
                    registry.reset_all();
                    println!("全部参数已恢复默认值");
                }
            }
            store.save_preset(&settings.preset, &registry)?;
        }
        "presets" => {
            let store = open_store(&settings)?;
            for preset in store.list_presets()? {
                let marker = if preset.name == settings.preset { "*" } else { " " };
                println!(
                    "{} {} ({} 项, 更新于 {})",
                    marker, preset.name, preset.value_count, preset.updated_at
                );
            }
        }
        "export" => {
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            let json = registry.to_json_string()?;
            match rest.first() {
                Some(path) => {
                    fs::write(path, json).with_context(|| format!("写入失败: {}", path))?;
                    println!("已导出到 {}", path);
                }
                None => println!("{}", json),
            }
        }
        "import" => {
            let path = required(rest, 0, "file")?;
            let text = fs::read_to_string(path).with_context(|| format!("读取失败: {}", path))?;
            let store = open_store(&settings)?;
            apply_preset(&store, &settings, &mut registry)?;
            let report = registry.load_values_json(&text)?;
            print_report(&report);
            store.save_preset(&settings.preset, &registry)?;
        }
        "help" | "-h" | "--help" => println!("{}", USAGE),
        other => bail!("未知命令: {}\n\n{}", other, USAGE),
    }

    Ok(())
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value.as_str()),
        None => bail!("缺少参数: {}\n\n{}", name, USAGE),
    }
}

fn open_store(settings: &RegistrySettings) -> Result<ValueStore> {
    settings
        .open_store()
        .with_context(|| format!("预设库打开失败: {}", settings.db_path.display()))
}

/// 当前预设存在时载入
fn apply_preset(
    store: &ValueStore,
    settings: &RegistrySettings,
    registry: &mut ParameterRegistry,
) -> Result<()> {
    if store.has_preset(&settings.preset)? {
        let report = store.load_preset(&settings.preset, registry)?;
        if !report.is_clean() {
            print_report(&report);
        }
    }
    Ok(())
}

fn list(registry: &ParameterRegistry, group: Option<&str>) -> Result<()> {
    let groups: Vec<&str> = match group {
        Some(group) => {
            if registry.by_group(group).is_empty() {
                bail!("未知分组: {}", group);
            }
            vec![group]
        }
        None => registry.groups().collect(),
    };

    let modified = registry.modified_keys();
    for group in groups {
        println!("[{}]", group);
        for key in registry.by_group(group) {
            let definition = registry.definition(key)?;
            let flag = if modified.contains(&key.as_str()) { "*" } else { " " };
            let unit = definition
                .unit
                .as_deref()
                .map(|u| format!(" {}", u))
                .unwrap_or_default();
            println!(
                "{} {:<28} = {}{}  ({})",
                flag,
                key,
                registry.get(key)?,
                unit,
                definition.widget_kind
            );
        }
    }
    Ok(())
}

fn print_report(report: &LoadReport) {
    println!("已载入 {} 项", report.loaded.len());
    if !report.dropped.is_empty() {
        println!("已丢弃（参数表中不存在）: {}", report.dropped.join(", "));
    }
    if !report.filled.is_empty() {
        println!("以默认值补齐: {}", report.filled.join(", "));
    }
    for rejected in &report.rejected {
        println!("已拒绝 {}: {}", rejected.key, rejected.reason);
    }
}
