// ==========================================
// 用地适宜性评估 - 预设配置仓库
// ==========================================
// 职责: 读取 <presets>/<name>.json 命名预设, 注入 state
// 存储: JSON 文件 (只读)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::exclusion_config::{reserved_keys, ConfigInput, ExclusionConfiguration};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// 读取预设
    ///
    /// # 参数
    /// - name: 预设名 (不含扩展名)
    /// - state: 若给出则写入 "state" 键
    pub fn load(&self, name: &str, state: Option<&str>) -> ConfigResult<ExclusionConfiguration> {
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(ConfigError::PresetNotFound {
                name: name.to_string(),
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::PresetParse {
            name: name.to_string(),
            source,
        })?;
        let mut config = ExclusionConfiguration::from_value(value)?;
        if let Some(state) = state {
            config.insert(reserved_keys::STATE, Value::String(state.to_string()));
        }
        debug!(preset = name, keys = config.len(), "预设配置已加载");
        Ok(config)
    }

    /// 列出全部预设名 (排序)
    pub fn list(&self) -> ConfigResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// 由调用方输入得到最终判据字典
    ///
    /// # 规则
    /// - Default: 加载技术默认预设
    /// - Preset(name): 加载命名预设
    /// - Mapping + update=true: 映射逐键覆盖默认预设
    /// - Mapping + update=false: 映射整体替换默认预设
    pub fn materialize(
        &self,
        input: ConfigInput,
        default_preset: &str,
        update: bool,
        state: Option<&str>,
    ) -> ConfigResult<ExclusionConfiguration> {
        match input {
            ConfigInput::Default => self.load(default_preset, state),
            ConfigInput::Preset(name) => self.load(&name, state),
            ConfigInput::Mapping(map) if update => {
                let mut base = self.load(default_preset, state)?;
                base.merge(map);
                info!(preset = default_preset, "判据映射已覆盖默认预设");
                Ok(base)
            }
            ConfigInput::Mapping(map) => {
                let mut config = ExclusionConfiguration::from_map(map);
                if let (Some(state), false) = (state, config.is_present(reserved_keys::STATE)) {
                    config.insert(reserved_keys::STATE, Value::String(state.to_string()));
                }
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(presets: &[(&str, Value)]) -> (tempfile::TempDir, PresetStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in presets {
            std::fs::write(
                dir.path().join(format!("{}.json", name)),
                serde_json::to_string_pretty(value).unwrap(),
            )
            .unwrap();
        }
        let store = PresetStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_load_injects_state() {
        let (_dir, store) = store_with(&[("wind_th", json!({"forests": {"buffer": 0}}))]);
        let config = store.load("wind_th", Some("th")).unwrap();
        assert_eq!(config.state().as_deref(), Some("th"));
        assert!(config.is_present("forests"));
    }

    #[test]
    fn test_missing_preset_is_error() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.load("nope", None),
            Err(ConfigError::PresetNotFound { .. })
        ));
    }

    #[test]
    fn test_materialize_update_merges_over_default() {
        let (_dir, store) = store_with(&[(
            "wind_th",
            json!({"forests": {"buffer": 0}, "motorway": {"buffer": 100}}),
        )]);
        let overrides = json!({"motorway": {"buffer": 200}}).as_object().unwrap().clone();

        let merged = store
            .materialize(ConfigInput::Mapping(overrides.clone()), "wind_th", true, None)
            .unwrap();
        assert!(merged.is_present("forests"));
        assert_eq!(merged.get("motorway").unwrap()["buffer"], json!(200));

        let replaced = store
            .materialize(ConfigInput::Mapping(overrides), "wind_th", false, None)
            .unwrap();
        assert!(!replaced.is_present("forests"));
    }

    #[test]
    fn test_list_sorted() {
        let (_dir, store) = store_with(&[("b", json!({})), ("a", json!({}))]);
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
