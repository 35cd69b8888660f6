// ==========================================
// 用地适宜性评估 - 数据源上下文
// ==========================================
// 职责: 显式传入管线的路径与区域上下文 (数据源根目录/区域/州/中间文件)
// 红线: 只做路径拼接, 不读写数据文件
// ==========================================

use std::path::{Path, PathBuf};

/// 数据源根目录环境变量
pub const ENV_DATASOURCES: &str = "LAND_ELIGIBILITY_DATASOURCES";
/// 预设目录环境变量
pub const ENV_PRESETS: &str = "LAND_ELIGIBILITY_PRESETS";

/// 默认像元分辨率 (米)
pub const DEFAULT_PIXEL_RES: f64 = 10.0;

// ==========================================
// PathRoot - 判据表中的路径根
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// 数据源根目录本身
    Datasources,
    /// <root>/osm/merged
    Osm,
    /// <root>/osm_overpass
    OsmOverpass,
    /// CLC 矢量文件 (文件名忽略)
    Clc,
    /// DLM250 分层目录
    Dlm250,
    /// Basis-DLM 根目录 (可单独配置)
    BasisDlm,
    /// HU 建筑数据 (按州分文件, 文件名忽略)
    Hu,
    /// <root>/wdpa
    Wdpa,
    /// <root>/bfn
    Bfn,
}

// ==========================================
// DatasourceContext
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceContext {
    pub datasource_root: PathBuf,
    pub basis_dlm_root: PathBuf,
    pub hu_root: PathBuf,
    pub intermediate_dir: PathBuf,
    pub presets_dir: PathBuf,
    /// 写出每个判据的中间掩膜 (毛流量核算需要)
    pub use_intermediate: bool,
    /// 命名判据执行前检查文件存在, 缺失视为致命错误
    pub check_paths: bool,
    pub region_id: String,
    pub state: Option<String>,
    pub case_name: String,
    pub pixel_res: f64,
}

impl DatasourceContext {
    /// 以给定根目录构造, 其余路径取默认布局
    pub fn new(datasource_root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = datasource_root.into();
        let presets_dir = std::env::var(ENV_PRESETS)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_presets_dir());
        Self {
            basis_dlm_root: root.join("basis-dlm"),
            hu_root: root.join("hu"),
            intermediate_dir: root.join("intermediates"),
            presets_dir,
            use_intermediate: false,
            check_paths: false,
            region_id: "region".to_string(),
            state: None,
            case_name: "base".to_string(),
            pixel_res: DEFAULT_PIXEL_RES,
            datasource_root: root,
        }
    }

    /// 从环境变量读取数据源根目录, 缺省为系统数据目录下的 land-eligibility/datasources
    pub fn from_env() -> Self {
        let root = std::env::var(ENV_DATASOURCES)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("land-eligibility")
                    .join("datasources")
            });
        Self::new(root)
    }

    pub fn with_region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = region_id.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_case(mut self, case_name: impl Into<String>) -> Self {
        self.case_name = case_name.into();
        self
    }

    pub fn with_basis_dlm_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.basis_dlm_root = path.into();
        self
    }

    pub fn with_hu_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.hu_root = path.into();
        self
    }

    pub fn with_intermediate_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.intermediate_dir = path.into();
        self
    }

    pub fn with_presets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.presets_dir = path.into();
        self
    }

    pub fn with_pixel_res(mut self, pixel_res: f64) -> Self {
        self.pixel_res = pixel_res;
        self
    }

    pub fn use_intermediate(mut self, enabled: bool) -> Self {
        self.use_intermediate = enabled;
        self
    }

    pub fn check_paths(mut self, enabled: bool) -> Self {
        self.check_paths = enabled;
        self
    }

    // ==========================================
    // 路径拼接
    // ==========================================

    /// 路径根对应的目录 (或文件)
    pub fn root(&self, root: PathRoot) -> PathBuf {
        let ds = &self.datasource_root;
        match root {
            PathRoot::Datasources => ds.clone(),
            PathRoot::Osm => ds.join("osm").join("merged"),
            PathRoot::OsmOverpass => ds.join("osm_overpass"),
            PathRoot::Clc => ds.join("clc").join("CLC2018_v2020_20u1_DE_fgdb.shp"),
            PathRoot::Dlm250 => ds
                .join("dlm250.utm32s.shape.ebenen")
                .join("dlm250.utm32s.shape.ebenen")
                .join("dlm250_ebenen")
                .join("de")
                .join("dlm250"),
            PathRoot::BasisDlm => self.basis_dlm_root.clone(),
            PathRoot::Hu => self.hu_file(),
            PathRoot::Wdpa => ds.join("wdpa"),
            PathRoot::Bfn => ds.join("bfn"),
        }
    }

    /// 根目录 + 相对文件名; Clc/Hu 本身即文件
    pub fn resolve(&self, root: PathRoot, file: &str) -> PathBuf {
        let base = self.root(root);
        if file.is_empty() || matches!(root, PathRoot::Clc | PathRoot::Hu) {
            base
        } else {
            base.join(file)
        }
    }

    /// HU 按州分文件: <hu>/<state>/hu_<state>.shp; 无州信息时取 <hu>/hu.shp
    pub fn hu_file(&self) -> PathBuf {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => self
                .hu_root
                .join(state)
                .join(format!("hu_{}.shp", state)),
            _ => self.hu_root.join("hu.shp"),
        }
    }

    /// 中间掩膜文件路径
    pub fn intermediate_path(&self, file_name: &str) -> PathBuf {
        self.intermediate_dir.join(file_name)
    }

    /// 辅助判据路径: 已存在的文件原样使用, 否则视为数据源根目录下的相对路径
    pub fn locate_auxiliary(&self, source_path: &Path) -> Option<PathBuf> {
        if source_path.is_file() {
            return Some(source_path.to_path_buf());
        }
        let joined = self.datasource_root.join(source_path);
        if joined.is_file() {
            Some(joined)
        } else {
            None
        }
    }

    /// 像元面积 (平方米)
    pub fn pixel_area(&self) -> f64 {
        self.pixel_res * self.pixel_res
    }
}

impl Default for DatasourceContext {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_presets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_layout() {
        let ctx = DatasourceContext::new("/ds");
        assert_eq!(ctx.root(PathRoot::Osm), PathBuf::from("/ds/osm/merged"));
        assert_eq!(
            ctx.resolve(PathRoot::Clc, "ignored.shp"),
            PathBuf::from("/ds/clc/CLC2018_v2020_20u1_DE_fgdb.shp")
        );
        assert_eq!(
            ctx.resolve(PathRoot::BasisDlm, "ver01_l.shp"),
            PathBuf::from("/ds/basis-dlm/ver01_l.shp")
        );
    }

    #[test]
    fn test_hu_file_per_state() {
        let ctx = DatasourceContext::new("/ds").with_state("th");
        assert_eq!(ctx.hu_file(), PathBuf::from("/ds/hu/th/hu_th.shp"));
        let no_state = DatasourceContext::new("/ds");
        assert_eq!(no_state.hu_file(), PathBuf::from("/ds/hu/hu.shp"));
    }

    #[test]
    fn test_locate_auxiliary_relative_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("state_th")).unwrap();
        std::fs::write(dir.path().join("state_th/vrg.shp"), b"").unwrap();

        let ctx = DatasourceContext::new(dir.path());
        assert_eq!(
            ctx.locate_auxiliary(Path::new("state_th/vrg.shp")),
            Some(dir.path().join("state_th/vrg.shp"))
        );
        assert_eq!(ctx.locate_auxiliary(Path::new("state_th/missing.shp")), None);
    }
}
