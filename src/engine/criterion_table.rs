// ==========================================
// 用地适宜性评估 - 判据表
// ==========================================
// 职责: 每个命名判据的类别/标签/几何类型/允许数据源/默认源/文件与过滤条件
// 红线: 表的顺序即执行顺序; 解析器只做通用查表, 不按键写分支
// ==========================================

use crate::config::PathRoot;
use crate::domain::types::{Category, DataSource, GeometryKind};

// ==========================================
// 表结构
// ==========================================

/// 单个图层模板: 路径根 + 相对文件 + 属性过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerTemplate {
    pub root: PathRoot,
    pub file: &'static str,
    pub filter: Option<&'static str>,
}

/// 某数据源下的图层 (多于一个时按并集排除)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRule {
    pub source: DataSource,
    pub layers: &'static [LayerTemplate],
}

/// 栅格值域的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// 原样使用
    Identity,
    /// 坡度: 上界 (度) 转换为 250·cos(π/180·度)
    SlopeCosine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriterionDef {
    pub key: &'static str,
    pub label: &'static str,
    /// None: 不计入分类核算 (border)
    pub category: Option<Category>,
    pub kind: GeometryKind,
    pub default_source: DataSource,
    pub encoding: ValueEncoding,
    /// 允许的数据源及其图层; 顺序即允许列表
    pub rules: &'static [SourceRule],
}

impl CriterionDef {
    pub fn allows(&self, source: DataSource) -> bool {
        self.rules.iter().any(|r| r.source == source)
    }

    pub fn rule(&self, source: DataSource) -> Option<&'static SourceRule> {
        self.rules.iter().find(|r| r.source == source)
    }

    pub fn allowed_sources(&self) -> impl Iterator<Item = DataSource> + '_ {
        self.rules.iter().map(|r| r.source)
    }
}

// ==========================================
// 构造宏 (展开为可提升为 'static 的字面量)
// ==========================================

macro_rules! layer {
    ($root:ident, $file:expr, $filter:expr) => {
        LayerTemplate {
            root: PathRoot::$root,
            file: $file,
            filter: $filter,
        }
    };
}

macro_rules! rule {
    ($source:ident: $($layer:expr),+ $(,)?) => {
        SourceRule {
            source: DataSource::$source,
            layers: &[$($layer),+],
        }
    };
}

/// basis-dlm 与 dlm250 共用同一文件与过滤条件, 其余数据源追加在后
macro_rules! dlm_rules {
    ($file:expr, $filter:expr $(, $extra:expr)* $(,)?) => {
        &[
            rule!(BasisDlm: layer!(BasisDlm, $file, $filter)),
            rule!(Dlm250: layer!(Dlm250, $file, $filter)),
            $($extra),*
        ]
    };
}

macro_rules! vector {
    ($key:expr, $label:expr, $category:expr, $default:ident, $rules:expr) => {
        CriterionDef {
            key: $key,
            label: $label,
            category: $category,
            kind: GeometryKind::Vector,
            default_source: DataSource::$default,
            encoding: ValueEncoding::Identity,
            rules: $rules,
        }
    };
}

macro_rules! raster {
    ($key:expr, $label:expr, $default:ident, $encoding:ident, $rules:expr) => {
        CriterionDef {
            key: $key,
            label: $label,
            category: Some(Category::EcoTech),
            kind: GeometryKind::Raster,
            default_source: DataSource::$default,
            encoding: ValueEncoding::$encoding,
            rules: $rules,
        }
    };
}

const SOCIAL: Option<Category> = Some(Category::Social);
const INFRA: Option<Category> = Some(Category::Infrastructure);
const PHYSICAL: Option<Category> = Some(Category::Physical);
const PROTECTED: Option<Category> = Some(Category::Protected);

// ===== 常用文件 =====
const OSM_ROADS: &str = "gis_osm_roads_free_1.shp";
const OSM_LANDUSE: &str = "gis_osm_landuse_a_free_1.shp";
const OSM_TRANSPORT: &str = "gis_osm_transport_a_free_1.shp";
const OSM_POIS: &str = "gis_osm_pois_a_free_1.shp";
const OSM_WATER: &str = "gis_osm_water_a_free_1.shp";
const OSM_WATERWAYS: &str = "gis_osm_waterways_free_1.shp";
const OSM_RAILWAYS: &str = "gis_osm_railways_free_1.shp";
const HOUSES_FILE: &str = "inner_areas/gis_osm_landuse_a_free_1_with_geomAttr.shp";
const BIO_ZONES: &str = "Bio_Zonierung2021_3035.shp";
const WDPA_FILE: &str = "WDPA_DE.shp";
const SIE02: &str = "sie02_f.shp";

// ===== 过滤条件 =====
const F_AIRPORTS_DLM: &str =
    "ART in ('5510', '5511', '5512') OR  NTZ in ('2000', '3000')  AND (ZUS IS NULL or ZUS = 'None') ";
const F_AIRFIELDS_DLM: &str = "ART in ('5520', '5540', '5550') AND (ZUS IS NULL or ZUS = 'None')";
const F_HEALTH_HU: &str =
    "GFK IN ('31001_3240', '31001_3241', '31001_3242', '31001_3051', '31001_3052') ";
const F_BUILDINGS_HU: &str = "GFK IN ('31001_1000', '31001_1010', '31001_1020', '31001_1021', \
'31001_1022', '31001_1023', '31001_1024', '31001_1025', '31001_1210', '31001_3064', '31001_3066', \
'31001_2070', '31001_2071', '31001_2072', '31001_2074')";
const F_BUILDINGS_COMMERCIAL_HU: &str = "GFK IN ('31001_2000', '31001_2010', '31001_2020', \
'31001_2030', '31001_2040', '31001_2050', '31001_2051', '31001_2052', '31001_2053', '31001_2054', \
'31001_2055', '31001_2056', '31001_2060', '31001_2070', '31001_2071', '31001_2072', '31001_2073', \
'31001_2074', '31001_2080', '31001_2081', '31001_2082', '31001_2083', '31001_2090', '31001_2091', \
'31001_2092', '31001_2093', '31001_2094')";
const F_MIXED_BUILDINGS_HU: &str = "GFK IN ('31001_1100', '31001_1110', '31001_1120', \
'31001_1121', '31001_1122', '31001_1123', '31001_1130', '31001_1220', '31001_1221', '31001_1223')";
const F_WATER_STILL_DLM: &str =
    "OBJART_TXT='AX_Hafenbecken' OR OBJART_TXT='AX_Meer' OR OBJART_TXT='AX_StehendesGewaesser' ";
const F_WATER_STILL_OSM: &str = "fclass!='river' OR fclass!='drain' OR fclass!='canal' \
OR fclass!='tidal_channel' OR fclass!='riverbank'";
const F_WATER_RIVER_DLM: &str = "OBJART_TXT='AX_Fliessgewaesser' OR OBJART_TXT='AX_Kanal' \
OR OBJART_TXT='AX_Wasserlauf' OR OBJART_TXT='AX_Gewaesserachse' ";
const F_WATER_RIVER_OSM: &str = "fclass='river' OR fclass='drain' OR fclass='canal' \
OR fclass='tidal_channel' OR fclass='riverbank'";
const F_FARMLAND_CLC: &str = "Code_18='211' OR Code_18='212' OR Code_18='213' OR Code_18='221' \
OR Code_18='222' OR Code_18='223' OR Code_18='241' OR Code_18='242' OR Code_18='243' OR Code_18='244'";
const F_OUTER_AREAS_DLM: &str = "OBJART !='41005' AND OBJART !='41004' AND OBJART !='41002'";
const F_RESIDENTIAL_DLM: &str =
    "OBJART = '41001' OR (OBJART='41007' AND FKT in('1110', '1120', '1130', '1150', '1160', '1170'))";
const F_RESIDENTIAL_CLC: &str =
    "Code_18='111' OR Code_18='112' OR Code_18='133' OR Code_18='141' OR Code_18='142' ";
const F_HISTORICAL_DLM: &str = "OBJART_TXT = 'AX_HistorischesBauwerkOderHistorischeEinrichtung'";
const F_REGIONAL_ROADS_DLM: &str = "WDM != '1301' AND WDM != '1303' AND WDM != '1305'";
const F_MOTORWAY_PLATZ: &str = "OBJART_TXT = 'AX_Platz' and FKT != '5310'";

// ==========================================
// 判据表 (规范执行顺序)
// ==========================================
static CRITERIA: &[CriterionDef] = &[
    // ===== 边界 (不计入分类核算) =====
    vector!("border", "Border", None, Vg250, &[
        rule!(Vg250: layer!(Datasources, "border/borders.shp", None)),
    ]),
    // ===== 交通线路 =====
    vector!("motorway", "Motorways", INFRA, BasisDlm, &[
        rule!(BasisDlm:
            layer!(BasisDlm, "ver01_l.shp", Some("WDM = '1301'")),
            layer!(BasisDlm, "ver01_f.shp", Some(F_MOTORWAY_PLATZ)),
        ),
        rule!(Osm: layer!(Osm, OSM_ROADS, Some("fclass = 'motorway' OR fclass = 'motorway_link'"))),
        rule!(Dlm250:
            layer!(Dlm250, "ver01_l.shp", Some("WDM = '1301'")),
            layer!(Dlm250, "ver01_f.shp", Some(F_MOTORWAY_PLATZ)),
        ),
    ]),
    vector!("primary_roads", "Primary roads", INFRA, BasisDlm, dlm_rules!(
        "ver01_l.shp", Some("WDM = '1303'"),
        rule!(Osm: layer!(Osm, OSM_ROADS, Some("fclass = 'primary' OR fclass = 'primary_link' OR fclass = 'trunk' OR fclass = 'trunk_link'"))),
    )),
    vector!("secondary_roads", "Secondary roads", INFRA, BasisDlm, dlm_rules!(
        "ver01_l.shp", Some("WDM = '1305'"),
        rule!(Osm: layer!(Osm, OSM_ROADS, Some("fclass = 'secondary' OR fclass = 'secondary_link'"))),
    )),
    vector!("regional_roads", "Regional roads", INFRA, BasisDlm, dlm_rules!(
        "ver01_l.shp", Some(F_REGIONAL_ROADS_DLM),
        rule!(Osm: layer!(Osm, OSM_ROADS, Some("fclass = 'residential'  OR fclass = 'tertiary'  OR fclass = 'tertiary_link' "))),
    )),
    vector!("railways", "Railways", INFRA, BasisDlm, &[
        rule!(BasisDlm:
            layer!(BasisDlm, "ver03_l.shp", Some("OBJART_TXT = 'AX_Bahnstrecke'")),
            layer!(BasisDlm, "ver03_f.shp", None),
            layer!(BasisDlm, "ver06_f.shp", Some("OBJART_TXT = 'AX_Bahnverkehrsanlage'")),
        ),
        rule!(Osm: layer!(Osm, OSM_RAILWAYS, None)),
        rule!(Dlm250:
            layer!(Dlm250, "ver03_l.shp", Some("OBJART_TXT = 'AX_Bahnstrecke'")),
            layer!(Dlm250, "ver03_f.shp", None),
            layer!(Dlm250, "ver06_f.shp", Some("OBJART_TXT = 'AX_Bahnverkehrsanlage'")),
        ),
    ]),
    vector!("power_lines", "Power lines", INFRA, BasisDlm, dlm_rules!(
        "sie03_l.shp", Some("OBJART_TXT='AX_Leitung'"),
        rule!(OsmOverpass: layer!(OsmOverpass, "power_line_OSM.shp", None)),
    )),
    // ===== 建成区 =====
    vector!("inner_areas", "Inner areas", SOCIAL, BasisDlm, dlm_rules!("sie01_f.shp", None)),
    vector!("5Houses", "5-Houses", SOCIAL, InnerAreas, &[
        rule!(InnerAreas: layer!(Datasources, HOUSES_FILE, Some("fclass='residential' AND area>9022"))),
    ]),
    vector!("10Houses", "10-Houses", SOCIAL, InnerAreas, &[
        rule!(InnerAreas: layer!(Datasources, HOUSES_FILE, Some("fclass='residential' AND area>18044"))),
    ]),
    vector!("outer_areas", "Outer areas", SOCIAL, BasisDlm, dlm_rules!(SIE02, Some(F_OUTER_AREAS_DLM))),
    vector!("residential", "Residential areas", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some(F_RESIDENTIAL_DLM),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='residential' OR fclass='retail' OR fclass='allotments'"))),
        rule!(Clc: layer!(Clc, "", Some(F_RESIDENTIAL_CLC))),
    )),
    vector!("mixed_usage", "Mixed-use areas", SOCIAL, BasisDlm, &[
        rule!(BasisDlm: layer!(BasisDlm, SIE02, Some("OBJART ='41006'"))),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='farmyard'"))),
    ]),
    vector!("industrial_commercial", "Indu & Commer", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some("OBJART ='41002'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass = 'commercial' OR fclass= 'industrial'"))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='121'"))),
    )),
    vector!("buildings", "Residential buildings", SOCIAL, Hu, &[
        rule!(Hu: layer!(Hu, "", Some(F_BUILDINGS_HU))),
    ]),
    vector!("buildings_commercial", "Commercial buildings", SOCIAL, Hu, &[
        rule!(Hu: layer!(Hu, "", Some(F_BUILDINGS_COMMERCIAL_HU))),
    ]),
    vector!("buildings_all", "Buildings", SOCIAL, Hu, &[
        rule!(Hu: layer!(Hu, "", None)),
    ]),
    vector!("mixed_buildings", "Mixed-use buildings", SOCIAL, Hu, &[
        rule!(Hu: layer!(Hu, "", Some(F_MIXED_BUILDINGS_HU))),
    ]),
    vector!("health_treatment_buildings", "Health treatment buildings", SOCIAL, Hu, &[
        rule!(Hu: layer!(Hu, "", Some(F_HEALTH_HU))),
        rule!(Osm: layer!(Osm, OSM_POIS, Some("fclass = 'hospital'"))),
    ]),
    // ===== 水体 =====
    vector!("water_still", "Lakes", PHYSICAL, BasisDlm, dlm_rules!(
        "gew01_f.shp", Some(F_WATER_STILL_DLM),
        rule!(Osm: layer!(Osm, OSM_WATER, Some(F_WATER_STILL_OSM))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='512' OR Code_18='521' OR Code_18='523'"))),
    )),
    vector!("water_river", "Rivers", PHYSICAL, BasisDlm, dlm_rules!(
        "gew01_f.shp", Some(F_WATER_RIVER_DLM),
        rule!(Osm: layer!(Osm, OSM_WATERWAYS, Some(F_WATER_RIVER_OSM))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='511' OR Code_18='522'"))),
    )),
    vector!("water_stream", "Streams", PHYSICAL, Osm, &[
        rule!(Osm: layer!(Osm, OSM_WATERWAYS, Some("fclass='stream' OR fclass='ditch'"))),
    ]),
    // ===== 植被 =====
    vector!("farmland", "Farmlands", PHYSICAL, BasisDlm, dlm_rules!(
        "veg01_f.shp", Some("VEG != '1020'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='farmland' OR fclass='orchard' OR fclass='vineyard'"))),
        rule!(Clc: layer!(Clc, "", Some(F_FARMLAND_CLC))),
    )),
    vector!("grassland", "Grassland", PHYSICAL, BasisDlm, dlm_rules!(
        "veg01_f.shp", Some("VEG = '1020'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='grass' OR fclass='meadow'"))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='231'"))),
    )),
    vector!("forests", "Forests", PHYSICAL, BasisDlm, dlm_rules!(
        "veg02_f.shp", None,
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='forest'"))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='311' OR Code_18='312' OR Code_18='313'"))),
    )),
    vector!("forests_outside_FRA", "Forests outside FRA", PHYSICAL, BasisDlm, &[
        rule!(BasisDlm: layer!(BasisDlm, "forest_rich_area/de/forest_outside_forest_rich_municipality_de.shp", None)),
    ]),
    vector!("forests_in_FRA_without_coniferous_forests", "NC forests in FRA", PHYSICAL, BasisDlm, &[
        rule!(BasisDlm: layer!(BasisDlm, "forest_rich_area/de/forest_in_forest_rich_municipality_de.shp", Some("VEG != '1200'"))),
    ]),
    vector!("trees", "Trees", PHYSICAL, BasisDlm, &[
        rule!(BasisDlm: layer!(BasisDlm, "veg03_f.shp", Some("OBJART_TXT = 'AX_Gehoelz'"))),
    ]),
    // ===== 航空与监测设施 =====
    vector!("airports", "Airports", INFRA, BasisDlm, dlm_rules!(
        "ver04_f.shp", Some(F_AIRPORTS_DLM),
        rule!(Osm: layer!(Osm, OSM_TRANSPORT, Some("fclass = 'airport'"))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='124'"))),
    )),
    vector!("airfields", "Airfields", INFRA, BasisDlm, &[
        rule!(BasisDlm: layer!(BasisDlm, "ver04_f.shp", Some(F_AIRFIELDS_DLM))),
        rule!(Osm: layer!(Osm, OSM_TRANSPORT, Some("fclass = 'airfield' OR fclass = 'apron'"))),
    ]),
    vector!("dvor", "D-VOR", INFRA, OsmOverpass, &[
        rule!(OsmOverpass: layer!(OsmOverpass, "D-VOR_OSM.shp", None)),
    ]),
    vector!("vor", "VOR", INFRA, OsmOverpass, &[
        rule!(OsmOverpass: layer!(OsmOverpass, "VOR_OSM.shp", None)),
    ]),
    vector!("seismic_station", "Seismic station", INFRA, Bgr, &[
        rule!(Bgr: layer!(Datasources, "Seismologie/seismic_station_de.shp", None)),
    ]),
    // ===== 社会用地 =====
    vector!("military", "Military", SOCIAL, BasisDlm, dlm_rules!(
        "geb03_f.shp", Some("ADF = '4720'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass='military'"))),
    )),
    vector!("cemetery", "Cemetery", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some("OBJART = '41009'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass = 'cemetery'"))),
    )),
    vector!("recreational", "Recreational areas", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some("OBJART = '41008'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass = 'park' OR fclass = 'recreation_ground'"))),
    )),
    vector!("camping", "Camping sites", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some("FKT = '4330'"),
        rule!(Osm: layer!(Osm, OSM_POIS, Some("fclass='camp_site'"))),
    )),
    vector!("historical", "Historical sites", SOCIAL, Osm, dlm_rules!(
        "sie03_f.shp", Some(F_HISTORICAL_DLM),
        rule!(Osm: layer!(Osm, OSM_POIS, Some("fclass IN ('archaeological','monument','memorial','castle') "))),
        rule!(Hu: layer!(Hu, "", Some("GFK IN ('31001_3031', '31001_3038')"))),
    )),
    vector!("mineral_extraction", "Mineral extraction sites", SOCIAL, BasisDlm, dlm_rules!(
        SIE02, Some("OBJART ='41005' OR OBJART ='41004'"),
        rule!(Osm: layer!(Osm, OSM_LANDUSE, Some("fclass = 'quarry'"))),
        rule!(Clc: layer!(Clc, "", Some("Code_18='131'"))),
    )),
    vector!("dump_sites", "Dump sites", SOCIAL, Clc, dlm_rules!(
        SIE02, Some("FKT = '2600'"),
        rule!(Clc: layer!(Clc, "", Some("Code_18='132'"))),
    )),
    vector!("construction", "Construction sites", SOCIAL, Clc, &[
        rule!(Clc: layer!(Clc, "", Some("Code_18='133'"))),
    ]),
    // ===== 经济与技术 (栅格) =====
    raster!("wind_100m", "Wind speed at 100m", Gwa, Identity, &[
        rule!(Gwa: layer!(Datasources, "gwa/DEU_wind-speed_100m.tif", None)),
    ]),
    raster!("wind_100m_era", "Wind speed at 100m", Gwa, Identity, &[
        rule!(Gwa: layer!(Datasources, "gwa/ERA5_wind_speed_100m_mean.tiff", None)),
    ]),
    raster!("wind_100m_power", "Wind power at 100m", Gwa, Identity, &[
        rule!(Gwa: layer!(Datasources, "gwa/DEU_power-density_100m.tif", None)),
    ]),
    raster!("elevation", "Elevation", Copernicus, Identity, &[
        rule!(Copernicus: layer!(Datasources, "dem/copernicus/copernicus_merged.tif", None)),
    ]),
    raster!("slope", "Slope", Copernicus, SlopeCosine, &[
        rule!(Copernicus: layer!(Datasources, "dem/copernicus/copernicus_slop_merged.tif", None)),
    ]),
    // ===== 保护区 =====
    vector!("birds", "Birds", PROTECTED, Wdpa, &[
        rule!(Wdpa: layer!(Wdpa, WDPA_FILE, Some("DESIG_ENG = 'Special Protection Area (Birds Directive)'"))),
    ]),
    vector!("nature_protection", "Nature protection areas", PROTECTED, Wdpa, &[
        rule!(Wdpa: layer!(Wdpa, WDPA_FILE, Some("Desig='Naturschutzgebiet'"))),
    ]),
    vector!("nationalpark", "National parks", PROTECTED, Wdpa, &[
        rule!(Wdpa: layer!(Wdpa, WDPA_FILE, Some("Desig='Nationalpark'"))),
    ]),
    vector!("habitats", "Habitats", PROTECTED, Wdpa, &[
        rule!(Wdpa: layer!(Wdpa, WDPA_FILE, Some("Desig='Site of Community Importance (Habitats Directive)'"))),
    ]),
    vector!("landscape", "Landscape protected areas", PROTECTED, Wdpa, &[
        rule!(Wdpa: layer!(Wdpa, WDPA_FILE, Some("DESIG_ENG = 'Landscape Protection Area'"))),
    ]),
    vector!("biospheres_core", "Biospheres_core", PROTECTED, Bfn, &[
        rule!(Bfn: layer!(Bfn, BIO_ZONES, Some("ZONIERUNG = 'Kernzone'"))),
    ]),
    vector!("biospheres_develop", "Biospheres_develop", PROTECTED, Bfn, &[
        rule!(Bfn: layer!(Bfn, BIO_ZONES, Some("ZONIERUNG = 'Entwicklungszone'"))),
    ]),
    vector!("biospheres_maintain", "Biospheres_maintain", PROTECTED, Bfn, &[
        rule!(Bfn: layer!(Bfn, BIO_ZONES, Some("ZONIERUNG = 'Pflegezone'"))),
    ]),
];

// ==========================================
// 查询接口
// ==========================================

/// 全部命名判据 (规范执行顺序)
pub fn all() -> &'static [CriterionDef] {
    CRITERIA
}

pub fn lookup(key: &str) -> Option<&'static CriterionDef> {
    CRITERIA.iter().find(|c| c.key == key)
}

/// 判据在执行顺序中的位置
pub fn position(key: &str) -> Option<usize> {
    CRITERIA.iter().position(|c| c.key == key)
}

/// 命名判据或保留键
pub fn is_known_key(key: &str) -> bool {
    lookup(key).is_some() || crate::config::reserved_keys::is_reserved(key)
}
