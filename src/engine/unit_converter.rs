// ==========================================
// 碳排放数据导入系统 - 计量单位换算引擎
// ==========================================
// 职责: 同维度单位换算（经由维度标准单位中转）
// 红线: 跨维度换算必须失败，不允许静默兜底
// ==========================================

use crate::domain::types::UnitDimension;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ERR_INVALID_NUMERIC_VALUE: &str = "Invalid numeric value";
pub const ERR_UNKNOWN_UNIT: &str = "Unknown unit of measure";
pub const ERR_DIMENSION_MISMATCH: &str = "Cannot convert between different unit categories";

// ==========================================
// 单位定义
// ==========================================
// factor: 每 1 个该单位等于多少个标准单位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDefinition {
    pub symbol: &'static str,
    pub dimension: UnitDimension,
    pub factor: f64,
}

const fn unit(symbol: &'static str, dimension: UnitDimension, factor: f64) -> UnitDefinition {
    UnitDefinition {
        symbol,
        dimension,
        factor,
    }
}

const UNITS: &[UnitDefinition] = &[
    // ===== 质量（标准单位 kg）=====
    unit("mg", UnitDimension::Mass, 1e-6),
    unit("g", UnitDimension::Mass, 1e-3),
    unit("kg", UnitDimension::Mass, 1.0),
    unit("t", UnitDimension::Mass, 1000.0),
    unit("lb", UnitDimension::Mass, 0.453_592_37),
    unit("oz", UnitDimension::Mass, 0.028_349_523_125),
    unit("st", UnitDimension::Mass, 6.350_293_18),
    unit("short_ton", UnitDimension::Mass, 907.184_74),
    unit("long_ton", UnitDimension::Mass, 1_016.046_908_8),
    // ===== 体积（标准单位 m³）=====
    unit("ml", UnitDimension::Volume, 1e-6),
    unit("l", UnitDimension::Volume, 1e-3),
    unit("m³", UnitDimension::Volume, 1.0),
    unit("gal", UnitDimension::Volume, 0.003_785_411_784),
    unit("imp_gal", UnitDimension::Volume, 0.004_546_09),
    unit("ft³", UnitDimension::Volume, 0.028_316_846_592),
    unit("bbl", UnitDimension::Volume, 0.158_987_294_928),
    // ===== 能量（标准单位 kWh）=====
    unit("Wh", UnitDimension::Energy, 1e-3),
    unit("kWh", UnitDimension::Energy, 1.0),
    unit("MWh", UnitDimension::Energy, 1e3),
    unit("GWh", UnitDimension::Energy, 1e6),
    unit("J", UnitDimension::Energy, 1.0 / 3.6e6),
    unit("kJ", UnitDimension::Energy, 1.0 / 3.6e3),
    unit("MJ", UnitDimension::Energy, 1.0 / 3.6),
    unit("GJ", UnitDimension::Energy, 1e3 / 3.6),
    unit("btu", UnitDimension::Energy, 2.930_710_701_7e-4),
    unit("therm", UnitDimension::Energy, 29.307_107_017),
    unit("mmbtu", UnitDimension::Energy, 293.071_070_17),
    // ===== 距离（标准单位 km）=====
    unit("m", UnitDimension::Distance, 1e-3),
    unit("km", UnitDimension::Distance, 1.0),
    unit("mi", UnitDimension::Distance, 1.609_344),
    unit("ft", UnitDimension::Distance, 3.048e-4),
    unit("yd", UnitDimension::Distance, 9.144e-4),
    unit("nmi", UnitDimension::Distance, 1.852),
    // ===== 面积（标准单位 m²）=====
    unit("m²", UnitDimension::Area, 1.0),
    unit("km²", UnitDimension::Area, 1e6),
    unit("ha", UnitDimension::Area, 1e4),
    unit("ft²", UnitDimension::Area, 0.092_903_04),
    unit("acre", UnitDimension::Area, 4_046.856_422_4),
];

// 别名 → 规范符号（键为小写、单空格）
const ALIASES: &[(&str, &str)] = &[
    // 质量
    ("milligram", "mg"),
    ("milligrams", "mg"),
    ("gram", "g"),
    ("grams", "g"),
    ("gr", "g"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("kgs", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("tonne", "t"),
    ("tonnes", "t"),
    ("ton", "t"),
    ("tons", "t"),
    ("mt", "t"),
    ("metric ton", "t"),
    ("metric tons", "t"),
    ("metric tonne", "t"),
    ("metric tonnes", "t"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("lbs", "lb"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("stone", "st"),
    ("short ton", "short_ton"),
    ("short tons", "short_ton"),
    ("us ton", "short_ton"),
    ("us tons", "short_ton"),
    ("long ton", "long_ton"),
    ("long tons", "long_ton"),
    ("imperial ton", "long_ton"),
    // 体积
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("liter", "l"),
    ("liters", "l"),
    ("litre", "l"),
    ("litres", "l"),
    ("ltr", "l"),
    ("lt", "l"),
    ("m3", "m³"),
    ("cbm", "m³"),
    ("cubic meter", "m³"),
    ("cubic meters", "m³"),
    ("cubic metre", "m³"),
    ("cubic metres", "m³"),
    ("gallon", "gal"),
    ("gallons", "gal"),
    ("gals", "gal"),
    ("us gallon", "gal"),
    ("us gallons", "gal"),
    ("imperial gallon", "imp_gal"),
    ("imperial gallons", "imp_gal"),
    ("uk gallon", "imp_gal"),
    ("uk gallons", "imp_gal"),
    ("ft3", "ft³"),
    ("cubic foot", "ft³"),
    ("cubic feet", "ft³"),
    ("barrel", "bbl"),
    ("barrels", "bbl"),
    // 能量
    ("watt hour", "Wh"),
    ("watt hours", "Wh"),
    ("watt-hour", "Wh"),
    ("watt-hours", "Wh"),
    ("kilowatt hour", "kWh"),
    ("kilowatt hours", "kWh"),
    ("kilowatt-hour", "kWh"),
    ("kilowatt-hours", "kWh"),
    ("kw h", "kWh"),
    ("kw-h", "kWh"),
    ("megawatt hour", "MWh"),
    ("megawatt hours", "MWh"),
    ("megawatt-hour", "MWh"),
    ("megawatt-hours", "MWh"),
    ("gigawatt hour", "GWh"),
    ("gigawatt hours", "GWh"),
    ("joule", "J"),
    ("joules", "J"),
    ("kilojoule", "kJ"),
    ("kilojoules", "kJ"),
    ("megajoule", "MJ"),
    ("megajoules", "MJ"),
    ("gigajoule", "GJ"),
    ("gigajoules", "GJ"),
    ("btus", "btu"),
    ("british thermal unit", "btu"),
    ("british thermal units", "btu"),
    ("therms", "therm"),
    ("thm", "therm"),
    ("mmbtus", "mmbtu"),
    ("million btu", "mmbtu"),
    // 距离
    ("meter", "m"),
    ("meters", "m"),
    ("metre", "m"),
    ("metres", "m"),
    ("kilometer", "km"),
    ("kilometers", "km"),
    ("kilometre", "km"),
    ("kilometres", "km"),
    ("kms", "km"),
    ("mile", "mi"),
    ("miles", "mi"),
    ("foot", "ft"),
    ("feet", "ft"),
    ("yard", "yd"),
    ("yards", "yd"),
    ("nautical mile", "nmi"),
    ("nautical miles", "nmi"),
    // 面积
    ("m2", "m²"),
    ("sq m", "m²"),
    ("sqm", "m²"),
    ("square meter", "m²"),
    ("square meters", "m²"),
    ("square metre", "m²"),
    ("square metres", "m²"),
    ("km2", "km²"),
    ("sq km", "km²"),
    ("square kilometer", "km²"),
    ("square kilometers", "km²"),
    ("square kilometre", "km²"),
    ("square kilometres", "km²"),
    ("hectare", "ha"),
    ("hectares", "ha"),
    ("ft2", "ft²"),
    ("sq ft", "ft²"),
    ("sqft", "ft²"),
    ("square foot", "ft²"),
    ("square feet", "ft²"),
    ("acres", "acre"),
];

// ==========================================
// 输入数值（数字或文本）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityInput {
    Number(f64),
    Text(String),
}

impl QuantityInput {
    /// 解析为有限浮点数，非数值返回 None
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            QuantityInput::Number(v) => *v,
            QuantityInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for QuantityInput {
    fn from(v: f64) -> Self {
        QuantityInput::Number(v)
    }
}

impl From<i64> for QuantityInput {
    fn from(v: i64) -> Self {
        QuantityInput::Number(v as f64)
    }
}

impl From<&str> for QuantityInput {
    fn from(s: &str) -> Self {
        QuantityInput::Text(s.to_string())
    }
}

impl From<String> for QuantityInput {
    fn from(s: String) -> Self {
        QuantityInput::Text(s)
    }
}

// ==========================================
// 换算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub value: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub error: Option<String>,
}

impl ConversionResult {
    fn failed(value: f64, from_unit: &str, to_unit: &str, error: String) -> Self {
        Self {
            success: false,
            value,
            from_unit: from_unit.to_string(),
            to_unit: to_unit.to_string(),
            error: Some(error),
        }
    }
}

/// 按维度分组的单位清单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitGroup {
    pub dimension: UnitDimension,
    pub standard_unit: &'static str,
    pub units: Vec<&'static str>,
}

// ==========================================
// UnitConverter - 单位换算器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConverter;

impl UnitConverter {
    pub fn new() -> Self {
        Self
    }

    /// 解析单位字符串为规范单位定义
    ///
    /// 顺序: TRIM + 小写 + 合并空白 → 规范符号 → 别名
    pub fn resolve_unit(&self, raw: &str) -> Option<&'static UnitDefinition> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(def) = UNITS.iter().find(|u| u.symbol.to_lowercase() == normalized) {
            return Some(def);
        }

        let symbol = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, symbol)| *symbol)?;
        UNITS.iter().find(|u| u.symbol == symbol)
    }

    pub fn is_supported(&self, raw: &str) -> bool {
        self.resolve_unit(raw).is_some()
    }

    pub fn dimension_of(&self, raw: &str) -> Option<UnitDimension> {
        self.resolve_unit(raw).map(|u| u.dimension)
    }

    /// 单位所在维度的标准单位
    pub fn standard_unit_for(&self, raw: &str) -> Option<&'static str> {
        self.dimension_of(raw).map(|d| d.standard_unit())
    }

    /// 单位换算
    ///
    /// # 参数
    /// - value: 数值（数字或文本）
    /// - from_unit: 源单位
    /// - to_unit: 目标单位（None → 源单位所在维度的标准单位）
    ///
    /// # 返回
    /// - success=false 时 error 给出原因，value 为解析出的原值（无法解析时为 0）
    pub fn convert(
        &self,
        value: impl Into<QuantityInput>,
        from_unit: &str,
        to_unit: Option<&str>,
    ) -> ConversionResult {
        let to_raw = to_unit.unwrap_or("");

        let Some(amount) = value.into().to_f64() else {
            return ConversionResult::failed(
                0.0,
                from_unit,
                to_raw,
                ERR_INVALID_NUMERIC_VALUE.to_string(),
            );
        };

        let Some(from) = self.resolve_unit(from_unit) else {
            return ConversionResult::failed(
                amount,
                from_unit,
                to_raw,
                format!("{}: {}", ERR_UNKNOWN_UNIT, from_unit.trim()),
            );
        };

        let to = match to_unit {
            None => self
                .resolve_unit(from.dimension.standard_unit())
                .unwrap_or(from),
            Some(raw) => match self.resolve_unit(raw) {
                Some(def) => def,
                None => {
                    return ConversionResult::failed(
                        amount,
                        from.symbol,
                        raw,
                        format!("{}: {}", ERR_UNKNOWN_UNIT, raw.trim()),
                    )
                }
            },
        };

        if from.dimension != to.dimension {
            debug!(
                from = from.symbol,
                to = to.symbol,
                from_dimension = %from.dimension,
                to_dimension = %to.dimension,
                "跨维度换算被拒绝"
            );
            return ConversionResult::failed(
                amount,
                from.symbol,
                to.symbol,
                ERR_DIMENSION_MISMATCH.to_string(),
            );
        }

        // 同单位直接返回，避免无意义的浮点往返
        let converted = if from.symbol == to.symbol {
            amount
        } else {
            amount * from.factor / to.factor
        };

        ConversionResult {
            success: true,
            value: converted,
            from_unit: from.symbol.to_string(),
            to_unit: to.symbol.to_string(),
            error: None,
        }
    }

    /// 全部支持单位（按维度分组）
    pub fn supported_units(&self) -> Vec<UnitGroup> {
        UnitDimension::ALL
            .iter()
            .map(|dimension| UnitGroup {
                dimension: *dimension,
                standard_unit: dimension.standard_unit(),
                units: UNITS
                    .iter()
                    .filter(|u| u.dimension == *dimension)
                    .map(|u| u.symbol)
                    .collect(),
            })
            .collect()
    }
}
