//! MRP 配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;

/// 批量規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotSizingMethod {
    /// 批對批（Lot for Lot）- 按實際需求訂購
    LotForLot,

    /// 固定訂購量（Fixed Order Quantity）- 每次固定數量
    FixedOrderQuantity,

    /// 經濟訂購量（Economic Order Quantity）
    EconomicOrderQuantity,

    /// 週期訂購量（Period Order Quantity）- 未實作，退回批對批
    PeriodOrderQuantity,

    /// 最小-最大（Min-Max）- 未實作，退回批對批
    MinMax,
}

impl LotSizingMethod {
    /// 主檔中使用的標籤
    pub fn as_str(&self) -> &'static str {
        match self {
            LotSizingMethod::LotForLot => "LOT_FOR_LOT",
            LotSizingMethod::FixedOrderQuantity => "FIXED_ORDER_QUANTITY",
            LotSizingMethod::EconomicOrderQuantity => "ECONOMIC_ORDER_QUANTITY",
            LotSizingMethod::PeriodOrderQuantity => "PERIOD_ORDER_QUANTITY",
            LotSizingMethod::MinMax => "MIN_MAX",
        }
    }

    /// 由標籤解析，無法辨識時回傳 None
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "LOT_FOR_LOT" | "LFL" => Some(LotSizingMethod::LotForLot),
            "FIXED_ORDER_QUANTITY" | "FOQ" => Some(LotSizingMethod::FixedOrderQuantity),
            "ECONOMIC_ORDER_QUANTITY" | "EOQ" => Some(LotSizingMethod::EconomicOrderQuantity),
            "PERIOD_ORDER_QUANTITY" | "POQ" => Some(LotSizingMethod::PeriodOrderQuantity),
            "MIN_MAX" => Some(LotSizingMethod::MinMax),
            _ => None,
        }
    }
}

impl Default for LotSizingMethod {
    fn default() -> Self {
        LotSizingMethod::LotForLot
    }
}

/// 物料批量規則配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSizingConfig {
    /// 物料ID
    pub material_id: String,

    /// 批量規則
    pub method: LotSizingMethod,

    /// 固定批量（如果適用）
    pub fixed_order_quantity: Option<Decimal>,

    /// 最小訂購量
    pub minimum_order_quantity: Option<Decimal>,

    /// 訂購倍數（必須是此倍數）
    pub order_multiple: Option<Decimal>,

    /// 經濟訂購量（主檔預先計算，這裡不重算）
    pub economic_order_quantity: Option<Decimal>,

    /// 週期訂購天數（僅記錄，POQ 未實作）
    pub period_order_quantity_days: Option<u32>,
}

impl LotSizingConfig {
    /// 創建新的批量配置（預設批對批）
    pub fn new(material_id: impl Into<String>) -> Self {
        Self {
            material_id: material_id.into(),
            method: LotSizingMethod::LotForLot,
            fixed_order_quantity: None,
            minimum_order_quantity: None,
            order_multiple: None,
            economic_order_quantity: None,
            period_order_quantity_days: None,
        }
    }

    /// 建構器模式：設置批量規則
    pub fn with_method(mut self, method: LotSizingMethod) -> Self {
        self.method = method;
        self
    }

    /// 建構器模式：設置固定批量
    pub fn with_fixed_order_quantity(mut self, qty: Decimal) -> Self {
        self.fixed_order_quantity = Some(qty);
        self
    }

    /// 建構器模式：設置最小訂購量
    pub fn with_minimum_order_quantity(mut self, qty: Decimal) -> Self {
        self.minimum_order_quantity = Some(qty);
        self
    }

    /// 建構器模式：設置訂購倍數
    pub fn with_order_multiple(mut self, multiple: Decimal) -> Self {
        self.order_multiple = Some(multiple);
        self
    }

    /// 建構器模式：設置經濟訂購量
    pub fn with_economic_order_quantity(mut self, eoq: Decimal) -> Self {
        self.economic_order_quantity = Some(eoq);
        self
    }

    /// 建構器模式：設置週期訂購天數
    pub fn with_period_order_quantity_days(mut self, days: u32) -> Self {
        self.period_order_quantity_days = Some(days);
        self
    }

    /// 調整訂購量：先套用最小訂購量，再向上取整到訂購倍數
    ///
    /// 取整超出 `Decimal` 範圍時回傳 `None`
    pub fn adjust_order_quantity(&self, mut quantity: Decimal) -> Option<Decimal> {
        if let Some(min_qty) = self.minimum_order_quantity {
            if quantity < min_qty {
                quantity = min_qty;
            }
        }

        if let Some(multiple) = self.order_multiple {
            if multiple > Decimal::ZERO {
                let remainder = quantity.checked_rem(multiple)?;
                if remainder > Decimal::ZERO {
                    quantity = quantity.checked_sub(remainder)?.checked_add(multiple)?;
                }
            }
        }

        Some(quantity)
    }
}

fn default_max_bom_depth() -> u32 {
    50
}

fn default_unit_of_measure() -> String {
    "EA".to_string()
}

fn default_order_number_width() -> usize {
    5
}

fn default_purchase_prefix() -> String {
    "PPO".to_string()
}

fn default_production_prefix() -> String {
    "PMO".to_string()
}

fn default_calendar() -> WorkCalendar {
    WorkCalendar::fallback_calendar()
}

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// BOM 最大層級
    #[serde(default = "default_max_bom_depth")]
    pub max_bom_depth: u32,

    /// 工作日曆（預設 24/7，即以日曆天偏移）
    #[serde(default = "default_calendar")]
    pub calendar: WorkCalendar,

    /// 主檔缺少單位時使用的單位
    #[serde(default = "default_unit_of_measure")]
    pub default_unit_of_measure: String,

    /// 計劃訂單號流水號寬度
    #[serde(default = "default_order_number_width")]
    pub order_number_width: usize,

    /// 計劃採購單前綴
    #[serde(default = "default_purchase_prefix")]
    pub purchase_order_prefix: String,

    /// 計劃生產單前綴
    #[serde(default = "default_production_prefix")]
    pub production_order_prefix: String,
}

impl EngineConfig {
    /// 從 JSON 載入，缺少的欄位使用預設值
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// 建構器模式：設置 BOM 最大層級
    pub fn with_max_bom_depth(mut self, depth: u32) -> Self {
        self.max_bom_depth = depth;
        self
    }

    /// 建構器模式：設置工作日曆
    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bom_depth: default_max_bom_depth(),
            calendar: default_calendar(),
            default_unit_of_measure: default_unit_of_measure(),
            order_number_width: default_order_number_width(),
            purchase_order_prefix: default_purchase_prefix(),
            production_order_prefix: default_production_prefix(),
        }
    }
}
