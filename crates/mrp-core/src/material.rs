//! 物料主檔與供應商

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LotSizingMethod;

/// 物料主檔
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialMaster {
    pub material_id: String,
    pub material_code: String,

    /// 提前期（天）
    pub lead_time_days: i32,

    /// 安全提前期（天）
    pub safety_lead_time_days: i32,

    pub is_manufactured: bool,
    pub is_purchased: bool,
    pub is_phantom: bool,

    /// 主檔上記錄的批量規則（僅作記錄用途）
    pub lot_sizing_method: LotSizingMethod,

    pub standard_cost: Option<Decimal>,
    pub average_cost: Option<Decimal>,
    pub unit_of_measure: Option<String>,
}

impl MaterialMaster {
    /// 創建新的物料主檔（預設為採購件）
    pub fn new(material_id: impl Into<String>, lead_time_days: i32) -> Self {
        let material_id = material_id.into();
        Self {
            material_code: material_id.clone(),
            material_id,
            lead_time_days,
            safety_lead_time_days: 0,
            is_manufactured: false,
            is_purchased: true,
            is_phantom: false,
            lot_sizing_method: LotSizingMethod::LotForLot,
            standard_cost: None,
            average_cost: None,
            unit_of_measure: None,
        }
    }

    /// 建構器模式：設為自製件（不可採購）
    pub fn manufactured(mut self) -> Self {
        self.is_manufactured = true;
        self.is_purchased = false;
        self
    }

    /// 建構器模式：設置自製/採購旗標
    pub fn with_flags(mut self, is_manufactured: bool, is_purchased: bool) -> Self {
        self.is_manufactured = is_manufactured;
        self.is_purchased = is_purchased;
        self
    }

    /// 建構器模式：設置標準成本
    pub fn with_standard_cost(mut self, cost: Decimal) -> Self {
        self.standard_cost = Some(cost);
        self
    }

    /// 建構器模式：設置平均成本
    pub fn with_average_cost(mut self, cost: Decimal) -> Self {
        self.average_cost = Some(cost);
        self
    }

    /// 建構器模式：設置單位
    pub fn with_unit_of_measure(mut self, uom: impl Into<String>) -> Self {
        self.unit_of_measure = Some(uom.into());
        self
    }

    /// 建構器模式：設置批量規則
    pub fn with_lot_sizing_method(mut self, method: LotSizingMethod) -> Self {
        self.lot_sizing_method = method;
        self
    }

    /// 自製且不可採購才產生生產訂單
    pub fn is_production_item(&self) -> bool {
        self.is_manufactured && !self.is_purchased
    }

    /// 主檔成本：標準成本優先，其次平均成本
    pub fn fallback_unit_cost(&self) -> Option<Decimal> {
        self.standard_cost.or(self.average_cost)
    }
}

/// 供應商供貨資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSource {
    pub vendor_id: String,
    pub material_id: String,

    /// 供應商交期（天）
    pub lead_time_days: i32,

    /// 是否為首選供應商
    pub is_preferred: bool,
}

impl VendorSource {
    pub fn new(
        vendor_id: impl Into<String>,
        material_id: impl Into<String>,
        lead_time_days: i32,
    ) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            material_id: material_id.into(),
            lead_time_days,
            is_preferred: true,
        }
    }
}
