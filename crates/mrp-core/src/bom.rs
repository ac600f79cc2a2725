//! BOM 子件模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// BOM 子件（主檔資料，唯讀）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    /// 子件物料ID
    pub material_id: String,

    /// 子件物料編碼
    pub material_code: String,

    /// 每個父件的用量
    pub quantity_per_parent: Decimal,

    /// 損耗率（百分比，5 表示 5%）
    pub scrap_percentage: Decimal,

    /// 提前期（天）
    pub lead_time_days: i32,

    /// 安全提前期（天）
    pub safety_lead_time_days: i32,

    /// 是否自製
    pub is_manufactured: bool,

    /// 是否為虛擬件
    pub is_phantom: bool,

    /// 順序號
    pub sequence_number: i32,
}

impl BomComponent {
    /// 創建新的 BOM 子件（採購件，無損耗、無提前期）
    pub fn new(material_id: impl Into<String>, quantity_per_parent: Decimal) -> Self {
        let material_id = material_id.into();
        Self {
            material_code: material_id.clone(),
            material_id,
            quantity_per_parent,
            scrap_percentage: Decimal::ZERO,
            lead_time_days: 0,
            safety_lead_time_days: 0,
            is_manufactured: false,
            is_phantom: false,
            sequence_number: 10,
        }
    }

    /// 建構器模式：設置物料編碼
    pub fn with_material_code(mut self, code: impl Into<String>) -> Self {
        self.material_code = code.into();
        self
    }

    /// 建構器模式：設置損耗率
    pub fn with_scrap_percentage(mut self, scrap: Decimal) -> Self {
        self.scrap_percentage = scrap;
        self
    }

    /// 建構器模式：設置提前期
    pub fn with_lead_time(mut self, lead_time_days: i32, safety_lead_time_days: i32) -> Self {
        self.lead_time_days = lead_time_days;
        self.safety_lead_time_days = safety_lead_time_days;
        self
    }

    /// 建構器模式：設為自製件
    pub fn manufactured(mut self) -> Self {
        self.is_manufactured = true;
        self
    }

    /// 建構器模式：設為虛擬件
    pub fn phantom(mut self) -> Self {
        self.is_phantom = true;
        self
    }

    /// 建構器模式：設置順序號
    pub fn with_sequence(mut self, sequence_number: i32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// 含損耗的毛需求：父件數量 × 用量 × (1 + 損耗% / 100)
    ///
    /// 超出 `Decimal` 範圍時回傳 `None`
    pub fn gross_quantity(&self, parent_quantity: Decimal) -> Option<Decimal> {
        let scrap_factor = self
            .scrap_percentage
            .checked_div(Decimal::ONE_HUNDRED)
            .and_then(|ratio| Decimal::ONE.checked_add(ratio))?;
        parent_quantity
            .checked_mul(self.quantity_per_parent)?
            .checked_mul(scrap_factor)
    }

    /// 是否需要繼續展開（自製且非虛擬件）
    pub fn is_explodable(&self) -> bool {
        self.is_manufactured && !self.is_phantom
    }
}
