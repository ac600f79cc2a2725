//! 毛需求與淨需求

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demand::PeggingChain;

/// 毛需求（BOM 展開產生，每條 BOM 路徑一筆，不跨路徑合併）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    /// MRP 執行ID
    pub mrp_run_id: Uuid,

    /// 物料ID
    pub material_id: String,

    /// 物料編碼
    pub material_code: String,

    /// 毛需求數量（含損耗）
    pub gross_quantity: Decimal,

    /// 需求日期（已扣除提前期）
    pub required_date: NaiveDate,

    /// 需求來源（根需求）
    pub demand_source: String,

    /// 追溯鏈（根需求到父件）
    pub pegging_chain: PeggingChain,
}

impl MaterialRequirement {
    /// BOM 層級（根需求的直接子件為 1）
    pub fn bom_level(&self) -> usize {
        self.pegging_chain.len()
    }
}

/// 淨需求（只保留 net_quantity > 0 的項目）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetRequirement {
    /// 物料ID
    pub material_id: String,

    /// 物料編碼
    pub material_code: String,

    /// 毛需求
    pub gross_quantity: Decimal,

    /// 扣除前的預計庫存（已計入到期收貨）
    pub projected_on_hand: Decimal,

    /// 淨需求
    pub net_quantity: Decimal,

    /// 需求日期
    pub required_date: NaiveDate,

    /// 追溯鏈
    pub pegging_chain: PeggingChain,
}
