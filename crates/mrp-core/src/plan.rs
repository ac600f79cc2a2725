//! 計劃訂單模型

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LotSizingMethod;
use crate::demand::PeggingChain;

/// 計劃訂單類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlannedOrderType {
    /// 採購
    Purchase,
    /// 生產
    Production,
}

impl PlannedOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannedOrderType::Purchase => "PURCHASE",
            PlannedOrderType::Production => "PRODUCTION",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PURCHASE" => Some(PlannedOrderType::Purchase),
            "PRODUCTION" => Some(PlannedOrderType::Production),
            _ => None,
        }
    }
}

/// 計劃訂單狀態（建立時一律為 Planned，其餘由下游確認/轉單流程更新）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlannedOrderStatus {
    Planned,
    Firmed,
    Converted,
    Cancelled,
}

impl PlannedOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannedOrderStatus::Planned => "PLANNED",
            PlannedOrderStatus::Firmed => "FIRMED",
            PlannedOrderStatus::Converted => "CONVERTED",
            PlannedOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PLANNED" => Some(PlannedOrderStatus::Planned),
            "FIRMED" => Some(PlannedOrderStatus::Firmed),
            "CONVERTED" => Some(PlannedOrderStatus::Converted),
            "CANCELLED" => Some(PlannedOrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// 批量計算後、尚未決定類型與日期的計劃訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOrderInput {
    pub material_id: String,
    pub material_code: String,

    /// 批量後的訂購數量
    pub quantity: Decimal,

    /// 批量前的淨需求
    pub net_quantity: Decimal,

    /// 需求日期
    pub required_date: NaiveDate,

    /// 實際套用的批量規則（含退回後的結果）
    pub applied_method: LotSizingMethod,

    pub pegging_chain: PeggingChain,
}

/// 已建立的計劃訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOrderResult {
    /// 計劃訂單ID
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub facility_id: Uuid,
    pub mrp_run_id: Uuid,

    /// 計劃訂單號，例如 PPO-202611-00001
    pub order_number: String,

    pub order_type: PlannedOrderType,

    pub material_id: String,
    pub material_code: String,

    pub quantity: Decimal,
    pub unit_of_measure: String,

    /// 需求日期（完成日期）
    pub required_date: NaiveDate,

    /// 下單日期（開始日期）
    pub order_date: NaiveDate,

    /// 供應商（採購）
    pub vendor_id: Option<String>,

    /// 工作中心（生產，尚未整合途程）
    pub work_center_id: Option<String>,

    pub estimated_unit_cost: Decimal,
    pub estimated_total_cost: Decimal,

    /// 主檔上的批量規則標籤
    pub lot_sizing_method: LotSizingMethod,

    pub status: PlannedOrderStatus,

    pub pegging_chain: PeggingChain,

    pub created_at: DateTime<Utc>,
}

impl PlannedOrderResult {
    /// 計算提前期（天數）
    pub fn lead_time_days(&self) -> i64 {
        (self.required_date - self.order_date).num_days()
    }

    /// 檢查是否為採購訂單
    pub fn is_purchase(&self) -> bool {
        self.order_type == PlannedOrderType::Purchase
    }

    /// 檢查是否為生產訂單
    pub fn is_production(&self) -> bool {
        self.order_type == PlannedOrderType::Production
    }
}
