//! 預計收貨模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 預計收貨來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptType {
    /// 未結採購訂單行
    PurchaseOrder,
    /// 進行中的生產工單
    ProductionOrder,
}

/// 在途訂單（未來預計收貨）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnOrderItem {
    /// 物料ID
    pub material_id: String,

    /// 預計收貨數量
    pub quantity: Decimal,

    /// 預計到貨日
    pub due_date: NaiveDate,

    /// 來源類型
    pub order_type: ReceiptType,

    /// 來源單據ID
    pub order_id: String,
}

impl OnOrderItem {
    /// 創建新的在途訂單
    pub fn new(
        material_id: impl Into<String>,
        quantity: Decimal,
        due_date: NaiveDate,
        order_type: ReceiptType,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            material_id: material_id.into(),
            quantity,
            due_date,
            order_type,
            order_id: order_id.into(),
        }
    }
}
