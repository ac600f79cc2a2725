//! 庫存模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 淨算時點的庫存快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevels {
    /// 現有庫存
    pub on_hand_quantity: Decimal,

    /// 已分配數量（鎖定）
    pub allocated_quantity: Decimal,
}

impl InventoryLevels {
    /// 創建新的庫存快照
    pub fn new(on_hand_quantity: Decimal, allocated_quantity: Decimal) -> Self {
        Self {
            on_hand_quantity,
            allocated_quantity,
        }
    }

    /// 可用庫存（現有 - 已分配），可能為負
    pub fn available(&self) -> Decimal {
        self.on_hand_quantity - self.allocated_quantity
    }
}
