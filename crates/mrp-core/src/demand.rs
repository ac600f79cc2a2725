//! 需求模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 追溯鏈節點：(產品ID, 數量)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeggingEntry {
    pub product_id: String,
    pub quantity: Decimal,
}

impl PeggingEntry {
    pub fn new(product_id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// 追溯鏈：從根需求到目前節點的完整路徑
pub type PeggingChain = Vec<PeggingEntry>;

/// 獨立需求（MRP 的輸入，例如銷售訂單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    /// 需求ID
    pub id: Uuid,

    /// 產品ID
    pub product_id: String,

    /// 需求數量
    pub quantity: Decimal,

    /// 需求日期
    pub due_date: NaiveDate,

    /// 來源單據（如銷售訂單號）
    pub source_ref: Option<String>,
}

impl Demand {
    /// 創建新的需求
    pub fn new(product_id: impl Into<String>, quantity: Decimal, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product_id.into(),
            quantity,
            due_date,
            source_ref: None,
        }
    }

    /// 建構器模式：設置來源單據
    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// 需求來源描述，用於 MaterialRequirement.demand_source
    pub fn source_label(&self) -> String {
        self.source_ref
            .clone()
            .unwrap_or_else(|| format!("DEMAND:{}", self.id))
    }
}

/// 展開過程中的佇列節點（僅存在於單次展開內）
#[derive(Debug, Clone)]
pub struct DemandNode {
    pub product_id: String,
    pub quantity: Decimal,
    pub due_date: NaiveDate,
    pub level: u32,
    pub pegging_chain: PeggingChain,
}

impl DemandNode {
    /// 根節點：層級 0，追溯鏈為空
    pub fn root(product_id: impl Into<String>, quantity: Decimal, due_date: NaiveDate) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            due_date,
            level: 0,
            pegging_chain: Vec::new(),
        }
    }

    /// 訪問鍵 (產品ID, 層級)
    pub fn visit_key(&self) -> (String, u32) {
        (self.product_id.clone(), self.level)
    }

    /// 子件使用的追溯鏈：目前鏈 + 本節點
    pub fn extended_chain(&self) -> PeggingChain {
        let mut chain = self.pegging_chain.clone();
        chain.push(PeggingEntry::new(self.product_id.clone(), self.quantity));
        chain
    }

    /// 本節點的產品是否已出現在祖先路徑上
    pub fn is_own_ancestor(&self) -> bool {
        self.pegging_chain
            .iter()
            .any(|entry| entry.product_id == self.product_id)
    }
}
