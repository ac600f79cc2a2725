//! # MRP Calculation Engine
//!
//! 核心 MRP 計算引擎：BOM 展開 → 淨需求 → 批量 → 計劃訂單

pub mod calculator;
pub mod explosion;
pub mod lead_time;
pub mod lot_sizing;
pub mod netting;
pub mod planned_order;

// Re-export 主要類型
pub use calculator::MrpRunner;
pub use explosion::{BomExplosion, BomExplosionEngine};
pub use lot_sizing::{LotSizingEngine, LotSizingOutcome};
pub use netting::NettingEngine;
pub use planned_order::PlannedOrderGenerator;

use mrp_core::{ErrorKind, MaterialRequirement, MrpError, NetRequirement, PlannedOrderResult};
use uuid::Uuid;

/// MRP 執行結果
#[derive(Debug, Clone)]
pub struct MrpRunResult {
    /// MRP 執行ID
    pub run_id: Uuid,

    /// 毛需求
    pub requirements: Vec<MaterialRequirement>,

    /// 淨需求
    pub net_requirements: Vec<NetRequirement>,

    /// 已寫入的計劃訂單
    pub planned_orders: Vec<PlannedOrderResult>,

    /// 警告信息
    pub warnings: Vec<MrpWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl MrpRunResult {
    /// 創建空的計算結果
    pub fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            requirements: Vec::new(),
            net_requirements: Vec::new(),
            planned_orders: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: MrpWarning) {
        self.warnings.push(warning);
    }
}

/// MRP 警告（可恢復的異常，不中止執行）
#[derive(Debug, Clone, PartialEq)]
pub struct MrpWarning {
    pub component_id: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub kind: Option<ErrorKind>,
}

impl MrpWarning {
    pub fn new(component_id: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            component_id,
            message,
            severity,
            kind: None,
        }
    }

    pub fn info(component_id: String, message: String) -> Self {
        Self::new(component_id, message, WarningSeverity::Info)
    }

    pub fn warning(component_id: String, message: String) -> Self {
        Self::new(component_id, message, WarningSeverity::Warning)
    }

    /// 由錯誤轉成警告；不可恢復的錯誤標為 Error
    pub fn from_error(error: &MrpError) -> Self {
        let severity = if error.is_recoverable() {
            WarningSeverity::Warning
        } else {
            WarningSeverity::Error
        };
        Self {
            component_id: error
                .product_id()
                .or_else(|| error.material_id())
                .unwrap_or_default()
                .to_string(),
            message: error.to_string(),
            severity,
            kind: Some(error.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
