//! 計劃執行範圍

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 租戶與工廠範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanningScope {
    pub tenant_id: Uuid,
    pub facility_id: Uuid,
}

impl PlanningScope {
    pub fn new(tenant_id: Uuid, facility_id: Uuid) -> Self {
        Self {
            tenant_id,
            facility_id,
        }
    }
}

/// 單次 MRP 執行的上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// MRP 執行ID
    pub run_id: Uuid,

    /// 租戶與工廠
    pub scope: PlanningScope,

    /// 執行基準日（BOM 生效日篩選、計劃訂單號年月）
    pub as_of: NaiveDate,
}

impl RunContext {
    /// 創建新的執行上下文，自動產生 run_id
    pub fn new(scope: PlanningScope, as_of: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scope,
            as_of,
        }
    }

    /// 建構器模式：指定 run_id
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }
}
