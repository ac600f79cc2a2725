//! MRP 主計算器
//!
//! 依序執行 BOM 展開 → 淨需求 → 批量 → 計劃訂單，每個階段完成後才進入下一階段。

use mrp_core::{
    BomReader, Demand, EngineConfig, InventoryReader, LotConfigReader, MaterialReader,
    PlannedOrderStore, Result, RunContext, VendorReader,
};
use std::time::Instant;

use crate::explosion::BomExplosionEngine;
use crate::lot_sizing::LotSizingEngine;
use crate::netting::NettingEngine;
use crate::planned_order::PlannedOrderGenerator;
use crate::MrpRunResult;

/// MRP 執行器
///
/// `R` 同時提供所有讀取介面與計劃訂單寫入，通常是 `&Store` 或 `Arc<Store>`。
pub struct MrpRunner<R> {
    store: R,
    config: EngineConfig,
}

impl<R> MrpRunner<R>
where
    R: BomReader
        + InventoryReader
        + LotConfigReader
        + MaterialReader
        + VendorReader
        + PlannedOrderStore
        + Clone,
{
    /// 創建新的執行器（預設配置）
    pub fn new(store: R) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// 建構器模式：設置引擎配置
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 主 MRP 計算入口
    ///
    /// 每筆獨立需求各自展開，毛需求合併後只做一次淨算、批量與寫入。
    /// 任何致命錯誤都中止整次執行，不回傳部分結果。
    pub fn run(&self, ctx: &RunContext, demands: &[Demand]) -> Result<MrpRunResult> {
        let span = tracing::info_span!(
            "mrp_run",
            run_id = %ctx.run_id,
            tenant_id = %ctx.scope.tenant_id,
            facility_id = %ctx.scope.facility_id
        );
        let _guard = span.enter();

        tracing::info!("開始 MRP 計算：需求 {} 筆，基準日 {}", demands.len(), ctx.as_of);

        let start_time = Instant::now();
        let result = self.run_stages(ctx, demands);

        match &result {
            Ok(r) => {
                tracing::info!("MRP 計算完成，耗時 {:?}", start_time.elapsed());
                tracing::info!(
                    "毛需求 {} 筆，淨需求 {} 筆，計劃訂單 {} 筆，警告 {} 筆",
                    r.requirements.len(),
                    r.net_requirements.len(),
                    r.planned_orders.len(),
                    r.warnings.len()
                );
            }
            Err(err) => {
                tracing::error!(
                    retryable = err.is_retryable(),
                    "MRP 計算失敗：{}",
                    err.operator_summary()
                );
            }
        }

        result.map(|mut r| {
            r.calculation_time_ms = Some(start_time.elapsed().as_millis());
            r
        })
    }

    fn run_stages(&self, ctx: &RunContext, demands: &[Demand]) -> Result<MrpRunResult> {
        let mut result = MrpRunResult::empty(ctx.run_id);

        // Step 1: BOM 展開
        tracing::debug!("Step 1: BOM 展開");
        let explosion = BomExplosionEngine::new(self.store.clone(), self.config.clone());
        for demand in demands {
            let exploded = explosion.explode_demand(ctx, demand)?;
            result.requirements.extend(exploded.requirements);
            result.warnings.extend(exploded.warnings);
        }
        tracing::debug!("毛需求: {} 筆", result.requirements.len());

        // Step 2: 淨需求
        tracing::debug!("Step 2: 淨需求");
        let netting = NettingEngine::new(self.store.clone());
        result.net_requirements =
            netting.calculate_net_requirements(&ctx.scope, &result.requirements)?;
        tracing::debug!("淨需求: {} 筆", result.net_requirements.len());

        // Step 3: 批量
        tracing::debug!("Step 3: 批量規則");
        let lot_sizing = LotSizingEngine::new(self.store.clone());
        let sized = lot_sizing.size_requirements(&ctx.scope, &result.net_requirements)?;
        result.warnings.extend(sized.warnings);

        // Step 4: 計劃訂單
        tracing::debug!("Step 4: 計劃訂單");
        let generator =
            PlannedOrderGenerator::new(self.store.clone(), self.store.clone(), self.store.clone())
                .with_config(self.config.clone());
        result.planned_orders = generator.bulk_create_planned_orders(ctx, &sized.orders)?;

        Ok(result)
    }
}
