//! 計劃訂單生成
//!
//! 先逐筆查詢主檔、供應商與價格，全部成功後才在單一交易中編號並寫入。
//! 任一筆失敗則整批回滾，包含訂單號流水號。

use chrono::{Datelike, NaiveDate, Utc};
use mrp_core::{
    EngineConfig, LotSizingMethod, MaterialMaster, MaterialReader, MrpError, OrderSequenceKey,
    PlannedOrderInput, PlannedOrderResult, PlannedOrderSink, PlannedOrderStatus, PlannedOrderStore,
    PlannedOrderType, Result, RunContext, VendorReader,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::lead_time::LeadTimeCalculator;

/// 寫入前已解析的訂單屬性
#[derive(Debug, Clone)]
struct ResolvedOrder {
    order_type: PlannedOrderType,
    order_date: NaiveDate,
    vendor_id: Option<String>,
    unit_cost: Decimal,
    total_cost: Decimal,
    unit_of_measure: String,
    lot_sizing_method: LotSizingMethod,
}

/// 計劃訂單生成器
pub struct PlannedOrderGenerator<M, V, S> {
    materials: M,
    vendors: V,
    store: S,
    config: EngineConfig,
}

impl<M, V, S> PlannedOrderGenerator<M, V, S>
where
    M: MaterialReader,
    V: VendorReader,
    S: PlannedOrderStore,
{
    /// 創建新的生成器（預設配置）
    pub fn new(materials: M, vendors: V, store: S) -> Self {
        Self {
            materials,
            vendors,
            store,
            config: EngineConfig::default(),
        }
    }

    /// 建構器模式：設置引擎配置
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 批次建立計劃訂單（全有或全無）
    pub fn bulk_create_planned_orders(
        &self,
        ctx: &RunContext,
        inputs: &[PlannedOrderInput],
    ) -> Result<Vec<PlannedOrderResult>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("開始建立計劃訂單：{} 筆", inputs.len());

        // Step 1: 逐筆解析（每筆各自查詢）
        let resolved = inputs
            .iter()
            .map(|input| self.resolve(ctx, input))
            .collect::<Result<Vec<_>>>()?;

        // Step 2: 單一交易內編號並寫入
        let mut created = Vec::with_capacity(inputs.len());
        self.store
            .in_transaction(&mut |sink: &mut dyn PlannedOrderSink| -> Result<()> {
                created.clear();
                for (input, order) in inputs.iter().zip(&resolved) {
                    let key = OrderSequenceKey {
                        tenant_id: ctx.scope.tenant_id,
                        order_type: order.order_type,
                        year: ctx.as_of.year(),
                        month: ctx.as_of.month(),
                    };
                    let sequence = sink.next_order_sequence(&key)?;
                    let result = self.build(ctx, input, order, self.order_number(&key, sequence));
                    sink.insert_planned_order(&result)?;
                    created.push(result);
                }
                Ok(())
            })?;

        tracing::info!("計劃訂單建立完成：{} 筆", created.len());

        Ok(created)
    }

    fn resolve(&self, ctx: &RunContext, input: &PlannedOrderInput) -> Result<ResolvedOrder> {
        let scope = &ctx.scope;
        let master = self.materials.material(scope, &input.material_id)?;
        if master.is_none() {
            tracing::warn!(
                "物料 {} 沒有主檔，以採購件、提前期 0 建立計劃訂單",
                input.material_id
            );
        }

        let order_type = match &master {
            Some(m) if m.is_production_item() => PlannedOrderType::Production,
            _ => PlannedOrderType::Purchase,
        };

        let lead_time_days = master.as_ref().map_or(0, |m| m.lead_time_days);
        let order_date = LeadTimeCalculator::calculate_order_date(
            &input.material_id,
            input.required_date,
            lead_time_days,
            &self.config.calendar,
        )?;

        let vendor_id = match order_type {
            PlannedOrderType::Purchase => self.preferred_vendor(ctx, &input.material_id)?,
            PlannedOrderType::Production => {
                // 尚未整合途程，工作中心留空
                tracing::debug!("物料 {} 為生產訂單，不指定工作中心", input.material_id);
                None
            }
        };

        let unit_cost = self.unit_cost(ctx, &input.material_id, vendor_id.as_deref(), master.as_ref())?;
        let total_cost = unit_cost.checked_mul(input.quantity).ok_or_else(|| {
            MrpError::InvalidMasterData {
                material_id: input.material_id.clone(),
                message: format!("預估總成本超出數值範圍（單價 {} × 數量 {}）", unit_cost, input.quantity),
            }
        })?;

        let unit_of_measure = master
            .as_ref()
            .and_then(|m| m.unit_of_measure.clone())
            .unwrap_or_else(|| self.config.default_unit_of_measure.clone());

        let lot_sizing_method = master
            .as_ref()
            .map_or(LotSizingMethod::LotForLot, |m| m.lot_sizing_method);

        Ok(ResolvedOrder {
            order_type,
            order_date,
            vendor_id,
            unit_cost,
            total_cost,
            unit_of_measure,
            lot_sizing_method,
        })
    }

    /// 首選供應商中交期最短者
    fn preferred_vendor(&self, ctx: &RunContext, material_id: &str) -> Result<Option<String>> {
        let vendors = self.vendors.preferred_vendors(&ctx.scope, material_id)?;
        Ok(vendors
            .into_iter()
            .filter(|v| v.is_preferred)
            .min_by_key(|v| v.lead_time_days)
            .map(|v| v.vendor_id))
    }

    /// 單價：供應商議價 → 標準成本 → 平均成本 → 0
    fn unit_cost(
        &self,
        ctx: &RunContext,
        material_id: &str,
        vendor_id: Option<&str>,
        master: Option<&MaterialMaster>,
    ) -> Result<Decimal> {
        if let Some(vendor_id) = vendor_id {
            if let Some(price) = self.vendors.vendor_price(&ctx.scope, vendor_id, material_id)? {
                return Ok(price);
            }
        }

        Ok(master
            .and_then(MaterialMaster::fallback_unit_cost)
            .unwrap_or(Decimal::ZERO))
    }

    /// 例如 PPO-202511-00001
    fn order_number(&self, key: &OrderSequenceKey, sequence: u32) -> String {
        let prefix = match key.order_type {
            PlannedOrderType::Purchase => &self.config.purchase_order_prefix,
            PlannedOrderType::Production => &self.config.production_order_prefix,
        };
        format!(
            "{}-{:04}{:02}-{:0width$}",
            prefix,
            key.year,
            key.month,
            sequence,
            width = self.config.order_number_width
        )
    }

    fn build(
        &self,
        ctx: &RunContext,
        input: &PlannedOrderInput,
        order: &ResolvedOrder,
        order_number: String,
    ) -> PlannedOrderResult {
        PlannedOrderResult {
            id: Uuid::new_v4(),
            tenant_id: ctx.scope.tenant_id,
            facility_id: ctx.scope.facility_id,
            mrp_run_id: ctx.run_id,
            order_number,
            order_type: order.order_type,
            material_id: input.material_id.clone(),
            material_code: input.material_code.clone(),
            quantity: input.quantity,
            unit_of_measure: order.unit_of_measure.clone(),
            required_date: input.required_date,
            order_date: order.order_date,
            vendor_id: order.vendor_id.clone(),
            work_center_id: None,
            estimated_unit_cost: order.unit_cost,
            estimated_total_cost: order.total_cost,
            lot_sizing_method: order.lot_sizing_method,
            status: PlannedOrderStatus::Planned,
            pegging_chain: input.pegging_chain.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{ErrorKind, PeggingEntry, PlanningScope, VendorSource};
    use mrp_store::{FailurePoint, InMemoryStore};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn ctx() -> RunContext {
        RunContext::new(PlanningScope::new(Uuid::new_v4(), Uuid::new_v4()), day(1))
    }

    fn input(material_id: &str, quantity: i64, required: NaiveDate) -> PlannedOrderInput {
        PlannedOrderInput {
            material_id: material_id.to_string(),
            material_code: material_id.to_string(),
            quantity: Decimal::from(quantity),
            net_quantity: Decimal::from(quantity),
            required_date: required,
            applied_method: LotSizingMethod::LotForLot,
            pegging_chain: vec![PeggingEntry::new("P", Decimal::from(10))],
        }
    }

    fn generator(
        store: &InMemoryStore,
    ) -> PlannedOrderGenerator<&InMemoryStore, &InMemoryStore, &InMemoryStore> {
        PlannedOrderGenerator::new(store, store, store)
    }

    #[test]
    fn test_purchase_order_with_fastest_preferred_vendor() {
        let store = InMemoryStore::new()
            .with_material(
                MaterialMaster::new("C", 5)
                    .with_standard_cost(Decimal::from(3))
                    .with_unit_of_measure("PCS")
                    .with_lot_sizing_method(LotSizingMethod::FixedOrderQuantity),
            )
            .with_vendor(VendorSource::new("V-SLOW", "C", 10), Some(Decimal::from(2)))
            .with_vendor(VendorSource::new("V-FAST", "C", 3), Some(Decimal::new(25, 1)));
        let ctx = ctx();

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx, &[input("C", 25, day(25))])
            .unwrap();

        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert!(order.is_purchase());
        assert_eq!(order.order_number, "PPO-202511-00001");
        assert_eq!(order.order_date, day(20));
        assert_eq!(order.lead_time_days(), 5);
        assert_eq!(order.vendor_id.as_deref(), Some("V-FAST"));
        assert_eq!(order.work_center_id, None);
        assert_eq!(order.estimated_unit_cost, Decimal::new(25, 1));
        assert_eq!(order.estimated_total_cost, Decimal::new(625, 1));
        assert_eq!(order.unit_of_measure, "PCS");
        assert_eq!(order.lot_sizing_method, LotSizingMethod::FixedOrderQuantity);
        assert_eq!(order.status, PlannedOrderStatus::Planned);
        assert_eq!(order.mrp_run_id, ctx.run_id);
        assert_eq!(order.tenant_id, ctx.scope.tenant_id);
        assert_eq!(order.pegging_chain.len(), 1);

        assert_eq!(store.planned_orders(), orders);
    }

    #[test]
    fn test_non_preferred_vendor_is_ignored() {
        let mut backup = VendorSource::new("V-BACKUP", "C", 1);
        backup.is_preferred = false;
        let store = InMemoryStore::new()
            .with_material(MaterialMaster::new("C", 5).with_average_cost(Decimal::from(4)))
            .with_vendor(backup, Some(Decimal::ONE));

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("C", 10, day(25))])
            .unwrap();

        assert_eq!(orders[0].vendor_id, None);
        assert_eq!(orders[0].estimated_unit_cost, Decimal::from(4));
        assert_eq!(orders[0].estimated_total_cost, Decimal::from(40));
    }

    #[test]
    fn test_vendor_without_price_uses_standard_cost() {
        let store = InMemoryStore::new()
            .with_material(
                MaterialMaster::new("C", 0)
                    .with_standard_cost(Decimal::from(7))
                    .with_average_cost(Decimal::from(9)),
            )
            .with_vendor(VendorSource::new("V1", "C", 2), None);

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("C", 2, day(25))])
            .unwrap();

        assert_eq!(orders[0].vendor_id.as_deref(), Some("V1"));
        assert_eq!(orders[0].estimated_unit_cost, Decimal::from(7));
        assert_eq!(orders[0].order_date, day(25));
    }

    #[test]
    fn test_production_order_for_manufactured_item() {
        let store = InMemoryStore::new()
            .with_material(
                MaterialMaster::new("SUB", 4)
                    .manufactured()
                    .with_standard_cost(Decimal::from(12)),
            )
            .with_vendor(VendorSource::new("V1", "SUB", 1), Some(Decimal::ONE));

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("SUB", 3, day(20))])
            .unwrap();

        let order = &orders[0];
        assert!(order.is_production());
        assert_eq!(order.order_number, "PMO-202511-00001");
        assert_eq!(order.order_date, day(16));
        assert_eq!(order.vendor_id, None);
        assert_eq!(order.work_center_id, None);
        assert_eq!(order.estimated_total_cost, Decimal::from(36));
    }

    #[test]
    fn test_manufactured_and_purchasable_is_purchase() {
        let store = InMemoryStore::new()
            .with_material(MaterialMaster::new("M", 1).with_flags(true, true));

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("M", 1, day(10))])
            .unwrap();

        assert_eq!(orders[0].order_type, PlannedOrderType::Purchase);
    }

    #[test]
    fn test_numbering_is_per_order_type_and_monotonic() {
        let store = InMemoryStore::new()
            .with_material(MaterialMaster::new("BUY", 1))
            .with_material(MaterialMaster::new("MAKE", 1).manufactured());
        let generator = generator(&store);
        let ctx = ctx();

        let orders = generator
            .bulk_create_planned_orders(
                &ctx,
                &[
                    input("BUY", 1, day(10)),
                    input("MAKE", 1, day(10)),
                    input("BUY", 1, day(12)),
                ],
            )
            .unwrap();

        let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["PPO-202511-00001", "PMO-202511-00001", "PPO-202511-00002"]
        );

        let next = generator
            .bulk_create_planned_orders(&ctx, &[input("BUY", 1, day(15))])
            .unwrap();
        assert_eq!(next[0].order_number, "PPO-202511-00003");
    }

    #[test]
    fn test_missing_master_defaults_to_purchase() {
        let store = InMemoryStore::new();

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("GHOST", 4, day(9))])
            .unwrap();

        let order = &orders[0];
        assert!(order.is_purchase());
        assert_eq!(order.order_date, day(9));
        assert_eq!(order.estimated_unit_cost, Decimal::ZERO);
        assert_eq!(order.unit_of_measure, "EA");
        assert_eq!(order.lot_sizing_method, LotSizingMethod::LotForLot);
    }

    #[test]
    fn test_custom_prefix_and_width() {
        let store = InMemoryStore::new();
        let mut config = EngineConfig::default();
        config.purchase_order_prefix = "PO".to_string();
        config.order_number_width = 3;

        let orders = generator(&store)
            .with_config(config)
            .bulk_create_planned_orders(&ctx(), &[input("C", 1, day(9))])
            .unwrap();

        assert_eq!(orders[0].order_number, "PO-202511-001");
    }

    #[test]
    fn test_total_cost_overflow_writes_nothing() {
        let store = InMemoryStore::new()
            .with_material(MaterialMaster::new("C", 0).with_standard_cost(Decimal::MAX));
        let mut order = input("C", 1, day(9));
        order.quantity = Decimal::from(2);

        let err = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("OK", 1, day(9)), order])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidMasterData);
        assert_eq!(err.material_id(), Some("C"));
        assert!(store.planned_orders().is_empty());
    }

    #[test]
    fn test_insert_failure_rolls_back_whole_batch() {
        let store = InMemoryStore::new().with_failure(FailurePoint::InsertAfter(2));
        let ctx = ctx();

        let err = generator(&store)
            .bulk_create_planned_orders(
                &ctx,
                &[input("A", 1, day(9)), input("B", 1, day(9)), input("C", 1, day(9))],
            )
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(store.planned_orders().is_empty());

        // 流水號也一併回滾
        store.clear_failures();
        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx, &[input("A", 1, day(9))])
            .unwrap();
        assert_eq!(orders[0].order_number, "PPO-202511-00001");
    }

    #[test]
    fn test_negative_master_lead_time_writes_nothing() {
        let store = InMemoryStore::new()
            .with_material(MaterialMaster::new("OK", 1))
            .with_material(MaterialMaster::new("BAD", -3));

        let err = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("OK", 1, day(9)), input("BAD", 1, day(9))])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidLeadTime);
        assert_eq!(err.material_id(), Some("BAD"));
        assert!(store.planned_orders().is_empty());
    }

    #[test]
    fn test_lookup_failure_aborts() {
        let store = InMemoryStore::new().with_failure(FailurePoint::Material);

        let err = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[input("A", 1, day(9))])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataAccessFailed);
        assert!(store.planned_orders().is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let store = InMemoryStore::new().with_failure(FailurePoint::InsertAfter(0));

        let orders = generator(&store)
            .bulk_create_planned_orders(&ctx(), &[])
            .unwrap();

        assert!(orders.is_empty());
    }
}
