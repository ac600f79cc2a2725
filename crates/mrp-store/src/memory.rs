//! 記憶體資料存取
//!
//! 讀取忽略租戶/工廠範圍。計劃訂單寫入在暫存副本上進行，成功才替換，
//! 以此模擬交易回滾。

use chrono::NaiveDate;
use mrp_core::{
    BomComponent, BomReader, InventoryLevels, InventoryReader, LotConfigReader, LotSizingConfig,
    MaterialMaster, MaterialReader, MrpError, OnOrderItem, OrderSequenceKey, PlannedOrderResult,
    PlannedOrderSink, PlannedOrderStore, PlanningScope, Result, VendorReader, VendorSource,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// 查詢種類（用於驗證批次查詢次數）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Bom,
    InventoryLevels,
    ScheduledReceipts,
    LotConfigs,
    Material,
    PreferredVendors,
    VendorPrice,
}

/// 注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Bom,
    InventoryLevels,
    ScheduledReceipts,
    /// 庫存查詢逾時
    Timeout,
    LotConfigs,
    Material,
    Vendor,
    /// 交易內已寫入 n 筆後，下一筆寫入失敗
    InsertAfter(usize),
}

#[derive(Debug, Clone)]
struct BomRow {
    component: BomComponent,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
    is_active: bool,
}

impl BomRow {
    /// 有效期間含頭含尾
    fn is_effective(&self, as_of: NaiveDate) -> bool {
        self.is_active
            && self.effective_from.map_or(true, |from| from <= as_of)
            && self.effective_to.map_or(true, |to| as_of <= to)
    }
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    planned_orders: Vec<PlannedOrderResult>,
    sequences: HashMap<OrderSequenceKey, u32>,
}

/// 記憶體資料存取
#[derive(Debug, Default)]
pub struct InMemoryStore {
    boms: HashMap<String, Vec<BomRow>>,
    materials: HashMap<String, MaterialMaster>,
    inventory: HashMap<String, InventoryLevels>,
    receipts: HashMap<String, Vec<OnOrderItem>>,
    lot_configs: HashMap<String, LotSizingConfig>,
    vendors: HashMap<String, Vec<VendorSource>>,
    prices: HashMap<(String, String), Decimal>,
    failures: Mutex<Vec<FailurePoint>>,
    query_counts: Mutex<HashMap<QueryKind, usize>>,
    ledger: Mutex<Ledger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置父件的 BOM（全部有效且啟用）
    pub fn with_bom(mut self, parent_id: impl Into<String>, components: Vec<BomComponent>) -> Self {
        let rows = self.boms.entry(parent_id.into()).or_default();
        rows.extend(components.into_iter().map(|component| BomRow {
            component,
            effective_from: None,
            effective_to: None,
            is_active: true,
        }));
        self
    }

    /// 建構器模式：加入帶有效期間與啟用旗標的 BOM 行
    pub fn with_dated_bom_row(
        mut self,
        parent_id: impl Into<String>,
        component: BomComponent,
        effective_from: Option<NaiveDate>,
        effective_to: Option<NaiveDate>,
        is_active: bool,
    ) -> Self {
        self.boms.entry(parent_id.into()).or_default().push(BomRow {
            component,
            effective_from,
            effective_to,
            is_active,
        });
        self
    }

    pub fn with_material(mut self, material: MaterialMaster) -> Self {
        self.materials.insert(material.material_id.clone(), material);
        self
    }

    pub fn with_inventory(mut self, material_id: impl Into<String>, levels: InventoryLevels) -> Self {
        self.inventory.insert(material_id.into(), levels);
        self
    }

    pub fn with_receipt(mut self, receipt: OnOrderItem) -> Self {
        self.receipts
            .entry(receipt.material_id.clone())
            .or_default()
            .push(receipt);
        self
    }

    pub fn with_lot_config(mut self, config: LotSizingConfig) -> Self {
        self.lot_configs.insert(config.material_id.clone(), config);
        self
    }

    /// 建構器模式：加入供應商與議價（可無）
    pub fn with_vendor(mut self, vendor: VendorSource, price: Option<Decimal>) -> Self {
        if let Some(price) = price {
            self.prices
                .insert((vendor.vendor_id.clone(), vendor.material_id.clone()), price);
        }
        self.vendors
            .entry(vendor.material_id.clone())
            .or_default()
            .push(vendor);
        self
    }

    /// 建構器模式：注入故障
    pub fn with_failure(self, failure: FailurePoint) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure);
        }
        self
    }

    /// 清除所有注入的故障
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    /// 某種查詢被呼叫的次數
    pub fn query_count(&self, kind: QueryKind) -> usize {
        self.query_counts
            .lock()
            .map(|counts| counts.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// 已提交的計劃訂單
    pub fn planned_orders(&self) -> Vec<PlannedOrderResult> {
        self.ledger
            .lock()
            .map(|ledger| ledger.planned_orders.clone())
            .unwrap_or_default()
    }

    fn record(&self, kind: QueryKind) {
        if let Ok(mut counts) = self.query_counts.lock() {
            *counts.entry(kind).or_insert(0) += 1;
        }
    }

    fn has_failure(&self, failure: FailurePoint) -> bool {
        self.failures
            .lock()
            .map(|failures| failures.contains(&failure))
            .unwrap_or(false)
    }

    fn insert_limit(&self) -> Option<usize> {
        self.failures.lock().ok().and_then(|failures| {
            failures.iter().find_map(|f| match f {
                FailurePoint::InsertAfter(n) => Some(*n),
                _ => None,
            })
        })
    }

    fn check(&self, kind: QueryKind, failure: FailurePoint, operation: &str) -> Result<()> {
        self.record(kind);
        if self.has_failure(failure) {
            return Err(MrpError::data_access(operation, "injected failure"));
        }
        Ok(())
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|e| MrpError::data_access("planned_orders", e.to_string()))
    }
}

impl BomReader for InMemoryStore {
    fn active_components(
        &self,
        _scope: &PlanningScope,
        product_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<BomComponent>> {
        self.check(QueryKind::Bom, FailurePoint::Bom, "bom_components")?;

        let mut components: Vec<BomComponent> = self
            .boms
            .get(product_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.is_effective(as_of))
                    .map(|row| row.component.clone())
                    .collect()
            })
            .unwrap_or_default();
        components.sort_by_key(|c| c.sequence_number);
        Ok(components)
    }
}

impl InventoryReader for InMemoryStore {
    fn inventory_levels(
        &self,
        _scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, InventoryLevels>> {
        self.check(
            QueryKind::InventoryLevels,
            FailurePoint::InventoryLevels,
            "inventory_levels",
        )?;
        if self.has_failure(FailurePoint::Timeout) {
            return Err(MrpError::DatabaseTimeout {
                message: "inventory_levels timed out".to_string(),
            });
        }

        Ok(material_ids
            .iter()
            .filter_map(|id| self.inventory.get(id).map(|levels| (id.clone(), *levels)))
            .collect())
    }

    fn scheduled_receipts(
        &self,
        _scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, Vec<OnOrderItem>>> {
        self.check(
            QueryKind::ScheduledReceipts,
            FailurePoint::ScheduledReceipts,
            "scheduled_receipts",
        )?;

        Ok(material_ids
            .iter()
            .filter_map(|id| {
                self.receipts.get(id).map(|items| {
                    let mut items = items.clone();
                    items.sort_by_key(|r| r.due_date);
                    (id.clone(), items)
                })
            })
            .collect())
    }
}

impl LotConfigReader for InMemoryStore {
    fn lot_sizing_configs(
        &self,
        _scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, LotSizingConfig>> {
        self.check(
            QueryKind::LotConfigs,
            FailurePoint::LotConfigs,
            "lot_sizing_configs",
        )?;

        Ok(material_ids
            .iter()
            .filter_map(|id| self.lot_configs.get(id).map(|c| (id.clone(), c.clone())))
            .collect())
    }
}

impl MaterialReader for InMemoryStore {
    fn material(&self, _scope: &PlanningScope, material_id: &str) -> Result<Option<MaterialMaster>> {
        self.check(QueryKind::Material, FailurePoint::Material, "materials")?;
        Ok(self.materials.get(material_id).cloned())
    }
}

impl VendorReader for InMemoryStore {
    fn preferred_vendors(
        &self,
        _scope: &PlanningScope,
        material_id: &str,
    ) -> Result<Vec<VendorSource>> {
        self.check(
            QueryKind::PreferredVendors,
            FailurePoint::Vendor,
            "vendor_materials",
        )?;
        Ok(self.vendors.get(material_id).cloned().unwrap_or_default())
    }

    fn vendor_price(
        &self,
        _scope: &PlanningScope,
        vendor_id: &str,
        material_id: &str,
    ) -> Result<Option<Decimal>> {
        self.check(QueryKind::VendorPrice, FailurePoint::Vendor, "vendor_materials")?;
        Ok(self
            .prices
            .get(&(vendor_id.to_string(), material_id.to_string()))
            .copied())
    }
}

struct MemorySink<'a> {
    staged: &'a mut Ledger,
    inserted: usize,
    insert_limit: Option<usize>,
}

impl PlannedOrderSink for MemorySink<'_> {
    fn next_order_sequence(&mut self, key: &OrderSequenceKey) -> Result<u32> {
        let sequence = self.staged.sequences.entry(*key).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    fn insert_planned_order(&mut self, order: &PlannedOrderResult) -> Result<()> {
        if self.insert_limit == Some(self.inserted) {
            return Err(MrpError::data_access("planned_orders", "injected failure"));
        }
        self.staged.planned_orders.push(order.clone());
        self.inserted += 1;
        Ok(())
    }
}

impl PlannedOrderStore for InMemoryStore {
    fn in_transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn PlannedOrderSink) -> Result<()>,
    ) -> Result<()> {
        let insert_limit = self.insert_limit();
        let mut ledger = self.lock_ledger()?;
        let mut staged = ledger.clone();

        let mut sink = MemorySink {
            staged: &mut staged,
            inserted: 0,
            insert_limit,
        };
        work(&mut sink)?;

        *ledger = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{PlannedOrderType, ReceiptType};
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn scope() -> PlanningScope {
        PlanningScope::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_bom_rows_sorted_and_filtered() {
        let store = InMemoryStore::new()
            .with_bom(
                "P",
                vec![
                    BomComponent::new("B", Decimal::ONE).with_sequence(30),
                    BomComponent::new("A", Decimal::ONE).with_sequence(20),
                ],
            )
            .with_dated_bom_row(
                "P",
                BomComponent::new("FUTURE", Decimal::ONE),
                Some(day(15)),
                None,
                true,
            );

        let names: Vec<_> = store
            .active_components(&scope(), "P", day(1))
            .unwrap()
            .into_iter()
            .map(|c| c.material_id)
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        let on_start = store.active_components(&scope(), "P", day(15)).unwrap();
        assert_eq!(on_start.len(), 3);
        assert_eq!(store.query_count(QueryKind::Bom), 2);
    }

    #[test]
    fn test_receipts_sorted_by_due_date() {
        let store = InMemoryStore::new()
            .with_receipt(OnOrderItem::new(
                "C",
                Decimal::ONE,
                day(9),
                ReceiptType::ProductionOrder,
                "MO-1",
            ))
            .with_receipt(OnOrderItem::new(
                "C",
                Decimal::ONE,
                day(3),
                ReceiptType::PurchaseOrder,
                "PO-1",
            ));

        let receipts = store
            .scheduled_receipts(&scope(), &["C".to_string(), "D".to_string()])
            .unwrap();

        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts["C"][0].order_id, "PO-1");
    }

    #[test]
    fn test_transaction_commits_and_rolls_back() {
        let store = InMemoryStore::new();
        let key = OrderSequenceKey {
            tenant_id: Uuid::nil(),
            order_type: PlannedOrderType::Purchase,
            year: 2025,
            month: 11,
        };

        store
            .in_transaction(&mut |sink: &mut dyn PlannedOrderSink| {
                assert_eq!(sink.next_order_sequence(&key)?, 1);
                assert_eq!(sink.next_order_sequence(&key)?, 2);
                Ok(())
            })
            .unwrap();

        let err = store.in_transaction(&mut |sink: &mut dyn PlannedOrderSink| {
            assert_eq!(sink.next_order_sequence(&key)?, 3);
            Err(MrpError::data_access("test", "abort"))
        });
        assert!(err.is_err());

        store
            .in_transaction(&mut |sink: &mut dyn PlannedOrderSink| {
                assert_eq!(sink.next_order_sequence(&key)?, 3);
                Ok(())
            })
            .unwrap();
    }
}
