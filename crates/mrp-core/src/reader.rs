//! 資料存取介面
//!
//! 每個引擎只依賴它需要的窄介面，方便以記憶體實作替換。
//! 實作者負責在邊界把資料列解析成具型別的紀錄。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::bom::BomComponent;
use crate::config::LotSizingConfig;
use crate::inventory::InventoryLevels;
use crate::material::{MaterialMaster, VendorSource};
use crate::plan::{PlannedOrderResult, PlannedOrderType};
use crate::run::PlanningScope;
use crate::supply::OnOrderItem;
use crate::Result;

/// BOM 讀取
pub trait BomReader {
    /// 父件在 `as_of` 當天有效且啟用的子件，依順序號排列
    fn active_components(
        &self,
        scope: &PlanningScope,
        product_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<BomComponent>>;
}

/// 庫存與預計收貨讀取（批次查詢）
pub trait InventoryReader {
    /// 每個物料的現有與已分配數量；沒有紀錄的物料不出現在結果中
    fn inventory_levels(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, InventoryLevels>>;

    /// 每個物料的未結採購行與進行中工單
    fn scheduled_receipts(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, Vec<OnOrderItem>>>;
}

/// 批量規則讀取（批次查詢）
pub trait LotConfigReader {
    fn lot_sizing_configs(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, LotSizingConfig>>;
}

/// 物料主檔讀取（逐筆）
pub trait MaterialReader {
    fn material(&self, scope: &PlanningScope, material_id: &str) -> Result<Option<MaterialMaster>>;
}

/// 供應商與議價讀取（逐筆）
pub trait VendorReader {
    /// 物料的首選供應商
    fn preferred_vendors(
        &self,
        scope: &PlanningScope,
        material_id: &str,
    ) -> Result<Vec<VendorSource>>;

    /// 供應商對物料的議價單價
    fn vendor_price(
        &self,
        scope: &PlanningScope,
        vendor_id: &str,
        material_id: &str,
    ) -> Result<Option<Decimal>>;
}

/// 計劃訂單號流水號範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderSequenceKey {
    pub tenant_id: Uuid,
    pub order_type: PlannedOrderType,
    pub year: i32,
    pub month: u32,
}

/// 交易內可用的寫入操作
pub trait PlannedOrderSink {
    /// 遞增並回傳該範圍的下一個流水號（從 1 開始）
    fn next_order_sequence(&mut self, key: &OrderSequenceKey) -> Result<u32>;

    fn insert_planned_order(&mut self, order: &PlannedOrderResult) -> Result<()>;
}

/// 計劃訂單寫入
pub trait PlannedOrderStore {
    /// 在單一交易中執行 `work`；`work` 回傳錯誤時整批回滾（含流水號）
    fn in_transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn PlannedOrderSink) -> Result<()>,
    ) -> Result<()>;
}

macro_rules! forward_reader {
    ($($wrapper:ty),*) => {
        $(
            impl<T: BomReader + ?Sized> BomReader for $wrapper {
                fn active_components(
                    &self,
                    scope: &PlanningScope,
                    product_id: &str,
                    as_of: NaiveDate,
                ) -> Result<Vec<BomComponent>> {
                    (**self).active_components(scope, product_id, as_of)
                }
            }

            impl<T: InventoryReader + ?Sized> InventoryReader for $wrapper {
                fn inventory_levels(
                    &self,
                    scope: &PlanningScope,
                    material_ids: &[String],
                ) -> Result<HashMap<String, InventoryLevels>> {
                    (**self).inventory_levels(scope, material_ids)
                }

                fn scheduled_receipts(
                    &self,
                    scope: &PlanningScope,
                    material_ids: &[String],
                ) -> Result<HashMap<String, Vec<OnOrderItem>>> {
                    (**self).scheduled_receipts(scope, material_ids)
                }
            }

            impl<T: LotConfigReader + ?Sized> LotConfigReader for $wrapper {
                fn lot_sizing_configs(
                    &self,
                    scope: &PlanningScope,
                    material_ids: &[String],
                ) -> Result<HashMap<String, LotSizingConfig>> {
                    (**self).lot_sizing_configs(scope, material_ids)
                }
            }

            impl<T: MaterialReader + ?Sized> MaterialReader for $wrapper {
                fn material(
                    &self,
                    scope: &PlanningScope,
                    material_id: &str,
                ) -> Result<Option<MaterialMaster>> {
                    (**self).material(scope, material_id)
                }
            }

            impl<T: VendorReader + ?Sized> VendorReader for $wrapper {
                fn preferred_vendors(
                    &self,
                    scope: &PlanningScope,
                    material_id: &str,
                ) -> Result<Vec<VendorSource>> {
                    (**self).preferred_vendors(scope, material_id)
                }

                fn vendor_price(
                    &self,
                    scope: &PlanningScope,
                    vendor_id: &str,
                    material_id: &str,
                ) -> Result<Option<Decimal>> {
                    (**self).vendor_price(scope, vendor_id, material_id)
                }
            }

            impl<T: PlannedOrderStore + ?Sized> PlannedOrderStore for $wrapper {
                fn in_transaction(
                    &self,
                    work: &mut dyn FnMut(&mut dyn PlannedOrderSink) -> Result<()>,
                ) -> Result<()> {
                    (**self).in_transaction(work)
                }
            }
        )*
    };
}

forward_reader!(&T, Arc<T>);
