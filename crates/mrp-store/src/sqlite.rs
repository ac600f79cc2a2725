//! SQLite 資料存取
//!
//! 資料列在此解析成具型別的紀錄，業務邏輯不接觸原始欄位。
//! BOM 行只存結構欄位，子件的提前期與旗標取自物料主檔。

use chrono::{DateTime, NaiveDate, Utc};
use mrp_core::{
    BomComponent, BomReader, InventoryLevels, InventoryReader, LotConfigReader, LotSizingConfig,
    LotSizingMethod, MaterialMaster, MaterialReader, MrpError, OnOrderItem, OrderSequenceKey,
    PeggingChain, PlannedOrderResult, PlannedOrderSink, PlannedOrderStatus, PlannedOrderStore,
    PlannedOrderType, PlanningScope, ReceiptType, Result, VendorReader, VendorSource,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::schema;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// BOM 行（結構資料）
#[derive(Debug, Clone, PartialEq)]
pub struct BomLine {
    pub parent_material_id: String,
    pub component_material_id: String,
    pub quantity_per_parent: Decimal,
    pub scrap_percentage: Decimal,
    pub sequence_number: i32,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    pub is_active: bool,
}

impl BomLine {
    pub fn new(
        parent_material_id: impl Into<String>,
        component_material_id: impl Into<String>,
        quantity_per_parent: Decimal,
    ) -> Self {
        Self {
            parent_material_id: parent_material_id.into(),
            component_material_id: component_material_id.into(),
            quantity_per_parent,
            scrap_percentage: Decimal::ZERO,
            sequence_number: 10,
            effective_from: None,
            effective_to: None,
            is_active: true,
        }
    }

    pub fn with_scrap_percentage(mut self, scrap: Decimal) -> Self {
        self.scrap_percentage = scrap;
        self
    }

    pub fn with_sequence(mut self, sequence_number: i32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// 建構器模式：設置有效期間（含頭含尾）
    pub fn with_effective_window(
        mut self,
        effective_from: Option<NaiveDate>,
        effective_to: Option<NaiveDate>,
    ) -> Self {
        self.effective_from = effective_from;
        self.effective_to = effective_to;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// SQLite 資料存取
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 開啟資料庫檔案並建立資料表
    pub fn open(db_path: &str) -> StoreResult<Self> {
        Self::from_connection(Arc::new(Mutex::new(Connection::open(db_path)?)))
    }

    /// 開啟記憶體資料庫
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// 從已有連線建立
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let store = Self { conn };
        {
            let conn = store.get_conn()?;
            schema::configure_connection(&conn)?;
            schema::init_schema(&conn)?;
        }
        tracing::debug!("SQLite 資料表已就緒");
        Ok(store)
    }

    /// 共享連線
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    // ===== 主檔維護 =====

    pub fn insert_bom_line(&self, tenant_id: Uuid, line: &BomLine) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO bom_components (
                tenant_id, parent_material_id, component_material_id,
                quantity_per_parent, scrap_percentage, sequence_number,
                effective_from, effective_to, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                tenant_id.to_string(),
                line.parent_material_id,
                line.component_material_id,
                line.quantity_per_parent.to_string(),
                line.scrap_percentage.to_string(),
                line.sequence_number,
                line.effective_from.map(|d| d.format(DATE_FORMAT).to_string()),
                line.effective_to.map(|d| d.format(DATE_FORMAT).to_string()),
                line.is_active,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_material(&self, tenant_id: Uuid, material: &MaterialMaster) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO materials (
                tenant_id, material_id, material_code,
                lead_time_days, safety_lead_time_days,
                is_manufactured, is_purchased, is_phantom,
                lot_sizing_method, standard_cost, average_cost, unit_of_measure
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                tenant_id.to_string(),
                material.material_id,
                material.material_code,
                material.lead_time_days,
                material.safety_lead_time_days,
                material.is_manufactured,
                material.is_purchased,
                material.is_phantom,
                material.lot_sizing_method.as_str(),
                material.standard_cost.map(|c| c.to_string()),
                material.average_cost.map(|c| c.to_string()),
                material.unit_of_measure,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_lot_config(&self, tenant_id: Uuid, config: &LotSizingConfig) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO lot_sizing_configs (
                tenant_id, material_id, method,
                fixed_order_quantity, minimum_order_quantity, order_multiple,
                economic_order_quantity, period_order_quantity_days
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                tenant_id.to_string(),
                config.material_id,
                config.method.as_str(),
                config.fixed_order_quantity.map(|q| q.to_string()),
                config.minimum_order_quantity.map(|q| q.to_string()),
                config.order_multiple.map(|q| q.to_string()),
                config.economic_order_quantity.map(|q| q.to_string()),
                config.period_order_quantity_days,
            ],
        )?;
        Ok(())
    }

    /// 記錄庫存異動（帶正負號）
    pub fn record_inventory_transaction(
        &self,
        scope: &PlanningScope,
        material_id: &str,
        transaction_type: &str,
        quantity: Decimal,
        transaction_date: NaiveDate,
    ) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO inventory_transactions (
                tenant_id, facility_id, material_id, transaction_type, quantity, transaction_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                scope.tenant_id.to_string(),
                scope.facility_id.to_string(),
                material_id,
                transaction_type,
                quantity.to_string(),
                transaction_date.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn record_allocation(
        &self,
        scope: &PlanningScope,
        material_id: &str,
        quantity: Decimal,
    ) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO inventory_allocations (tenant_id, facility_id, material_id, quantity) VALUES (?1, ?2, ?3, ?4)",
            params![
                scope.tenant_id.to_string(),
                scope.facility_id.to_string(),
                material_id,
                quantity.to_string(),
            ],
        )?;
        Ok(())
    }

    /// 加入未結採購行或已下達工單
    pub fn add_scheduled_receipt(&self, scope: &PlanningScope, item: &OnOrderItem) -> StoreResult<()> {
        let sql = match item.order_type {
            ReceiptType::PurchaseOrder => {
                r#"
                INSERT INTO purchase_order_lines (
                    tenant_id, facility_id, purchase_order_id, material_id,
                    quantity_ordered, quantity_received, due_date, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6, 'OPEN')
                "#
            }
            ReceiptType::ProductionOrder => {
                r#"
                INSERT INTO production_orders (
                    tenant_id, facility_id, production_order_id, material_id,
                    quantity_planned, quantity_completed, due_date, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6, 'RELEASED')
                "#
            }
        };

        let conn = self.get_conn()?;
        conn.execute(
            sql,
            params![
                scope.tenant_id.to_string(),
                scope.facility_id.to_string(),
                item.order_id,
                item.material_id,
                item.quantity.to_string(),
                item.due_date.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_vendor_material(
        &self,
        tenant_id: Uuid,
        vendor: &VendorSource,
        negotiated_price: Option<Decimal>,
    ) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO vendor_materials (
                tenant_id, vendor_id, material_id, lead_time_days, is_preferred, negotiated_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                tenant_id.to_string(),
                vendor.vendor_id,
                vendor.material_id,
                vendor.lead_time_days,
                vendor.is_preferred,
                negotiated_price.map(|p| p.to_string()),
            ],
        )?;
        Ok(())
    }

    /// 讀回某次執行寫入的計劃訂單（依訂單號排序）
    pub fn planned_orders_for_run(&self, run_id: Uuid) -> StoreResult<Vec<PlannedOrderResult>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                id, tenant_id, facility_id, mrp_run_id, order_number, order_type,
                material_id, material_code, quantity, unit_of_measure,
                required_date, order_date, vendor_id, work_center_id,
                estimated_unit_cost, estimated_total_cost, lot_sizing_method, status,
                pegging_chain, created_at
            FROM planned_orders
            WHERE mrp_run_id = ?1
            ORDER BY order_number
            "#,
        )?;

        let rows = stmt
            .query_map(params![run_id.to_string()], |row| {
                let mut columns = Vec::with_capacity(20);
                for idx in 0..20 {
                    columns.push(row.get::<_, Option<String>>(idx)?);
                }
                Ok(columns)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(PlannedOrderRow::parse).collect()
    }

    // ===== 查詢 =====

    fn query_active_components(
        &self,
        scope: &PlanningScope,
        product_id: &str,
        as_of: NaiveDate,
    ) -> StoreResult<Vec<BomComponent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                b.component_material_id,
                COALESCE(m.material_code, b.component_material_id),
                b.quantity_per_parent,
                b.scrap_percentage,
                COALESCE(m.lead_time_days, 0),
                COALESCE(m.safety_lead_time_days, 0),
                COALESCE(m.is_manufactured, 0),
                COALESCE(m.is_phantom, 0),
                b.sequence_number
            FROM bom_components b
            LEFT JOIN materials m
                ON m.tenant_id = b.tenant_id AND m.material_id = b.component_material_id
            WHERE b.tenant_id = ?1
              AND b.parent_material_id = ?2
              AND b.is_active = 1
              AND (b.effective_from IS NULL OR b.effective_from <= ?3)
              AND (b.effective_to IS NULL OR b.effective_to >= ?3)
            ORDER BY b.sequence_number
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    scope.tenant_id.to_string(),
                    product_id,
                    as_of.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i32>(4)?,
                        row.get::<_, i32>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, i32>(8)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, code, qpp, scrap, lead, safety, manufactured, phantom, sequence)| {
                Ok(BomComponent {
                    quantity_per_parent: parse_decimal(&id, "quantity_per_parent", &qpp)?,
                    scrap_percentage: parse_decimal(&id, "scrap_percentage", &scrap)?,
                    material_id: id,
                    material_code: code,
                    lead_time_days: lead,
                    safety_lead_time_days: safety,
                    is_manufactured: manufactured,
                    is_phantom: phantom,
                    sequence_number: sequence,
                })
            })
            .collect()
    }

    /// 現有量（異動帳加總）與已分配量
    fn query_inventory_levels(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> StoreResult<HashMap<String, InventoryLevels>> {
        let conn = self.get_conn()?;
        let mut levels: HashMap<String, InventoryLevels> = HashMap::new();

        let on_hand = select_quantities(
            &conn,
            "SELECT material_id, quantity FROM inventory_transactions",
            scope,
            material_ids,
        )?;
        for (material_id, quantity) in on_hand {
            let q = parse_decimal(&material_id, "inventory_transactions.quantity", &quantity)?;
            levels.entry(material_id).or_default().on_hand_quantity += q;
        }

        let allocated = select_quantities(
            &conn,
            "SELECT material_id, quantity FROM inventory_allocations",
            scope,
            material_ids,
        )?;
        for (material_id, quantity) in allocated {
            let q = parse_decimal(&material_id, "inventory_allocations.quantity", &quantity)?;
            levels.entry(material_id).or_default().allocated_quantity += q;
        }

        Ok(levels)
    }

    /// 未結採購行與進行中工單的剩餘數量，依到貨日排序
    fn query_scheduled_receipts(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<OnOrderItem>>> {
        let placeholders = numbered_placeholders(3, material_ids.len());
        let sql = format!(
            r#"
            SELECT material_id, purchase_order_id, 'PURCHASE_ORDER',
                   quantity_ordered, quantity_received, due_date
            FROM purchase_order_lines
            WHERE tenant_id = ?1 AND facility_id = ?2
              AND status IN ('OPEN', 'PARTIAL')
              AND material_id IN ({placeholders})
            UNION ALL
            SELECT material_id, production_order_id, 'PRODUCTION_ORDER',
                   quantity_planned, quantity_completed, due_date
            FROM production_orders
            WHERE tenant_id = ?1 AND facility_id = ?2
              AND status IN ('RELEASED', 'IN_PROGRESS')
              AND material_id IN ({placeholders})
            ORDER BY due_date
            "#
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(scoped_params(scope, material_ids)), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut receipts: HashMap<String, Vec<OnOrderItem>> = HashMap::new();
        for (material_id, order_id, source, ordered, received, due) in rows {
            let remaining = parse_decimal(&material_id, "quantity", &ordered)?
                - parse_decimal(&material_id, "quantity_received", &received)?;
            if remaining <= Decimal::ZERO {
                continue;
            }

            let order_type = if source == "PRODUCTION_ORDER" {
                ReceiptType::ProductionOrder
            } else {
                ReceiptType::PurchaseOrder
            };
            let due_date = parse_date(&material_id, "due_date", &due)?;

            receipts
                .entry(material_id.clone())
                .or_default()
                .push(OnOrderItem::new(material_id, remaining, due_date, order_type, order_id));
        }

        Ok(receipts)
    }

    fn query_lot_sizing_configs(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> StoreResult<HashMap<String, LotSizingConfig>> {
        let sql = format!(
            r#"
            SELECT material_id, method, fixed_order_quantity, minimum_order_quantity,
                   order_multiple, economic_order_quantity, period_order_quantity_days
            FROM lot_sizing_configs
            WHERE tenant_id = ?1 AND material_id IN ({})
            "#,
            numbered_placeholders(2, material_ids.len())
        );

        let mut values = vec![Value::from(scope.tenant_id.to_string())];
        values.extend(material_ids.iter().map(|id| Value::from(id.clone())));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut configs = HashMap::new();
        for (material_id, method, fixed, minimum, multiple, eoq, period_days) in rows {
            let config = LotSizingConfig {
                method: parse_method(&material_id, &method)?,
                fixed_order_quantity: parse_optional_decimal(&material_id, "fixed_order_quantity", fixed)?,
                minimum_order_quantity: parse_optional_decimal(
                    &material_id,
                    "minimum_order_quantity",
                    minimum,
                )?,
                order_multiple: parse_optional_decimal(&material_id, "order_multiple", multiple)?,
                economic_order_quantity: parse_optional_decimal(
                    &material_id,
                    "economic_order_quantity",
                    eoq,
                )?,
                period_order_quantity_days: period_days
                    .map(|days| {
                        u32::try_from(days).map_err(|e| field_error(&material_id, "period_order_quantity_days", e))
                    })
                    .transpose()?,
                material_id: material_id.clone(),
            };
            configs.insert(material_id, config);
        }

        Ok(configs)
    }

    fn query_material(
        &self,
        scope: &PlanningScope,
        material_id: &str,
    ) -> StoreResult<Option<MaterialMaster>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT material_code, lead_time_days, safety_lead_time_days,
                       is_manufactured, is_purchased, is_phantom,
                       lot_sizing_method, standard_cost, average_cost, unit_of_measure
                FROM materials
                WHERE tenant_id = ?1 AND material_id = ?2
                "#,
                params![scope.tenant_id.to_string(), material_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i32>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                        row.get::<_, Option<String>>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((code, lead, safety, manufactured, purchased, phantom, method, standard, average, uom)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(MaterialMaster {
            material_id: material_id.to_string(),
            material_code: code,
            lead_time_days: lead,
            safety_lead_time_days: safety,
            is_manufactured: manufactured,
            is_purchased: purchased,
            is_phantom: phantom,
            lot_sizing_method: parse_method(material_id, &method)?,
            standard_cost: parse_optional_decimal(material_id, "standard_cost", standard)?,
            average_cost: parse_optional_decimal(material_id, "average_cost", average)?,
            unit_of_measure: uom,
        }))
    }

    fn query_preferred_vendors(
        &self,
        scope: &PlanningScope,
        material_id: &str,
    ) -> StoreResult<Vec<VendorSource>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT vendor_id, lead_time_days, is_preferred
            FROM vendor_materials
            WHERE tenant_id = ?1 AND material_id = ?2 AND is_preferred = 1
            ORDER BY lead_time_days, vendor_id
            "#,
        )?;
        let vendors = stmt
            .query_map(params![scope.tenant_id.to_string(), material_id], |row| {
                Ok(VendorSource {
                    vendor_id: row.get(0)?,
                    material_id: material_id.to_string(),
                    lead_time_days: row.get(1)?,
                    is_preferred: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(vendors)
    }

    fn query_vendor_price(
        &self,
        scope: &PlanningScope,
        vendor_id: &str,
        material_id: &str,
    ) -> StoreResult<Option<Decimal>> {
        let conn = self.get_conn()?;
        let price = conn
            .query_row(
                r#"
                SELECT negotiated_price FROM vendor_materials
                WHERE tenant_id = ?1 AND vendor_id = ?2 AND material_id = ?3
                "#,
                params![scope.tenant_id.to_string(), vendor_id, material_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        parse_optional_decimal(material_id, "negotiated_price", price)
    }
}

impl BomReader for SqliteStore {
    fn active_components(
        &self,
        scope: &PlanningScope,
        product_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<BomComponent>> {
        self.query_active_components(scope, product_id, as_of)
            .map_err(|e| e.into_mrp("bom_components"))
    }
}

impl InventoryReader for SqliteStore {
    fn inventory_levels(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, InventoryLevels>> {
        if material_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.query_inventory_levels(scope, material_ids)
            .map_err(StoreError::into_inventory_failure)
    }

    fn scheduled_receipts(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, Vec<OnOrderItem>>> {
        if material_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.query_scheduled_receipts(scope, material_ids)
            .map_err(StoreError::into_inventory_failure)
    }
}

impl LotConfigReader for SqliteStore {
    fn lot_sizing_configs(
        &self,
        scope: &PlanningScope,
        material_ids: &[String],
    ) -> Result<HashMap<String, LotSizingConfig>> {
        if material_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.query_lot_sizing_configs(scope, material_ids)
            .map_err(|e| e.into_mrp("lot_sizing_configs"))
    }
}

impl MaterialReader for SqliteStore {
    fn material(&self, scope: &PlanningScope, material_id: &str) -> Result<Option<MaterialMaster>> {
        self.query_material(scope, material_id)
            .map_err(|e| e.into_mrp("materials"))
    }
}

impl VendorReader for SqliteStore {
    fn preferred_vendors(
        &self,
        scope: &PlanningScope,
        material_id: &str,
    ) -> Result<Vec<VendorSource>> {
        self.query_preferred_vendors(scope, material_id)
            .map_err(|e| e.into_mrp("vendor_materials"))
    }

    fn vendor_price(
        &self,
        scope: &PlanningScope,
        vendor_id: &str,
        material_id: &str,
    ) -> Result<Option<Decimal>> {
        self.query_vendor_price(scope, vendor_id, material_id)
            .map_err(|e| e.into_mrp("vendor_materials"))
    }
}

/// 交易內的寫入
struct SqliteSink<'a> {
    conn: &'a Connection,
}

impl PlannedOrderSink for SqliteSink<'_> {
    fn next_order_sequence(&mut self, key: &OrderSequenceKey) -> Result<u32> {
        let tenant_id = key.tenant_id.to_string();
        let order_type = key.order_type.as_str();

        let sequence = (|| -> StoreResult<i64> {
            self.conn.execute(
                r#"
                INSERT INTO planned_order_sequences (tenant_id, order_type, year, month, last_sequence)
                VALUES (?1, ?2, ?3, ?4, 1)
                ON CONFLICT (tenant_id, order_type, year, month)
                DO UPDATE SET last_sequence = last_sequence + 1
                "#,
                params![tenant_id, order_type, key.year, key.month],
            )?;
            let sequence = self.conn.query_row(
                r#"
                SELECT last_sequence FROM planned_order_sequences
                WHERE tenant_id = ?1 AND order_type = ?2 AND year = ?3 AND month = ?4
                "#,
                params![tenant_id, order_type, key.year, key.month],
                |row| row.get(0),
            )?;
            Ok(sequence)
        })()
        .map_err(|e| e.into_mrp("planned_order_sequences"))?;

        u32::try_from(sequence).map_err(|e| MrpError::data_access("planned_order_sequences", e.to_string()))
    }

    fn insert_planned_order(&mut self, order: &PlannedOrderResult) -> Result<()> {
        let pegging_chain = serde_json::to_string(&order.pegging_chain)
            .map_err(|e| MrpError::data_access("planned_orders", e.to_string()))?;

        self.conn
            .execute(
                r#"
                INSERT INTO planned_orders (
                    id, tenant_id, facility_id, mrp_run_id, order_number, order_type,
                    material_id, material_code, quantity, unit_of_measure,
                    required_date, order_date, vendor_id, work_center_id,
                    estimated_unit_cost, estimated_total_cost, lot_sizing_method, status,
                    pegging_chain, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                          ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                "#,
                params![
                    order.id.to_string(),
                    order.tenant_id.to_string(),
                    order.facility_id.to_string(),
                    order.mrp_run_id.to_string(),
                    order.order_number,
                    order.order_type.as_str(),
                    order.material_id,
                    order.material_code,
                    order.quantity.to_string(),
                    order.unit_of_measure,
                    order.required_date.format(DATE_FORMAT).to_string(),
                    order.order_date.format(DATE_FORMAT).to_string(),
                    order.vendor_id,
                    order.work_center_id,
                    order.estimated_unit_cost.to_string(),
                    order.estimated_total_cost.to_string(),
                    order.lot_sizing_method.as_str(),
                    order.status.as_str(),
                    pegging_chain,
                    order.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::from(e).into_mrp("planned_orders"))?;
        Ok(())
    }
}

impl PlannedOrderStore for SqliteStore {
    fn in_transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn PlannedOrderSink) -> Result<()>,
    ) -> Result<()> {
        let mut conn = self.get_conn().map_err(|e| e.into_mrp("planned_orders"))?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::from(e).into_mrp("planned_orders"))?;

        // 出錯時 tx 被丟棄即回滾
        if let Err(err) = work(&mut SqliteSink { conn: &tx }) {
            tracing::warn!("計劃訂單交易回滾：{}", err);
            return Err(err);
        }

        tx.commit()
            .map_err(|e| StoreError::from(e).into_mrp("planned_orders"))?;
        tracing::debug!("計劃訂單交易已提交");
        Ok(())
    }
}

struct PlannedOrderRow;

impl PlannedOrderRow {
    fn parse(columns: Vec<Option<String>>) -> StoreResult<PlannedOrderResult> {
        let mut columns = columns.into_iter();
        let mut next = |field: &str| -> StoreResult<Option<String>> {
            columns
                .next()
                .ok_or_else(|| field_error("", field, "missing column"))
        };

        let id = next("id")?;
        let tenant_id = next("tenant_id")?;
        let facility_id = next("facility_id")?;
        let mrp_run_id = next("mrp_run_id")?;
        let order_number = next("order_number")?;
        let order_type = next("order_type")?;
        let material_id = next("material_id")?.unwrap_or_default();
        let material_code = next("material_code")?;
        let quantity = next("quantity")?;
        let unit_of_measure = next("unit_of_measure")?;
        let required_date = next("required_date")?;
        let order_date = next("order_date")?;
        let vendor_id = next("vendor_id")?;
        let work_center_id = next("work_center_id")?;
        let unit_cost = next("estimated_unit_cost")?;
        let total_cost = next("estimated_total_cost")?;
        let method = next("lot_sizing_method")?;
        let status = next("status")?;
        let pegging_chain = next("pegging_chain")?;
        let created_at = next("created_at")?;

        let m = material_id.as_str();
        let required = |field: &str, value: Option<String>| {
            value.ok_or_else(|| field_error(m, field, "NULL"))
        };

        let pegging_chain: PeggingChain =
            serde_json::from_str(&required("pegging_chain", pegging_chain)?)
                .map_err(|e| field_error(m, "pegging_chain", e))?;
        let order_type_label = required("order_type", order_type)?;
        let status_label = required("status", status)?;

        Ok(PlannedOrderResult {
            id: parse_uuid(m, "id", &required("id", id)?)?,
            tenant_id: parse_uuid(m, "tenant_id", &required("tenant_id", tenant_id)?)?,
            facility_id: parse_uuid(m, "facility_id", &required("facility_id", facility_id)?)?,
            mrp_run_id: parse_uuid(m, "mrp_run_id", &required("mrp_run_id", mrp_run_id)?)?,
            order_number: required("order_number", order_number)?,
            order_type: PlannedOrderType::from_label(&order_type_label)
                .ok_or_else(|| field_error(m, "order_type", &order_type_label))?,
            material_code: required("material_code", material_code)?,
            quantity: parse_decimal(m, "quantity", &required("quantity", quantity)?)?,
            unit_of_measure: required("unit_of_measure", unit_of_measure)?,
            required_date: parse_date(m, "required_date", &required("required_date", required_date)?)?,
            order_date: parse_date(m, "order_date", &required("order_date", order_date)?)?,
            vendor_id,
            work_center_id,
            estimated_unit_cost: parse_decimal(
                m,
                "estimated_unit_cost",
                &required("estimated_unit_cost", unit_cost)?,
            )?,
            estimated_total_cost: parse_decimal(
                m,
                "estimated_total_cost",
                &required("estimated_total_cost", total_cost)?,
            )?,
            lot_sizing_method: parse_method(m, &required("lot_sizing_method", method)?)?,
            status: PlannedOrderStatus::from_label(&status_label)
                .ok_or_else(|| field_error(m, "status", &status_label))?,
            pegging_chain,
            created_at: DateTime::parse_from_rfc3339(&required("created_at", created_at)?)
                .map_err(|e| field_error(m, "created_at", e))?
                .with_timezone(&Utc),
            material_id,
        })
    }
}

// ===== 解析工具 =====

fn field_error(material_id: &str, field: &str, message: impl ToString) -> StoreError {
    StoreError::FieldValueError {
        material_id: material_id.to_string(),
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn parse_decimal(material_id: &str, field: &str, raw: &str) -> StoreResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| field_error(material_id, field, format!("{}: {}", raw, e)))
}

fn parse_optional_decimal(
    material_id: &str,
    field: &str,
    raw: Option<String>,
) -> StoreResult<Option<Decimal>> {
    raw.map(|s| parse_decimal(material_id, field, &s)).transpose()
}

fn parse_date(material_id: &str, field: &str, raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| field_error(material_id, field, format!("{}: {}", raw, e)))
}

fn parse_method(material_id: &str, raw: &str) -> StoreResult<LotSizingMethod> {
    LotSizingMethod::from_label(raw).ok_or_else(|| field_error(material_id, "lot_sizing_method", raw))
}

fn parse_uuid(material_id: &str, field: &str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| field_error(material_id, field, e))
}

/// 例如 start=3, count=2 → "?3, ?4"
fn numbered_placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// ?1 = 租戶、?2 = 工廠、?3.. = 物料
fn scoped_params(scope: &PlanningScope, material_ids: &[String]) -> Vec<Value> {
    let mut values = vec![
        Value::from(scope.tenant_id.to_string()),
        Value::from(scope.facility_id.to_string()),
    ];
    values.extend(material_ids.iter().map(|id| Value::from(id.clone())));
    values
}

/// 依範圍與物料集合取出 (material_id, quantity) 列
fn select_quantities(
    conn: &Connection,
    select: &str,
    scope: &PlanningScope,
    material_ids: &[String],
) -> StoreResult<Vec<(String, String)>> {
    let sql = format!(
        "{} WHERE tenant_id = ?1 AND facility_id = ?2 AND material_id IN ({})",
        select,
        numbered_placeholders(3, material_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(scoped_params(scope, material_ids)), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
