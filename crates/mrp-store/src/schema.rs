//! SQLite 連線設定與資料表結構
//!
//! 數量與金額以 TEXT 儲存，於讀取邊界解析為 `Decimal`；日期為 `YYYY-MM-DD`。

use rusqlite::Connection;
use std::time::Duration;

/// 預設 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bom_components (
    tenant_id TEXT NOT NULL,
    parent_material_id TEXT NOT NULL,
    component_material_id TEXT NOT NULL,
    quantity_per_parent TEXT NOT NULL,
    scrap_percentage TEXT NOT NULL DEFAULT '0',
    sequence_number INTEGER NOT NULL DEFAULT 10,
    effective_from TEXT,
    effective_to TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_bom_parent ON bom_components (tenant_id, parent_material_id);

CREATE TABLE IF NOT EXISTS materials (
    tenant_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    material_code TEXT NOT NULL,
    lead_time_days INTEGER NOT NULL DEFAULT 0,
    safety_lead_time_days INTEGER NOT NULL DEFAULT 0,
    is_manufactured INTEGER NOT NULL DEFAULT 0,
    is_purchased INTEGER NOT NULL DEFAULT 1,
    is_phantom INTEGER NOT NULL DEFAULT 0,
    lot_sizing_method TEXT NOT NULL DEFAULT 'LOT_FOR_LOT',
    standard_cost TEXT,
    average_cost TEXT,
    unit_of_measure TEXT,
    PRIMARY KEY (tenant_id, material_id)
);

CREATE TABLE IF NOT EXISTS lot_sizing_configs (
    tenant_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    method TEXT NOT NULL DEFAULT 'LOT_FOR_LOT',
    fixed_order_quantity TEXT,
    minimum_order_quantity TEXT,
    order_multiple TEXT,
    economic_order_quantity TEXT,
    period_order_quantity_days INTEGER,
    PRIMARY KEY (tenant_id, material_id)
);

CREATE TABLE IF NOT EXISTS inventory_transactions (
    tenant_id TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    quantity TEXT NOT NULL,
    transaction_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_inv_tx_material
    ON inventory_transactions (tenant_id, facility_id, material_id);

CREATE TABLE IF NOT EXISTS inventory_allocations (
    tenant_id TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    quantity TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS purchase_order_lines (
    tenant_id TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    purchase_order_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    quantity_ordered TEXT NOT NULL,
    quantity_received TEXT NOT NULL DEFAULT '0',
    due_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'OPEN'
);

CREATE TABLE IF NOT EXISTS production_orders (
    tenant_id TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    production_order_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    quantity_planned TEXT NOT NULL,
    quantity_completed TEXT NOT NULL DEFAULT '0',
    due_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'RELEASED'
);

CREATE TABLE IF NOT EXISTS vendor_materials (
    tenant_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL,
    material_id TEXT NOT NULL,
    lead_time_days INTEGER NOT NULL DEFAULT 0,
    is_preferred INTEGER NOT NULL DEFAULT 0,
    negotiated_price TEXT,
    PRIMARY KEY (tenant_id, vendor_id, material_id)
);

CREATE TABLE IF NOT EXISTS planned_orders (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    mrp_run_id TEXT NOT NULL,
    order_number TEXT NOT NULL,
    order_type TEXT NOT NULL,
    material_id TEXT NOT NULL,
    material_code TEXT NOT NULL,
    quantity TEXT NOT NULL,
    unit_of_measure TEXT NOT NULL,
    required_date TEXT NOT NULL,
    order_date TEXT NOT NULL,
    vendor_id TEXT,
    work_center_id TEXT,
    estimated_unit_cost TEXT NOT NULL,
    estimated_total_cost TEXT NOT NULL,
    lot_sizing_method TEXT NOT NULL,
    status TEXT NOT NULL,
    pegging_chain TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (tenant_id, order_number)
);
CREATE INDEX IF NOT EXISTS idx_planned_orders_run ON planned_orders (mrp_run_id);

CREATE TABLE IF NOT EXISTS planned_order_sequences (
    tenant_id TEXT NOT NULL,
    order_type TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    last_sequence INTEGER NOT NULL,
    PRIMARY KEY (tenant_id, order_type, year, month)
);
"#;

/// 設定連線 PRAGMA
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 建立資料表（可重複執行）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
