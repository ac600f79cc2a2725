//! # MRP Planner
//!
//! MRP 計算核心：BOM 展開、淨需求、批量規則與計劃訂單產生。
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use mrp_planner::{Demand, MrpRunner, PlanningScope, RunContext, SqliteStore};
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! mrp_planner::logging::init();
//!
//! let store = SqliteStore::open("mrp.db").unwrap();
//! let scope = PlanningScope::new(Uuid::new_v4(), Uuid::new_v4());
//! let as_of = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
//! let ctx = RunContext::new(scope, as_of);
//!
//! let demand = Demand::new("BIKE", Decimal::from(10), NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
//! let result = MrpRunner::new(&store).run(&ctx, &[demand]).unwrap();
//! println!("計劃訂單 {} 筆", result.planned_orders.len());
//! ```

pub mod logging;

pub use mrp_calc::{
    BomExplosion, BomExplosionEngine, LotSizingEngine, LotSizingOutcome, MrpRunResult, MrpRunner,
    MrpWarning, NettingEngine, PlannedOrderGenerator, WarningSeverity,
};
pub use mrp_core::*;
pub use mrp_store::{BomLine, InMemoryStore, SqliteStore, StoreError};

pub use mrp_calc;
pub use mrp_core;
pub use mrp_store;
