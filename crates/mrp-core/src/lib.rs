//! # MRP Core
//!
//! 核心資料模型、錯誤類型與資料存取介面

pub mod bom;
pub mod calendar;
pub mod config;
pub mod demand;
pub mod error;
pub mod inventory;
pub mod material;
pub mod plan;
pub mod reader;
pub mod requirement;
pub mod run;
pub mod supply;

// Re-export 主要類型
pub use bom::BomComponent;
pub use calendar::WorkCalendar;
pub use config::{EngineConfig, LotSizingConfig, LotSizingMethod};
pub use demand::{Demand, DemandNode, PeggingChain, PeggingEntry};
pub use error::{ErrorKind, MrpError, Result};
pub use inventory::InventoryLevels;
pub use material::{MaterialMaster, VendorSource};
pub use plan::{PlannedOrderInput, PlannedOrderResult, PlannedOrderStatus, PlannedOrderType};
pub use reader::{
    BomReader, InventoryReader, LotConfigReader, MaterialReader, OrderSequenceKey,
    PlannedOrderSink, PlannedOrderStore, VendorReader,
};
pub use requirement::{MaterialRequirement, NetRequirement};
pub use run::{PlanningScope, RunContext};
pub use supply::{OnOrderItem, ReceiptType};
