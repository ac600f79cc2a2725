//! 淨需求計算
//!
//! 每個物料只維護一個「預計庫存」，依需求日期順序模擬；
//! 需求必須按日期遞增處理，否則收貨會被錯配。

use mrp_core::{
    InventoryReader, MaterialRequirement, MrpError, NetRequirement, OnOrderItem, PlanningScope,
    Result,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// 淨需求計算引擎
pub struct NettingEngine<R> {
    reader: R,
}

impl<R: InventoryReader> NettingEngine<R> {
    /// 創建新的淨需求引擎
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// 計算淨需求
    ///
    /// 對所有物料只發出兩次批次查詢（庫存、預計收貨），避免逐物料查詢。
    /// 輸出依物料首次出現的順序分組，組內依需求日期遞增。
    pub fn calculate_net_requirements(
        &self,
        scope: &PlanningScope,
        gross_requirements: &[MaterialRequirement],
    ) -> Result<Vec<NetRequirement>> {
        // Step 1: 按物料分組
        let mut material_ids: Vec<String> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&MaterialRequirement>> = HashMap::new();
        for req in gross_requirements {
            let group = grouped.entry(req.material_id.as_str()).or_default();
            if group.is_empty() {
                material_ids.push(req.material_id.clone());
            }
            group.push(req);
        }

        if material_ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "淨需求計算：毛需求 {} 筆，物料 {} 種",
            gross_requirements.len(),
            material_ids.len()
        );

        // Step 2: 兩次批次查詢
        let inventory = self
            .reader
            .inventory_levels(scope, &material_ids)
            .map_err(Self::as_inventory_failure)?;
        let mut receipts = self
            .reader
            .scheduled_receipts(scope, &material_ids)
            .map_err(Self::as_inventory_failure)?;

        // Step 3: 逐物料模擬預計庫存
        let mut results = Vec::new();
        for material_id in &material_ids {
            let initial = inventory
                .get(material_id)
                .map(|levels| levels.available())
                .unwrap_or(Decimal::ZERO);
            let material_receipts = receipts.remove(material_id).unwrap_or_default();
            let requirements = grouped.remove(material_id.as_str()).unwrap_or_default();

            results.extend(Self::net_material(initial, material_receipts, requirements)?);
        }

        tracing::debug!("淨需求計算完成：淨需求 {} 筆", results.len());

        Ok(results)
    }

    /// 單一物料的淨算
    ///
    /// 每筆需求先把到期（due_date ≤ 需求日）的收貨加入預計庫存，每筆收貨只計入一次；
    /// 淨需求 = max(0, 毛需求 - max(預計庫存, 0))；之後從預計庫存扣除整筆毛需求。
    /// 負的預計庫存代表已由前面的計劃訂單補足的缺口，不再重複計入淨需求。
    pub fn net_material(
        initial_available: Decimal,
        mut receipts: Vec<OnOrderItem>,
        mut requirements: Vec<&MaterialRequirement>,
    ) -> Result<Vec<NetRequirement>> {
        requirements.sort_by_key(|r| r.required_date);
        receipts.sort_by_key(|r| r.due_date);
        let mut pending: VecDeque<OnOrderItem> = receipts.into();

        let mut projected_on_hand = initial_available;
        let mut results = Vec::new();

        for req in requirements {
            while pending
                .front()
                .is_some_and(|receipt| receipt.due_date <= req.required_date)
            {
                if let Some(receipt) = pending.pop_front() {
                    projected_on_hand = projected_on_hand
                        .checked_add(receipt.quantity)
                        .ok_or_else(|| Self::overflow(req, "預計收貨累加溢位"))?;
                }
            }

            let available = projected_on_hand.max(Decimal::ZERO);
            let net_quantity = req
                .gross_quantity
                .checked_sub(available)
                .ok_or_else(|| Self::overflow(req, "淨需求計算溢位"))?
                .max(Decimal::ZERO);
            if net_quantity > Decimal::ZERO {
                results.push(NetRequirement {
                    material_id: req.material_id.clone(),
                    material_code: req.material_code.clone(),
                    gross_quantity: req.gross_quantity,
                    projected_on_hand: available,
                    net_quantity,
                    required_date: req.required_date,
                    pegging_chain: req.pegging_chain.clone(),
                });
            }

            projected_on_hand = projected_on_hand
                .checked_sub(req.gross_quantity)
                .ok_or_else(|| Self::overflow(req, "預計庫存扣減溢位"))?;
        }

        Ok(results)
    }

    fn overflow(req: &MaterialRequirement, message: &str) -> MrpError {
        MrpError::InvalidMasterData {
            material_id: req.material_id.clone(),
            message: message.to_string(),
        }
    }

    /// 庫存查詢失敗一律視為可重試；逾時與主檔解析錯誤保留原分類
    fn as_inventory_failure(err: MrpError) -> MrpError {
        match err {
            MrpError::DatabaseTimeout { .. }
            | MrpError::InventoryQueryFailed { .. }
            | MrpError::InvalidMasterData { .. } => err,
            other => MrpError::InventoryQueryFailed {
                message: other.to_string(),
            },
        }
    }
}
