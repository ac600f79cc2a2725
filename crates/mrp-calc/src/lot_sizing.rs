//! 批量規則實現

use mrp_core::{
    LotConfigReader, LotSizingConfig, LotSizingMethod, MrpError, NetRequirement,
    PlannedOrderInput, PlanningScope, Result,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::MrpWarning;

/// 批量計算結果
#[derive(Debug, Clone, Default)]
pub struct LotSizingOutcome {
    pub orders: Vec<PlannedOrderInput>,
    pub warnings: Vec<MrpWarning>,
}

/// 批量規則引擎
pub struct LotSizingEngine<R> {
    reader: R,
}

impl<R: LotConfigReader> LotSizingEngine<R> {
    /// 創建新的批量引擎
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// 應用批量規則，只回傳訂單輸入
    pub fn apply_lot_sizing(
        &self,
        scope: &PlanningScope,
        net_requirements: &[NetRequirement],
    ) -> Result<Vec<PlannedOrderInput>> {
        Ok(self.size_requirements(scope, net_requirements)?.orders)
    }

    /// 應用批量規則，並回傳缺少配置的警告
    ///
    /// 所有物料的批量配置以一次批次查詢取得；沒有配置的物料以批對批處理。
    pub fn size_requirements(
        &self,
        scope: &PlanningScope,
        net_requirements: &[NetRequirement],
    ) -> Result<LotSizingOutcome> {
        let mut material_ids: Vec<String> = Vec::new();
        for req in net_requirements {
            if !material_ids.contains(&req.material_id) {
                material_ids.push(req.material_id.clone());
            }
        }

        if material_ids.is_empty() {
            return Ok(LotSizingOutcome::default());
        }

        let configs = self.reader.lot_sizing_configs(scope, &material_ids)?;

        let mut outcome = LotSizingOutcome::default();
        let mut defaulted: HashMap<&str, LotSizingConfig> = HashMap::new();

        for req in net_requirements {
            let config = match configs.get(&req.material_id) {
                Some(config) => config,
                None => defaulted.entry(req.material_id.as_str()).or_insert_with(|| {
                    tracing::warn!("物料 {} 沒有批量配置，使用批對批", req.material_id);
                    outcome.warnings.push(MrpWarning::warning(
                        req.material_id.clone(),
                        "沒有批量配置，使用批對批".to_string(),
                    ));
                    LotSizingConfig::new(req.material_id.clone())
                }),
            };

            let (quantity, applied_method) = Self::size(req.net_quantity, config)?;

            tracing::debug!(
                "物料 {}：淨需求 {} → 批量 {}（{}）",
                req.material_id,
                req.net_quantity,
                quantity,
                applied_method.as_str()
            );

            outcome.orders.push(PlannedOrderInput {
                material_id: req.material_id.clone(),
                material_code: req.material_code.clone(),
                quantity,
                net_quantity: req.net_quantity,
                required_date: req.required_date,
                applied_method,
                pegging_chain: req.pegging_chain.clone(),
            });
        }

        Ok(outcome)
    }

    /// 依配置計算訂購量，回傳實際套用的規則
    ///
    /// 取整結果超出 `Decimal` 範圍時以 `InvalidMasterData` 失敗
    pub fn size(
        net_quantity: Decimal,
        config: &LotSizingConfig,
    ) -> Result<(Decimal, LotSizingMethod)> {
        let (quantity, applied) = match config.method {
            LotSizingMethod::LotForLot => (Self::lot_for_lot(net_quantity, config), config.method),
            LotSizingMethod::FixedOrderQuantity => {
                match config.fixed_order_quantity.filter(|q| *q > Decimal::ZERO) {
                    Some(fixed) => (
                        Self::fixed_order_quantity(net_quantity, fixed),
                        config.method,
                    ),
                    None => Self::fall_back(net_quantity, config),
                }
            }
            LotSizingMethod::EconomicOrderQuantity => {
                match config.economic_order_quantity.filter(|q| *q > Decimal::ZERO) {
                    Some(eoq) => (
                        Self::economic_order_quantity(net_quantity, eoq, config),
                        config.method,
                    ),
                    None => Self::fall_back(net_quantity, config),
                }
            }
            // 週期訂購與最小-最大需要預測資料，這裡不實作
            LotSizingMethod::PeriodOrderQuantity | LotSizingMethod::MinMax => {
                Self::fall_back(net_quantity, config)
            }
        };

        let quantity = quantity.ok_or_else(|| MrpError::InvalidMasterData {
            material_id: config.material_id.clone(),
            message: format!(
                "淨需求 {} 依 {} 取整後超出數值範圍",
                net_quantity,
                applied.as_str()
            ),
        })?;

        Ok((quantity, applied))
    }

    fn fall_back(
        net_quantity: Decimal,
        config: &LotSizingConfig,
    ) -> (Option<Decimal>, LotSizingMethod) {
        tracing::debug!(
            "物料 {} 的 {} 無法套用，退回批對批",
            config.material_id,
            config.method.as_str()
        );
        (
            Self::lot_for_lot(net_quantity, config),
            LotSizingMethod::LotForLot,
        )
    }

    /// 批對批（Lot for Lot）
    fn lot_for_lot(net_quantity: Decimal, config: &LotSizingConfig) -> Option<Decimal> {
        config.adjust_order_quantity(net_quantity)
    }

    /// 固定訂購量（Fixed Order Quantity）
    /// 需要幾批就訂幾批固定批量
    fn fixed_order_quantity(net_quantity: Decimal, fixed: Decimal) -> Option<Decimal> {
        net_quantity.checked_div(fixed)?.ceil().checked_mul(fixed)
    }

    /// 經濟訂購量（EOQ）
    /// 使用主檔預先計算的 EOQ；超過時訂整數倍，之後再套用最小訂購量與倍數
    fn economic_order_quantity(
        net_quantity: Decimal,
        eoq: Decimal,
        config: &LotSizingConfig,
    ) -> Option<Decimal> {
        let quantity = if net_quantity > eoq {
            net_quantity.checked_div(eoq)?.ceil().checked_mul(eoq)?
        } else {
            eoq
        };
        config.adjust_order_quantity(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{ErrorKind, PeggingEntry};
    use mrp_store::{FailurePoint, InMemoryStore, QueryKind};
    use rstest::rstest;
    use uuid::Uuid;

    type Engine<'a> = LotSizingEngine<&'a InMemoryStore>;

    fn scope() -> PlanningScope {
        PlanningScope::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn net(material_id: &str, quantity: i64) -> NetRequirement {
        NetRequirement {
            material_id: material_id.to_string(),
            material_code: format!("{}-CODE", material_id),
            gross_quantity: Decimal::from(quantity),
            projected_on_hand: Decimal::ZERO,
            net_quantity: Decimal::from(quantity),
            required_date: NaiveDate::from_ymd_opt(2025, 11, 25).unwrap(),
            pegging_chain: vec![
                PeggingEntry::new("P", Decimal::from(10)),
                PeggingEntry::new(material_id, Decimal::from(quantity)),
            ],
        }
    }

    #[rstest]
    #[case::lfl_moq_wins(
        LotSizingConfig::new("M")
            .with_minimum_order_quantity(Decimal::from(50))
            .with_order_multiple(Decimal::from(10)),
        37,
        50
    )]
    #[case::lfl_multiple_only(LotSizingConfig::new("M").with_order_multiple(Decimal::from(10)), 37, 40)]
    #[case::lfl_plain(LotSizingConfig::new("M"), 37, 37)]
    #[case::foq(
        LotSizingConfig::new("M")
            .with_method(LotSizingMethod::FixedOrderQuantity)
            .with_fixed_order_quantity(Decimal::from(50)),
        130,
        150
    )]
    #[case::foq_exact(
        LotSizingConfig::new("M")
            .with_method(LotSizingMethod::FixedOrderQuantity)
            .with_fixed_order_quantity(Decimal::from(50)),
        100,
        100
    )]
    #[case::eoq_multiples(
        LotSizingConfig::new("M")
            .with_method(LotSizingMethod::EconomicOrderQuantity)
            .with_economic_order_quantity(Decimal::from(100)),
        220,
        300
    )]
    #[case::eoq_below(
        LotSizingConfig::new("M")
            .with_method(LotSizingMethod::EconomicOrderQuantity)
            .with_economic_order_quantity(Decimal::from(100)),
        30,
        100
    )]
    #[case::eoq_then_multiple(
        LotSizingConfig::new("M")
            .with_method(LotSizingMethod::EconomicOrderQuantity)
            .with_economic_order_quantity(Decimal::from(45))
            .with_order_multiple(Decimal::from(20)),
        50,
        100
    )]
    fn test_size(#[case] config: LotSizingConfig, #[case] net_quantity: i64, #[case] expected: i64) {
        let (quantity, method) = Engine::size(Decimal::from(net_quantity), &config).unwrap();

        assert_eq!(quantity, Decimal::from(expected));
        assert_eq!(method, config.method);
    }

    #[rstest]
    #[case::foq_without_quantity(LotSizingMethod::FixedOrderQuantity)]
    #[case::eoq_without_value(LotSizingMethod::EconomicOrderQuantity)]
    #[case::poq(LotSizingMethod::PeriodOrderQuantity)]
    #[case::min_max(LotSizingMethod::MinMax)]
    fn test_methods_fall_back_to_lot_for_lot(#[case] method: LotSizingMethod) {
        let config = LotSizingConfig::new("M")
            .with_method(method)
            .with_period_order_quantity_days(7)
            .with_order_multiple(Decimal::from(10));

        let (quantity, applied) = Engine::size(Decimal::from(37), &config).unwrap();

        assert_eq!(quantity, Decimal::from(40));
        assert_eq!(applied, LotSizingMethod::LotForLot);
    }

    #[test]
    fn test_zero_fixed_quantity_falls_back() {
        let config = LotSizingConfig::new("M")
            .with_method(LotSizingMethod::FixedOrderQuantity)
            .with_fixed_order_quantity(Decimal::ZERO);

        let (quantity, applied) = Engine::size(Decimal::from(37), &config).unwrap();

        assert_eq!(quantity, Decimal::from(37));
        assert_eq!(applied, LotSizingMethod::LotForLot);
    }

    #[test]
    fn test_rounding_past_decimal_range_is_invalid_master_data() {
        let config = LotSizingConfig::new("M")
            .with_method(LotSizingMethod::FixedOrderQuantity)
            .with_fixed_order_quantity(Decimal::from(1_000));

        let err = Engine::size(Decimal::MAX - Decimal::ONE, &config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidMasterData);
        assert_eq!(err.material_id(), Some("M"));
    }

    #[test]
    fn test_apply_lot_sizing_preserves_date_and_pegging() {
        let store = InMemoryStore::new().with_lot_config(
            LotSizingConfig::new("C").with_order_multiple(Decimal::from(5)),
        );
        let engine = LotSizingEngine::new(&store);

        let requirement = net("C", 21);
        let orders = engine
            .apply_lot_sizing(&scope(), std::slice::from_ref(&requirement))
            .unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, Decimal::from(25));
        assert_eq!(orders[0].net_quantity, Decimal::from(21));
        assert_eq!(orders[0].required_date, requirement.required_date);
        assert_eq!(orders[0].pegging_chain, requirement.pegging_chain);
        assert_eq!(orders[0].material_code, "C-CODE");
    }

    #[test]
    fn test_missing_config_warns_once_per_material() {
        let store = InMemoryStore::new();
        let engine = LotSizingEngine::new(&store);

        let outcome = engine
            .size_requirements(&scope(), &[net("X", 7), net("X", 3), net("Y", 1)])
            .unwrap();

        assert_eq!(outcome.orders.len(), 3);
        assert_eq!(outcome.orders[0].quantity, Decimal::from(7));
        assert_eq!(outcome.orders[0].applied_method, LotSizingMethod::LotForLot);
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.warnings[0].component_id, "X");
        assert_eq!(outcome.warnings[1].component_id, "Y");
    }

    #[test]
    fn test_configs_are_fetched_in_one_query() {
        let store = InMemoryStore::new();
        let engine = LotSizingEngine::new(&store);

        engine
            .apply_lot_sizing(&scope(), &[net("A", 1), net("B", 1), net("A", 2)])
            .unwrap();
        assert_eq!(store.query_count(QueryKind::LotConfigs), 1);

        engine.apply_lot_sizing(&scope(), &[]).unwrap();
        assert_eq!(store.query_count(QueryKind::LotConfigs), 1);
    }

    #[test]
    fn test_config_query_failure_propagates() {
        let store = InMemoryStore::new().with_failure(FailurePoint::LotConfigs);
        let engine = LotSizingEngine::new(&store);

        let err = engine.apply_lot_sizing(&scope(), &[net("A", 1)]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataAccessFailed);
        assert!(err.is_retryable());
    }
}
