//! BOM 展開
//!
//! 以顯式佇列做廣度優先展開（不使用遞迴），佇列與訪問集合都只存在於單次呼叫內。

use chrono::NaiveDate;
use mrp_core::{
    BomReader, Demand, DemandNode, EngineConfig, MaterialRequirement, MrpError, Result,
    RunContext,
};
use rust_decimal::Decimal;
use std::collections::{HashSet, VecDeque};

use crate::lead_time::LeadTimeCalculator;
use crate::MrpWarning;

/// BOM 展開結果
#[derive(Debug, Clone, Default)]
pub struct BomExplosion {
    /// 毛需求（依發現順序）
    pub requirements: Vec<MaterialRequirement>,

    /// 可恢復的異常（循環引用）
    pub warnings: Vec<MrpWarning>,
}

/// BOM 展開引擎
pub struct BomExplosionEngine<R> {
    reader: R,
    config: EngineConfig,
}

impl<R: BomReader> BomExplosionEngine<R> {
    /// 創建新的展開引擎
    pub fn new(reader: R, config: EngineConfig) -> Self {
        Self { reader, config }
    }

    /// 展開獨立需求
    pub fn explode_demand(&self, ctx: &RunContext, demand: &Demand) -> Result<BomExplosion> {
        self.run(
            ctx,
            DemandNode::root(demand.product_id.clone(), demand.quantity, demand.due_date),
            demand.source_label(),
        )
    }

    /// 展開根產品需求
    pub fn explode(
        &self,
        ctx: &RunContext,
        root_product_id: &str,
        root_quantity: Decimal,
        due_date: NaiveDate,
    ) -> Result<BomExplosion> {
        self.run(
            ctx,
            DemandNode::root(root_product_id, root_quantity, due_date),
            root_product_id.to_string(),
        )
    }

    fn run(&self, ctx: &RunContext, root: DemandNode, demand_source: String) -> Result<BomExplosion> {
        tracing::debug!(
            "開始 BOM 展開：{} 數量 {} 需求日 {}",
            root.product_id,
            root.quantity,
            root.due_date
        );

        let mut queue = VecDeque::from([root]);
        let mut visited: HashSet<(String, u32)> = HashSet::new();
        let mut result = BomExplosion::default();

        while let Some(node) = queue.pop_front() {
            // 同一 (產品, 層級) 只展開一次；產品出現在自己的祖先路徑上也視為循環
            if node.is_own_ancestor() || !visited.insert(node.visit_key()) {
                let cycle = MrpError::CircularBom {
                    product_id: node.product_id.clone(),
                    level: node.level,
                };
                tracing::warn!("{}，停止展開此分支", cycle);
                result.warnings.push(MrpWarning::from_error(&cycle));
                continue;
            }

            if node.level > self.config.max_bom_depth {
                return Err(MrpError::MaxDepthExceeded {
                    product_id: node.product_id,
                    level: node.level,
                    max_depth: self.config.max_bom_depth,
                });
            }

            let mut components =
                self.reader
                    .active_components(&ctx.scope, &node.product_id, ctx.as_of)?;
            components.sort_by_key(|c| c.sequence_number);

            if components.is_empty() {
                if node.level == 0 {
                    return Err(MrpError::MissingBom {
                        product_id: node.product_id,
                    });
                }
                tracing::debug!("自製件 {} 沒有有效的 BOM，視為末端", node.product_id);
                continue;
            }

            let chain = node.extended_chain();

            for component in &components {
                let gross_quantity = component.gross_quantity(node.quantity).ok_or_else(|| {
                    MrpError::InvalidMasterData {
                        material_id: component.material_id.clone(),
                        message: format!(
                            "毛需求超出數值範圍（父件 {} 數量 {}，用量 {}）",
                            node.product_id, node.quantity, component.quantity_per_parent
                        ),
                    }
                })?;
                let required_date = LeadTimeCalculator::calculate_required_date(
                    &component.material_id,
                    node.due_date,
                    component.lead_time_days,
                    component.safety_lead_time_days,
                    &self.config.calendar,
                )?;

                tracing::debug!(
                    "BOM 展開: {} → {} (數量: {}, 日期: {}, 層級: {})",
                    node.product_id,
                    component.material_id,
                    gross_quantity,
                    required_date,
                    node.level + 1
                );

                result.requirements.push(MaterialRequirement {
                    mrp_run_id: ctx.run_id,
                    material_id: component.material_id.clone(),
                    material_code: component.material_code.clone(),
                    gross_quantity,
                    required_date,
                    demand_source: demand_source.clone(),
                    pegging_chain: chain.clone(),
                });

                if component.is_explodable() {
                    queue.push_back(DemandNode {
                        product_id: component.material_id.clone(),
                        quantity: gross_quantity,
                        due_date: required_date,
                        level: node.level + 1,
                        pegging_chain: chain.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            "BOM 展開完成：毛需求 {} 筆，警告 {} 筆",
            result.requirements.len(),
            result.warnings.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{BomComponent, ErrorKind, PlanningScope};
    use mrp_store::{FailurePoint, InMemoryStore};
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn ctx() -> RunContext {
        RunContext::new(PlanningScope::new(Uuid::new_v4(), Uuid::new_v4()), day(1))
    }

    fn qty(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_multi_level_bom_emits_one_requirement_per_edge() {
        // BIKE
        //   ├── FRAME x1 (自製)
        //   │   └── TUBE x3
        //   │   └── PAINT x1
        //   └── WHEEL x2 (自製)
        //       └── SPOKE x36
        let store = InMemoryStore::new()
            .with_bom(
                "BIKE",
                vec![
                    BomComponent::new("FRAME", qty(1)).manufactured().with_sequence(10),
                    BomComponent::new("WHEEL", qty(2)).manufactured().with_sequence(20),
                ],
            )
            .with_bom(
                "FRAME",
                vec![
                    BomComponent::new("TUBE", qty(3)),
                    BomComponent::new("PAINT", qty(1)).with_sequence(20),
                ],
            )
            .with_bom("WHEEL", vec![BomComponent::new("SPOKE", qty(36))]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "BIKE", qty(10), day(30)).unwrap();

        assert_eq!(result.requirements.len(), 5);
        assert!(result.warnings.is_empty());

        let ids: Vec<_> = result
            .requirements
            .iter()
            .map(|r| r.material_id.as_str())
            .collect();
        // 廣度優先：第一層全部在第二層之前
        assert_eq!(ids, vec!["FRAME", "WHEEL", "TUBE", "PAINT", "SPOKE"]);

        let spoke = &result.requirements[4];
        assert_eq!(spoke.gross_quantity, qty(720));
        assert_eq!(spoke.bom_level(), 2);
        assert_eq!(spoke.pegging_chain[0].product_id, "BIKE");
        assert_eq!(spoke.pegging_chain[1].product_id, "WHEEL");
        assert_eq!(spoke.pegging_chain[1].quantity, qty(20));
    }

    #[test]
    fn test_components_follow_sequence_number() {
        let store = InMemoryStore::new().with_bom(
            "P",
            vec![
                BomComponent::new("LAST", qty(1)).with_sequence(30),
                BomComponent::new("FIRST", qty(1)).with_sequence(10),
                BomComponent::new("MIDDLE", qty(1)).with_sequence(20),
            ],
        );

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap();

        let ids: Vec<_> = result
            .requirements
            .iter()
            .map(|r| r.material_id.as_str())
            .collect();
        assert_eq!(ids, vec!["FIRST", "MIDDLE", "LAST"]);
    }

    #[test]
    fn test_scrap_and_lead_time_offset() {
        let store = InMemoryStore::new().with_bom(
            "P",
            vec![BomComponent::new("C", qty(2))
                .with_scrap_percentage(qty(5))
                .with_lead_time(5, 0)],
        );

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P", qty(10), day(30)).unwrap();

        assert_eq!(result.requirements.len(), 1);
        let c = &result.requirements[0];
        assert_eq!(c.gross_quantity, qty(21));
        assert_eq!(c.required_date, day(25));
        assert_eq!(c.demand_source, "P");
    }

    #[test]
    fn test_two_node_cycle_terminates_without_error() {
        let store = InMemoryStore::new()
            .with_bom("A", vec![BomComponent::new("B", qty(1)).manufactured()])
            .with_bom("B", vec![BomComponent::new("A", qty(1)).manufactured()]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "A", qty(1), day(30)).unwrap();

        // A→B 與 B→A 各產生一筆，之後 A 出現在自己的祖先路徑上而停止
        assert_eq!(result.requirements.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, Some(ErrorKind::CircularBom));
        assert_eq!(result.warnings[0].component_id, "A");
    }

    #[test]
    fn test_shared_subassembly_at_same_level_is_expanded_once() {
        let store = InMemoryStore::new()
            .with_bom(
                "TOP",
                vec![
                    BomComponent::new("LEFT", qty(1)).manufactured(),
                    BomComponent::new("RIGHT", qty(1)).manufactured().with_sequence(20),
                ],
            )
            .with_bom("LEFT", vec![BomComponent::new("CORE", qty(1)).manufactured()])
            .with_bom("RIGHT", vec![BomComponent::new("CORE", qty(1)).manufactured()])
            .with_bom("CORE", vec![BomComponent::new("SCREW", qty(4))]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "TOP", qty(1), day(30)).unwrap();

        let screws = result
            .requirements
            .iter()
            .filter(|r| r.material_id == "SCREW")
            .count();
        assert_eq!(screws, 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_depth_ceiling() {
        // P0 → P1 → ... → P51，P51 位於層級 51
        let mut store = InMemoryStore::new();
        for i in 0..51 {
            store = store.with_bom(
                format!("P{}", i),
                vec![BomComponent::new(format!("P{}", i + 1), qty(1)).manufactured()],
            );
        }
        store = store.with_bom("P51", vec![BomComponent::new("RAW", qty(1))]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let err = engine.explode(&ctx(), "P0", qty(1), day(30)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MaxDepthExceeded);
        assert_eq!(err.product_id(), Some("P51"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_depth_at_ceiling_is_allowed() {
        let mut store = InMemoryStore::new();
        for i in 0..50 {
            store = store.with_bom(
                format!("P{}", i),
                vec![BomComponent::new(format!("P{}", i + 1), qty(1)).manufactured()],
            );
        }
        store = store.with_bom("P50", vec![BomComponent::new("RAW", qty(1))]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P0", qty(1), day(30)).unwrap();

        assert_eq!(result.requirements.len(), 51);
        let raw = result.requirements.last().unwrap();
        assert_eq!(raw.pegging_chain.len(), 51);
    }

    #[test]
    fn test_quantity_overflow_on_deep_multiplier_chain() {
        // P0 → ... → P35，每層用量 10；P29 的毛需求 10^29 超出 Decimal 範圍
        let mut store = InMemoryStore::new();
        for i in 0..35 {
            store = store.with_bom(
                format!("P{}", i),
                vec![BomComponent::new(format!("P{}", i + 1), qty(10)).manufactured()],
            );
        }

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let err = engine.explode(&ctx(), "P0", qty(1), day(30)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidMasterData);
        assert_eq!(err.material_id(), Some("P29"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_root_bom() {
        let store = InMemoryStore::new();
        let engine = BomExplosionEngine::new(&store, EngineConfig::default());

        let err = engine.explode(&ctx(), "GHOST", qty(1), day(30)).unwrap_err();
        assert_eq!(
            err,
            MrpError::MissingBom {
                product_id: "GHOST".to_string()
            }
        );
    }

    #[test]
    fn test_manufactured_leaf_without_bom_is_not_an_error() {
        let store = InMemoryStore::new()
            .with_bom("P", vec![BomComponent::new("SUB", qty(1)).manufactured()]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap();

        assert_eq!(result.requirements.len(), 1);
    }

    #[test]
    fn test_phantom_and_purchased_are_leaves() {
        let store = InMemoryStore::new()
            .with_bom(
                "P",
                vec![
                    BomComponent::new("KIT", qty(1)).manufactured().phantom(),
                    BomComponent::new("BOLT", qty(4)).with_sequence(20),
                ],
            )
            .with_bom("KIT", vec![BomComponent::new("WASHER", qty(2))])
            .with_bom("BOLT", vec![BomComponent::new("STEEL", qty(1))]);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap();

        let ids: Vec<_> = result
            .requirements
            .iter()
            .map(|r| r.material_id.as_str())
            .collect();
        assert_eq!(ids, vec!["KIT", "BOLT"]);
    }

    #[test]
    fn test_negative_lead_time_fails_the_run() {
        let store = InMemoryStore::new().with_bom(
            "P",
            vec![
                BomComponent::new("OK", qty(1)),
                BomComponent::new("BAD", qty(1)).with_lead_time(-1, 0).with_sequence(20),
            ],
        );

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let err = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidLeadTime);
        assert_eq!(err.material_id(), Some("BAD"));
    }

    #[test]
    fn test_expired_bom_rows_are_ignored() {
        let store = InMemoryStore::new()
            .with_bom("P", vec![BomComponent::new("CURRENT", qty(1))])
            .with_dated_bom_row(
                "P",
                BomComponent::new("RETIRED", qty(1)),
                None,
                Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
                true,
            )
            .with_dated_bom_row("P", BomComponent::new("INACTIVE", qty(1)), None, None, false);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let result = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap();

        assert_eq!(result.requirements.len(), 1);
        assert_eq!(result.requirements[0].material_id, "CURRENT");
    }

    #[test]
    fn test_bom_read_failure_propagates() {
        let store = InMemoryStore::new()
            .with_bom("P", vec![BomComponent::new("C", qty(1))])
            .with_failure(FailurePoint::Bom);

        let engine = BomExplosionEngine::new(&store, EngineConfig::default());
        let err = engine.explode(&ctx(), "P", qty(1), day(30)).unwrap_err();

        assert!(err.is_retryable());
    }

    #[test]
    fn test_explode_demand_uses_source_ref() {
        let store = InMemoryStore::new().with_bom("P", vec![BomComponent::new("C", qty(1))]);
        let engine = BomExplosionEngine::new(&store, EngineConfig::default());

        let demand = Demand::new("P", qty(3), day(30)).with_source_ref("SO-1001");
        let result = engine.explode_demand(&ctx(), &demand).unwrap();

        assert_eq!(result.requirements[0].demand_source, "SO-1001");
        assert_eq!(result.requirements[0].gross_quantity, qty(3));
    }
}
