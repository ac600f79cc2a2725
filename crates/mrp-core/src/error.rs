//! MRP 錯誤類型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 錯誤種類（對外的穩定標籤）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    CircularBom,
    MaxDepthExceeded,
    MissingBom,
    InvalidLeadTime,
    InventoryQueryFailed,
    DatabaseTimeout,
    ConcurrencyConflict,
    DataAccessFailed,
    InvalidMasterData,
}

impl ErrorKind {
    /// 標籤字串，例如 `MAX_DEPTH_EXCEEDED`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CircularBom => "CIRCULAR_BOM",
            ErrorKind::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            ErrorKind::MissingBom => "MISSING_BOM",
            ErrorKind::InvalidLeadTime => "INVALID_LEAD_TIME",
            ErrorKind::InventoryQueryFailed => "INVENTORY_QUERY_FAILED",
            ErrorKind::DatabaseTimeout => "DATABASE_TIMEOUT",
            ErrorKind::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            ErrorKind::DataAccessFailed => "DATA_ACCESS_FAILED",
            ErrorKind::InvalidMasterData => "INVALID_MASTER_DATA",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MRP 錯誤類型
///
/// 除 `CircularBom` 外，所有錯誤都會中止整個 MRP 執行；
/// 標記為可重試的錯誤表示協調端可以重新執行整個 run。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MrpError {
    #[error("BOM 循環引用: {product_id} (層級 {level})")]
    CircularBom { product_id: String, level: u32 },

    #[error("BOM 層級超過上限 {max_depth}: {product_id} 位於層級 {level}")]
    MaxDepthExceeded {
        product_id: String,
        level: u32,
        max_depth: u32,
    },

    #[error("找不到有效的 BOM: {product_id}")]
    MissingBom { product_id: String },

    #[error("無效的提前期: {material_id} 提前期 {days} 天")]
    InvalidLeadTime { material_id: String, days: i64 },

    #[error("庫存查詢失敗: {message}")]
    InventoryQueryFailed { message: String },

    #[error("資料庫逾時: {message}")]
    DatabaseTimeout { message: String },

    /// 保留：目前管線中沒有任何地方會產生此錯誤
    #[error("並行衝突: {message}")]
    ConcurrencyConflict { message: String },

    #[error("資料存取失敗 ({operation}): {message}")]
    DataAccessFailed { operation: String, message: String },

    #[error("無效的主檔資料 ({material_id}): {message}")]
    InvalidMasterData { material_id: String, message: String },
}

impl MrpError {
    /// 錯誤種類
    pub fn kind(&self) -> ErrorKind {
        match self {
            MrpError::CircularBom { .. } => ErrorKind::CircularBom,
            MrpError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
            MrpError::MissingBom { .. } => ErrorKind::MissingBom,
            MrpError::InvalidLeadTime { .. } => ErrorKind::InvalidLeadTime,
            MrpError::InventoryQueryFailed { .. } => ErrorKind::InventoryQueryFailed,
            MrpError::DatabaseTimeout { .. } => ErrorKind::DatabaseTimeout,
            MrpError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            MrpError::DataAccessFailed { .. } => ErrorKind::DataAccessFailed,
            MrpError::InvalidMasterData { .. } => ErrorKind::InvalidMasterData,
        }
    }

    /// 協調端是否可以重試整個 run
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MrpError::InventoryQueryFailed { .. }
                | MrpError::DatabaseTimeout { .. }
                | MrpError::ConcurrencyConflict { .. }
                | MrpError::DataAccessFailed { .. }
        )
    }

    /// 是否為可恢復的異常（不中止 run）
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MrpError::CircularBom { .. })
    }

    /// 相關產品ID
    pub fn product_id(&self) -> Option<&str> {
        match self {
            MrpError::CircularBom { product_id, .. }
            | MrpError::MaxDepthExceeded { product_id, .. }
            | MrpError::MissingBom { product_id } => Some(product_id),
            _ => None,
        }
    }

    /// 相關物料ID
    pub fn material_id(&self) -> Option<&str> {
        match self {
            MrpError::InvalidLeadTime { material_id, .. }
            | MrpError::InvalidMasterData { material_id, .. } => Some(material_id),
            _ => None,
        }
    }

    /// 資料存取失敗的便捷建構
    pub fn data_access(operation: impl Into<String>, message: impl Into<String>) -> Self {
        MrpError::DataAccessFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// 給操作人員看的摘要：`run failed: <kind>, <message>`
    pub fn operator_summary(&self) -> String {
        format!("run failed: {}, {}", self.kind(), self)
    }
}

pub type Result<T> = std::result::Result<T, MrpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MrpError::MissingBom { product_id: "P".into() }, "MISSING_BOM", false)]
    #[case(MrpError::InventoryQueryFailed { message: "x".into() }, "INVENTORY_QUERY_FAILED", true)]
    #[case(MrpError::DatabaseTimeout { message: "x".into() }, "DATABASE_TIMEOUT", true)]
    #[case(MrpError::InvalidLeadTime { material_id: "M".into(), days: -1 }, "INVALID_LEAD_TIME", false)]
    fn test_kind_and_retryable(
        #[case] error: MrpError,
        #[case] label: &str,
        #[case] retryable: bool,
    ) {
        assert_eq!(error.kind().as_str(), label);
        assert_eq!(error.is_retryable(), retryable);
    }

    #[test]
    fn test_offending_ids() {
        let err = MrpError::MaxDepthExceeded {
            product_id: "ASSY-51".to_string(),
            level: 51,
            max_depth: 50,
        };
        assert_eq!(err.product_id(), Some("ASSY-51"));
        assert_eq!(err.material_id(), None);
        assert!(!err.is_recoverable());

        let err = MrpError::InvalidLeadTime {
            material_id: "BOLT".to_string(),
            days: -3,
        };
        assert_eq!(err.material_id(), Some("BOLT"));
    }

    #[test]
    fn test_operator_summary() {
        let err = MrpError::MissingBom {
            product_id: "BIKE".to_string(),
        };
        assert!(err.operator_summary().starts_with("run failed: MISSING_BOM, "));
    }
}
