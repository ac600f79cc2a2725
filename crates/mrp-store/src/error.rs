//! 儲存層錯誤類型

use mrp_core::MrpError;
use thiserror::Error;

/// 儲存層錯誤
#[derive(Error, Debug)]
pub enum StoreError {
    /// 資料庫忙碌或被鎖定（busy_timeout 已耗盡）
    #[error("資料庫忙碌: {0}")]
    Busy(String),

    #[error("資料庫鎖獲取失敗: {0}")]
    LockError(String),

    #[error("資料庫查詢失敗: {0}")]
    DatabaseQueryError(String),

    /// 資料列無法解析成具型別的紀錄
    #[error("欄位值錯誤 (material_id={material_id}, field={field}): {message}")]
    FieldValueError {
        material_id: String,
        field: String,
        message: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Busy(err.to_string())
            }
            _ => StoreError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl StoreError {
    /// 轉成引擎錯誤；`operation` 標示失敗的存取
    pub fn into_mrp(self, operation: &str) -> MrpError {
        match self {
            StoreError::Busy(message) => MrpError::DatabaseTimeout { message },
            StoreError::FieldValueError {
                material_id,
                field,
                message,
            } => MrpError::InvalidMasterData {
                material_id,
                message: format!("{}: {}", field, message),
            },
            other => MrpError::data_access(operation, other.to_string()),
        }
    }

    /// 庫存與預計收貨查詢的錯誤分類
    pub fn into_inventory_failure(self) -> MrpError {
        match self {
            StoreError::DatabaseQueryError(message) | StoreError::LockError(message) => {
                MrpError::InventoryQueryFailed { message }
            }
            other => other.into_mrp("inventory"),
        }
    }
}

/// Result 類型別名
pub type StoreResult<T> = Result<T, StoreError>;
