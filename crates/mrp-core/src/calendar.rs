//! 工作日曆模型

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// 工作日曆
///
/// 提前期偏移以「工作日」計算；24/7 日曆下等同於日曆天。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// 工作日（週一到週日，true表示工作日）
    /// 索引 0 = 週一, 1 = 週二, ..., 6 = 週日
    pub working_days: [bool; 7],

    /// 節假日列表
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// 日曆ID
    pub calendar_id: String,
}

impl WorkCalendar {
    /// 創建新的工作日曆（預設週一到週五為工作日）
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            working_days: [true, true, true, true, true, false, false],
            calendar_id: calendar_id.into(),
            holidays: Vec::new(),
        }
    }

    /// 創建 24/7 日曆（所有日子都是工作日）
    pub fn new_24_7(calendar_id: impl Into<String>) -> Self {
        Self {
            working_days: [true; 7],
            calendar_id: calendar_id.into(),
            holidays: Vec::new(),
        }
    }

    /// 創建降級日曆：沒有排班資料時以日曆天計算
    pub fn fallback_calendar() -> Self {
        Self::new_24_7("FALLBACK-24/7")
    }

    /// 建構器模式：設置工作日
    pub fn with_working_days(mut self, working_days: [bool; 7]) -> Self {
        self.working_days = working_days;
        self
    }

    /// 建構器模式：設置節假日
    pub fn with_holidays(mut self, mut holidays: Vec<NaiveDate>) -> Self {
        holidays.sort();
        holidays.dedup();
        self.holidays = holidays;
        self
    }

    /// 添加節假日
    pub fn add_holiday(&mut self, date: NaiveDate) {
        if let Err(pos) = self.holidays.binary_search(&date) {
            self.holidays.insert(pos, date);
        }
    }

    /// 檢查是否為工作日
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.holidays.contains(&date) {
            return false;
        }

        let weekday_index = date.weekday().num_days_from_monday() as usize;
        self.working_days[weekday_index]
    }

    /// 是否每天都是工作日（可直接以日曆天計算）
    fn is_continuous(&self) -> bool {
        self.holidays.is_empty() && self.working_days.iter().all(|&d| d)
    }

    /// 沒有任何工作日時無法逐日推算，退回日曆天
    fn has_working_days(&self) -> bool {
        self.working_days.iter().any(|&d| d)
    }

    /// 向後推算工作日，日期溢出時回傳 None
    pub fn subtract_working_days(&self, start_date: NaiveDate, days: u32) -> Option<NaiveDate> {
        if self.is_continuous() || !self.has_working_days() {
            return start_date.checked_sub_days(Days::new(u64::from(days)));
        }

        let mut current = start_date;
        let mut remaining = days;

        while remaining > 0 {
            current = current.pred_opt()?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }

        Some(current)
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new("DEFAULT")
    }
}
