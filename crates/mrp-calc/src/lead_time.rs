//! 交期計算

use chrono::NaiveDate;
use mrp_core::{MrpError, Result, WorkCalendar};

/// 交期計算器
pub struct LeadTimeCalculator;

impl LeadTimeCalculator {
    /// 子件需求日期 = 父件需求日期 - (提前期 + 安全提前期)
    pub fn calculate_required_date(
        material_id: &str,
        due_date: NaiveDate,
        lead_time_days: i32,
        safety_lead_time_days: i32,
        calendar: &WorkCalendar,
    ) -> Result<NaiveDate> {
        let lead = Self::validate(material_id, lead_time_days)?;
        let safety = Self::validate(material_id, safety_lead_time_days)?;
        Self::offset_backward(material_id, due_date, lead + safety, calendar)
    }

    /// 下單日期 = 需求日期 - 提前期
    pub fn calculate_order_date(
        material_id: &str,
        required_date: NaiveDate,
        lead_time_days: i32,
        calendar: &WorkCalendar,
    ) -> Result<NaiveDate> {
        let lead = Self::validate(material_id, lead_time_days)?;
        Self::offset_backward(material_id, required_date, lead, calendar)
    }

    fn validate(material_id: &str, days: i32) -> Result<u32> {
        u32::try_from(days).map_err(|_| MrpError::InvalidLeadTime {
            material_id: material_id.to_string(),
            days: i64::from(days),
        })
    }

    fn offset_backward(
        material_id: &str,
        date: NaiveDate,
        days: u32,
        calendar: &WorkCalendar,
    ) -> Result<NaiveDate> {
        calendar
            .subtract_working_days(date, days)
            .ok_or_else(|| MrpError::InvalidMasterData {
                material_id: material_id.to_string(),
                message: format!("{} 往前推 {} 天超出日期範圍", date, days),
            })
    }
}
