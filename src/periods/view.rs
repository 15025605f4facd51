use serde::{Deserialize, Serialize};

/// Which version of a branch board the consumer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewMode {
    Live,
    Frozen { year: i32, month: u32 },
}

/// Request parameters selecting the view: `?frozen=1&year=2025&month=3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub frozen: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewModeError {
    #[error("frozen view requires both year and month")]
    MissingPeriod,
    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),
}

impl ViewQuery {
    fn frozen_requested(&self) -> bool {
        match self.frozen.as_deref().map(str::trim) {
            None => false,
            Some(flag) => !matches!(
                flag.to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
        }
    }

    /// Without the frozen flag the view is live, whatever else was passed.
    pub fn view_mode(&self) -> Result<ViewMode, ViewModeError> {
        if !self.frozen_requested() {
            return Ok(ViewMode::Live);
        }

        match (self.year, self.month) {
            (Some(year), Some(month)) if (1..=12).contains(&month) => {
                Ok(ViewMode::Frozen { year, month })
            }
            (Some(_), Some(month)) => Err(ViewModeError::InvalidMonth(month)),
            _ => Err(ViewModeError::MissingPeriod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(frozen: Option<&str>, year: Option<i32>, month: Option<u32>) -> ViewQuery {
        ViewQuery {
            frozen: frozen.map(str::to_string),
            year,
            month,
        }
    }

    #[test]
    fn absent_flag_means_live() {
        assert_eq!(query(None, Some(2025), Some(3)).view_mode(), Ok(ViewMode::Live));
        assert_eq!(query(Some("0"), None, None).view_mode(), Ok(ViewMode::Live));
    }

    #[test]
    fn flag_with_period_selects_frozen() {
        assert_eq!(
            query(Some("1"), Some(2025), Some(3)).view_mode(),
            Ok(ViewMode::Frozen {
                year: 2025,
                month: 3
            })
        );
        assert_eq!(
            query(Some(""), Some(2024), Some(12)).view_mode(),
            Ok(ViewMode::Frozen {
                year: 2024,
                month: 12
            })
        );
    }

    #[test]
    fn frozen_without_complete_period_is_rejected() {
        assert_eq!(
            query(Some("true"), Some(2025), None).view_mode(),
            Err(ViewModeError::MissingPeriod)
        );
        assert_eq!(
            query(Some("1"), Some(2025), Some(0)).view_mode(),
            Err(ViewModeError::InvalidMonth(0))
        );
    }
}
