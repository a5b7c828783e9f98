use super::{SeasonId, SiteId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Site-specific agricultural season.
///
/// A "winter" season has `end_date < start_date` within one calendar year and
/// is normalised by the season resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub site_id: SiteId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub enabled: bool,
}

impl Season {
    pub fn new(
        id: SeasonId,
        site_id: SiteId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        enabled: bool,
    ) -> Self {
        Self {
            id,
            site_id,
            name: name.into(),
            start_date,
            end_date,
            enabled,
        }
    }

    pub fn is_winter(&self) -> bool {
        self.end_date < self.start_date
    }
}
