//! # Season Resolution
//!
//! Pure functions mapping a site's seasons, a scheduling date and an optional
//! explicit season override to a concrete `[start, end]` window.
//!
//! ## Policies
//!
//! The policies differ in what an explicit season override means when its
//! date test fails:
//!
//! - [`SeasonPolicy::StartEndDates`] treats the override as a preference: when the
//!   date is outside the overridden season the generic search runs.
//! - [`SeasonPolicy::BestMatch`] treats the override as authoritative and returns
//!   the season's raw bounds unconditionally. When nothing contains the date it
//!   also falls back to the most recently ended season.
//!
//! Under both policies an override naming a disabled season is a hard failure.

use crate::config::ConfigurationParameterValueMap;
use crate::constants::keys::SITE_SEASON_ID;
use crate::error::{OrchestratorError, Result};
use crate::models::{Season, SeasonId, SiteId};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Resolved season interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub season_id: SeasonId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPolicy {
    /// Override must contain the date, otherwise search all enabled seasons
    StartEndDates,
    /// Override wins unconditionally; latest ended season is the last resort
    BestMatch,
}

/// Test whether `date` falls within a season, accepting dates up to one month
/// after its end. Returns the normalised `(start, end)` bounds on success.
pub fn is_in_season(
    start: NaiveDate,
    end: NaiveDate,
    date: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let normalized_start = if end < start {
        start.checked_sub_months(Months::new(12))?
    } else {
        start
    };
    let limit = end.checked_add_months(Months::new(1))?;

    (date >= normalized_start && date <= limit).then_some((normalized_start, end))
}

/// Read the `site_season_id` override. Unparseable or negative values are
/// logged and treated as absent.
pub fn season_override(overrides: &ConfigurationParameterValueMap) -> Option<SeasonId> {
    let raw = overrides.get_non_empty(SITE_SEASON_ID)?;
    match raw.parse::<SeasonId>() {
        Ok(id) if id >= 0 => Some(id),
        Ok(id) => {
            warn!(season_id = id, "Ignoring negative site season override");
            None
        }
        Err(_) => {
            warn!(value = %raw, "Ignoring unparseable site season override");
            None
        }
    }
}

/// Resolve the season window for `date` on a site.
pub fn resolve_season(
    site_id: SiteId,
    seasons: &[Season],
    date: NaiveDate,
    overrides: &ConfigurationParameterValueMap,
    policy: SeasonPolicy,
) -> Result<SeasonWindow> {
    if let Some(season_id) = season_override(overrides) {
        match seasons.iter().find(|s| s.id == season_id) {
            Some(season) if !season.enabled => {
                warn!(site_id, season_id, "Requested season is disabled");
                return Err(OrchestratorError::InvalidSeasonOverride { site_id, season_id });
            }
            Some(season) => match policy {
                SeasonPolicy::BestMatch => {
                    debug!(site_id, season_id, "Using requested season bounds");
                    return Ok(raw_window(season));
                }
                SeasonPolicy::StartEndDates => {
                    if let Some((start, end)) =
                        is_in_season(season.start_date, season.end_date, date)
                    {
                        return Ok(SeasonWindow {
                            season_id,
                            start,
                            end,
                        });
                    }
                    info!(
                        site_id,
                        season_id,
                        %date,
                        "Requested season does not contain the date, searching all seasons"
                    );
                }
            },
            None => {
                warn!(site_id, season_id, "Requested season does not exist for site");
            }
        }
    }

    let enabled = || seasons.iter().filter(|s| s.enabled);

    for season in enabled() {
        if let Some((start, end)) = is_in_season(season.start_date, season.end_date, date) {
            return Ok(SeasonWindow {
                season_id: season.id,
                start,
                end,
            });
        }
    }

    if policy == SeasonPolicy::BestMatch {
        if let Some(latest) = enabled()
            .filter(|s| date >= s.end_date)
            .max_by_key(|s| s.end_date)
        {
            debug!(
                site_id,
                season_id = latest.id,
                "No season contains the date, using the latest ended season"
            );
            return Ok(raw_window(latest));
        }
    }

    Err(OrchestratorError::SeasonResolution { site_id, date })
}

fn raw_window(season: &Season) -> SeasonWindow {
    SeasonWindow {
        season_id: season.id,
        start: season.start_date,
        end: season.end_date,
    }
}
