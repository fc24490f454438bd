// Visit Aggregation Module
use crate::config::{DateWindow, Visits};
use crate::error::Result;
use crate::source::{DataSource, Tables};
use crate::timestamps::{self, ZoneBasis};
use crate::tx;
use chrono_tz::Tz;
use polars::prelude::*;
use serde::Serialize;

pub const ENTITIES: [&str; 3] = ["users", "visits", "restaurants"];

const CREATED_AT: &str = "created_at";
const SUFFIXES: (&str, &str) = ("_visits", "_restaurants");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    pub visited_restaurants: usize,
    pub total_check_ins: usize,
}

/// Output of one aggregation run.
#[derive(Debug, Clone)]
pub struct VisitReport {
    pub users: DataFrame,
    pub visits: DataFrame,
    pub restaurants: DataFrame,
    pub complete_counts: DataFrame,
    pub actual_counts: DataFrame,
    pub stats: VisitStats,
    /// Basis detected on the raw visit timestamps.
    pub zone_basis: ZoneBasis,
}

pub struct VisitAggregator {
    ignored_emails: Vec<String>,
    window: DateWindow,
    zone: Tz,
}

impl VisitAggregator {
    pub fn new(config: &Visits) -> Result<Self> {
        Ok(Self {
            ignored_emails: config.ignored_emails.clone(),
            window: config.window(),
            zone: config.zone()?,
        })
    }

    pub fn load(&self, source: &impl DataSource) -> Result<VisitReport> {
        self.run(source.get_data(&ENTITIES)?)
    }

    pub fn run(&self, mut tables: Tables) -> Result<VisitReport> {
        let users = tables.take("users")?;
        let visits = tables.take("visits")?;
        let restaurants = tables.take("restaurants")?;
        tracing::info!(
            users = users.height(),
            visits = visits.height(),
            restaurants = restaurants.height(),
            "tables loaded"
        );

        // Registration, then identity exclusion
        let users = tx::drop_unregistered(&users)?;
        let excluded = tx::excluded_user_ids(&users, &self.ignored_emails)?;
        let users = tx::exclude_users(&users, &excluded)?;
        let visits = tx::exclude_users(&visits, &excluded)?;
        tracing::info!(
            excluded_users = excluded.len(),
            users = users.height(),
            visits = visits.height(),
            "identity filters applied"
        );

        // Promotion window
        let (visits, zone_basis) = self.within_window(visits)?;
        tracing::info!(?zone_basis, visits = visits.height(), "window filter applied");

        let stats = VisitStats {
            visited_restaurants: tx::column(&visits, "restaurant_id")?.drop_nulls().n_unique()?,
            total_check_ins: visits.height(),
        };
        tracing::info!(
            visited_restaurants = stats.visited_restaurants,
            total_check_ins = stats.total_check_ins,
            "stats"
        );

        // Restaurant names
        let shared_created_at = tx::has_column(&restaurants, CREATED_AT);
        let visits = tx::merge_with_suffixes(&visits, &restaurants, "restaurant_id", "id", SUFFIXES)?;
        let visit_ts = if shared_created_at {
            format!("{CREATED_AT}{}", SUFFIXES.0)
        } else {
            CREATED_AT.to_string()
        };

        // Local time
        let visits = visits
            .lazy()
            .with_column(timestamps::to_zone(&visit_ts, zone_basis, self.zone))
            .with_columns(timestamps::calendar_features(&visit_ts))
            .collect()?;
        let users = self.users_in_zone(users)?;

        let actual_counts = tx::count_by_day_hour(&visits)?;
        let complete_counts = tx::complete_grid(&actual_counts, &self.window.days_of_month())?;
        tracing::debug!(
            occupied_cells = actual_counts.height(),
            grid_cells = complete_counts.height(),
            "day/hour counts"
        );

        Ok(VisitReport {
            users,
            visits,
            restaurants,
            complete_counts,
            actual_counts,
            stats,
            zone_basis,
        })
    }

    fn within_window(&self, mut visits: DataFrame) -> Result<(DataFrame, ZoneBasis)> {
        let (created, basis) = timestamps::normalize(tx::column(&visits, CREATED_AT)?)?;
        visits.with_column(created)?;

        let visits = visits
            .lazy()
            .filter(timestamps::in_window(CREATED_AT, &self.window))
            .collect()?;
        Ok((visits, basis))
    }

    fn users_in_zone(&self, mut users: DataFrame) -> Result<DataFrame> {
        let (created, basis) = timestamps::normalize(tx::column(&users, CREATED_AT)?)?;
        users.with_column(created)?;

        Ok(users
            .lazy()
            .with_column(timestamps::to_zone(CREATED_AT, basis, self.zone))
            .collect()?)
    }
}
