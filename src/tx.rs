// Transformation Module
use crate::error::{Error, Result};
use crate::timestamps::{DAY_OF_MONTH, HOUR_OF_DAY};
use polars::prelude::*;
use std::collections::HashSet;

pub const VISIT_COUNT: &str = "visit_count";

/// Looks up a column, reporting absence as a schema problem.
pub fn column<'a>(table: &'a DataFrame, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .map_err(|_| Error::Schema(format!("expected column '{name}' is missing")))
}

pub fn require(table: &DataFrame, names: &[&str]) -> Result<()> {
    for name in names {
        column(table, name)?;
    }
    Ok(())
}

pub fn has_column(table: &DataFrame, name: &str) -> bool {
    table.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Drops users who never finished registering (null `created_at`).
pub fn drop_unregistered(users: &DataFrame) -> Result<DataFrame> {
    require(users, &["created_at"])?;

    Ok(users
        .clone()
        .lazy()
        .filter(col("created_at").is_not_null())
        .collect()?)
}

/// `user_id`s of users whose email is on the ignore list.
pub fn excluded_user_ids(users: &DataFrame, emails: &[String]) -> Result<Series> {
    require(users, &["user_id", "email"])?;
    let ignored = Series::new(PlSmallStr::from_str("ignored"), emails);

    let ids = users
        .clone()
        .lazy()
        .filter(col("email").cast(DataType::String).is_in(lit(ignored)))
        .select([col("user_id")])
        .collect()?;

    Ok(column(&ids, "user_id")?.as_materialized_series().clone())
}

/// Removes rows whose `user_id` is in `ids`. Rows with no `user_id` stay.
pub fn exclude_users(table: &DataFrame, ids: &Series) -> Result<DataFrame> {
    let dtype = column(table, "user_id")?.dtype().clone();
    let ids = ids.cast(&dtype)?;

    Ok(table
        .clone()
        .lazy()
        .filter(
            col("user_id")
                .is_in(lit(ids))
                .fill_null(lit(false))
                .not(),
        )
        .collect()?)
}

/// Left merge with pandas-style suffixes on every shared column name.
///
/// Both key columns are kept. If the key types differ the left key is cast
/// to the right key's type first.
pub fn merge_with_suffixes(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &str,
    right_on: &str,
    suffixes: (&str, &str),
) -> Result<DataFrame> {
    require(left, &[left_on])?;
    require(right, &[right_on])?;

    let mut left = left.clone();
    let mut right = right.clone();
    let mut left_key = left_on.to_string();
    let mut right_key = right_on.to_string();

    let right_names: HashSet<String> = right
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let shared: Vec<String> = left
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .filter(|n| right_names.contains(n))
        .collect();

    for name in &shared {
        let left_name = format!("{name}{}", suffixes.0);
        let right_name = format!("{name}{}", suffixes.1);
        left.rename(name, PlSmallStr::from_str(&left_name))?;
        right.rename(name, PlSmallStr::from_str(&right_name))?;
        if left_key == *name {
            left_key = left_name;
        }
        if right_key == *name {
            right_key = right_name;
        }
    }

    let right_dtype = column(&right, &right_key)?.dtype().clone();
    if column(&left, &left_key)?.dtype() != &right_dtype {
        let cast = column(&left, &left_key)?.cast(&right_dtype)?;
        left.with_column(cast)?;
    }

    Ok(left
        .lazy()
        .join_builder()
        .with(right.lazy())
        .left_on([col(left_key.as_str())])
        .right_on([col(right_key.as_str())])
        .how(JoinType::Left)
        .coalesce(JoinCoalesce::KeepColumns)
        .maintain_order(MaintainOrderJoin::Left)
        .finish()
        .collect()?)
}

/// Visits per (day_of_month, hour_of_day); only cells with a visit appear.
pub fn count_by_day_hour(visits: &DataFrame) -> Result<DataFrame> {
    require(visits, &[DAY_OF_MONTH, HOUR_OF_DAY])?;

    Ok(visits
        .clone()
        .lazy()
        .filter(col(DAY_OF_MONTH).is_not_null().and(col(HOUR_OF_DAY).is_not_null()))
        .group_by([col(DAY_OF_MONTH), col(HOUR_OF_DAY)])
        .agg([len().cast(DataType::Int64).alias(VISIT_COUNT)])
        .sort([DAY_OF_MONTH, HOUR_OF_DAY], SortMultipleOptions::default())
        .collect()?)
}

/// Every `days` × 0..24 cell, zero where `actual` has no count.
pub fn complete_grid(actual: &DataFrame, days: &[u32]) -> Result<DataFrame> {
    require(actual, &[DAY_OF_MONTH, HOUR_OF_DAY, VISIT_COUNT])?;

    let (day_col, hour_col): (Vec<i32>, Vec<i32>) = days
        .iter()
        .flat_map(|&day| (0..24).map(move |hour| (day as i32, hour)))
        .unzip();

    let grid = DataFrame::new(vec![
        Column::new(PlSmallStr::from_str(DAY_OF_MONTH), day_col),
        Column::new(PlSmallStr::from_str(HOUR_OF_DAY), hour_col),
    ])?;

    Ok(grid
        .lazy()
        .join(
            actual.clone().lazy(),
            [col(DAY_OF_MONTH), col(HOUR_OF_DAY)],
            [col(DAY_OF_MONTH), col(HOUR_OF_DAY)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(VISIT_COUNT).fill_null(lit(0i64)))
        .sort([DAY_OF_MONTH, HOUR_OF_DAY], SortMultipleOptions::default())
        .collect()?)
}
