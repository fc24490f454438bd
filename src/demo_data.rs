// Fixture tables for the test suites
use crate::config::Visits;
use crate::source::Tables;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const STAFF_EMAIL: &str = "b@staff.org";

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn visits_config() -> Visits {
    Visits {
        ignored_emails: vec![STAFF_EMAIL.to_string()],
        window_start: at(8, 0, 0, 0),
        window_end: at(15, 23, 59, 59),
        time_zone: "US/Eastern".to_string(),
    }
}

fn users() -> DataFrame {
    df!(
        "user_id" => [1i64, 2, 3],
        "name" => ["Ann", "Bea", "Cal"],
        "email" => ["a@x.com", STAFF_EMAIL, "c@x.com"],
        "phone" => [Some("0123456789"), None, Some("5550001111")],
        "created_at" => [Some("2025-02-20 09:00:00"), Some("2025-02-21 10:00:00"), None],
    )
    .unwrap()
}

fn restaurants() -> DataFrame {
    df!(
        "id" => [10i64, 20, 30],
        "name" => ["Luigi's", "Thai Palace", "The Grill"],
    )
    .unwrap()
}

/// Ann visits before the window and during it; Bea is staff.
pub fn small_tables() -> Tables {
    let visits = df!(
        "visit_id" => [1i64, 2, 3],
        "user_id" => [1i64, 1, 2],
        "restaurant_id" => [10i64, 10, 20],
        "created_at" => ["2025-03-07 18:00:00", "2025-03-09 12:00:00", "2025-03-10 19:30:00"],
    )
    .unwrap();

    let mut tables = Tables::new();
    tables.insert("users", users());
    tables.insert("visits", visits);
    tables.insert("restaurants", restaurants());
    tables
}

pub fn empty_visits() -> DataFrame {
    DataFrame::new(vec![
        Column::new_empty(PlSmallStr::from_str("visit_id"), &DataType::Int64),
        Column::new_empty(PlSmallStr::from_str("user_id"), &DataType::Int64),
        Column::new_empty(PlSmallStr::from_str("restaurant_id"), &DataType::Int64),
        Column::new_empty(PlSmallStr::from_str("created_at"), &DataType::String),
    ])
    .unwrap()
}

/// A few hundred naive check-ins spread from two days before the window to two days after.
pub fn week_tables() -> Tables {
    let n_visits: i64 = 400;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let first = at(6, 0, 0, 0);

    let user_ids = (0..n_visits).map(|_| rng.random_range(1..=3)).collect::<Vec<i64>>();
    let restaurant_ids = (0..n_visits)
        .map(|_| [10i64, 20, 30][rng.random_range(0..3)])
        .collect::<Vec<i64>>();
    let created_at = (0..n_visits)
        .map(|_| {
            let offset = TimeDelta::minutes(rng.random_range(0..12 * 24 * 60));
            (first + offset).format("%Y-%m-%d %H:%M:%S").to_string()
        })
        .collect::<Vec<String>>();

    let visits = df!(
        "visit_id" => (1..=n_visits).collect::<Vec<i64>>(),
        "user_id" => user_ids,
        "restaurant_id" => restaurant_ids,
        "created_at" => created_at,
    )
    .unwrap();

    let mut tables = Tables::new();
    tables.insert("users", users());
    tables.insert("visits", visits);
    tables.insert("restaurants", restaurants());
    tables
}

/// Check-ins joined with their users, as the drawing reads them.
pub fn entries() -> DataFrame {
    df!(
        "visit_id" => [1i64, 2, 3, 4, 5],
        "name_user" => ["Ann", "Ann", "Dee", "Eve", "Dee"],
        "email" => ["a@x.com", "a@x.com", "d@x.com", "e@x.com", "d@x.com"],
        "phone" => [Some("0123456789"), Some("0123456789"), None, Some("5550002222"), None],
    )
    .unwrap()
}
