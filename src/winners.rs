// Prize Drawing Module
//
// Every unique app user is entered for the music festival tickets. The raffle
// takes every app check-in plus the paper entrants. The seed is published
// ahead of the drawing so anyone can repeat it.
use crate::config::Drawing;
use crate::error::{Error, Result};
use crate::source::DataSource;
use crate::tx;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

pub const ENTRANT_COLUMNS: [&str; 4] = ["name", "email", "phone", "is_app_user"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Entrant tables, all with [`ENTRANT_COLUMNS`].
#[derive(Debug, Clone)]
pub struct EntrantPools {
    /// One row per app check-in.
    pub app_entries: DataFrame,
    /// First check-in per email.
    pub unique_app_entrants: DataFrame,
    /// Every app check-in followed by the paper entrants.
    pub all_entries: DataFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub music_fest_winner: Winner,
    pub raffle_winner: Winner,
}

pub struct EntrantSelector {
    seed: u64,
    entries_table: String,
    name_column: String,
    manual_entrants: Vec<String>,
}

impl EntrantSelector {
    pub fn new(config: &Drawing) -> Self {
        Self {
            seed: config.seed,
            entries_table: config.entries_table.clone(),
            name_column: config.name_column.clone(),
            manual_entrants: config.manual_entrants.clone(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn load(&self, source: &impl DataSource) -> Result<DrawResult> {
        let mut tables = source.get_data(&[self.entries_table.as_str()])?;
        let entries = tables.take(&self.entries_table)?;
        self.draw(&self.pools(&entries)?)
    }

    pub fn pools(&self, entries: &DataFrame) -> Result<EntrantPools> {
        tx::require(entries, &[self.name_column.as_str(), "email", "phone"])?;

        let app_entries = entries
            .clone()
            .lazy()
            .select([
                col(self.name_column.as_str()).cast(DataType::String).alias("name"),
                col("email").cast(DataType::String),
                col("phone").cast(DataType::String),
                lit(true).alias("is_app_user"),
            ])
            .collect()?;

        let unique_app_entrants = app_entries.unique_stable(
            Some(&["email".to_string()]),
            UniqueKeepStrategy::First,
            None,
        )?;

        let all_entries = app_entries.vstack(&manual_roster(&self.manual_entrants)?)?;

        tracing::info!(
            app_entries = app_entries.height(),
            unique_app_entrants = unique_app_entrants.height(),
            all_entries = all_entries.height(),
            "entrant pools built"
        );

        Ok(EntrantPools {
            app_entries,
            unique_app_entrants,
            all_entries,
        })
    }

    pub fn draw(&self, pools: &EntrantPools) -> Result<DrawResult> {
        Ok(DrawResult {
            music_fest_winner: draw_one(&pools.unique_app_entrants, self.seed)?,
            raffle_winner: draw_one(&pools.all_entries, self.seed)?,
        })
    }
}

/// Paper entrants: a name and nothing else.
fn manual_roster(names: &[String]) -> Result<DataFrame> {
    let blanks: Vec<Option<&str>> = vec![None; names.len()];

    Ok(DataFrame::new(vec![
        Column::new(PlSmallStr::from_str("name"), names),
        Column::new(PlSmallStr::from_str("email"), &blanks),
        Column::new(PlSmallStr::from_str("phone"), &blanks),
        Column::new(PlSmallStr::from_str("is_app_user"), vec![false; names.len()]),
    ])?)
}

/// Row index picked for a table of `len` rows.
///
/// A fresh ChaCha8 generator is seeded with `seed_from_u64(seed)` and one
/// `random_range(0..len)` is taken. The same seed and length always give the
/// same index.
pub fn draw_index(len: usize, seed: u64) -> Result<usize> {
    if len == 0 {
        return Err(Error::MissingData(
            "cannot draw a winner from an empty entrant table".to_string(),
        ));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Ok(rng.random_range(0..len))
}

/// Draws one row, in table order, from `table`.
pub fn draw_one(table: &DataFrame, seed: u64) -> Result<Winner> {
    let idx = draw_index(table.height(), seed)?;
    tracing::debug!(idx, rows = table.height(), seed, "winner drawn");

    let text = |name: &str| -> Result<Option<String>> {
        Ok(tx::column(table, name)?.str()?.get(idx).map(str::to_string))
    };

    Ok(Winner {
        name: text("name")?,
        email: text("email")?,
        phone: text("phone")?,
    })
}

struct Shown<'a>(&'a Option<String>);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or("(none)"))
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "user name: {}", Shown(&self.name))?;
        writeln!(f, "email: {}", Shown(&self.email))?;
        write!(f, "phone: {}", Shown(&self.phone))
    }
}

impl DrawResult {
    /// Announcement text, closed by the selection time and the seed used.
    pub fn announcement(&self, seed: u64, selected_at: &str) -> String {
        format!(
            "Announcing the music fest winner! Congratulations!\n{}\n---\n\
             Announcing the raffle winner! Congratulations!\n{}\n---\n\
             Winners selected on {selected_at} using magic number {seed}\n",
            self.music_fest_winner, self.raffle_winner
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data;
    use crate::source::{MemorySource, Tables};

    fn selector() -> EntrantSelector {
        EntrantSelector::new(&Drawing {
            seed: 88434,
            entries_table: "visits_with_users".to_string(),
            name_column: "name_user".to_string(),
            manual_entrants: vec![
                "Ed Galati".to_string(),
                "Kristie Galati".to_string(),
                "Micah Vandall".to_string(),
            ],
        })
    }

    fn emails(df: &DataFrame) -> Vec<Option<String>> {
        df.column("email")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|e| e.map(str::to_string))
            .collect()
    }

    #[test]
    fn duplicate_emails_keep_first_entry() {
        let entries = df!(
            "name_user" => ["First X", "Second X", "Y"],
            "email" => ["x@x.com", "x@x.com", "y@y.com"],
            "phone" => ["1", "2", "3"],
        )
        .unwrap();

        let pools = selector().pools(&entries).unwrap();
        assert_eq!(pools.unique_app_entrants.height(), 2);
        assert_eq!(pools.all_entries.height(), 6);

        let names = pools.unique_app_entrants.column("name").unwrap().str().unwrap();
        assert_eq!(names.get(0), Some("First X"));
        assert_eq!(names.get(1), Some("Y"));
    }

    #[test]
    fn raffle_pool_keeps_duplicates_and_paper_entrants() {
        let pools = selector().pools(&demo_data::entries()).unwrap();

        assert_eq!(pools.app_entries.height(), 5);
        assert_eq!(pools.unique_app_entrants.height(), 3);
        assert_eq!(pools.all_entries.height(), 5 + 3);

        let names: Vec<&str> = pools.all_entries.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ENTRANT_COLUMNS.to_vec());

        let paper = pools.all_entries.slice(5, 3);
        assert_eq!(emails(&paper), vec![None, None, None]);
        let flags: Vec<Option<bool>> =
            paper.column("is_app_user").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(flags, vec![Some(false); 3]);
    }

    #[test]
    fn draws_repeat_for_the_same_seed() {
        let pools = selector().pools(&demo_data::entries()).unwrap();
        let first = selector().draw(&pools).unwrap();
        for _ in 0..5 {
            assert_eq!(selector().draw(&pools).unwrap(), first);
        }
    }

    #[test]
    fn draw_index_is_in_range() {
        for seed in 0..200 {
            assert!(draw_index(8, seed).unwrap() < 8);
        }
        assert_eq!(draw_index(1, 88434).unwrap(), 0);
        assert_eq!(draw_index(8, 88434).unwrap(), draw_index(8, 88434).unwrap());
    }

    #[test]
    fn music_fest_winner_is_an_app_user() {
        let pools = selector().pools(&demo_data::entries()).unwrap();
        let result = selector().draw(&pools).unwrap();
        assert!(result.music_fest_winner.email.is_some());
        assert!(emails(&pools.unique_app_entrants).contains(&result.music_fest_winner.email));
    }

    #[test]
    fn empty_table_cannot_be_drawn() {
        let empty = demo_data::entries().slice(0, 0);
        let pools = selector().pools(&empty).unwrap();
        assert_eq!(pools.all_entries.height(), 3);

        let err = selector().draw(&pools).unwrap_err();
        assert!(matches!(err, Error::MissingData(_)), "got {err:?}");
    }

    #[test]
    fn missing_name_column_is_a_schema_error() {
        let entries = df!("email" => ["x@x.com"], "phone" => ["1"]).unwrap();
        let err = selector().pools(&entries).unwrap_err();
        assert!(matches!(err, Error::Schema(_)), "got {err:?}");
    }

    #[test]
    fn loads_entries_from_the_source() {
        let mut tables = Tables::new();
        tables.insert("visits_with_users", demo_data::entries());

        let result = selector().load(&MemorySource::new(tables)).unwrap();
        let pools = selector().pools(&demo_data::entries()).unwrap();
        assert_eq!(result, selector().draw(&pools).unwrap());
    }

    #[test]
    fn announcement_shows_missing_values() {
        let result = DrawResult {
            music_fest_winner: Winner {
                name: Some("Ann".to_string()),
                email: Some("a@x.com".to_string()),
                phone: None,
            },
            raffle_winner: Winner {
                name: Some("Ed Galati".to_string()),
                email: None,
                phone: None,
            },
        };

        let text = result.announcement(88434, "2025-03-20 10:00:00");
        assert!(text.contains("user name: Ann\nemail: a@x.com\nphone: (none)"));
        assert!(text.contains("user name: Ed Galati\nemail: (none)"));
        assert!(text.ends_with("using magic number 88434\n"));
    }
}
