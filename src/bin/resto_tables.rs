// Raw table loader: prints users, visits and restaurants as JSON records
use anyhow::Result;
use resto_week::config::Config;
use resto_week::source::{DataSource, TableDir};
use resto_week::visits::ENTITIES;
use resto_week::{logging, records};
use std::io::Write;

fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.general.log_level);

    let tables = TableDir::new(&config.source.data_dir).get_data(&ENTITIES)?;
    let json = records::to_pretty_json(&records::tables(&tables)?)?;

    let mut out = std::io::stdout().lock();
    out.write_all(json.as_bytes())?;
    out.flush()?;
    Ok(())
}
