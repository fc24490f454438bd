// Prize drawing: announces the music fest and raffle winners
use anyhow::Result;
use resto_week::config::Config;
use resto_week::logging;
use resto_week::source::TableDir;
use resto_week::winners::EntrantSelector;
use std::io::Write;

fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.general.log_level);

    let selector = EntrantSelector::new(&config.drawing);
    let result = selector.load(&TableDir::new(&config.source.data_dir))?;

    let selected_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    let mut out = std::io::stdout().lock();
    out.write_all(result.announcement(selector.seed(), &selected_at).as_bytes())?;
    out.flush()?;
    Ok(())
}
