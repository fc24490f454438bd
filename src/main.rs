// Visit report loader: prints the dashboard JSON to stdout
use anyhow::Result;
use resto_week::config::Config;
use resto_week::source::TableDir;
use resto_week::visits::VisitAggregator;
use resto_week::{logging, records};
use std::io::Write;

fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.general.log_level);

    let source = TableDir::new(&config.source.data_dir);
    let report = VisitAggregator::new(&config.visits)?.load(&source)?;

    let json = records::to_pretty_json(&records::visit_report(&report)?)?;
    let mut out = std::io::stdout().lock();
    out.write_all(json.as_bytes())?;
    out.flush()?;

    tracing::info!(check_ins = report.stats.total_check_ins, "visit report written");
    Ok(())
}
