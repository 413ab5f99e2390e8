use clap::Subcommand;
use rhythm_core::storage::Database;
use rhythm_core::StatisticsAggregator;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's summary: minutes worked, cycles, overall mood
    Today,
    /// All-time counts
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let stats = StatisticsAggregator::refresh(&db)?;
            println!("{}", serde_json::to_string_pretty(&stats.daily)?);
        }
        StatsAction::All => {
            let stats = db.statistics()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
