use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::Args;
use rhythm_core::storage::Database;
use rhythm_core::CycleType;

#[derive(Args)]
pub struct HistoryArgs {
    /// Only cycles of this type (work or break)
    #[arg(long = "type")]
    cycle_type: Option<CycleType>,
    /// First day to include (YYYY-MM-DD, local time)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, local time)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
    /// Show at most this many cycles
    #[arg(long)]
    limit: Option<usize>,
}

/// Local midnight starting `date` as UTC.
fn local_midnight(date: NaiveDate) -> Result<DateTime<Utc>, String> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("no local midnight on {date}"))
}

/// `[start of from, end of to]` in UTC.
fn day_range(from: NaiveDate, to: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let after_to = to
        .succ_opt()
        .ok_or_else(|| format!("date out of range: {to}"))?;
    let end = local_midnight(after_to)? - chrono::Duration::milliseconds(1);
    Ok((local_midnight(from)?, end))
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    let mut cycles = match (args.from, args.to) {
        (Some(from), Some(to)) => {
            if from > to {
                return Err(format!("--from {from} is after --to {to}").into());
            }
            let (start, end) = day_range(from, to)?;
            db.cycles_by_date_range(start, end)?
        }
        _ => match args.cycle_type {
            Some(t) => db.cycles_by_type(t)?,
            None => db.all_cycles()?,
        },
    };

    if let Some(t) = args.cycle_type {
        cycles.retain(|c| c.cycle_type == t);
    }
    if let Some(limit) = args.limit {
        cycles.truncate(limit);
    }

    println!("{}", serde_json::to_string_pretty(&cycles)?);
    Ok(())
}
