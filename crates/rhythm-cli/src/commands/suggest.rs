use clap::Args;
use rhythm_core::suggest::FixedCoin;
use rhythm_core::{BreakSuggester, Config, Mood, SuggestionRequest};

#[derive(Args)]
pub struct SuggestArgs {
    /// Minutes worked since the last break
    #[arg(long, default_value = "25")]
    worked: f64,
    /// Break length in minutes
    #[arg(long = "break", default_value = "5")]
    break_minutes: f64,
    /// Current mood (tired, good, stressed, keep_going)
    #[arg(long)]
    mood: Option<Mood>,
    /// Try a video first
    #[arg(long, conflicts_with = "text")]
    video: bool,
    /// Skip the video search
    #[arg(long)]
    text: bool,
}

pub fn run(args: SuggestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut suggester = BreakSuggester::from_config(&config.providers);
    if args.video || args.text {
        suggester = suggester.with_coin(FixedCoin(args.video));
    }

    let request = SuggestionRequest {
        worked_for_minutes: args.worked,
        break_minutes: args.break_minutes,
        mood: args.mood,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let suggestion = runtime.block_on(suggester.suggest(&request));

    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}
