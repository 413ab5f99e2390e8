use rhythm_core::storage::Database;

pub fn run(yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("refusing to delete history without --yes".into());
    }
    let db = Database::open()?;
    let deleted = db.clear_all_cycles()?;
    println!("{}", serde_json::json!({ "deleted": deleted }));
    Ok(())
}
