use eyre::Result;

/// Placeholder for the interactive browser; conversion is the only
/// implemented surface.
pub fn run() -> Result<()> {
    println!("Interactive mode is not implemented yet. Please use `convert` for now.");
    Ok(())
}
