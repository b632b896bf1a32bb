use eyre::{Context, Result};
use std::path::Path;

/// Convert one file; the direction is detected from its first four bytes.
pub fn run(from: impl AsRef<Path>, to: impl AsRef<Path>, force: bool, debug: bool) -> Result<()> {
    let from = from.as_ref();
    let to = to.as_ref();

    if !from.exists() {
        eyre::bail!("source file {} does not exist", from.display());
    }
    if to.exists() && !force {
        eyre::bail!(
            "destination {} already exists; retype the command with --force to allow overwriting \
             (the explicit flag keeps a real save file from being clobbered by accident)",
            to.display()
        );
    }

    let input = std::fs::read(from).with_context(|| format!("read {}", from.display()))?;

    let output = if crate::is_dson(&input) {
        tracing::info!(path = %from.display(), "input is DSON, decoding");
        let decoded = if debug {
            crate::decode_debug(&input)
        } else {
            crate::decode(&input)
        };
        decoded.context("decode DSON to JSON")?
    } else {
        tracing::info!(path = %from.display(), "input is JSON, encoding");
        crate::encode(&input).context("encode JSON to DSON")?
    };

    std::fs::write(to, output).with_context(|| format!("write {}", to.display()))?;
    println!("Done converting. Please check the result at: {}", to.display());

    Ok(())
}
