use std::path::Path;

use anyhow::Context;
use modelgrid_state::Snapshot;
use tracing::info;

use super::CommandContext;

pub fn seed(ctx: &CommandContext, file: &Path) -> anyhow::Result<()> {
    let count = load(ctx, file)?;
    println!("✓ Loaded {count} objects into {}", ctx.store_path().display());
    Ok(())
}

fn load(ctx: &CommandContext, file: &Path) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", file.display()))?;
    let store = ctx.open_store()?;
    let count = store.load_snapshot(&snapshot)?;
    info!(
        templates = snapshot.templates.len(),
        models = snapshot.models.len(),
        nodes = snapshot.nodes.len(),
        "snapshot loaded"
    );
    Ok(count)
}
