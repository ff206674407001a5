//! Handlers for `climalign regions list`/`climalign regions describe`.

use anyhow::{anyhow, Context, Result};
use climalign_io::load_region_registry;

pub fn list(regions_path: &std::path::Path, regions_crs: &str) -> Result<()> {
    let registry = load_region_registry(regions_path, regions_crs)
        .with_context(|| format!("loading region registry '{}'", regions_path.display()))?;
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

pub fn describe(name: &str, regions_path: &std::path::Path, regions_crs: &str) -> Result<()> {
    let registry = load_region_registry(regions_path, regions_crs)
        .with_context(|| format!("loading region registry '{}'", regions_path.display()))?;
    let region = registry.find(name).ok_or_else(|| anyhow!("unknown region '{name}'"))?;
    let (min_x, min_y, max_x, max_y) = region.envelope();
    println!("{name} ({})", region.crs);
    println!("  envelope: [{min_x:.1}, {min_y:.1}] - [{max_x:.1}, {max_y:.1}]");
    println!("  rings: {}", region.rings.len());
    Ok(())
}
