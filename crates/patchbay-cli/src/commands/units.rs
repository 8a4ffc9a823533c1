//! Unit type listing.

use patchbay_core::Registry;

pub fn run() -> anyhow::Result<()> {
    let registry = Registry::new(48000, 64);
    println!("Available Units");
    println!("===============");
    for name in registry.names() {
        println!("  {name}");
    }
    Ok(())
}
