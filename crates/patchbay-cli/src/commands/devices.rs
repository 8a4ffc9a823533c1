//! Audio output device listing.

pub fn run() -> anyhow::Result<()> {
    let names = patchbay_io::cpal_backend::output_device_names()?;
    if names.is_empty() {
        println!("No output devices found");
        return Ok(());
    }
    println!("Output Devices");
    println!("==============");
    for name in names {
        println!("  {name}");
    }
    Ok(())
}
