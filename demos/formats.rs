use std::env;
use std::error::Error;

use vcap::Device;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "/dev/video0".to_string());
    println!("Using device: {}\n", path);

    let mut dev = Device::new(&path, false, 4);
    dev.open()?;

    let (id, size) = dev.format()?;
    println!("Active format: {} {} at {}\n", id, size, dev.rate()?);

    println!("Available formats:");
    for format in dev.formats().into_vec()? {
        println!("  {}", format);

        for size in dev.sizes(format.id).into_vec()? {
            println!("    Size: {}", size);

            for rate in dev.rates(format.id, size).into_vec()? {
                println!("      Rate: {}", rate);
            }
        }

        println!()
    }

    Ok(())
}
