use std::env;
use std::error::Error;
use std::fs;
use std::time::Instant;

use vcap::Device;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/dev/video0".to_string());
    // capture into a file when given one, raw bytes only
    let output = args.next();
    println!("Using device: {}\n", path);

    // Capture 4 frames by default
    let count = 4;

    // Allocate 4 buffers by default
    let buffer_count = 4;

    let mut dev = Device::new(&path, false, buffer_count);
    dev.open()?;
    println!("Active format:\n{}", dev.raw_format()?);
    println!("Active rate: {}\n", dev.rate()?);

    dev.start_stream()?;
    println!("Streaming with {} buffers", dev.active_buffers());

    let mut frame = vec![0u8; dev.image_size()?];

    // warmup
    dev.grab(&mut frame)?;

    let start = Instant::now();
    for _ in 0..count {
        let t0 = Instant::now();
        let len = dev.grab(&mut frame)?;
        println!(
            "Frame: {} bytes in {} us",
            len,
            t0.elapsed().as_micros()
        );
    }

    println!();
    println!("FPS: {}", count as f64 / start.elapsed().as_secs_f64());

    if let Some(output) = output {
        fs::write(&output, &frame)?;
        println!("Last frame written to {}", output);
    }

    dev.stop_stream()?;
    dev.close()?;
    Ok(())
}
