use std::env;
use std::error::Error;

use vcap::{Device, Settings};

fn usage() -> Box<dyn Error> {
    "usage: settings <save|load> <file> [device]".into()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let command = args.next().ok_or_else(usage)?;
    let file = args.next().ok_or_else(usage)?;
    let path = args.next().unwrap_or_else(|| "/dev/video0".to_string());

    let mut dev = Device::new(&path, false, 4);
    dev.open()?;

    match command.as_str() {
        "save" => {
            let settings = Settings::export(&dev)?;
            settings.save(&file)?;
            println!(
                "Saved {} controls of {} to {}",
                settings.controls.len(),
                path,
                file
            );
        }
        "load" => {
            Settings::load(&file)?.apply(&mut dev)?;
            println!("Applied {} to {}", file, path);
        }
        _ => return Err(usage()),
    }

    Ok(())
}
