use std::env;
use std::error::Error;

use vcap::Device;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "/dev/video0".to_string());
    println!("Using device: {}\n", path);

    let mut dev = Device::new(&path, false, 4);
    dev.open()?;

    for control in dev.controls().into_vec()? {
        print!("{}", control);
        println!("Status     : {}", dev.control_status(control.id)?);
        if let Ok(value) = dev.control(control.id) {
            println!("Value      : {}", value);
        }

        if control.typ.is_menu() && !control.read_only {
            println!("Menu       :");
            for entry in dev.menu(control.id).into_vec()? {
                println!("  {}", entry);
            }
        }
        println!();
    }

    Ok(())
}
