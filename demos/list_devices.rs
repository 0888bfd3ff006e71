use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut devices = vcap::devices();
    for info in devices.by_ref() {
        println!("{}", info);
    }

    if let Some(e) = devices.error() {
        return Err(format!("device scan failed: {}", e).into());
    }
    Ok(())
}
