//! backlight.rs
//!
//! Sets the display backlight brightness, 0..=255.
//!
//! On host `cd pi` run:
//! cargo run --example backlight -- 128
//!
use pi::{open, request};
use pi_and_companion::Request;

fn main() -> Result<(), std::io::Error> {
    let value: u8 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(128);

    let mut port = open()?;
    let response = request(&Request::SetBrightness { value }, &mut port)?;
    println!("brightness {}: {:?}", value, response);
    Ok(())
}
