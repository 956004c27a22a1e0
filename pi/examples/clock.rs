//! clock.rs
//!
//! Sets the companion's wall clock and reads it back.
//!
//! On host `cd pi` run:
//! cargo run --example clock
//!
use pi::{open, request};
use pi_and_companion::{DateTime, Request, Response};

fn main() -> Result<(), std::io::Error> {
    let mut port = open()?;

    let now = DateTime::new(2023, 10, 1, 12, 0, 0).expect("valid date");
    let response = request(&Request::SetDateTime(now), &mut port)?;
    println!("set clock: {:?}", response);

    match request(&Request::GetDateTime, &mut port)? {
        Response::DateTime(t) => println!(
            "companion clock {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        ),
        other => println!("unexpected response {:?}", other),
    }

    Ok(())
}
