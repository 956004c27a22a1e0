//! record.rs
//!
//! Records a short burst of 8 kHz audio packets from the companion's
//! microphone and dumps them.
//!
//! On host `cd pi` run:
//! cargo run --example record
//!
use pi::{open, request};
use pi_and_companion::{Request, Response};

const PACKETS: usize = 16;

fn main() -> Result<(), std::io::Error> {
    let mut port = open()?;

    request(&Request::StartAudioRecording, &mut port)?;

    let mut collected = 0;
    while collected < PACKETS {
        match request(&Request::GetAudioPacket, &mut port)? {
            Response::Audio(samples) => {
                println!("packet {:2}: {:?}", collected, samples);
                collected += 1;
            }
            Response::NotReady => continue,
            other => println!("unexpected response {:?}", other),
        }
    }

    let response = request(&Request::StopAudioRecording, &mut port)?;
    println!("stopped: {:?}", response);
    Ok(())
}
