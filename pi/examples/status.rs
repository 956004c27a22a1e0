//! status.rs
//!
//! On target `cd companion` run:
//!
//! cargo embed --release
//!
//! On host `cd pi` run:
//! cargo run --example status
//!
use pi::{open, request};
use pi_and_companion::{Request, Response};

fn main() -> Result<(), std::io::Error> {
    let mut port = open()?;

    match request(&Request::GetStatus, &mut port)? {
        Response::Status(status) => {
            println!("power on      {}", status.power_on());
            println!("charging      {}", status.charging());
            println!("vusb          {}", status.vusb());
            println!("low battery   {}", status.low_battery());
            println!("left volume   {}", status.btn_left_volume());
            println!("right volume  {}", status.btn_right_volume());
            println!("joystick btn  {}", status.btn_joystick());
            println!("joystick      {} {}", status.joy_x(), status.joy_y());
            println!("photores      {}", status.photores());
        }
        other => println!("unexpected response {:?}", other),
    }

    match request(&Request::GetExtendedStatus, &mut port)? {
        Response::ExtendedStatus(estatus) => {
            println!("vcc           {} x 10mV", estatus.vcc());
            println!("batt          {} x 10mV", estatus.batt());
            println!("temp          {} x 0.1C", estatus.temp_x10());
            println!("brightness    {}", estatus.brightness());
            println!("mic threshold {}", estatus.mic_threshold());
        }
        other => println!("unexpected response {:?}", other),
    }

    Ok(())
}
