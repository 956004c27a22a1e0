use pi_and_companion::{deserialize_crc_cobs, serialize_crc_cobs, Request, Response, MAX_FRAME};
use serial2::SerialPort;
use std::io::{Error, ErrorKind, Read, Result};
use std::time::Duration;

#[cfg(target_os = "linux")]
static COM_PATH: &str = "/dev/ttyACM0";
#[cfg(target_os = "windows")]
static COM_PATH: &str = "COM3";

const TIME_OUT: Duration = Duration::from_millis(1000);

/// Opens the serial link to the companion, over programmer or ftdi.
pub fn open() -> Result<SerialPort> {
    let mut port = SerialPort::open(COM_PATH, 9600)?;
    // Needed for windows, but should not hurt on Linux
    port.set_dtr(true)?;
    port.set_rts(true)?;
    port.set_write_timeout(TIME_OUT)?;
    port.set_read_timeout(TIME_OUT)?;

    Ok(port)
}

/// One request/response exchange over an open link.
pub fn request(cmd: &Request, port: &mut SerialPort) -> Result<Response> {
    let mut out_buf = [0u8; MAX_FRAME];
    let to_write = serialize_crc_cobs(cmd, &mut out_buf).map_err(codec_error)?;
    port.write_all(to_write)?;

    // read one cobs frame, zero byte included
    let mut in_buf = [0u8; MAX_FRAME];
    let mut index: usize = 0;
    loop {
        let slice = &mut in_buf[index..index + 1];
        port.read_exact(slice)?;
        if index < MAX_FRAME - 1 {
            index += 1;
        }
        if slice[0] == corncobs::ZERO {
            break;
        }
    }
    deserialize_crc_cobs(&mut in_buf[..index]).map_err(codec_error)
}

fn codec_error(err: pi_and_companion::CodecError) -> Error {
    Error::new(ErrorKind::InvalidData, format!("codec error: {err:?}"))
}
