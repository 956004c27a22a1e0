#![cfg_attr(not(test), no_std)]

use serde_derive::{Deserialize, Serialize};

pub mod codec;
pub mod power;
mod status;
mod time;

pub use codec::{deserialize_crc_cobs, serialize_crc_cobs, CodecError, MAX_FRAME};
pub use status::{ExtendedStatus, Status};
pub use time::DateTime;

/// Bus address the companion's resident bootloader answers on.
pub const COMPANION_ADDRESS: u8 = 0x43;

/// One transfer worth of the audio buffer.
pub const PACKET_SIZE: usize = 32;

/// Flash reserved for the resident bootloader. The application image must
/// start above it.
pub const BOOTLOADER_SIZE: u32 = 0x200;

/// Handed verbatim to the link step by companion/build.rs so that `.text`
/// lands just above the bootloader.
pub const TEXT_RELOCATION_FLAG: &str = "-Ttext=0x200";

/// Commands the pi sends to the companion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub enum Request {
    /// The pi acknowledges it has seen the cold-boot flag.
    ClearPowerOnFlag,
    /// Display backlight, 0 = off, 255 = full.
    SetBrightness { value: u8 },
    SetDateTime(DateTime),
    SetMicThreshold { value: u8 },
    GetStatus,
    GetExtendedStatus,
    GetDateTime,
    StartAudioRecording,
    StopAudioRecording,
    /// Read the most recently filled half of the audio buffer.
    GetAudioPacket,
    /// Cut power to the pi and let the companion sleep.
    PowerOff,
}

/// Companion's answer to a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub enum Response {
    SetOk,
    Status(Status),
    ExtendedStatus(ExtendedStatus),
    DateTime(DateTime),
    Audio([u8; PACKET_SIZE]),
    /// No recording is running, or the frame did not parse.
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocation_flag_matches_bootloader_size() {
        assert_eq!(
            TEXT_RELOCATION_FLAG,
            format!("-Ttext={:#x}", BOOTLOADER_SIZE)
        );
    }

    #[test]
    fn requests_fit_the_frame_budget() {
        use core::mem::size_of;
        assert!(size_of::<Request>() <= codec::MAX_PAYLOAD);
        assert!(size_of::<Response>() <= codec::MAX_PAYLOAD);
    }
}
