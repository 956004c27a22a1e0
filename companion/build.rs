use std::{env, fs::File, io::Write, path::PathBuf};

use pi_and_companion::{BOOTLOADER_SIZE, TEXT_RELOCATION_FLAG};

fn main() {
    // Put the memory.x script somewhere the linker can find it
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();

    // Extend the linker search path
    println!("cargo:rustc-link-search={}", out.display());

    // The first BOOTLOADER_SIZE bytes of flash belong to the resident
    // bootloader; relocate the application's .text right above it.
    assert_eq!(
        TEXT_RELOCATION_FLAG,
        format!("-Ttext={BOOTLOADER_SIZE:#x}"),
        "relocation flag out of sync with the bootloader size"
    );
    println!("cargo:rustc-link-arg={TEXT_RELOCATION_FLAG}");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
