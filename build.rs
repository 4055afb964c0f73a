//! Build script for the uBITX firmware
//!
//! The memory layout comes from embassy-stm32's `memory-x` feature; this
//! only makes sure a board-specific `memory.x` in the crate root is found
//! when present.

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
        println!("cargo:rustc-link-search={dir}");
    }
}
