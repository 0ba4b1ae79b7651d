use std::path::Path;

use walkdir::WalkDir;

fn main() {
    let shaders_path = Path::new("shaders");
    if shaders_path.exists() {
        println!("cargo:rerun-if-changed=shaders");
        for entry in WalkDir::new("shaders").into_iter().flatten() {
            if entry.file_type().is_file() {
                println!("cargo:rerun-if-changed={}", entry.path().display());
            }
        }
    }

    let config = Path::new("config.toml");
    if config.exists() {
        println!("cargo:rerun-if-changed=config.toml");
    }
}
