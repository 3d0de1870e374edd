//! Tool and platform version reporting (multi-level `--version`).

use sysinfo::System;

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Tiny helper to read rustc version at runtime
fn rustc_version() -> String {
    option_env!("RUSTC_VERSION").unwrap_or("unknown").to_string()
}

// Key third-party components, matching the requirements in Cargo.toml.
const DEPENDENCY_VERSIONS: &[(&str, &str)] = &[
    ("clap", "4.5"),
    ("serde", "1.0"),
    ("toml", "0.8"),
    ("csv", "1.3"),
    ("rayon", "1.10"),
    ("rand", "0.8"),
    ("printpdf", "0.7"),
];

fn platform_line() -> String {
    let os = System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "unknown".to_string());
    format!("{os} (kernel {kernel}, {})", std::env::consts::ARCH)
}

/// The versions of this software and its environment, one per line.
pub fn get_formatted_versions() -> Vec<String> {
    let mut s = System::new_all();
    s.refresh_all();

    let mut lines = vec![
        format!("Version: {PKG_VERSION}"),
        format!("rustc: {}", rustc_version()),
        platform_line(),
        format!("CPUs: {}", s.cpus().len()),
    ];
    lines.extend(
        DEPENDENCY_VERSIONS
            .iter()
            .map(|(name, version)| format!("{name}: {version}")),
    );
    lines
}

/// `-V` prints the tool version; `-VV` adds the toolchain and platform;
/// `-VVV` the full indented listing.
pub fn print_version(level: u8) {
    if level > 2 {
        println!("GunShotMatch CLI");
        for line in get_formatted_versions() {
            println!("  {line}");
        }
    } else if level > 1 {
        println!(
            "GunShotMatch CLI version {PKG_VERSION}, rustc {}, {}",
            rustc_version(),
            platform_line()
        );
    } else {
        println!("GunShotMatch CLI version {PKG_VERSION}");
    }
}
