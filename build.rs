fn main() {
    // CI can inject the number through the environment; local builds fall back to the file.
    let build_number = std::env::var("GHMON_BUILD_NUMBER")
        .ok()
        .or_else(|| std::fs::read_to_string("BUILD_NUMBER").ok())
        .map_or_else(|| "0".to_string(), |s| s.trim().to_string());

    println!("cargo:rustc-env=BUILD_NUMBER={build_number}");
    println!("cargo:rerun-if-changed=BUILD_NUMBER");
    println!("cargo:rerun-if-env-changed=GHMON_BUILD_NUMBER");
}
