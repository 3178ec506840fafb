fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Crate version and build time, exposed as `built_info` and reported by /api/health
    built::write_built_file().expect("Failed to acquire build-time information");
}
