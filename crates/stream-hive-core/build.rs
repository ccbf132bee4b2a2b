/// Builds the gRPC client and server code for the `identity.proto` definition
/// using `tonic-prost-build`.
///
/// Generated modules land in the crate's `OUT_DIR` together with an encoded
/// file descriptor set (`identity_descriptor.bin`) that the identity service
/// registers with `tonic-reflection`.
///
/// # Panics
///
/// Panics if code generation fails, which aborts the build with the
/// underlying `protoc` diagnostics.
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("identity_descriptor.bin");

    println!("cargo:rerun-if-changed=proto/identity.proto");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/identity.proto"], &["proto"])
        .unwrap();
}
