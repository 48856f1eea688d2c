use std::process::Command;
use vergen::EmitBuilder;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let inside_git_checkout = Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    // The version endpoint falls back to "unknown" when no SHA is emitted
    let mut builder = EmitBuilder::builder();
    builder.build_timestamp();
    if inside_git_checkout {
        builder.git_sha(true);
    }

    if let Err(e) = builder.emit() {
        println!("cargo:warning=unable to emit build metadata: {e}");
    }
}
