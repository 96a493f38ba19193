//! Thin entrypoint delegating to [`sluice_cli::run`].

fn main() {
    std::process::exit(sluice_cli::run());
}
