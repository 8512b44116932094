//! Entry point for the `xapi-index` command-line tool.
#![forbid(unsafe_code)]

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = xapi_index_cli::run() {
        eprintln!("xapi-index: {err}");
        std::process::exit(1);
    }
}
