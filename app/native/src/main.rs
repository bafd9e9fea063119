//! Topscroll - scroll rerouting daemon and CLI.
//!
//! Without arguments the binary runs the daemon; subcommands inspect the
//! configuration and the accessibility tree.

fn main() {
    if let Err(err) = topscroll_lib::cli::run() {
        eprintln!("topscroll: {err}");
        if err.is_user_facing() {
            eprintln!("topscroll: grant access in System Settings › Privacy & Security › Accessibility");
        }
        std::process::exit(1);
    }
}
