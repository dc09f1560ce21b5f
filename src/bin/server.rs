//! Lingo tutor server binary.
//! Run with: cargo run --bin lingo-tutor-server

use std::process::ExitCode;

use lingo_tutor::start_tutor;

fn main() -> ExitCode {
    start_tutor::run()
}
