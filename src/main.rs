mod args;
mod tabgen;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

use crate::args::{Action, Args};

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("args: {:?}", args);

    let res = match &args.action {
        Action::Download(action_args) => tabgen::run_download(args.config.as_deref(), action_args),
        Action::Upload(action_args) => tabgen::run_upload(args.config.as_deref(), action_args),
    };

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
