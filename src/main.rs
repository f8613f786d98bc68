use cdp_pipe_bridge::cli::{self, Launch};
use cdp_pipe_bridge::{logging, supervisor};
use tracing::error;

#[tokio::main]
async fn main() {
    logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let launch = match cli::parse(&args) {
        Ok(launch) => launch,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(64); // EX_USAGE
        }
    };

    let exit_code = match launch {
        Launch::Passthrough { argv } => exec_chromium_unchanged(argv),
        Launch::Proxy(config) => match supervisor::run(config).await {
            Ok(code) => code,
            Err(err) => {
                error!(error = %err, "bring-up failed");
                1
            }
        },
    };

    std::process::exit(exit_code);
}

/// No `--remote-debugging-path` was given: replace this process with
/// Chromium unchanged, exactly as `execvp` would.
#[cfg(unix)]
fn exec_chromium_unchanged(argv: Vec<String>) -> i32 {
    use std::os::unix::process::CommandExt;

    let Some((program, rest)) = argv.split_first() else {
        eprintln!("no program to execute");
        return 1;
    };
    let err = std::process::Command::new(program).args(rest).exec();
    eprintln!("failed to exec {program}: {err}");
    1
}

#[cfg(not(unix))]
fn exec_chromium_unchanged(argv: Vec<String>) -> i32 {
    let Some((program, rest)) = argv.split_first() else {
        return 1;
    };
    match std::process::Command::new(program).args(rest).status() {
        Ok(status) => status.code().unwrap_or(1),
        Err(err) => {
            eprintln!("failed to launch {program}: {err}");
            1
        }
    }
}
