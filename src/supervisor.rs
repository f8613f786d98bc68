//! Launches Chromium in pipe mode, wires fds 3/4 to one end of a socket
//! pair, and orchestrates bring-up and teardown of the dispatcher and
//! HTTP listener around the child's lifetime.

use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
use std::path::Path;
use std::sync::Arc;

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use tracing::info;
use uuid::Uuid;

use crate::cdp::dispatcher::Dispatcher;
use crate::cdp::registry::RequestRegistry;
use crate::cli::ProxyConfig;
use crate::error::ProxyError;
use crate::http::state::AppState;
use crate::http::build_router;
use crate::pipe::{FrameReader, FrameWriter};
use crate::session::table::SessionTable;

pub async fn run(config: ProxyConfig) -> Result<i32, ProxyError> {
    // 1. Create the socket pair; one end stays with us, the other is
    // duplicated onto fds 3 and 4 in the child before exec.
    let (proxy_end, child_end) =
        socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::empty())?;

    // 2. Wrap our end of the socket pair as an async bidirectional pipe
    // and bring up the dispatcher and the HTTP listener before Chromium
    // exists, so neither can race the child's startup.
    let std_stream = unsafe { std::os::unix::net::UnixStream::from_raw_fd(proxy_end.into_raw_fd()) };
    std_stream.set_nonblocking(true)?;
    let tokio_stream = tokio::net::UnixStream::from_std(std_stream)?;
    let (read_half, write_half) = tokio_stream.into_split();

    let registry = Arc::new(RequestRegistry::new(FrameWriter::new(write_half)));
    let sessions = Arc::new(SessionTable::new());
    let dispatcher = Dispatcher::new(FrameReader::new(read_half), registry.clone(), sessions.clone());
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let state = Arc::new(AppState {
        registry,
        sessions,
        browser_uuid: Uuid::new_v4(),
        allow_list: config.allow_list.map(Arc::new),
    });
    let router = build_router(state.clone());
    let listener = bind_socket(&config.socket_path).await?;
    info!(path = %config.socket_path.display(), "http listener bound");
    let http_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router.into_make_service()).await {
            tracing::warn!(error = %err, "http listener exited with error");
        }
    });

    // 3. Now that both are up, spawn Chromium with fds 3 and 4 wired to
    // the other end of the socket pair.
    let mut argv = config.chromium_argv;
    argv.push("--remote-debugging-pipe".to_string());
    let program = argv.remove(0);
    let child_fd = child_end.as_raw_fd();

    let mut command = tokio::process::Command::new(program);
    command.args(&argv);
    // Safety: only async-signal-safe syscalls (dup2) run between fork and
    // exec in the child.
    unsafe {
        command.pre_exec(move || {
            if libc::dup2(child_fd, 3) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            if libc::dup2(child_fd, 4) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = command
        .spawn()
        .map_err(|e| ProxyError::Process(format!("failed to spawn chromium: {e}")))?;
    info!(pid = ?child.id(), "chromium spawned");
    drop(child_end); // parent no longer needs its copy of the child's end

    // 4. Await Chromium's exit, racing a shutdown signal.
    let status = wait_for_exit_or_signal(&mut child).await?;
    info!(status = ?status, "chromium exited");

    // 5/6. Tear down the HTTP listener and the dispatcher. If Chromium's
    // exit was never observed this path is still reached via the signal
    // branch above, which already terminates the child.
    http_handle.abort();
    dispatcher_handle.abort();

    Ok(0)
}

async fn bind_socket(path: &Path) -> Result<tokio::net::UnixListener, ProxyError> {
    let _ = std::fs::remove_file(path);
    Ok(tokio::net::UnixListener::bind(path)?)
}

#[cfg(unix)]
async fn wait_for_exit_or_signal(child: &mut tokio::process::Child) -> Result<std::process::ExitStatus, ProxyError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        status = child.wait() => Ok(status?),
        _ = sigterm.recv() => {
            info!("received SIGTERM, terminating chromium");
            terminate_and_wait(child).await
        }
        _ = sigint.recv() => {
            info!("received SIGINT, terminating chromium");
            terminate_and_wait(child).await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_exit_or_signal(child: &mut tokio::process::Child) -> Result<std::process::ExitStatus, ProxyError> {
    Ok(child.wait().await?)
}

#[cfg(unix)]
async fn terminate_and_wait(child: &mut tokio::process::Child) -> Result<std::process::ExitStatus, ProxyError> {
    let _ = child.start_kill();
    Ok(child.wait().await?)
}
