//! Manual argv scanning.
//!
//! A declarative flag parser is the wrong tool here: every flag this
//! wrapper does not itself recognize has to pass through to Chromium
//! unchanged, in its original order, which rules out a parser built
//! around a fixed, closed flag set. So argv is walked by hand, the same
//! way the implementation this is modeled on does it.

use std::path::PathBuf;

use crate::allowlist::AllowList;
use crate::error::ProxyError;

/// The effective configuration produced by scanning argv: either proxy
/// mode (bridge Chromium's pipe transport behind a UNIX socket) or plain
/// passthrough (no `--remote-debugging-path` given).
pub enum Launch {
    Passthrough { argv: Vec<String> },
    Proxy(ProxyConfig),
}

pub struct ProxyConfig {
    pub socket_path: PathBuf,
    pub allow_list: Option<AllowList>,
    pub chromium_argv: Vec<String>,
}

const FLAG_PATH: &str = "--remote-debugging-path";
const FLAG_ALLOW: &str = "--remote-debugging-allow";
const FLAG_ALLOW_EXPR: &str = "--remote-debugging-allow-expression";

/// Parse `args` (as from `std::env::args().collect::<Vec<_>>()`,
/// including `args[0]`) into a `Launch`.
pub fn parse(args: &[String]) -> Result<Launch, ProxyError> {
    let mut chromium_argv = Vec::with_capacity(args.len());
    // The program to launch is always "chromium", never this process's own
    // argv[0]: this wrapper's console-script name differs from the browser
    // it launches, so args[0] (e.g. "cdp-pipe-bridge" or its invocation
    // path) must never be passed to `Command::new`/`exec`.
    chromium_argv.push("chromium".to_string());

    let mut socket_path = None;
    let mut allow_list = AllowList::new();
    let mut saw_allow_flag = false;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];

        if let Some(value) = take_flag_value(args, &mut i, arg, FLAG_PATH) {
            socket_path = Some(PathBuf::from(value));
            continue;
        }
        if let Some(value) = take_flag_value(args, &mut i, arg, FLAG_ALLOW) {
            allow_list.push_method(value);
            saw_allow_flag = true;
            continue;
        }
        if let Some(value) = take_flag_value(args, &mut i, arg, FLAG_ALLOW_EXPR) {
            allow_list.push_matcher_json(&value)?;
            saw_allow_flag = true;
            continue;
        }

        chromium_argv.push(arg.clone());
        i += 1;
    }

    match socket_path {
        None => {
            if saw_allow_flag {
                return Err(ProxyError::Config(format!(
                    "{FLAG_ALLOW} or {FLAG_ALLOW_EXPR} given without {FLAG_PATH}"
                )));
            }
            Ok(Launch::Passthrough { argv: chromium_argv })
        }
        Some(socket_path) => Ok(Launch::Proxy(ProxyConfig {
            socket_path,
            allow_list: if allow_list.is_empty() { None } else { Some(allow_list) },
            chromium_argv,
        })),
    }
}

/// If `arg` is `flag` or `flag=value`, consume it (and, for the
/// two-token form, the following argument) and return the value.
/// Advances `i` past whatever was consumed; leaves it untouched if `arg`
/// does not match `flag` at all.
fn take_flag_value(args: &[String], i: &mut usize, arg: &str, flag: &str) -> Option<String> {
    if let Some(value) = arg.strip_prefix(&format!("{flag}=")) {
        let value = value.to_string();
        *i += 1;
        return Some(value);
    }
    if arg == flag {
        let value = args.get(*i + 1).cloned().unwrap_or_default();
        *i += 2;
        return Some(value);
    }
    None
}
