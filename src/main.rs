// SPDX-License-Identifier: MIT
//
// hello-dither: fill a small pixel buffer, show it dithered in the terminal,
// wait for a key.
//
//   pattern → the 64×32 RGBA buffer with its corner markers
//   config  → compiled-in settings (title, pixel format, dither options)
//   app     → the open / draw / refresh / wait / release sequence
//
// The display comes from hd-term and the bitmap conversion from hd-dither.
// Exit status is 0 when the sequence completes and 1 on any failure,
// including when there is no terminal to draw on.
//
// Logs go to `hello-dither-<pid>.log` in the temp directory (filter with
// RUST_LOG), since the terminal itself is busy showing the image. The file
// must not exist yet: an existing file or symlink there is left alone and
// logging stays off.

mod app;
mod config;
mod pattern;

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{self, ExitCode};

use hd_term::Display;

use crate::config::DemoConfig;

/// A fresh log file in `dir`, named after this process.
fn create_log(dir: &Path) -> io::Result<(PathBuf, File)> {
    let path = dir.join(format!("hello-dither-{}.log", process::id()));
    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    Ok((path, file))
}

fn init_logging() {
    // Without a log file the log macros are no-ops.
    if let Ok((path, file)) = create_log(&env::temp_dir()) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_micros()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        log::debug!("logging to {}", path.display());
    }
}

fn main() -> ExitCode {
    init_logging();
    log::info!("starting hello-dither {}", env!("CARGO_PKG_VERSION"));

    match app::run(Display::open, &DemoConfig::default()) {
        Ok(()) => {
            log::info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("hello-dither: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("hello-dither-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn log_file_is_per_process() {
        let dir = scratch("log-name");
        let (path, _file) = create_log(&dir).unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert!(path.to_string_lossy().contains(&process::id().to_string()));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn existing_log_file_is_not_clobbered() {
        let dir = scratch("log-existing");
        let (path, _file) = create_log(&dir).unwrap();
        fs::write(&path, "keep me").unwrap();

        assert!(create_log(&dir).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
        fs::remove_dir_all(&dir).unwrap();
    }
}
