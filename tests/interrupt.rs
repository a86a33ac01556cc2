//! Process-level behavior of the `mcp-chat` binary.
#![cfg(unix)]

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn wait_for_exit(child: &mut Child, limit: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(50));
    }
    None
}

#[test]
fn test_ctrl_c_at_prompt_exits_process() {
    let dir = tempfile::tempdir().unwrap();
    let servers = dir.path().join("servers.json");
    std::fs::write(&servers, r#"{"mcpServers": {}}"#).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_mcp-chat"))
        .current_dir(dir.path())
        .arg("--servers")
        .arg(&servers)
        .arg("--log-file")
        .arg(dir.path().join("mcp-chat.log"))
        .env("OPENAI_API_KEY", "test-key")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Held open so the binary blocks reading its first line.
    let _stdin = child.stdin.take().unwrap();
    let mut stdout = child.stdout.take().unwrap();
    let output = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&output);
    thread::spawn(move || {
        let mut buf = [0u8; 256];
        while let Ok(n) = stdout.read(&mut buf) {
            if n == 0 {
                break;
            }
            sink.lock().unwrap().extend_from_slice(&buf[..n]);
        }
    });

    let prompt_deadline = Instant::now() + Duration::from_secs(20);
    while !String::from_utf8_lossy(&output.lock().unwrap()).contains("You:") {
        assert!(Instant::now() < prompt_deadline, "prompt never shown");
        thread::sleep(Duration::from_millis(50));
    }
    // Let the read start and the Ctrl-C listener install.
    thread::sleep(Duration::from_millis(500));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
    }
    let status = status.expect("process still running after SIGINT");
    assert!(status.success(), "exit status {status:?}");
    assert!(String::from_utf8_lossy(&output.lock().unwrap()).contains("Bye"));
}
