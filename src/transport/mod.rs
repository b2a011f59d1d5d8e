use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::models::push_status;

/// Where and as whom a rendered config is pushed
#[derive(Debug, Clone)]
pub struct PushTarget {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// Whether a checked candidate is committed or thrown away after the diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    DryRun,
    Commit,
}

/// Result of handing one device its config
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub status: &'static str,
    /// Device transcript, or the rendered config in print-only mode
    pub output: String,
}

#[async_trait]
pub trait ConfigTransport: Send + Sync {
    async fn push(&self, target: &PushTarget, config: &str) -> Result<PushOutcome>;
}

/// Prints instead of connecting
pub struct PrintOnly;

#[async_trait]
impl ConfigTransport for PrintOnly {
    async fn push(&self, _target: &PushTarget, config: &str) -> Result<PushOutcome> {
        Ok(PushOutcome {
            status: push_status::PRINTED,
            output: config.to_string(),
        })
    }
}

/// One CLI session on a device: send a script, get the transcript back.
/// Blocking; callers run it on the blocking pool.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, target: &PushTarget, script: &str) -> Result<String>;
}

/// The two CLI sessions a push can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Load, diff, `commit check`, then roll back
    Check,
    /// Load again and commit
    Commit,
}

/// Stages config on a Junos device over interactive SSH shells.
///
/// Every push opens a check session first. In commit mode a second session
/// commits, and only when the check transcript came back clean.
pub struct SshTransport {
    pub mode: CommitMode,
    runner: Arc<dyn ScriptRunner>,
}

impl SshTransport {
    pub fn new(timeout_secs: u64, mode: CommitMode) -> Self {
        Self::with_runner(Arc::new(SshShell { timeout_secs }), mode)
    }

    pub fn with_runner(runner: Arc<dyn ScriptRunner>, mode: CommitMode) -> Self {
        Self { mode, runner }
    }

    async fn run_stage(&self, target: &PushTarget, config: &str, stage: Stage) -> Result<String> {
        let runner = self.runner.clone();
        let target = target.clone();
        let script = session_script(config, stage);
        tokio::task::spawn_blocking(move || runner.run(&target, &script))
            .await
            .context("Task join error")?
    }
}

#[async_trait]
impl ConfigTransport for SshTransport {
    async fn push(&self, target: &PushTarget, config: &str) -> Result<PushOutcome> {
        let check = self.run_stage(target, config, Stage::Check).await?;
        verify_check(&check)?;

        if self.mode == CommitMode::DryRun {
            return Ok(PushOutcome {
                status: push_status::ROLLED_BACK,
                output: check,
            });
        }

        tracing::info!("{}: commit check passed, committing", target.hostname);
        let commit = self.run_stage(target, config, Stage::Commit).await?;
        verify_commit(&commit)?;
        Ok(PushOutcome {
            status: push_status::COMMITTED,
            output: format!("{}{}", check, commit),
        })
    }
}

/// Clean check: no `error:` lines and Junos reported the check passing
pub fn verify_check(transcript: &str) -> Result<()> {
    let errors = transcript_errors(transcript);
    if !errors.is_empty() {
        anyhow::bail!("Device rejected configuration: {}", errors.join("; "));
    }
    if !transcript.contains("configuration check succeeds") {
        anyhow::bail!("Commit check did not succeed:\n{}", transcript);
    }
    Ok(())
}

pub fn verify_commit(transcript: &str) -> Result<()> {
    let errors = transcript_errors(transcript);
    if !errors.is_empty() {
        anyhow::bail!("Commit failed: {}", errors.join("; "));
    }
    if !transcript.contains("commit complete") {
        anyhow::bail!("Commit did not complete:\n{}", transcript);
    }
    Ok(())
}

/// Answers every keyboard-interactive prompt with the device password
struct EchoPassword<'a>(&'a str);

impl ssh2::KeyboardInteractivePrompt for EchoPassword<'_> {
    fn prompt<'b>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'b>],
    ) -> Vec<String> {
        vec![self.0.to_string(); prompts.len()]
    }
}

/// Interactive PTY shell over ssh2
pub struct SshShell {
    pub timeout_secs: u64,
}

impl SshShell {
    fn open(&self, target: &PushTarget) -> Result<ssh2::Session> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let addr = format!("{}:22", target.hostname)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve {}", target.hostname))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("No address for {}", target.hostname))?;
        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .with_context(|| format!("TCP connection to {} failed", addr))?;
        tcp.set_read_timeout(Some(timeout)).ok();
        tcp.set_write_timeout(Some(timeout)).ok();

        let mut session = ssh2::Session::new().context("Failed to create SSH session")?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().context("SSH handshake failed")?;

        authenticate(&session, target)?;
        Ok(session)
    }
}

/// Try whatever the server offers, password before keyboard-interactive.
/// Some Junos login classes only accept the latter.
fn authenticate(session: &ssh2::Session, target: &PushTarget) -> Result<()> {
    let offered = session
        .auth_methods(&target.username)
        .unwrap_or("password,keyboard-interactive")
        .to_string();
    if session.authenticated() {
        return Ok(());
    }

    if offered.contains("password") {
        if let Err(e) = session.userauth_password(&target.username, &target.password) {
            tracing::debug!("{}: password auth refused: {}", target.hostname, e);
        }
    }
    if !session.authenticated() && offered.contains("keyboard-interactive") {
        let mut prompt = EchoPassword(&target.password);
        if let Err(e) = session.userauth_keyboard_interactive(&target.username, &mut prompt) {
            tracing::debug!("{}: keyboard-interactive auth refused: {}", target.hostname, e);
        }
    }

    if session.authenticated() {
        Ok(())
    } else {
        anyhow::bail!(
            "SSH authentication failed for {}@{} (offered: {})",
            target.username,
            target.hostname,
            offered
        )
    }
}

impl ScriptRunner for SshShell {
    /// Feed a whole CLI script into a PTY shell and read until the device hangs up.
    fn run(&self, target: &PushTarget, script: &str) -> Result<String> {
        let session = self.open(target)?;

        let mut channel = session.channel_session().context("Failed to open channel")?;
        channel
            .request_pty("vt100", None, Some((200, 50, 0, 0)))
            .context("Failed to request PTY")?;
        channel.shell().context("Failed to start shell")?;

        channel
            .write_all(script.as_bytes())
            .context("Failed to send configuration")?;
        channel.flush().ok();
        channel.send_eof().ok();

        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .context("Failed to read device output")?;
        channel.wait_close().ok();

        tracing::debug!("{}: {} bytes of transcript", target.hostname, output.len());
        Ok(output)
    }
}

/// Junos CLI steps for one stage: private candidate, merge from terminal,
/// then check and roll back, or commit.
pub fn session_script(config: &str, stage: Stage) -> String {
    let mut script = String::new();
    script.push_str("set cli screen-length 0\n");
    script.push_str("configure private\n");
    script.push_str("load merge terminal\n");
    script.push_str(config);
    if !config.ends_with('\n') {
        script.push('\n');
    }
    // Ctrl-D ends terminal input
    script.push('\u{4}');
    script.push('\n');
    match stage {
        Stage::Check => {
            script.push_str("show | compare\n");
            script.push_str("commit check\n");
            script.push_str("rollback 0\n");
            script.push_str("exit configuration-mode\n");
        }
        Stage::Commit => script.push_str("commit and-quit\n"),
    }
    script.push_str("exit\n");
    script
}

/// Lines the device flagged as errors
pub fn transcript_errors(transcript: &str) -> Vec<String> {
    let re = match regex_lite::Regex::new(r"(?m)^\s*error:\s*(.+?)\s*$") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    re.captures_iter(transcript)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const CLEAN_CHECK: &str = "[edit]\nadmin@pe1# commit check\nconfiguration check succeeds\n";
    const FAILED_CHECK: &str = "\
[edit]
admin@pe1# commit check
[edit interfaces xe-0/0/1 unit 10]
  'vlan-tags'
    error: duplicate VLAN-ID on interface
error: configuration check-out failed
";

    fn target() -> PushTarget {
        PushTarget {
            hostname: "pe1.lab".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }

    /// Replays canned transcripts and remembers which stages were sent
    struct Scripted {
        check: &'static str,
        stages: Mutex<Vec<Stage>>,
    }

    impl Scripted {
        fn new(check: &'static str) -> Arc<Self> {
            Arc::new(Self {
                check,
                stages: Mutex::new(Vec::new()),
            })
        }
    }

    impl ScriptRunner for Scripted {
        fn run(&self, _target: &PushTarget, script: &str) -> Result<String> {
            if script.contains("commit and-quit") {
                self.stages.lock().unwrap().push(Stage::Commit);
                Ok("commit complete\nExiting configuration mode\n".to_string())
            } else {
                self.stages.lock().unwrap().push(Stage::Check);
                Ok(self.check.to_string())
            }
        }
    }

    #[test]
    fn test_print_only_returns_config() {
        let outcome = tokio_test::block_on(PrintOnly.push(&target(), "interfaces {}\n")).unwrap();
        assert_eq!(outcome.status, push_status::PRINTED);
        assert_eq!(outcome.output, "interfaces {}\n");
    }

    #[test]
    fn test_check_script_rolls_back() {
        let script = session_script("interfaces {}", Stage::Check);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines[1], "configure private");
        assert_eq!(lines[2], "load merge terminal");
        assert_eq!(lines[3], "interfaces {}");
        assert_eq!(lines[4], "\u{4}");
        assert!(script.contains("show | compare\n"));
        assert!(script.contains("commit check\n"));
        assert!(script.contains("rollback 0\n"));
        assert!(!script.contains("and-quit"));
        assert!(script.ends_with("exit\n"));
    }

    #[test]
    fn test_commit_script_only_commits() {
        let script = session_script("interfaces {}\n", Stage::Commit);
        assert!(script.contains("commit and-quit\n"));
        assert!(!script.contains("rollback"));
        assert!(!script.contains("commit check"));
        assert!(!script.contains("{}\n\n"));
    }

    #[tokio::test]
    async fn test_dry_run_never_commits() {
        let runner = Scripted::new(CLEAN_CHECK);
        let transport = SshTransport::with_runner(runner.clone(), CommitMode::DryRun);
        let outcome = transport.push(&target(), "interfaces {}\n").await.unwrap();
        assert_eq!(outcome.status, push_status::ROLLED_BACK);
        assert_eq!(*runner.stages.lock().unwrap(), vec![Stage::Check]);
    }

    #[tokio::test]
    async fn test_commit_follows_clean_check() {
        let runner = Scripted::new(CLEAN_CHECK);
        let transport = SshTransport::with_runner(runner.clone(), CommitMode::Commit);
        let outcome = transport.push(&target(), "interfaces {}\n").await.unwrap();
        assert_eq!(outcome.status, push_status::COMMITTED);
        assert!(outcome.output.contains("configuration check succeeds"));
        assert!(outcome.output.contains("commit complete"));
        assert_eq!(*runner.stages.lock().unwrap(), vec![Stage::Check, Stage::Commit]);
    }

    #[tokio::test]
    async fn test_failed_check_skips_commit() {
        let runner = Scripted::new(FAILED_CHECK);
        let transport = SshTransport::with_runner(runner.clone(), CommitMode::Commit);
        let err = transport.push(&target(), "interfaces {}\n").await.unwrap_err();
        assert!(err.to_string().contains("duplicate VLAN-ID"));
        assert_eq!(*runner.stages.lock().unwrap(), vec![Stage::Check]);
    }

    #[test]
    fn test_verify_transcripts() {
        assert!(verify_check(CLEAN_CHECK).is_ok());
        assert!(verify_check(FAILED_CHECK).is_err());
        // Silence is not success
        assert!(verify_check("admin@pe1# commit check\n").is_err());
        assert!(verify_commit("commit complete\n").is_ok());
        assert!(verify_commit("error: commit failed\ncommit complete\n").is_err());
    }

    #[test]
    fn test_transcript_errors() {
        assert_eq!(
            transcript_errors(FAILED_CHECK),
            vec![
                "duplicate VLAN-ID on interface".to_string(),
                "configuration check-out failed".to_string()
            ]
        );
        assert!(transcript_errors("commit complete\n").is_empty());
    }
}
