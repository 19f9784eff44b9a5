use std::path::PathBuf;
use std::process::Stdio;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::backend::{AuthBackend, EventHub, EventKind};

/// One line of helper stdout: `{"event": "login-progress", "payload": "Authorizing..."}`.
#[derive(Debug, Deserialize)]
struct HelperLine {
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Runs the native auth helper and republishes whatever it reports on the hub.
#[derive(Clone)]
pub struct HelperBackend {
    program: Option<PathBuf>,
    args: Vec<String>,
    hub: EventHub,
}

impl HelperBackend {
    pub fn new(program: Option<PathBuf>, args: Vec<String>, hub: EventHub) -> Self {
        Self { program, args, hub }
    }

    async fn run_helper(&self, completed: &mut bool) -> Result<(), String> {
        let Some(program) = &self.program else {
            return Err("no authentication helper configured".into());
        };
        info!("login: starting auth helper {}", program.display());

        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start auth helper {}: {e}", program.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or("auth helper stdout was not captured")?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read auth helper output: {e}"))?
        {
            if self.forward_line(&line).await == Some(EventKind::LoginComplete) {
                *completed = true;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| format!("failed to wait for auth helper: {e}"))?;
        if status.success() {
            info!("login: auth helper finished");
            Ok(())
        } else {
            Err(format!("auth helper exited with {status}"))
        }
    }

    async fn forward_line(&self, line: &str) -> Option<EventKind> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let parsed: HelperLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("login: skipping unreadable helper line ({err}): {line}");
                return None;
            }
        };
        let Some(event) = EventKind::from_name(&parsed.event) else {
            warn!("login: skipping unknown helper event {}", parsed.event);
            return None;
        };
        debug!("login: helper emitted {}", event.name());
        self.hub.emit(event, parsed.payload).await;
        Some(event)
    }
}

impl AuthBackend for HelperBackend {
    async fn login(&self) -> Result<(), String> {
        let mut completed = false;
        let result = self.run_helper(&mut completed).await;
        if !completed {
            // The accounts screen waits on this event to restore its login label.
            warn!("login: helper ended without login-complete; emitting it");
            self.hub.emit(EventKind::LoginComplete, Value::Null).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NotificationChannel;
    use serde_json::json;

    fn script_backend(hub: &EventHub, script: &str) -> HelperBackend {
        HelperBackend::new(
            Some(PathBuf::from("sh")),
            vec!["-c".into(), script.into()],
            hub.clone(),
        )
    }

    #[tokio::test]
    async fn missing_helper_fails_but_still_completes() {
        let hub = EventHub::new();
        let mut complete = hub.listen(EventKind::LoginComplete).await.unwrap();
        let backend = HelperBackend::new(None, Vec::new(), hub.clone());

        let err = backend.login().await.unwrap_err();
        assert!(err.contains("no authentication helper"));
        assert!(complete.try_next().is_some());
    }

    #[tokio::test]
    async fn unknown_program_reports_spawn_failure() {
        let hub = EventHub::new();
        let backend = HelperBackend::new(
            Some(PathBuf::from("/nonexistent/rune-auth-helper")),
            Vec::new(),
            hub,
        );
        let err = backend.login().await.unwrap_err();
        assert!(err.starts_with("failed to start auth helper"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn forwards_helper_events_in_order() {
        let hub = EventHub::new();
        let mut progress = hub.listen(EventKind::LoginProgress).await.unwrap();
        let mut added = hub.listen(EventKind::AccountAdded).await.unwrap();
        let mut complete = hub.listen(EventKind::LoginComplete).await.unwrap();

        let script = r#"
echo '{"event":"login-progress","payload":"Authorizing..."}'
echo 'not json'
echo '{"event":"login-progress","payload":"Getting Token..."}'
echo '{"event":"login-exploded","payload":1}'
echo '{"event":"account-added","payload":{"email":"a@b.com","account_name":"Main","characters":[]}}'
echo '{"event":"login-complete","payload":""}'
"#;
        script_backend(&hub, script).login().await.unwrap();

        assert_eq!(progress.try_next().unwrap().payload, json!("Authorizing..."));
        assert_eq!(progress.try_next().unwrap().payload, json!("Getting Token..."));
        assert!(progress.try_next().is_none());
        assert_eq!(added.try_next().unwrap().payload["account_name"], json!("Main"));
        assert!(complete.try_next().is_some());
        // The helper sent its own completion, so none is synthesized.
        assert!(complete.try_next().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_helper_gets_a_synthesized_completion() {
        let hub = EventHub::new();
        let mut complete = hub.listen(EventKind::LoginComplete).await.unwrap();

        let script = r#"echo '{"event":"login-progress","payload":"Authorizing..."}'; exit 3"#;
        let err = script_backend(&hub, script).login().await.unwrap_err();

        assert!(err.contains("exited with"));
        assert_eq!(complete.try_next().unwrap().payload, Value::Null);
    }
}
