//! Interactive admin console.
//!
//! Every line typed counts as a key press for the session guard, so an
//! operator who leaves the console idle is signed out after the inactivity
//! timeout.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use coverdesk_client::ApiClient;
use coverdesk_core::{ActivitySignal, AuthBackend, SessionGuard};

use crate::output;

const HELP: &str = "\
Commands:
  whoami                 Show the signed-in user
  submissions            List quote requests and client submissions
  dashboard              Show pipeline statistics
  delete-client <id>     Delete a client submission
  delete-quote <id>      Delete a quote request
  logout                 Sign out and leave the console
  quit                   Leave the console (the session stays valid)
  help                   Show this list";

/// Why the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    /// The operator ran `logout`.
    LoggedOut,
    /// The inactivity timeout fired.
    Inactivity,
    /// The backend ended the session.
    SessionEnded,
    EndOfInput,
}

enum Flow {
    Continue,
    Exit(ConsoleExit),
}

/// Runs the read-eval loop until the operator leaves or the session ends.
/// Expects `guard` to be signed in already.
pub async fn run<B, R, W>(
    guard: &SessionGuard<B>,
    api: &ApiClient,
    input: R,
    out: &mut W,
) -> Result<ConsoleExit>
where
    B: AuthBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut notices = guard.notices();
    let mut user = guard.user_changes();
    user.wait_for(Option::is_some)
        .await
        .context("Session guard stopped")?;

    writeln!(out, "Type 'help' for a list of commands.")?;
    prompt(out)?;

    loop {
        tokio::select! {
            biased;

            notice = notices.recv() => match notice {
                Ok(notice) => {
                    writeln!(out, "\n{}", notice.message())?;
                    return Ok(ConsoleExit::Inactivity);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Ok(ConsoleExit::SessionEnded),
            },

            changed = user.changed() => {
                if changed.is_err() || user.borrow().is_none() {
                    writeln!(out, "\nYour session has ended. Please log in again.")?;
                    return Ok(ConsoleExit::SessionEnded);
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(ConsoleExit::EndOfInput);
                };
                guard.record_activity(ActivitySignal::KeyPress);

                match execute(guard, api, line.trim(), out).await? {
                    Flow::Continue => prompt(out)?,
                    Flow::Exit(reason) => return Ok(reason),
                }
            }
        }
    }
}

fn prompt<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "coverdesk> ")?;
    out.flush()?;
    Ok(())
}

async fn execute<B, W>(
    guard: &SessionGuard<B>,
    api: &ApiClient,
    line: &str,
    out: &mut W,
) -> Result<Flow>
where
    B: AuthBackend,
    W: Write,
{
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(Flow::Continue);
    };
    let argument = parts.next();

    match command {
        "help" => writeln!(out, "{HELP}")?,
        "whoami" => match guard.user() {
            Some(user) => writeln!(
                out,
                "{} ({})",
                user.email.as_deref().unwrap_or("unknown"),
                user.role().map(|r| r.as_str()).unwrap_or("no role")
            )?,
            None => writeln!(out, "Not signed in.")?,
        },
        "logout" => {
            guard.sign_out().await?;
            writeln!(out, "Signed out.")?;
            return Ok(Flow::Exit(ConsoleExit::LoggedOut));
        }
        "quit" | "exit" => return Ok(Flow::Exit(ConsoleExit::Quit)),
        "submissions" | "dashboard" | "delete-client" | "delete-quote" => {
            if let Err(e) = remote(guard, api, command, argument, out).await {
                writeln!(out, "Error: {e}")?;
            }
        }
        other => writeln!(out, "Unknown command '{other}'. Type 'help' for a list.")?,
    }
    Ok(Flow::Continue)
}

/// Commands that call the API with the current access token.
async fn remote<B, W>(
    guard: &SessionGuard<B>,
    api: &ApiClient,
    command: &str,
    argument: Option<&str>,
    out: &mut W,
) -> Result<()>
where
    B: AuthBackend,
    W: Write,
{
    let session = guard
        .backend()
        .get_session()
        .await?
        .context("Not signed in")?;
    let api = api.clone().with_token(session.access_token);

    match command {
        "submissions" => {
            let submissions = api.submissions().await?;
            write!(out, "{}", output::submissions_table(&submissions, Utc::now()))?;
        }
        "dashboard" => {
            let stats = api.dashboard().await?;
            write!(out, "{}", output::dashboard(&stats))?;
        }
        "delete-client" => {
            let id = parse_id(argument)?;
            api.delete_client_submission(id).await?;
            writeln!(out, "Client submission {id} deleted.")?;
        }
        "delete-quote" => {
            let id = parse_id(argument)?;
            api.delete_quote_request(id).await?;
            writeln!(out, "Quote request {id} deleted.")?;
        }
        _ => {}
    }
    Ok(())
}

fn parse_id(argument: Option<&str>) -> Result<Uuid> {
    let raw = argument.context("Missing id")?;
    raw.parse()
        .with_context(|| format!("Invalid id '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use coverdesk_core::session::{DEFAULT_INACTIVITY_TIMEOUT, INACTIVITY_LOGOUT_MESSAGE};
    use coverdesk_core::testutil::MockAuthBackend;
    use coverdesk_core::{SessionConfig, SessionState};
    use tokio::io::{AsyncWriteExt, BufReader};

    async fn signed_in() -> (SessionGuard<MockAuthBackend>, MockAuthBackend, ApiClient) {
        let backend = MockAuthBackend::new();
        backend.add_account("admin@example.com", "secret", true);
        let guard = SessionGuard::mount(backend.clone(), SessionConfig::default()).await;
        guard.sign_in("admin@example.com", "secret").await.unwrap();
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        (guard, backend, api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_console_is_signed_out() {
        let (guard, backend, api) = signed_in().await;
        let (_writer, reader) = tokio::io::duplex(64);
        let mut out = Vec::new();

        let exit = run(&guard, &api, BufReader::new(reader), &mut out)
            .await
            .unwrap();

        assert_eq!(exit, ConsoleExit::Inactivity);
        assert_eq!(backend.sign_out_calls(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(INACTIVITY_LOGOUT_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_keeps_session_alive() {
        let (guard, backend, api) = signed_in().await;
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut out = Vec::new();

        let operator = async move {
            let gap = DEFAULT_INACTIVITY_TIMEOUT - Duration::from_secs(60);
            for line in ["whoami\n", "help\n", "quit\n"] {
                tokio::time::sleep(gap).await;
                writer.write_all(line.as_bytes()).await.unwrap();
            }
            writer
        };

        let (exit, _writer) = tokio::join!(
            run(&guard, &api, BufReader::new(reader), &mut out),
            operator
        );

        assert_eq!(exit.unwrap(), ConsoleExit::Quit);
        assert_eq!(backend.sign_out_calls(), 0);
        assert_eq!(guard.state(), SessionState::SignedIn);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("admin@example.com (admin)"));
        assert!(!text.contains(INACTIVITY_LOGOUT_MESSAGE));
    }

    #[tokio::test]
    async fn test_logout_and_unknown_commands() {
        let (guard, backend, api) = signed_in().await;
        let input = BufReader::new(&b"frobnicate\ndelete-quote not-a-uuid\nlogout\n"[..]);
        let mut out = Vec::new();

        let exit = run(&guard, &api, input, &mut out).await.unwrap();

        assert_eq!(exit, ConsoleExit::LoggedOut);
        assert_eq!(backend.sign_out_calls(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Unknown command 'frobnicate'"));
        assert!(text.contains("Error: Invalid id 'not-a-uuid'"));
        assert!(text.contains("Signed out."));
    }

    #[tokio::test]
    async fn test_backend_ending_session_stops_console() {
        let (guard, backend, api) = signed_in().await;
        let (_writer, reader) = tokio::io::duplex(64);
        let mut out = Vec::new();

        let expire = async {
            let mut user = guard.user_changes();
            user.wait_for(Option::is_some).await.unwrap();
            backend.expire_session();
        };

        let (exit, ()) = tokio::join!(
            run(&guard, &api, BufReader::new(reader), &mut out),
            expire
        );

        assert_eq!(exit.unwrap(), ConsoleExit::SessionEnded);
        assert_eq!(backend.sign_out_calls(), 0);
    }
}
