//! Interactive menu
//!
//! Pure I/O around a `Session`. No failure ends the loop; only the quit
//! choice or end of input does.

use anyhow::Result;
use console::Term;
use netdoc_common::TestProfile;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::output::{display_error, display_fix, display_info, display_run, display_success};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    FullTest,
    BasicTest,
    AutoFix,
    ExportReport,
    ShowConfig,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "full" => Some(MenuChoice::FullTest),
            "2" | "basic" => Some(MenuChoice::BasicTest),
            "3" | "fix" => Some(MenuChoice::AutoFix),
            "4" | "export" => Some(MenuChoice::ExportReport),
            "5" | "config" => Some(MenuChoice::ShowConfig),
            "0" | "q" | "quit" | "exit" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

const MENU: &str = "\
[NETDOC]
  1) Full diagnostic test
  2) Basic diagnostic test
  3) Auto-Fix last run
  4) Export last run to HTML
  5) Show configuration
  0) Quit";

/// Prompt and read one line. `None` at end of input.
async fn read_line<R>(input: &mut R, prompt: &str) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let _ = Term::stdout().write_str(prompt);
    let mut line = String::new();
    match input.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(e) => {
            debug!("Menu input closed: {}", e);
            None
        }
    }
}

pub async fn run_menu(session: &mut Session) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    run_menu_with(session, &mut stdin).await
}

/// Menu loop over any line source
pub async fn run_menu_with<R>(session: &mut Session, input: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        println!("{}", MENU);
        let Some(line) = read_line(input, "Select an option: ").await else {
            break;
        };

        let choice = match MenuChoice::parse(&line) {
            Some(choice) => choice,
            None => {
                display_error(&format!("Unknown option: {}", line.trim()));
                continue;
            }
        };

        match choice {
            MenuChoice::FullTest | MenuChoice::BasicTest => {
                let profile = if choice == MenuChoice::FullTest {
                    TestProfile::Full
                } else {
                    TestProfile::Basic
                };
                let Some(domain) = read_line(input, "Domain to test (blank for default): ").await
                else {
                    break;
                };
                match session.run_test(profile, Some(&domain)).await {
                    Ok(run) => display_run(run),
                    Err(e) => display_error(&format!("{:#}", e)),
                }
            }
            MenuChoice::AutoFix => {
                let report = session.auto_fix().await;
                display_fix(&report.decision, &report.outcomes);
            }
            MenuChoice::ExportReport => match session.export_html(None) {
                Ok(path) => display_success(&format!("Report written to {}", path.display())),
                Err(e) => display_error(&format!("{:#}", e)),
            },
            MenuChoice::ShowConfig => match session.config().to_toml() {
                Ok(text) => println!("{}", text),
                Err(e) => display_error(&e.to_string()),
            },
            MenuChoice::Quit => break,
        }
    }

    display_info("Goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdoc_common::{FakeCommandRunner, FakeNetworkBackend, MemoryLogger, NetDocConfig};
    use std::sync::Arc;

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::FullTest));
        assert_eq!(MenuChoice::parse(" basic\n"), Some(MenuChoice::BasicTest));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::AutoFix));
        assert_eq!(MenuChoice::parse("EXPORT"), Some(MenuChoice::ExportReport));
        assert_eq!(MenuChoice::parse("q"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("9"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    fn session() -> Session {
        let backend = FakeNetworkBackend::builder()
            .gateway("192.168.1.1")
            .echo_replies("192.168.1.1", &[true])
            .build();
        Session::with_parts(
            NetDocConfig::default(),
            Arc::new(backend),
            Arc::new(FakeCommandRunner::new()),
            Arc::new(MemoryLogger::new()),
        )
    }

    #[tokio::test]
    async fn test_menu_ends_at_end_of_input() {
        let mut session = session();
        let mut input: &[u8] = b"";
        run_menu_with(&mut session, &mut input).await.unwrap();
        assert!(session.last_run().is_none());
    }

    #[tokio::test]
    async fn test_menu_survives_bad_input_until_input_ends() {
        let mut session = session();
        let mut input: &[u8] = b"9\n\n3\n4\n";
        run_menu_with(&mut session, &mut input).await.unwrap();
        assert!(session.last_run().is_none());
    }

    #[tokio::test]
    async fn test_menu_runs_basic_test_then_quits() {
        let mut session = session();
        let mut input: &[u8] = b"2\n\n0\n1\n";
        run_menu_with(&mut session, &mut input).await.unwrap();

        let run = session.last_run().unwrap();
        assert_eq!(run.profile(), TestProfile::Basic);
        assert_eq!(run.domain(), "google.com");
    }

    #[tokio::test]
    async fn test_menu_stops_when_domain_prompt_hits_end_of_input() {
        let mut session = session();
        let mut input: &[u8] = b"1\n";
        run_menu_with(&mut session, &mut input).await.unwrap();
        assert!(session.last_run().is_none());
    }
}
