use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use async_trait::async_trait;
use issue_bridge_core::{error::WorkflowError, models::IssueForm};
use issue_bridge_workflow::ports::{FormPrefill, InputCollector};

/// Issue form on the terminal. Fields given on the command line are taken as-is; the rest are
/// prompted for, offering the suggestion as the default.
pub struct TerminalInput {
    preset: IssueForm,
}

impl TerminalInput {
    pub fn new(preset: IssueForm) -> Self { Self { preset } }
}

#[async_trait]
impl InputCollector for TerminalInput {
    async fn collect(&self, prefill: &FormPrefill) -> Result<IssueForm, WorkflowError> {
        let preset = self.preset.clone();
        let prefill = prefill.clone();
        tokio::task::spawn_blocking(move || {
            fill_form(preset, &prefill, &mut io::stdin().lock(), &mut io::stderr())
        })
        .await
        .context("Form input aborted")
        .and_then(|form| form)
        .map_err(WorkflowError::Input)
    }
}

fn fill_form(
    mut form: IssueForm,
    prefill: &FormPrefill,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<IssueForm> {
    if !prefill.thread.is_empty() {
        writeln!(output, "Message:\n{}\n", prefill.thread)?;
    }
    if form.url.is_empty() {
        form.url = ask(input, output, "Repository URL", "")?;
    }
    if form.title.is_empty() {
        form.title = ask(input, output, "Title", &prefill.title)?;
    }
    if form.description.is_empty() {
        form.description = ask(input, output, "Description", &prefill.description)?;
    }
    if form.assignees.is_empty() {
        form.assignees = ask(input, output, "Assignees (comma-separated)", "")?;
    }
    Ok(form)
}

fn ask(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    default: &str,
) -> Result<String> {
    if default.is_empty() {
        write!(output, "{label}: ")?;
    } else {
        write!(output, "{label} [{default}]: ")?;
    }
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).with_context(|| format!("Failed to read {label}"))?;
    let line = line.trim();
    Ok(if line.is_empty() { default.to_string() } else { line.to_string() })
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor, Read};

    use super::*;

    struct ClosedTerminal;

    impl Read for ClosedTerminal {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("terminal closed"))
        }
    }

    #[test]
    fn test_fill_form_uses_suggestion_as_default() {
        let prefill = FormPrefill {
            thread: "parser crashes".into(),
            title: "Bug in parser".into(),
            description: "Crashes on empty input".into(),
        };
        let preset = IssueForm { assignees: "octocat".into(), ..Default::default() };
        let mut input = Cursor::new("https://github.com/acme/widgets\n\nEmpty input crashes\n");
        let mut output = Vec::new();

        let form = fill_form(preset, &prefill, &mut input, &mut output).unwrap();
        assert_eq!(form, IssueForm {
            url: "https://github.com/acme/widgets".into(),
            title: "Bug in parser".into(),
            description: "Empty input crashes".into(),
            assignees: "octocat".into(),
        });
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Message:\nparser crashes\n"));
        assert!(output.contains("Title [Bug in parser]: "));
        assert!(!output.contains("Assignees"));
    }

    #[test]
    fn test_fill_form_skips_preset_fields() {
        let preset = IssueForm {
            url: "https://github.com/acme/widgets".into(),
            title: "Parser crash".into(),
            description: "Details".into(),
            assignees: "octocat".into(),
        };
        let mut output = Vec::new();
        let form = fill_form(
            preset.clone(),
            &FormPrefill::default(),
            &mut Cursor::new(""),
            &mut output,
        )
        .unwrap();
        assert_eq!(form, preset);
        assert!(output.is_empty());
    }

    #[test]
    fn test_fill_form_read_failure() {
        let prefill = FormPrefill { title: "Bug in parser".into(), ..Default::default() };
        let mut output = Vec::new();
        let err = fill_form(
            IssueForm::default(),
            &prefill,
            &mut BufReader::new(ClosedTerminal),
            &mut output,
        )
        .unwrap_err();

        let err = WorkflowError::Input(err);
        assert_eq!(
            err.to_string(),
            "failed to read issue form: Failed to read Repository URL: terminal closed"
        );
        assert!(String::from_utf8(output).unwrap().ends_with("Repository URL: "));
    }
}
