//! # Terminal Gate
//!
//! Interactive `ConfirmationGate` over any async line reader and writer.
//! `TerminalGate::stdio()` wires it to the process terminal.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;

use super::gate::{
    ConfirmationGate, SuggestionAction, SuggestionDecision, TrendAction, TrendDecision,
};
use crate::state::workflow::StepSpec;

pub struct TerminalGate<R, W> {
    io: Mutex<(R, W)>,
}

impl TerminalGate<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }

    /// Write `text`, then read one trimmed line. End of input is an error.
    async fn ask(&self, text: &str) -> anyhow::Result<String> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer
            .write_all(text.as_bytes())
            .await
            .context("Failed to write prompt")?;
        writer.flush().await.context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read answer")?;
        if read == 0 {
            anyhow::bail!("input closed while waiting for confirmation");
        }
        Ok(line.trim().to_string())
    }
}

fn trend_line(index: usize, trend: &Value) -> String {
    match trend {
        Value::String(title) => format!("  {}. {}\n", index + 1, title),
        Value::Object(map) => {
            let title = map.get("title").and_then(Value::as_str).unwrap_or("(untitled)");
            match map.get("score").and_then(Value::as_u64) {
                Some(score) => format!("  {}. {} [{}]\n", index + 1, title, score),
                None => format!("  {}. {}\n", index + 1, title),
            }
        }
        other => format!("  {}. {}\n", index + 1, other),
    }
}

fn suggestion_line(suggestion: &Value) -> String {
    let field = |key: &str| suggestion.get(key).and_then(Value::as_str).unwrap_or("");
    let line = suggestion.get("line").and_then(Value::as_u64).unwrap_or(0);
    format!(
        "  {} (line {}): \"{}\" -> {}\n",
        field("id"),
        line,
        field("original"),
        field("suggestion")
    )
}

/// `"a 1 3"` keeps trends 1 and 3; out-of-range numbers are ignored
fn parse_trend_answer(answer: &str, trends: &[Value]) -> TrendDecision {
    let mut parts = answer
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty());
    let action = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        None | Some("a") | Some("accept") => TrendAction::Accept,
        Some("e") | Some("edit") => TrendAction::Edit,
        Some("d") | Some("add") => TrendAction::Add,
        Some("r") | Some("retry") => TrendAction::Retry,
        Some("c") | Some("cancel") => TrendAction::Cancel,
        Some(_) => TrendAction::Cancel,
    };
    if action != TrendAction::Accept {
        return TrendDecision::other(action);
    }

    let picks: Vec<Value> = parts
        .filter_map(|p| p.parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1).and_then(|i| trends.get(i)).cloned())
        .collect();
    if picks.is_empty() {
        TrendDecision::accept()
    } else {
        TrendDecision::accept_only(picks)
    }
}

fn parse_suggestion_action(answer: &str) -> SuggestionAction {
    match answer.to_ascii_lowercase().as_str() {
        "" | "a" | "apply" => SuggestionAction::Apply,
        "s" | "skip" => SuggestionAction::Skip,
        "m" | "manual" | "manual-edit" => SuggestionAction::ManualEdit,
        _ => SuggestionAction::Cancel,
    }
}

#[async_trait]
impl<R, W> ConfirmationGate for TerminalGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm_trends(
        &self,
        step: &StepSpec,
        trends: &[Value],
    ) -> anyhow::Result<TrendDecision> {
        let mut prompt = format!("\n{} proposed {} trend(s):\n", step.label(), trends.len());
        for (index, trend) in trends.iter().enumerate() {
            prompt.push_str(&trend_line(index, trend));
        }
        prompt.push_str("[a]ccept (add numbers to keep a subset), [e]dit, a[d]d, [r]etry, [c]ancel: ");

        let answer = self.ask(&prompt).await?;
        Ok(parse_trend_answer(&answer, trends))
    }

    async fn confirm_suggestions(
        &self,
        step: &StepSpec,
        suggestions: &[Value],
    ) -> anyhow::Result<SuggestionDecision> {
        let mut prompt = format!(
            "\n{} made {} suggestion(s):\n",
            step.label(),
            suggestions.len()
        );
        for suggestion in suggestions {
            prompt.push_str(&suggestion_line(suggestion));
        }
        prompt.push_str("[a]pply, [s]kip, [m]anual edit, [c]ancel: ");

        let action = parse_suggestion_action(&self.ask(&prompt).await?);
        if action != SuggestionAction::ManualEdit {
            return Ok(SuggestionDecision::new(action));
        }

        let text = self.ask("Edit instructions: ").await?;
        Ok(SuggestionDecision::manual_edit(text))
    }

    async fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("\n{} [Y/n]: ", message)).await?;
        Ok(!answer.to_ascii_lowercase().starts_with('n'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::io::Builder;

    fn gate(input: &[u8]) -> TerminalGate<BufReader<tokio_test::io::Mock>, Vec<u8>> {
        TerminalGate::new(BufReader::new(Builder::new().read(input).build()), Vec::new())
    }

    fn written(gate: TerminalGate<BufReader<tokio_test::io::Mock>, Vec<u8>>) -> String {
        String::from_utf8(gate.into_inner().1).unwrap()
    }

    #[tokio::test]
    async fn test_trends_accept_subset() {
        let gate = gate(b"a 2\n");
        let step = StepSpec::new("trend-research");
        let trends = vec![
            json!({"title": "One", "score": 90}),
            json!({"title": "Two", "score": 80}),
        ];

        let decision = gate.confirm_trends(&step, &trends).await.unwrap();
        assert_eq!(decision, TrendDecision::accept_only(vec![trends[1].clone()]));

        let shown = written(gate);
        assert!(shown.contains("1. One [90]"));
        assert!(shown.contains("[a]ccept"));
    }

    #[tokio::test]
    async fn test_trends_retry_and_empty_answer() {
        let step = StepSpec::new("trend-research");
        let decision = gate(b"r\n").confirm_trends(&step, &[]).await.unwrap();
        assert_eq!(decision.action, TrendAction::Retry);

        let decision = gate(b"\n").confirm_trends(&step, &[]).await.unwrap();
        assert_eq!(decision, TrendDecision::accept());
    }

    #[tokio::test]
    async fn test_suggestions_manual_edit_reads_second_line() {
        let gate = gate(b"m\nmake it meaner\n");
        let step = StepSpec::new("editor");
        let suggestions = vec![json!({
            "id": "S001", "line": 3, "original": "very", "suggestion": "Cut the intensifier"
        })];

        let decision = gate.confirm_suggestions(&step, &suggestions).await.unwrap();
        assert_eq!(decision, SuggestionDecision::manual_edit("make it meaner"));
        let shown = written(gate);
        assert!(shown.contains("S001 (line 3)"));
        assert!(shown.contains("Edit instructions"));
    }

    #[tokio::test]
    async fn test_confirm_defaults_to_yes() {
        assert!(gate(b"\n").confirm("Publish?").await.unwrap());
        assert!(gate(b"yes\n").confirm("Publish?").await.unwrap());
        assert!(!gate(b"n\n").confirm("Publish?").await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_input_is_an_error() {
        let gate = TerminalGate::new(BufReader::new(Builder::new().build()), Vec::new());
        let err = gate.confirm("Publish?").await.unwrap_err();
        assert!(err.to_string().contains("input closed"));
    }

    #[test]
    fn test_parse_trend_answer_ignores_bad_numbers() {
        let trends = vec![json!("x")];
        assert_eq!(parse_trend_answer("a 0 9 zz", &trends), TrendDecision::accept());
        assert_eq!(
            parse_trend_answer("accept,1", &trends),
            TrendDecision::accept_only(vec![json!("x")])
        );
        assert_eq!(parse_trend_answer("nope", &trends).action, TrendAction::Cancel);
    }
}
