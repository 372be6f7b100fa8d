use crate::app::context::AppContext;
use crate::reports::render_chat_message;
use crate::shared::ReportId;
use std::io::{BufRead, Write};

const CHAT_EXIT_COMMANDS: &[&str] = &["/exit", "exit", "quit"];

pub fn cmd_chat<R: BufRead, W: Write>(
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    if args.len() != 1 {
        return Err("usage: chat <report_id>".to_string());
    }
    let report_id = ReportId::parse(&args[0])?;
    let context = AppContext::load()?;
    let chat = context.chat(report_id.clone());

    let history = chat.load_history().map_err(|e| e.to_string())?;
    writeln!(output, "chat report_id={report_id} messages={}", history.len())
        .map_err(|e| format!("failed to write chat output: {e}"))?;
    for message in &history {
        writeln!(output, "{}", render_chat_message(message))
            .map_err(|e| format!("failed to write chat output: {e}"))?;
    }
    writeln!(output, "type `/exit` to quit")
        .map_err(|e| format!("failed to write chat output: {e}"))?;

    let mut sent = 0_usize;
    loop {
        write!(output, "you> ").map_err(|e| format!("failed to write chat prompt: {e}"))?;
        output
            .flush()
            .map_err(|e| format!("failed to flush chat prompt: {e}"))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| format!("failed to read chat input: {e}"))?;
        if read == 0 {
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_chat_exit_command(message) {
            break;
        }

        // Failures are shown and the loop continues; the user can resend.
        match chat.send_message(message) {
            Ok(exchange) => {
                sent += 1;
                writeln!(output, "assistant> {}", exchange.assistant_message.content)
                    .map_err(|e| format!("failed to write chat output: {e}"))?;
            }
            Err(err) => {
                writeln!(output, "error> {err}")
                    .map_err(|e| format!("failed to write chat output: {e}"))?;
            }
        }
        output
            .flush()
            .map_err(|e| format!("failed to flush chat output: {e}"))?;
    }

    Ok(format!("chat ended\nreport_id={report_id}\nsent={sent}"))
}

fn is_chat_exit_command(message: &str) -> bool {
    CHAT_EXIT_COMMANDS
        .iter()
        .any(|command| message.eq_ignore_ascii_case(command))
}
