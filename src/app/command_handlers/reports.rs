use crate::app::context::AppContext;
use crate::gateway::UploadFile;
use crate::persistence::{ReportStore, User};
use crate::reports::{
    filter_reports, parse_filter_date, render_report, render_summary, ReportHistoryFilter,
    NO_ANALYSIS_TEXT,
};
use crate::shared::ReportId;
use crate::workflow::WorkflowError;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NewReportArgs {
    query: String,
    fields: Vec<(String, String)>,
    attachments: Vec<PathBuf>,
    prompt: bool,
}

pub fn cmd_report<R: BufRead, W: Write>(
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    match args.first().map(String::as_str) {
        Some("new") => cmd_report_new(&args[1..], input, output),
        Some("list") => cmd_report_list(&args[1..]),
        Some("show") if args.len() == 2 => cmd_report_show(&args[1]),
        Some("delete") if args.len() == 2 => cmd_report_delete(&args[1]),
        _ => Err(
            "usage: report new <query> [--field name=value]... [--attach path]... [--no-prompt] | report list [--search s] [--from date] [--to date] | report show <report_id> | report delete <report_id>"
                .to_string(),
        ),
    }
}

fn workflow_error(err: WorkflowError) -> String {
    format!("{} error: {err}", err.kind())
}

fn write_line<W: Write>(output: &mut W, line: &str) -> Result<(), String> {
    writeln!(output, "{line}").map_err(|e| format!("failed to write output: {e}"))
}

fn parse_new_report_args(args: &[String]) -> Result<NewReportArgs, String> {
    let mut parsed = NewReportArgs {
        prompt: true,
        ..NewReportArgs::default()
    };
    let mut query_words = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "--field" => {
                let raw = args
                    .get(idx + 1)
                    .ok_or_else(|| "--field requires <name>=<value>".to_string())?;
                let (name, value) = raw
                    .split_once('=')
                    .ok_or_else(|| format!("--field expects <name>=<value>, got `{raw}`"))?;
                parsed
                    .fields
                    .push((name.trim().to_string(), value.to_string()));
                idx += 2;
            }
            "--attach" => {
                let path = args
                    .get(idx + 1)
                    .ok_or_else(|| "--attach requires a file path".to_string())?;
                parsed.attachments.push(PathBuf::from(path));
                idx += 2;
            }
            "--no-prompt" => {
                parsed.prompt = false;
                idx += 1;
            }
            word => {
                query_words.push(word.to_string());
                idx += 1;
            }
        }
    }
    parsed.query = query_words.join(" ");
    if parsed.query.trim().is_empty() {
        return Err("usage: report new <query> [--field name=value]... [--attach path]...".to_string());
    }
    Ok(parsed)
}

fn cmd_report_new<R: BufRead, W: Write>(
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    let parsed = parse_new_report_args(args)?;
    let context = AppContext::load()?;
    let mut workflow = context.workflow();

    let outcome = workflow
        .submit_query(&parsed.query)
        .map_err(workflow_error)?;
    write_line(output, &format!("report_id={}", outcome.report_id))?;
    let requested = if outcome.form_fields.is_empty() {
        "(none)".to_string()
    } else {
        outcome.form_fields.join(", ")
    };
    write_line(output, &format!("requested fields: {requested}"))?;

    for (name, value) in &parsed.fields {
        workflow.record_field(name, value).map_err(workflow_error)?;
    }

    if parsed.prompt {
        for field in workflow.missing_fields() {
            write!(output, "{field}: ").map_err(|e| format!("failed to write prompt: {e}"))?;
            output
                .flush()
                .map_err(|e| format!("failed to flush prompt: {e}"))?;
            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| format!("failed to read input: {e}"))?;
            if read == 0 {
                break;
            }
            workflow
                .record_field(&field, line.trim())
                .map_err(workflow_error)?;
        }
    }

    let missing = workflow.missing_fields();
    if !missing.is_empty() {
        return Err(format!(
            "missing required fields: {}\nreport_id={}",
            missing.join(", "),
            outcome.report_id
        ));
    }

    if !parsed.attachments.is_empty() {
        let files = parsed
            .attachments
            .iter()
            .map(|path| {
                UploadFile::from_path(path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let uploaded = workflow
            .upload_supporting_files(files)
            .map_err(workflow_error)?;
        write_line(output, &format!("uploaded={}", uploaded.files.len()))?;
    }

    let analysis = workflow.submit_final().map_err(workflow_error)?;
    Ok(format!(
        "report submitted\nreport_id={}\nnarrative_stored={}\n\n{}",
        analysis.report_id,
        analysis.narrative_stored,
        analysis.markdown.as_deref().unwrap_or(NO_ANALYSIS_TEXT)
    ))
}

fn parse_history_filter(args: &[String]) -> Result<ReportHistoryFilter, String> {
    let mut filter = ReportHistoryFilter::default();
    let mut idx = 0;
    while idx < args.len() {
        let value = args
            .get(idx + 1)
            .ok_or_else(|| format!("`{}` requires a value", args[idx]))?;
        filter = match args[idx].as_str() {
            "--search" => filter.with_search(value),
            "--from" => filter.with_from(parse_filter_date(value)?),
            "--to" => filter.with_to(parse_filter_date(value)?),
            other => return Err(format!("unknown option `{other}` for report list")),
        };
        idx += 2;
    }
    Ok(filter)
}

fn signed_in_user(context: &AppContext) -> Result<User, String> {
    context.session.require_user().map_err(|e| e.to_string())
}

fn cmd_report_list(args: &[String]) -> Result<String, String> {
    let filter = parse_history_filter(args)?;
    let context = AppContext::load()?;
    let user = signed_in_user(&context)?;
    let reports = context
        .repository
        .list_reports_by_user(&user.id)
        .map_err(|e| e.to_string())?;
    let visible = filter_reports(&reports, &filter);
    if visible.is_empty() {
        return Ok("no reports".to_string());
    }
    Ok(visible
        .iter()
        .map(render_summary)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn cmd_report_show(raw_id: &str) -> Result<String, String> {
    let report_id = ReportId::parse(raw_id)?;
    let context = AppContext::load()?;
    let user = signed_in_user(&context)?;
    let report = context
        .repository
        .get_report(&report_id, &user.id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("report `{report_id}` not found"))?;
    Ok(render_report(&report))
}

fn cmd_report_delete(raw_id: &str) -> Result<String, String> {
    let report_id = ReportId::parse(raw_id)?;
    let context = AppContext::load()?;
    let user = signed_in_user(&context)?;
    let deleted = context
        .repository
        .delete_report(&report_id, &user.id)
        .map_err(|e| e.to_string())?;
    if !deleted {
        return Err(format!("report `{report_id}` not found"));
    }
    context
        .log
        .info("report.deleted", &format!("report {report_id}"));
    Ok(format!("report deleted\nreport_id={report_id}"))
}
