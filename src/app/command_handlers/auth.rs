use crate::app::context::AppContext;
use crate::persistence::User;
use std::io::{BufRead, Write};

fn render_user(header: &str, user: &User) -> String {
    format!(
        "{header}\nuser_id={}\nemail={}\norganization={}",
        user.id, user.email, user.organization_name
    )
}

/// Reads the password as the first line of `input` so it never appears in
/// argv or shell history.
fn read_password<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String, String> {
    write!(output, "password: ").map_err(|e| format!("failed to write prompt: {e}"))?;
    output
        .flush()
        .map_err(|e| format!("failed to flush prompt: {e}"))?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| format!("failed to read password: {e}"))?;
    let password = line.trim_end_matches(&['\r', '\n'][..]).to_string();
    if password.is_empty() {
        return Err("a password is required on stdin".to_string());
    }
    writeln!(output).map_err(|e| format!("failed to write output: {e}"))?;
    Ok(password)
}

pub fn cmd_signup<R: BufRead, W: Write>(
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    if args.len() < 2 {
        return Err("usage: signup <email> <organization> (password on stdin)".to_string());
    }
    let organization = args[1..].join(" ");
    let password = read_password(input, output)?;
    let context = AppContext::load()?;
    let user = context
        .auth_service()
        .signup(&args[0], &password, &organization)
        .map_err(|e| e.to_string())?;
    Ok(render_user("signup complete; log in to continue", &user))
}

pub fn cmd_login<R: BufRead, W: Write>(
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    if args.is_empty() {
        return Err("usage: login <email> [organization] (password on stdin)".to_string());
    }
    let organization = args[1..].join(" ");
    let password = read_password(input, output)?;
    let context = AppContext::load()?;
    let user = context
        .auth_service()
        .login(&args[0], &password, &organization)
        .map_err(|e| e.to_string())?;
    Ok(render_user("logged in", &user))
}

pub fn cmd_logout() -> Result<String, String> {
    let context = AppContext::load()?;
    context.auth_service().logout().map_err(|e| e.to_string())?;
    Ok("logged out".to_string())
}

pub fn cmd_whoami() -> Result<String, String> {
    let context = AppContext::load()?;
    match context
        .auth_service()
        .check_auth()
        .map_err(|e| e.to_string())?
    {
        Some(user) => Ok(render_user("logged in", &user)),
        None => Ok("not logged in".to_string()),
    }
}
