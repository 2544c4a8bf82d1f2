//! Output mode selection and the JSON envelope used by `--json`

use std::sync::OnceLock;

use serde::Serialize;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Suppresses human-mode chatter when `ENGAGE_QUIET` is set.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("ENGAGE_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn envelope<T: Serialize>(command: &str, data: T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Envelope {
        ok: true,
        command,
        data: Some(data),
        error: None,
    })
}

/// Print a success envelope. Human mode prints nothing here.
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        println!("{}", envelope(command, data)?);
    }
    Ok(())
}

/// Print a failure envelope on stdout so scripted callers see one document.
pub fn emit_error(mode: OutputMode, command: &str, error: &anyhow::Error) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let doc = serde_json::to_string_pretty(&Envelope::<()> {
            ok: false,
            command,
            data: None,
            error: Some(format!("{:#}", error)),
        })?;
        println!("{}", doc);
    }
    Ok(())
}
