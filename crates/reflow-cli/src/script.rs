//! Edit scripts: one step per line, replayed against a document.
//!
//! ```text
//! # comments and blank lines are skipped
//! insert 12 some text\n
//! delete 4..9
//! replace 0..5 Hello
//! invalidate 30
//! reflow
//! ```
//!
//! Text runs to the end of the line; `\n`, `\t` and `\\` are unescaped.

use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use reflow_engine::Cmd;
use regex::Regex;

static STEP: OnceLock<Regex> = OnceLock::new();

fn step_regex() -> &'static Regex {
    STEP.get_or_init(|| {
        Regex::new(r"^(?P<op>[a-z]+)(?:\s+(?P<start>\d+)(?:\.\.(?P<end>\d+))?)?(?:\s(?P<text>.*))?$")
            .expect("Invalid step regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Edit(Cmd),
    Invalidate(usize),
    Reflow,
}

pub fn parse(script: &str) -> Result<Vec<Step>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(number, line)| {
            parse_step(line.trim_end()).with_context(|| format!("line {}: {line:?}", number + 1))
        })
        .collect()
}

fn parse_step(line: &str) -> Result<Step> {
    let Some(caps) = step_regex().captures(line) else {
        bail!("not a step");
    };
    let number = |name: &str| -> Result<Option<usize>> {
        caps.name(name)
            .map(|m| m.as_str().parse::<usize>())
            .transpose()
            .with_context(|| format!("bad {name} position"))
    };
    let start = number("start")?;
    let end = number("end")?;
    let text = caps.name("text").map(|m| unescape(m.as_str()));

    let step = match (&caps["op"], start, end, text) {
        ("insert", Some(at), None, Some(text)) => Step::Edit(Cmd::InsertText { at, text }),
        ("delete", Some(start), Some(end), None) => Step::Edit(Cmd::DeleteRange { range: start..end }),
        ("replace", Some(start), Some(end), Some(text)) => Step::Edit(Cmd::ReplaceRange {
            range: start..end,
            text,
        }),
        ("invalidate", Some(at), None, None) => Step::Invalidate(at),
        ("reflow", None, None, None) => Step::Reflow,
        (op, ..) => bail!("wrong arguments for {op:?}"),
    };
    Ok(step)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
