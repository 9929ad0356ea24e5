use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use reflow_config::Config;
use reflow_engine::{
    Cmd, Document, ReflowReport, Segment, UnitId,
    editing::Payload,
    parsing::{Span as TextSpan, text::preview},
};
use std::{env, io::stdout, path::PathBuf, process};

mod script;

use script::Step;

/// Wrap widths cycled through with Ctrl-W.
const WIDTHS: [usize; 4] = [80, 60, 40, 0];

/// Bytes of text shown after each leaf unit in the layout panel.
const EXCERPT: usize = 24;

struct App {
    path: PathBuf,
    document: Document,
    caret: usize,
    last_report: Option<ReflowReport>,
    /// Top-level units that existed before the last pass.
    previous_units: Vec<UnitId>,
    status: String,
}

impl App {
    fn new(path: PathBuf, wrap_width: usize) -> Result<Self> {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = Document::from_bytes(&bytes)?.with_wrap_width(wrap_width);
        let caret = document.len();

        let mut app = Self {
            path,
            document,
            caret,
            last_report: None,
            previous_units: Vec::new(),
            status: String::new(),
        };
        app.reflow();
        Ok(app)
    }

    fn apply(&mut self, cmd: Cmd) {
        let patch = self.document.apply(cmd);
        self.caret = patch.new_selection.end;
        self.reflow();
    }

    fn reflow(&mut self) {
        self.previous_units = top_level_units(self.document.layout());
        match self.document.reflow() {
            Ok(report) => {
                self.status = format!("v{}", self.document.version());
                self.last_report = Some(report);
            }
            Err(e) => {
                log::debug!("reflow failed: {e}");
                self.status = format!("Reflow failed: {e}");
                self.last_report = None;
            }
        }
    }

    fn insert(&mut self, text: &str) {
        self.apply(Cmd::InsertText {
            at: self.caret,
            text: text.to_string(),
        });
    }

    fn backspace(&mut self) {
        if let Some(start) = self.char_before(self.caret) {
            self.apply(Cmd::DeleteRange {
                range: start..self.caret,
            });
        }
    }

    fn delete(&mut self) {
        if let Some(end) = self.char_after(self.caret) {
            self.apply(Cmd::DeleteRange {
                range: self.caret..end,
            });
        }
    }

    fn move_left(&mut self) {
        if let Some(start) = self.char_before(self.caret) {
            self.caret = start;
        }
    }

    fn move_right(&mut self) {
        if let Some(end) = self.char_after(self.caret) {
            self.caret = end;
        }
    }

    fn move_vertically(&mut self, down: bool) {
        let text = self.document.text();
        let (row, col) = caret_position(&text, self.caret);
        let target = match (down, row) {
            (false, 0) => return,
            (false, row) => row - 1,
            (true, row) => row + 1,
        };
        let mut offset = 0;
        for (index, line) in text.split_inclusive('\n').enumerate() {
            if index == target {
                let body = line.trim_end_matches('\n');
                let col = body
                    .char_indices()
                    .nth(col)
                    .map_or(body.len(), |(byte, _)| byte);
                self.caret = offset + col;
                return;
            }
            offset += line.len();
        }
    }

    fn invalidate_at_caret(&mut self) {
        self.status = match self.document.invalidate_from(self.caret) {
            Ok(true) => "Layout invalidated".to_string(),
            Ok(false) => format!("Layout invalidated from {}", self.caret),
            Err(e) => format!("Invalidation failed: {e}"),
        };
        self.reflow();
    }

    fn cycle_wrap_width(&mut self) {
        let current = self.document.wrap_width();
        let next = WIDTHS
            .iter()
            .position(|&w| w == current)
            .map_or(WIDTHS[0], |i| WIDTHS[(i + 1) % WIDTHS.len()]);
        if let Err(e) = self.document.set_wrap_width(next) {
            self.status = format!("Failed to change wrap width: {e}");
            return;
        }
        self.reflow();
    }

    fn reflow_all(&mut self) {
        self.previous_units = top_level_units(self.document.layout());
        match self.document.reflow_all() {
            Ok(report) => {
                self.status = "Full reflow".to_string();
                self.last_report = Some(report);
            }
            Err(e) => self.status = format!("Reflow failed: {e}"),
        }
    }

    fn save(&mut self) {
        self.status = match std::fs::write(&self.path, self.document.to_bytes()) {
            Ok(()) => {
                log::info!("saved {} (v{})", self.path.display(), self.document.version());
                format!("Saved {}", self.path.display())
            }
            Err(e) => format!("Failed to save: {e}"),
        };
    }

    fn char_before(&self, offset: usize) -> Option<usize> {
        let text = self.document.text();
        text[..offset.min(text.len())]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn char_after(&self, offset: usize) -> Option<usize> {
        let text = self.document.text();
        text.get(offset..)?
            .chars()
            .next()
            .map(|c| offset + c.len_utf8())
    }
}

fn top_level_units(layout: &Segment<Payload>) -> Vec<UnitId> {
    layout.iter().map(|(id, _)| id).collect()
}

fn caret_position(text: &str, caret: usize) -> (usize, usize) {
    let before = &text[..caret.min(text.len())];
    let row = before.matches('\n').count();
    let col = before
        .rsplit('\n')
        .next()
        .map_or(0, |line| line.chars().count());
    (row, col)
}

/// One row per unit, nested units indented under their container, leaves
/// followed by an excerpt of their text. Only top-level rows carry their id;
/// nested ids are local to their segment.
fn layout_rows(
    document: &Document,
    segment: &Segment<Payload>,
    indent: usize,
    rows: &mut Vec<(Option<UnitId>, String)>,
) {
    for (id, unit) in segment.iter() {
        let start = segment.origin() + unit.content_start();
        let end = start + unit.formatted_length();
        let excerpt = match unit.nested() {
            Some(_) => String::new(),
            None => preview(document.buffer(), TextSpan::new(start, end), EXCERPT),
        };
        let id = (indent == 0).then_some(id);
        rows.push((
            id,
            format!(
                "{}{:<9} {:>5}..{:<5} {:>3} lines  {excerpt}",
                "  ".repeat(indent),
                format!("{:?}", unit.kind()),
                start,
                end,
                unit.payload().map_or(0, |block| block.lines),
            ),
        ));
        if let Some(nested) = unit.nested() {
            layout_rows(document, nested, indent + 1, rows);
        }
    }
}

fn report_line(report: &ReflowReport) -> String {
    let stats = &report.stats;
    format!(
        "pulled {} | formatted {} | reused {} | modified {} | fabricated {} | disposed {} | islands {}",
        report.pulled,
        report.formatted,
        stats.reused,
        stats.modified,
        stats.fabricated,
        stats.disposed,
        stats.islands
    )
}

fn replay(document_path: PathBuf, script_path: PathBuf, wrap_width: usize) -> Result<()> {
    let source = std::fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps = script::parse(&source)?;
    log::debug!("replaying {} step(s) from {}", steps.len(), script_path.display());
    let bytes = std::fs::read(&document_path)
        .with_context(|| format!("Failed to read {}", document_path.display()))?;
    let mut document = Document::from_bytes(&bytes)?.with_wrap_width(wrap_width);

    let report = document.reflow()?;
    println!("initial: {}", report_line(&report));
    for step in steps {
        match step {
            Step::Edit(cmd) => {
                let patch = document.apply(cmd.clone());
                println!("{cmd:?} -> v{}", patch.version);
            }
            Step::Invalidate(at) => {
                let all = document.invalidate_from(at)?;
                println!("invalidate {at}: {}", if all { "everything" } else { "tail" });
            }
            Step::Reflow => {
                let report = document.reflow()?;
                println!("reflow: {}", report_line(&report));
            }
        }
    }

    // Trailing edits still get laid out
    if !document.edits().is_clean() {
        let report = document.reflow()?;
        println!("reflow: {}", report_line(&report));
    }
    let mut rows = Vec::new();
    layout_rows(&document, document.layout(), 0, &mut rows);
    println!();
    for (_, row) in rows {
        println!("{row}");
    }
    println!("{} display lines", document.total_lines());
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let mut builder = env_logger::Builder::new();
    builder.parse_filters(config.log_filter.as_deref().unwrap_or("warn"));
    if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    }
    builder.init();

    let (document_path, script_path) = match args.as_slice() {
        [_, flag, script, document] if flag == "--replay" => {
            (PathBuf::from(document), Some(PathBuf::from(script)))
        }
        [_, document] => (PathBuf::from(document), None),
        [_] => match config.document.clone() {
            Some(document) => (document, None),
            None => {
                eprintln!("Error: No document provided and none configured");
                eprintln!("Usage: {} [--replay <script>] <document.md>", args[0]);
                eprintln!("Or set `document` in {}", config_path.display());
                process::exit(1);
            }
        },
        _ => {
            eprintln!("Usage: {} [--replay <script>] <document.md>", args[0]);
            process::exit(1);
        }
    };

    if let Some(script_path) = script_path {
        return replay(document_path, script_path, config.wrap_width);
    }

    let mut app = App::new(document_path, config.wrap_width)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Char('r') if ctrl => app.reflow_all(),
                KeyCode::Char('w') if ctrl => app.cycle_wrap_width(),
                KeyCode::Char('x') if ctrl => app.invalidate_at_caret(),
                KeyCode::Char('s') if ctrl => app.save(),
                KeyCode::Char(c) if !ctrl => app.insert(c.encode_utf8(&mut [0; 4])),
                KeyCode::Enter => app.insert("\n"),
                KeyCode::Tab => app.insert("\t"),
                KeyCode::Backspace => app.backspace(),
                KeyCode::Delete => app.delete(),
                KeyCode::Left => app.move_left(),
                KeyCode::Right => app.move_right(),
                KeyCode::Up => app.move_vertically(false),
                KeyCode::Down => app.move_vertically(true),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[0]);

    // Document panel
    let text = app.document.text();
    let content_text: Vec<Line> = text.split('\n').map(|line| Line::from(line.to_string())).collect();
    let title = format!(
        "{} (wrap {})",
        app.path.display(),
        match app.document.wrap_width() {
            0 => "off".to_string(),
            width => width.to_string(),
        }
    );
    let content = Paragraph::new(content_text).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(content, chunks[0]);

    let (row, col) = caret_position(&text, app.caret);
    f.set_cursor_position((chunks[0].x + 1 + col as u16, chunks[0].y + 1 + row as u16));

    // Layout panel: top-level units fabricated by the last pass are highlighted
    let mut unit_rows = Vec::new();
    layout_rows(&app.document, app.document.layout(), 0, &mut unit_rows);
    let unit_items: Vec<ListItem> = unit_rows
        .into_iter()
        .map(|(id, row)| {
            let fresh = id.is_some_and(|id| !app.previous_units.contains(&id));
            let style = if fresh {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(vec![Line::from(vec![Span::styled(row, style)])])
        })
        .collect();
    let units = List::new(unit_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Layout ({} lines)", app.document.total_lines())),
    );
    f.render_widget(units, chunks[1]);

    // Status and help
    let report = app
        .last_report
        .as_ref()
        .map(report_line)
        .unwrap_or_default();
    let help = Paragraph::new(vec![
        Line::from(vec![Span::raw(format!("{} | {report}", app.status))]),
        Line::from(vec![Span::raw(
            "Esc: Quit | Ctrl-S: Save | Ctrl-R: Full reflow | Ctrl-W: Wrap width | Ctrl-X: Invalidate from caret",
        )]),
    ])
    .block(Block::default());
    f.render_widget(help, rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn caret_position_counts_rows_and_chars() {
        let text = "one\ntwó\n";
        assert_eq!(caret_position(text, 0), (0, 0));
        assert_eq!(caret_position(text, 4), (1, 0));
        assert_eq!(caret_position(text, 8), (1, 3));
        assert_eq!(caret_position(text, 9), (2, 0));
    }

    #[test]
    fn layout_rows_indent_nested_units() {
        let mut document = Document::from_bytes(b"intro\n\n> quoted\n").unwrap();
        document.reflow().unwrap();

        let mut rows = Vec::new();
        layout_rows(&document, document.layout(), 0, &mut rows);

        assert_eq!(rows.len(), 3);
        assert!(rows[0].1.starts_with("Paragraph"));
        assert!(rows[1].1.starts_with("Container"));
        assert!(rows[2].1.starts_with("  Paragraph"));
        assert!(rows[2].0.is_none());
        assert!(rows[0].1.ends_with("intro⏎⏎"));
        assert!(rows[2].1.ends_with("> quoted⏎"));
    }
}
