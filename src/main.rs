mod input;
mod ui;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use medrag::{
    Assistant, Config, EmbeddingFunction, IndexReport, Phase, Result as RagResult, Session,
    index_corpus, load_assistant,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::input::LineInput;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    init_tracing(&cfg.log_file)?;

    let args: Vec<String> = env::args().skip(1).collect();
    if let Some(question) = ask_argument(&args) {
        return run_once(cfg, question).await;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cfg);
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn init_tracing(path: &Path) -> io::Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn ask_argument(args: &[String]) -> Option<String> {
    match args {
        [flag, rest @ ..] if flag == "--ask" && !rest.is_empty() => Some(rest.join(" ")),
        _ => None,
    }
}

/// Answers one question on stdout without the terminal UI.
async fn run_once(cfg: Config, question: String) -> io::Result<()> {
    let outcome = tokio::task::spawn_blocking(move || {
        let mut session = Session::new(cfg);
        if session.initialize_with("", load_assistant) != Phase::Ready {
            return Err(session
                .banner()
                .map(|b| b.text().to_string())
                .unwrap_or_else(|| "initialization failed".to_string()));
        }
        let mut sink = FragmentSink::new(io::stdout());
        let answered = session.ask(&question, |f| sink.push(f)).is_some();
        sink.finish().map_err(|e| format!("writing answer to stdout: {}", e))?;
        match (answered, session.banner()) {
            (true, _) => Ok(()),
            (false, Some(banner)) => Err(banner.text().to_string()),
            (false, None) => Ok(()),
        }
    })
    .await
    .map_err(io::Error::other)?;

    outcome.map_err(io::Error::other)
}

/// Writes streamed fragments through as they arrive. The first write error
/// stops further output and is reported by `finish`.
struct FragmentSink<W: Write> {
    out: W,
    failed: Option<io::Error>,
}

impl<W: Write> FragmentSink<W> {
    fn new(out: W) -> Self {
        Self { out, failed: None }
    }

    fn push(&mut self, fragment: &str) {
        if self.failed.is_some() {
            return;
        }
        let written = self.out.write_all(fragment.as_bytes()).and_then(|_| self.out.flush());
        if let Err(err) = written {
            self.failed = Some(err);
        }
    }

    fn finish(mut self) -> io::Result<()> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Focus {
    Key,
    Question,
}

enum Response {
    Loaded(RagResult<Assistant>),
    Fragment(String),
    Answered(RagResult<String>),
    Indexed(RagResult<IndexReport>),
}

pub(crate) struct App {
    session: Session,
    focus: Focus,
    key_input: LineInput,
    question: LineInput,
    is_loading: bool,
    notice: Option<String>,
    answer_scroll: usize,
    answer_content_len: usize,
    answer_view_height: usize,
    answer_auto_scroll: bool,
    spinner_idx: usize,
}

impl App {
    fn new(cfg: Config) -> Self {
        Self {
            session: Session::new(cfg),
            focus: Focus::Question,
            key_input: LineInput::default(),
            question: LineInput::default(),
            is_loading: false,
            notice: None,
            answer_scroll: 0,
            answer_content_len: 0,
            answer_view_height: 0,
            answer_auto_scroll: false,
            spinner_idx: 0,
        }
    }

    fn busy(&self) -> bool {
        self.is_loading || self.session.is_busy()
    }

    fn focused_input(&mut self) -> &mut LineInput {
        match self.focus {
            Focus::Key => &mut self.key_input,
            Focus::Question => &mut self.question,
        }
    }

    fn apply_key(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.busy() {
            return;
        }
        let entered = self.key_input.text().to_string();
        match self.session.provide_key(&entered) {
            Some(credential) => {
                let cfg = self.session.config().clone();
                self.spawn_load(tx, move || load_assistant(&cfg, credential));
            }
            None => self.focus = Focus::Key,
        }
    }

    fn reload(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.busy() {
            return;
        }
        if let Some(credential) = self.session.reload() {
            let cfg = self.session.config().clone();
            self.spawn_load(tx, move || load_assistant(&cfg, credential));
        }
    }

    fn spawn_load<L>(&mut self, tx: mpsc::UnboundedSender<Response>, loader: L)
    where
        L: FnOnce() -> RagResult<Assistant> + Send + 'static,
    {
        self.is_loading = true;
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(Response::Loaded(loader()));
        });
    }

    fn create_directory(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.busy() || !self.session.can_create_directory() {
            return;
        }
        if self.session.create_directory().is_ok() {
            self.reload(tx);
        }
    }

    fn submit(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.busy() {
            return;
        }
        let Some((assistant, query)) = self.session.submit(self.question.text()) else {
            return;
        };
        self.notice = None;
        self.answer_scroll = 0;
        self.answer_auto_scroll = true;
        tokio::task::spawn_blocking(move || {
            let result = assistant.answer(&query, |fragment| {
                let _ = tx.send(Response::Fragment(fragment.to_string()));
            });
            let _ = tx.send(Response::Answered(result));
        });
    }

    fn index_now(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.busy() || !self.session.can_index() {
            return;
        }
        self.is_loading = true;
        self.notice = Some("Indexing corpus...".to_string());
        let cfg = self.session.config().clone();
        tokio::task::spawn_blocking(move || {
            let embedder = EmbeddingFunction::from_config(&cfg);
            let _ = tx.send(Response::Indexed(index_corpus(&cfg, &embedder)));
        });
    }

    fn handle_response(&mut self, response: Response, tx: mpsc::UnboundedSender<Response>) {
        match response {
            Response::Loaded(result) => {
                self.is_loading = false;
                self.session.index_loaded(result);
                if self.session.phase() == Phase::Ready {
                    self.focus = Focus::Question;
                }
            }
            Response::Fragment(fragment) => {
                self.session.push_fragment(&fragment);
                self.answer_auto_scroll = true;
            }
            Response::Answered(result) => {
                self.session.finish(result);
            }
            Response::Indexed(result) => {
                self.is_loading = false;
                match result {
                    Ok(report) => {
                        info!(files = report.files, chunks = report.chunks, "corpus indexed");
                        self.notice = Some(format!(
                            "Indexed {} chunks from {} files.",
                            report.chunks, report.files
                        ));
                        self.reload(tx);
                    }
                    Err(err) => self.notice = Some(format!("Indexing failed: {}", err)),
                }
            }
        }
    }

    fn scroll_up(&mut self, by: usize) {
        self.answer_scroll = self.answer_scroll.saturating_sub(by);
    }

    fn scroll_down(&mut self, by: usize) {
        let max_scroll = self.answer_content_len.saturating_sub(self.answer_view_height);
        self.answer_scroll = (self.answer_scroll + by).min(max_scroll);
    }

    fn scroll_to_end(&mut self) {
        self.answer_scroll = self.answer_content_len.saturating_sub(self.answer_view_height);
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut events = EventStream::new();
    let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
    spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    app.apply_key(tx.clone());
    ui::draw_ui(terminal, app)?;

    loop {
        tokio::select! {
            _ = spinner_tick.tick() => {
                if app.busy() {
                    app.spinner_idx = (app.spinner_idx + 1) % 4;
                    ui::draw_ui(terminal, app)?;
                }
            }
            maybe_response = rx.recv() => {
                if let Some(response) = maybe_response {
                    app.handle_response(response, tx.clone());
                    ui::draw_ui(terminal, app)?;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                        match key.code {
                            KeyCode::Char('c') if ctrl => return Ok(()),
                            KeyCode::Char('r') if ctrl => app.index_now(tx.clone()),
                            KeyCode::Char('n') if ctrl => app.create_directory(tx.clone()),
                            KeyCode::Esc => return Ok(()),
                            KeyCode::Tab | KeyCode::BackTab => {
                                app.focus = match app.focus {
                                    Focus::Key => Focus::Question,
                                    Focus::Question => Focus::Key,
                                };
                            }
                            KeyCode::Enter => match app.focus {
                                Focus::Key => app.apply_key(tx.clone()),
                                Focus::Question => app.submit(tx.clone()),
                            },
                            KeyCode::F(5) => app.submit(tx.clone()),
                            KeyCode::Up => app.scroll_up(1),
                            KeyCode::Down => app.scroll_down(1),
                            KeyCode::PageUp => app.scroll_up(app.answer_view_height.max(1)),
                            KeyCode::PageDown => app.scroll_down(app.answer_view_height.max(1)),
                            KeyCode::Home => app.answer_scroll = 0,
                            KeyCode::End => app.scroll_to_end(),
                            KeyCode::Left => app.focused_input().move_left(),
                            KeyCode::Right => app.focused_input().move_right(),
                            KeyCode::Backspace => app.focused_input().delete_char(),
                            KeyCode::Char(ch) if !ctrl => app.focused_input().insert_char(ch),
                            _ => {}
                        }
                        ui::draw_ui(terminal, app)?;
                    }
                    Some(Ok(Event::Resize(_, _))) => ui::draw_ui(terminal, app)?,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {}
                    None => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::{FragmentSink, ask_argument};

    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_writes_fragments_then_newline() {
        let mut out = Vec::new();
        let mut sink = FragmentSink::new(&mut out);
        sink.push("Diabetes ");
        sink.push("affects insulin.");
        sink.finish().expect("finish");
        assert_eq!(out, b"Diabetes affects insulin.\n");
    }

    #[test]
    fn sink_reports_the_first_write_error() {
        let mut pipe = ClosedPipe { attempts: 0 };
        let mut sink = FragmentSink::new(&mut pipe);
        sink.push("Asthma ");
        sink.push("narrows airways.");
        let err = sink.finish().expect_err("closed pipe");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(pipe.attempts, 1);
    }

    #[test]
    fn ask_flag_joins_question_words() {
        let args: Vec<String> = ["--ask", "What", "is", "diabetes?"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ask_argument(&args).as_deref(), Some("What is diabetes?"));
    }

    #[test]
    fn no_flag_starts_the_terminal_ui() {
        assert_eq!(ask_argument(&[]), None);
        assert_eq!(ask_argument(&["--ask".to_string()]), None);
    }
}
