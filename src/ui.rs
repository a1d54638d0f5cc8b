use std::io;

use medrag::{Banner, Phase};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};

use crate::input::visible_window;
use crate::{App, Focus};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

fn inner_width(area: Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

/// Rows `text` takes once word-wrapped to `width` columns.
fn wrapped_rows(text: &str, width: usize) -> usize {
    let width = u16::try_from(width).unwrap_or(u16::MAX);
    Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .line_count(width)
        .max(1)
}

fn banner_style(banner: &Banner) -> Style {
    match banner {
        Banner::Success(_) => Style::default().fg(Color::Green),
        Banner::Warning(_) => Style::default().fg(Color::Yellow),
        Banner::Error(_) => Style::default().fg(Color::Red),
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Blue)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub(crate) fn draw_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    terminal.draw(|frame| {
        let title_style = Style::default().add_modifier(Modifier::BOLD);
        let text_style = Style::default().fg(Color::Gray);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(40)])
            .split(frame.area());

        // Sidebar: key entry and debug information.
        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
            ])
            .split(columns[0]);

        let key_block = Block::bordered()
            .title("Groq API Key")
            .title_style(title_style)
            .border_style(focus_style(app.focus == Focus::Key));
        let masked = "*".repeat(app.key_input.len());
        let (key_view, key_col) =
            visible_window(&masked, app.key_input.cursor(), inner_width(sidebar[0]));
        frame.render_widget(Paragraph::new(key_view).block(key_block), sidebar[0]);

        let key_notice = match app.session.key_notice() {
            Some(banner) => Paragraph::new(banner.text().to_string()).style(banner_style(banner)),
            None => Paragraph::new(""),
        };
        frame.render_widget(
            key_notice
                .wrap(Wrap { trim: true })
                .block(Block::bordered().title("API Key Configuration").title_style(title_style)),
            sidebar[1],
        );

        let debug_lines = vec![
            Line::from(Span::styled("Vector store path:", title_style)),
            Line::from(app.session.store_path().display().to_string()),
            Line::from(""),
            Line::from(format!(
                "API Key Loaded: {}",
                if app.session.key_loaded() { "Yes" } else { "No" }
            )),
        ];
        frame.render_widget(
            Paragraph::new(debug_lines)
                .style(text_style)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title("Debug Information").title_style(title_style)),
            sidebar[2],
        );

        // Main panel.
        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(columns[1]);

        let help_text = match app.session.phase() {
            Phase::AwaitingKey => "Enter: Apply key | Tab: Focus | Esc/Ctrl+C: Quit",
            Phase::Unavailable if app.session.can_create_directory() => {
                "Ctrl+N: Create Directory | Ctrl+R: Index corpus | Tab: Focus | Esc/Ctrl+C: Quit"
            }
            _ => concat!(
                "Enter/F5: Get Answer | Tab: Focus | Ctrl+R: Index | ",
                "Up/Down/PgUp/PgDn/Home/End: Scroll | Esc/Ctrl+C: Quit"
            ),
        };
        let help = Paragraph::new(help_text)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title("Controls").title_style(title_style));
        frame.render_widget(help, main[4]);

        let banner = app
            .session
            .banner()
            .map(|b| Paragraph::new(b.text().to_string()).style(banner_style(b)))
            .or_else(|| app.notice.as_ref().map(|n| Paragraph::new(n.clone()).style(text_style)))
            .unwrap_or_else(|| Paragraph::new(""));
        frame.render_widget(
            banner.wrap(Wrap { trim: true }).block(Block::bordered()),
            main[2],
        );

        // Without a key nothing else of the main panel is shown.
        if app.session.phase() == Phase::AwaitingKey {
            if app.focus == Focus::Key {
                frame.set_cursor_position((
                    sidebar[0].x + 1 + key_col as u16,
                    sidebar[0].y + 1,
                ));
            }
            return;
        }

        frame.render_widget(
            Paragraph::new("Medical Knowledge Assistant").style(title_style),
            main[0],
        );

        let question_block = Block::bordered()
            .title("Enter your medical question here")
            .title_style(title_style)
            .border_style(focus_style(app.focus == Focus::Question));
        let (question_view, question_col) =
            visible_window(app.question.text(), app.question.cursor(), inner_width(main[1]));
        frame.render_widget(
            Paragraph::new(question_view).style(text_style).block(question_block),
            main[1],
        );

        let answer_text = if app.is_loading {
            "Loading index...".to_string()
        } else {
            match app.session.phase() {
                Phase::Querying => "Processing your query...".to_string(),
                _ => app.session.display_text().unwrap_or("").to_string(),
            }
        };
        let mut answer_title = if app.busy() {
            format!("Answer {}", SPINNER[app.spinner_idx])
        } else {
            "Answer".to_string()
        };
        if let Some(query) = app.session.last_query() {
            answer_title.push_str(&format!(" | Q: {}", query));
        }

        app.answer_view_height = inner_height(main[3]);
        app.answer_content_len = wrapped_rows(&answer_text, inner_width(main[3]));
        let max_scroll = app.answer_content_len.saturating_sub(app.answer_view_height);
        if app.answer_auto_scroll {
            app.answer_scroll = max_scroll;
            app.answer_auto_scroll = app.session.is_busy();
        } else if app.answer_scroll > max_scroll {
            app.answer_scroll = max_scroll;
        }

        let answer = Paragraph::new(answer_text)
            .style(text_style)
            .scroll((app.answer_scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(answer_title).title_style(title_style));
        frame.render_widget(answer, main[3]);

        let mut scrollbar = ScrollbarState::new(app.answer_content_len).position(app.answer_scroll);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .track_style(Style::default().fg(Color::DarkGray))
                .thumb_style(Style::default().fg(Color::Blue)),
            main[3].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar,
        );

        let (x, y) = match app.focus {
            Focus::Key => (sidebar[0].x + 1 + key_col as u16, sidebar[0].y + 1),
            Focus::Question => (main[1].x + 1 + question_col as u16, main[1].y + 1),
        };
        frame.set_cursor_position((x, y));
    })?;

    Ok(())
}
