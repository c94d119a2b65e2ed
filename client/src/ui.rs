use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use shared::{ChatMessage, Role};

use crate::session::ChatSession;

pub fn draw(f: &mut Frame, session: &ChatSession) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let lines: Vec<Line> = session.messages.iter().flat_map(message_lines).collect();
    // Keep the newest lines in view; wrapped lines may still push some off.
    let visible = chunks[0].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let transcript = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Chat"))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(transcript, chunks[0]);

    f.render_widget(status_line(session), chunks[1]);

    let title = format!(
        "Input [{}] Enter send · Tab mode · Ctrl-R reset · Esc quit",
        session.mode.label()
    );
    let input = Paragraph::new(session.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[2]);
}

fn message_lines(message: &ChatMessage) -> Vec<Line<'_>> {
    let (label, color) = match message.role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("Assistant", Color::Green),
        Role::System => ("System", Color::Magenta),
    };

    let mut lines = vec![Line::from(Span::styled(
        format!("{label}:"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))];
    if let Some(thinking) = &message.thinking {
        let style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC);
        lines.extend(thinking.lines().map(|l| Line::from(Span::styled(l, style))));
    }
    lines.extend(message.content.lines().map(Line::raw));
    if let Some(metadata) = &message.metadata {
        lines.push(Line::from(Span::styled(
            metadata.as_str(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::default());
    lines
}

fn status_line(session: &ChatSession) -> Paragraph<'_> {
    if let Some(error) = &session.last_error {
        Paragraph::new(Span::styled(
            format!("error: {error}"),
            Style::default().fg(Color::Red),
        ))
    } else if session.loading {
        Paragraph::new(Span::styled("waiting for reply…", Style::default().fg(Color::Yellow)))
    } else {
        Paragraph::new("")
    }
}
