//! Status bar rendering with keybindings and step details

use crate::snapshot::{ScopeKind, TraceEntry};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Short description of a trace entry for the status bar
pub fn describe_entry(entry: &TraceEntry) -> String {
    let Some(snapshot) = entry.snapshot() else {
        return match entry {
            TraceEntry::Exception { error } => format!("exception: {}", error),
            _ => "program output".to_string(),
        };
    };
    let mut text = format!(
        "{} {}() line {} depth {}",
        entry.event(),
        snapshot.function,
        snapshot.line,
        snapshot.depth
    );
    match (snapshot.scope, snapshot.branch_taken) {
        (Some(ScopeKind::Conditional), Some(taken)) => {
            text.push_str(if taken { " [branch taken]" } else { " [branch skipped]" })
        }
        (Some(ScopeKind::Loop), _) => text.push_str(" [loop]"),
        _ => {}
    }
    text
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    entry: Option<&TraceEntry>,
    current_step: usize,
    total_steps: usize,
    is_playing: bool,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let is_error = matches!(entry, Some(TraceEntry::Exception { .. }));
    let step_text = if total_steps == 0 {
        " Step 0/0 ".to_string()
    } else {
        format!(" Step {}/{} ", current_step + 1, total_steps)
    };
    let message = entry.map_or_else(|| "empty trace".to_string(), describe_entry);

    let left_spans = vec![
        Span::styled(
            step_text,
            Style::default()
                .bg(if is_error { DEFAULT_THEME.error } else { DEFAULT_THEME.primary })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " | ",
            Style::default().bg(DEFAULT_THEME.current_line_bg).fg(DEFAULT_THEME.comment),
        ),
        Span::styled(
            format!(" {} ", message),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(if is_error { DEFAULT_THEME.error } else { DEFAULT_THEME.fg }),
        ),
    ];
    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default().bg(DEFAULT_THEME.current_line_bg).fg(DEFAULT_THEME.fg);
    let sep_style = Style::default().bg(DEFAULT_THEME.current_line_bg).fg(DEFAULT_THEME.comment);

    let mut right_spans = vec![
        Span::styled(" ←/→ ", key_style),
        Span::styled(" step ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ⎵ ", key_style),
        Span::styled(" play ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" Home/End ", key_style),
        Span::styled(" start/end ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ⇥ ", key_style),
        Span::styled(" focus ", desc_style),
        Span::styled("│", sep_style),
        Span::styled("q", key_style),
        Span::styled(" quit ", desc_style),
    ];

    let badge = if is_playing {
        Some((" ▶ PLAYING ", DEFAULT_THEME.secondary))
    } else if total_steps > 0 && current_step + 1 >= total_steps {
        Some((" END ", DEFAULT_THEME.error))
    } else if current_step == 0 {
        Some((" START ", DEFAULT_THEME.success))
    } else {
        None
    };
    if let Some((text, color)) = badge {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(Span::styled(
            text,
            Style::default().bg(color).fg(Color::Black).add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            .alignment(Alignment::Right),
        layout[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_non_snapshot_entries() {
        assert_eq!(describe_entry(&TraceEntry::exception("boom")), "exception: boom");
        assert_eq!(
            describe_entry(&TraceEntry::Print { output: "x".to_string() }),
            "program output"
        );
    }
}
