//! Program output pane rendering

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// What the output pane shows at the current step
pub struct OutputRenderData<'a> {
    /// Captured output, once the step has reached the print entry
    pub output: Option<&'a str>,
    /// Uncaught error, once the step has reached the exception entry
    pub error: Option<&'a str>,
}

/// Render the output pane
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    data: OutputRenderData<'_>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Program Output ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut items: Vec<ListItem> = data
        .output
        .map(|text| {
            text.lines()
                .map(|line| {
                    ListItem::new(line.to_string()).style(Style::default().fg(DEFAULT_THEME.fg))
                })
                .collect()
        })
        .unwrap_or_default();
    if let Some(error) = data.error {
        items.push(
            ListItem::new(format!("error: {}", error))
                .style(Style::default().fg(DEFAULT_THEME.error).add_modifier(Modifier::BOLD)),
        );
    }

    if items.is_empty() {
        let paragraph = Paragraph::new("(no output yet)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(items.len().saturating_sub(visible_height));
    let visible: Vec<ListItem> =
        items.into_iter().skip(*scroll_offset).take(visible_height).collect();

    let list = List::new(visible).block(block.padding(Padding::new(1, 0, 0, 0)));
    frame.render_widget(list, area);
}
