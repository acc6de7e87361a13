//! Locals pane rendering
//!
//! Shows the bindings of the frame the current step belongs to, one per
//! line with their type tag. Linked structures are drawn as a chain of node
//! values: `5 -> 10 -> 20`, with `<->` between doubly linked nodes and a
//! trailing `↺ 5` when the last node links back into the chain.

use crate::snapshot::{LinkedKind, LinkedRendering, LocalValue, Snapshot, TypeTag};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Chain text of a linked rendering
pub fn format_rendering(rendering: &LinkedRendering) -> String {
    if let Some(error) = &rendering.error {
        return format!("<{}>", error);
    }
    let Some(head) = rendering.head else {
        return "(empty)".to_string();
    };
    let arrow = match rendering.kind {
        LinkedKind::DoublyLinkedList => " <-> ",
        LinkedKind::LinkedList => " -> ",
    };

    let mut parts = Vec::new();
    let mut seen = vec![false; rendering.nodes.len()];
    let mut current = Some(head);
    let mut closes_at = None;
    while let Some(id) = current {
        let Some(node) = rendering.nodes.get(id) else {
            break;
        };
        if seen[id] {
            closes_at = Some(node.value.to_string());
            break;
        }
        seen[id] = true;
        parts.push(node.value.to_string());
        current = node.next;
    }

    let mut text = parts.join(arrow);
    if let Some(value) = closes_at {
        text.push_str(&format!(" ↺ {}", value));
    }
    text
}

/// One-line text of a binding's value
pub fn value_text(value: &LocalValue) -> String {
    match value {
        LocalValue::Linked(rendering) => format_rendering(rendering),
        LocalValue::Plain(serde_json::Value::String(s)) => s.clone(),
        LocalValue::Plain(json) => json.to_string(),
    }
}

fn tag_style(tag: &TypeTag) -> Style {
    if tag.is_linked() {
        Style::default().fg(DEFAULT_THEME.link).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.type_name)
    }
}

/// Render the locals pane
pub fn render_locals_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
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

    let title = match snapshot {
        Some(s) => format!(" Locals: {}() ", s.function),
        None => " Locals ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut items = Vec::new();
    match snapshot {
        Some(snapshot) if !snapshot.locals.is_empty() => {
            for (name, value) in snapshot.locals.iter() {
                let tag = snapshot.var_types.get(name);
                let mut spans = vec![Span::styled(
                    name.to_string(),
                    Style::default().fg(DEFAULT_THEME.fg).add_modifier(Modifier::BOLD),
                )];
                if let Some(tag) = tag {
                    spans.push(Span::styled(format!(": {}", tag), tag_style(tag)));
                }
                spans.push(Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)));
                let value_style = match value {
                    LocalValue::Linked(_) => Style::default().fg(DEFAULT_THEME.link),
                    LocalValue::Plain(serde_json::Value::String(_)) => {
                        Style::default().fg(DEFAULT_THEME.string)
                    }
                    LocalValue::Plain(serde_json::Value::Number(_)) => {
                        Style::default().fg(DEFAULT_THEME.number)
                    }
                    LocalValue::Plain(_) => Style::default().fg(DEFAULT_THEME.fg),
                };
                spans.push(Span::styled(value_text(value), value_style));
                items.push(ListItem::new(Line::from(spans)));
            }
        }
        _ => items.push(
            ListItem::new("(no locals)").style(Style::default().fg(DEFAULT_THEME.comment)),
        ),
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(items.len().saturating_sub(visible_height));
    let visible: Vec<ListItem> =
        items.into_iter().skip(*scroll_offset).take(visible_height).collect();

    frame.render_widget(List::new(visible).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RenderedNode;
    use serde_json::json;

    fn node(id: usize, value: i64, next: Option<usize>, prev: Option<usize>) -> RenderedNode {
        RenderedNode {
            id,
            value: json!(value),
            next,
            prev,
        }
    }

    #[test]
    fn test_singly_chain() {
        let rendering = LinkedRendering {
            kind: LinkedKind::LinkedList,
            head: Some(0),
            nodes: vec![
                node(0, 5, Some(1), None),
                node(1, 10, Some(2), None),
                node(2, 20, None, None),
            ],
            error: None,
        };
        assert_eq!(format_rendering(&rendering), "5 -> 10 -> 20");
    }

    #[test]
    fn test_doubly_chain_and_cycle() {
        let doubly = LinkedRendering {
            kind: LinkedKind::DoublyLinkedList,
            head: Some(0),
            nodes: vec![node(0, 1, Some(1), None), node(1, 2, None, Some(0))],
            error: None,
        };
        assert_eq!(format_rendering(&doubly), "1 <-> 2");

        let cycle = LinkedRendering {
            kind: LinkedKind::LinkedList,
            head: Some(0),
            nodes: vec![node(0, 1, Some(1), None), node(1, 2, Some(0), None)],
            error: None,
        };
        assert_eq!(format_rendering(&cycle), "1 -> 2 ↺ 1");
    }

    #[test]
    fn test_empty_and_failed_renderings() {
        assert_eq!(format_rendering(&LinkedRendering::empty(LinkedKind::LinkedList)), "(empty)");
        let failed = LinkedRendering {
            error: Some("broken".to_string()),
            ..LinkedRendering::empty(LinkedKind::LinkedList)
        };
        assert_eq!(format_rendering(&failed), "<broken>");
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(value_text(&LocalValue::Plain(json!("hi"))), "hi");
        assert_eq!(value_text(&LocalValue::Plain(json!([1, 2]))), "[1,2]");
    }
}
