use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::state::PostList;

const HINTS: &str = "[j/k]move [g/G]first/last [Enter]open [q]uit";

pub(super) fn render(f: &mut Frame, list: &PostList) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 2 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let items: Vec<ListItem> = if list.posts.is_empty() {
        vec![ListItem::new("No posts yet. Run `gator agg` to collect some.")]
    } else {
        list.posts
            .iter()
            .map(|post| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        post.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!("  {}", post.url),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect()
    };

    let widget = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!("Posts ({})", list.posts.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    if !list.posts.is_empty() {
        state.select(Some(list.selected));
    }
    f.render_stateful_widget(widget, chunks[0], &mut state);

    let status = list.status.as_deref().unwrap_or(HINTS);
    f.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        chunks[1],
    );
}
