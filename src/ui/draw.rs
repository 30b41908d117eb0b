use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render the help modal
use tui_widgets::popup::Popup;

use crate::query::EXAMPLE_QUERIES;
use crate::remote::{Host, SearchError};

use super::app::{App, PaneFocus};

const FOOTER_HELP_INPUT: &str = "Enter: search  Tab: results  F1: help";
const FOOTER_HELP_RESULTS: &str =
    "/: query  n/p: page  g: first  j/k: select  v: vhosts  +/-: size  s: sort  ?: help  q: quit";

/// Static guidance shown alongside invalid-query errors; these mirror the
/// two repairs the normalizer knows about.
const QUERY_TIPS: &[&str] = &[
    "Use `services` (plural) instead of `service` in field names",
    "Example of a correct query: services.service_name: HTTP",
    "Quote country names containing spaces: location.country: \"United States\"",
];

const CREDENTIALS_BANNER: &str =
    "API credentials are not configured. Live searches will fail until they are.";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let show_banner = !app.credentials_configured() && !app.is_offline();

    let mut constraints = vec![Constraint::Length(1)];
    if show_banner {
        constraints.push(Constraint::Length(2));
    }
    constraints.push(Constraint::Length(3));
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(1));

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(size);

    let mut next = 0;
    draw_header(frame, layout[next], app);
    next += 1;
    if show_banner {
        draw_banner(frame, layout[next], app);
        next += 1;
    }
    draw_search(frame, layout[next], app);
    next += 1;
    draw_body(frame, layout[next], app);
    next += 1;
    draw_footer(frame, layout[next], app);

    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled("HOSTSCOPE", header_style)];
    if app.is_offline() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            " OFFLINE ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        spans.push(Span::styled(
            "  sample dataset",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::styled(
            format!("  {}", app.config().api_url),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    // Page position on the right
    if let Some(result) = &app.result {
        let caption = page_caption(app, result.total, result.hits.len());
        let para = Paragraph::new(Line::from(Span::styled(
            caption,
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Right);
        frame.render_widget(para, area);
    }
}

/// "Page 2 of 3 (11-20 of 25)" style caption. Cursors do not guarantee
/// stable numbering, so this is display-only and derived locally.
fn page_caption(app: &App, total: u64, shown: usize) -> String {
    let per_page = app.params.per_page.max(1) as u64;
    let pages = total.div_ceil(per_page).max(1);
    let page = u64::from(app.nav.page_number()).min(pages);
    if shown == 0 {
        return format!("Page {} of {} ({} hosts)", page, pages, total);
    }
    let first = (u64::from(app.nav.page_index)) * per_page + 1;
    let last = first + shown as u64 - 1;
    format!("Page {} of {} ({}-{} of {})", page, pages, first, last, total)
}

fn draw_banner(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let style = Style::default().fg(Color::Yellow);
    let lines = vec![
        Line::from(Span::styled(CREDENTIALS_BANNER, style)),
        Line::from(Span::styled(
            format!(
                "Set HOSTSCOPE_API_ID and HOSTSCOPE_API_SECRET, or edit {}",
                app.config().config_path.display()
            ),
            style,
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = matches!(app.focus, PaneFocus::Input);
    let options = format!(
        " per_page {}  vhosts {}  sort {} ",
        app.params.per_page,
        app.virtual_hosts_label(),
        app.sort_label()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(active))
        .title(" SEARCH ")
        .title_bottom(Line::from(options).right_aligned());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let label = "QUERY: ";
    let value = app.search_input.value();
    let line = Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Cyan)),
        Span::raw(value.to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    if active {
        let x = inner
            .x
            .saturating_add((label.len() + app.search_input.visual_cursor()) as u16);
        frame.set_cursor_position((x, inner.y));
    }
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    if let Some(error) = &app.error {
        draw_error(frame, area, error);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    draw_results(frame, layout[0], app);
    draw_detail(frame, layout[1], app);
}

fn draw_results(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = matches!(app.focus, PaneFocus::Results);
    let title = if app.is_fetching() {
        " RESULTS — searching... ".to_string()
    } else {
        match &app.result {
            Some(result) => format!(" RESULTS — {} hosts ", result.total),
            None => " RESULTS ".to_string(),
        }
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(active))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let hits = app.result.as_ref().map(|r| r.hits.as_slice()).unwrap_or(&[]);
    if hits.is_empty() {
        let message = if app.result.is_some() {
            "No hosts matched this query"
        } else {
            "No results yet. Enter a query and press Enter."
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let header = Row::new(vec!["IP", "NAME", "SERVICES", "COUNTRY"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = hits.iter().map(host_row).collect();
    let widths = [
        Constraint::Length(16),
        Constraint::Percentage(30),
        Constraint::Percentage(40),
        Constraint::Percentage(20),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(
            Style::default()
                .bg(Color::Indexed(237))
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(table, inner, &mut state);
}

fn host_row(host: &Host) -> Row<'_> {
    let country = host
        .location
        .as_ref()
        .and_then(|l| l.country_code.as_deref())
        .unwrap_or("-");
    Row::new(vec![
        Cell::from(host.ip.clone()),
        Cell::from(host.name.as_deref().unwrap_or("-").to_string()),
        Cell::from(host.service_summary()),
        Cell::from(country.to_string()),
    ])
}

fn draw_detail(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(false))
        .title(" HOST ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let Some(host) = app.selected_host() else {
        frame.render_widget(
            Paragraph::new("No host selected").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    };

    let label = Style::default().fg(Color::Cyan);
    let mut lines = vec![Line::from(vec![
        Span::styled("IP       ", label),
        Span::raw(host.ip.clone()),
    ])];
    if let Some(name) = &host.name {
        lines.push(Line::from(vec![
            Span::styled("NAME     ", label),
            Span::raw(name.clone()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("SERVICES", label)));
    for service in &host.services {
        let mut text = format!("  {}", service.port);
        if let Some(name) = &service.service_name {
            text.push_str(&format!("/{}", name));
        }
        if let Some(proto) = &service.transport_protocol {
            text.push_str(&format!(" ({})", proto));
        }
        lines.push(Line::from(text));
    }

    if let Some(location) = &host.location {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("LOCATION", label)));
        let mut place = Vec::new();
        if let Some(country) = &location.country {
            place.push(country.clone());
        }
        if let Some(continent) = &location.continent {
            place.push(continent.clone());
        }
        if !place.is_empty() {
            lines.push(Line::from(format!("  {}", place.join(", "))));
        }
        if let Some(timezone) = &location.timezone {
            lines.push(Line::from(format!("  {}", timezone)));
        }
        if let Some(coordinates) = &location.coordinates {
            lines.push(Line::from(format!(
                "  {:.4}, {:.4}",
                coordinates.latitude, coordinates.longitude
            )));
        }
    }

    if let Some(autonomous_system) = &host.autonomous_system {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("AS", label)));
        if let Some(asn) = autonomous_system.asn {
            let mut text = format!("  AS{}", asn);
            if let Some(name) = &autonomous_system.name {
                text.push_str(&format!(" {}", name));
            }
            lines.push(Line::from(text));
        }
        if let Some(prefix) = &autonomous_system.bgp_prefix {
            lines.push(Line::from(format!("  {}", prefix)));
        }
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_error(frame: &mut Frame<'_>, area: Rect, error: &SearchError) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" ERROR ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let mut lines = vec![
        Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
    ];

    if matches!(error, SearchError::InvalidQuery(_)) {
        lines.push(Line::from(Span::styled(
            "Helpful tips:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for tip in QUERY_TIPS {
            lines.push(Line::from(format!("  - {}", tip)));
        }
    }
    if matches!(error, SearchError::RateLimited) {
        lines.push(Line::from("No automatic retry is performed."));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let status = app.status.as_deref().unwrap_or("");
    frame.render_widget(
        Paragraph::new(Line::from(Span::raw(status.to_string()))),
        area,
    );

    let hints = match app.focus {
        PaneFocus::Input => FOOTER_HELP_INPUT,
        PaneFocus::Results => FOOTER_HELP_RESULTS,
    };
    let para = Paragraph::new(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Right);
    frame.render_widget(para, area);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_popup.is_none() {
        return;
    }

    let key_style = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from(Span::styled("KEYS", Style::default().add_modifier(Modifier::BOLD))),
        help_line("Enter", "submit search", key_style),
        help_line("Tab, /", "switch input/results focus", key_style),
        help_line("j/k", "select host", key_style),
        help_line("n/p", "next/previous page", key_style),
        help_line("g", "back to first page", key_style),
        help_line("v", "cycle virtual hosts filter", key_style),
        help_line("+/-", "cycle page size", key_style),
        help_line("s", "cycle sort order", key_style),
        help_line("q, Ctrl+C", "quit", key_style),
        Line::from(""),
        Line::from(Span::styled(
            "EXAMPLE QUERIES",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    for (label, example) in EXAMPLE_QUERIES {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<18}", label), key_style),
            Span::raw(*example),
        ]));
    }

    let popup = Popup::new(Text::from(lines))
        .title(Line::from(" HELP "))
        .border_style(Style::default().fg(Color::Cyan));
    let state = app.help_popup.as_mut().unwrap();
    frame.render_stateful_widget_ref(popup, area, state);
}

fn help_line(keys: &str, action: &str, key_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<18}", keys), key_style),
        Span::raw(action.to_string()),
    ])
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
