use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use crate::app::{App, Focus, MapPane, Role, CATEGORY_FIRST_ROW, HISTORICAL_ROW};
use crate::braille::BrailleCanvas;
use crate::controller::SourceStatus;
use crate::overlay::PopupContent;
use crate::records::{Category, SourceKind};
use crate::surface::{PlacedPopup, SurfaceFrame};

const ACCENT: Color = Color::Rgb(0x2e, 0x9e, 0x6b);
const POPUP_WIDTH: u16 = 34;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = app.layout();

    render_sidebar(frame, app, layout.sidebar);
    render_map(frame, app, layout.map);
    if layout.chat.width > 0 {
        render_chat(frame, app, layout.chat);
    }
    render_status_bar(frame, app, layout.status);
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { ACCENT } else { Color::DarkGray }))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn status_line(kind: SourceKind, status: &SourceStatus) -> Line<'static> {
    let (text, color) = match status {
        SourceStatus::Idle => ("offline".to_string(), Color::DarkGray),
        SourceStatus::Loading => ("loading…".to_string(), Color::Yellow),
        SourceStatus::Loaded { count, dropped: 0 } => (format!("{count} loaded"), Color::Green),
        SourceStatus::Loaded { count, dropped } => {
            (format!("{count} loaded, {dropped} skipped"), Color::Green)
        }
        SourceStatus::Degraded => ("degraded data".to_string(), Color::Magenta),
        SourceStatus::Failed(_) => ("failed to load".to_string(), Color::Red),
    };
    let name = match kind {
        SourceKind::Venues => "Venues",
        SourceKind::Historical => "Historical",
    };
    Line::from(vec![
        Span::styled(format!(" {name}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(text, Style::default().fg(color)),
    ])
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    if app.panes.sidebar_collapsed {
        frame.render_widget(pane_block("»", false), area);
        return;
    }

    let block = pane_block(" Raya ", false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let filter = app.controller().map(|c| *c.filter()).unwrap_or_default();
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "✦ Discover Saudi",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Trending Places",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    debug_assert_eq!(lines.len() as u16, CATEGORY_FIRST_ROW);

    for (i, category) in Category::ALL.into_iter().enumerate() {
        let selected = filter.selected_category == Some(category);
        let style = if selected {
            Style::default().fg(Color::Black).bg(ACCENT)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(" {} {}", i + 1, category.display_name()),
            style,
        )));
    }
    lines.push(Line::default());
    debug_assert_eq!(lines.len() as u16, HISTORICAL_ROW);

    lines.push(Line::from(vec![
        Span::styled(
            if filter.show_historical { " [x] " } else { " [ ] " },
            Style::default().fg(Color::LightYellow),
        ),
        Span::raw("Historical Places"),
    ]));
    lines.push(Line::default());

    match app.controller() {
        Some(c) => {
            for kind in SourceKind::ALL {
                lines.push(status_line(kind, c.status(kind)));
            }
        }
        None => lines.push(Line::from(Span::styled(
            " map unavailable",
            Style::default().fg(Color::Red),
        ))),
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = pane_block(" Map ", app.focus == Focus::Map);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &app.map {
        MapPane::Unavailable { reason } => {
            let text = vec![
                Line::from(Span::styled(
                    "Map unavailable",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(reason.clone(), Style::default().fg(Color::DarkGray))),
            ];
            frame.render_widget(
                Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }),
                inner,
            );
        }
        MapPane::Ready(controller) => {
            let surface_frame = controller.surface().render();
            let popup = surface_frame.popup.clone();
            frame.render_widget(MapWidget { frame: surface_frame }, inner);
            if let Some(popup) = popup {
                render_popup(frame, &popup, inner);
            }
        }
    }
}

/// Braille base map with markers and controls drawn on top
struct MapWidget {
    frame: SurfaceFrame,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..canvas.rows().min(area.height as usize) {
            let y = area.y + row as u16;
            for (col, ch) in canvas.row_chars(row).enumerate().take(area.width as usize) {
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col as u16, y)].set_char(ch).set_fg(color);
            }
        }
    }

    fn put_str(text: &str, x: u16, y: u16, style: Style, area: Rect, buf: &mut Buffer) {
        if y >= area.bottom() {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let px = x + i as u16;
            if px >= area.right() {
                break;
            }
            buf[(px, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layers = &self.frame.layers;
        Self::render_layer(&layers.coastlines, Color::Cyan, area, buf);
        Self::render_layer(&layers.borders, Color::Yellow, area, buf);
        Self::render_layer(&layers.landmarks, Color::LightRed, area, buf);

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &layers.labels {
            Self::put_str(text, area.x + lx, area.y + ly, label_style, area, buf);
        }

        for marker in &self.frame.markers {
            let (x, y) = (area.x + marker.col, area.y + marker.row);
            if x < area.right() && y < area.bottom() {
                buf[(x, y)]
                    .set_char(marker.style.glyph)
                    .set_fg(marker.style.color)
                    .set_style(Style::default().add_modifier(Modifier::BOLD));
            }
        }

        let dim = Style::default().fg(Color::Gray);
        if let Some(nav) = &self.frame.navigation {
            let x = area.right().saturating_sub(nav.chars().count() as u16 + 1);
            Self::put_str(nav, x, area.y, dim, area, buf);
        }
        if let Some(scale) = &self.frame.scale {
            let x = area.right().saturating_sub(scale.chars().count() as u16 + 1);
            Self::put_str(scale, x, area.bottom().saturating_sub(1), dim, area, buf);
        }
    }
}

fn popup_lines(content: &PopupContent) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(rating) = &content.rating {
        lines.push(Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::raw(rating.clone()),
        ]));
    }
    if let Some(price) = &content.price {
        lines.push(Line::from(Span::styled(
            price.clone(),
            Style::default().fg(Color::Green),
        )));
    }
    if let Some(occupancy) = &content.occupancy {
        lines.push(Line::from(occupancy.clone()));
    }
    if let Some(description) = &content.description {
        lines.push(Line::from(description.clone()));
    }
    if let Some(address) = &content.address {
        lines.push(Line::from(Span::styled(
            format!("⌂ {address}"),
            Style::default().fg(Color::Gray),
        )));
    }
    for todo in &content.todos {
        lines.push(Line::from(format!("• {todo}")));
    }
    if let Some(photo) = &content.photo {
        lines.push(Line::from(Span::styled(
            format!("photo: {}", photo.display_url()),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

/// Detail box next to its marker, kept inside the map pane
fn render_popup(frame: &mut Frame, popup: &PlacedPopup, area: Rect) {
    let lines = popup_lines(&popup.content);
    let width = POPUP_WIDTH.min(area.width);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    // Rough wrapped height
    let body: usize = lines
        .iter()
        .map(|l| l.width().div_ceil(inner_width).max(1))
        .sum();
    let height = (body as u16 + 2).min(area.height);

    let anchor_x = area.x + popup.col;
    let anchor_y = area.y + popup.row;
    let x = (anchor_x + 2).min(area.right().saturating_sub(width));
    let y = if anchor_y >= area.y + height {
        anchor_y - height
    } else {
        (anchor_y + 1).min(area.bottom().saturating_sub(height))
    };
    let rect = Rect::new(x.max(area.x), y.max(area.y), width, height);

    let title_style = if popup.content.historical {
        Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(format!(" {} ", popup.content.title), title_style));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let block = pane_block(" Assistant ", app.focus == Focus::Chat);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let transcript_area = Rect {
        height: inner.height - 1,
        ..inner
    };
    let input_area = Rect {
        y: inner.bottom() - 1,
        height: 1,
        ..inner
    };

    let mut lines = Vec::new();
    for message in &app.chat {
        let (who, color) = match message.role {
            Role::User => ("you", Color::LightBlue),
            Role::Assistant => ("raya", ACCENT),
        };
        lines.push(Line::from(Span::styled(
            who,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(message.content.clone()));
        lines.push(Line::default());
    }
    if app.awaiting_reply {
        lines.push(Line::from(Span::styled("…", Style::default().fg(Color::DarkGray))));
    }

    // Keep the newest messages in view
    let width = transcript_area.width.max(1) as usize;
    let total: usize = lines.iter().map(|l| l.width().div_ceil(width).max(1)).sum();
    let scroll = total.saturating_sub(transcript_area.height as usize) as u16;
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0)),
        transcript_area,
    );

    let prompt = if app.focus == Focus::Chat {
        Line::from(vec![
            Span::styled("› ", Style::default().fg(ACCENT)),
            Span::raw(app.input.clone()),
            Span::styled("▏", Style::default().fg(ACCENT)),
        ])
    } else {
        Line::from(Span::styled(
            "Tab to type a message",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(prompt), input_area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let counts = app
        .controller()
        .map(|c| {
            format!(
                "{} venues · {} historical",
                c.registry().len(SourceKind::Venues),
                c.registry().len(SourceKind::Historical)
            )
        })
        .unwrap_or_default();

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_label(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_label(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(counts, Style::default().fg(Color::Green)),
        Span::styled(
            " | hjkl:pan +/-:zoom 1-6:category t:historical n/N:next R:reload Tab:chat q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
