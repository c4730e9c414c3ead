use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::MapController;
use crate::fetch::{FetchClient, WorkerEvent};
use crate::map::MapRenderer;
use crate::records::{Category, SourceKind};
use crate::surface::{BrailleSurface, ContainerSize};

pub const SIDEBAR_MIN: u16 = 18;
pub const SIDEBAR_MAX: u16 = 40;
pub const CHAT_MIN: u16 = 24;
pub const CHAT_MAX: u16 = 64;
/// Width of the sidebar when collapsed to its border
const SIDEBAR_COLLAPSED: u16 = 3;

/// Sidebar lines inside the border: brand, blank, heading, categories,
/// blank, historical toggle
pub const CATEGORY_FIRST_ROW: u16 = 3;
pub const HISTORICAL_ROW: u16 = CATEGORY_FIRST_ROW + Category::ALL.len() as u16 + 1;

pub const WELCOME: &str =
    "Welcome to Raya! I can help you discover amazing places in Saudi Arabia. What would you like to know about?";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Map,
    Chat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Pane widths in columns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaneWidths {
    pub sidebar: u16,
    pub chat: u16,
    pub sidebar_collapsed: bool,
    pub chat_open: bool,
}

impl Default for PaneWidths {
    fn default() -> Self {
        Self {
            sidebar: 24,
            chat: 36,
            sidebar_collapsed: false,
            chat_open: true,
        }
    }
}

/// Screen areas for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppLayout {
    pub sidebar: Rect,
    pub map: Rect,
    /// Map pane inside its border: the map container
    pub map_inner: Rect,
    pub chat: Rect,
    pub status: Rect,
}

/// What a left-button drag is moving
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Map { col: u16, row: u16 },
    SidebarEdge,
    ChatEdge,
}

pub enum MapPane {
    /// The surface could not be created; retried once the pane has area
    Unavailable { reason: String },
    Ready(MapController<BrailleSurface>),
}

/// Application state
pub struct App {
    config: Config,
    base: MapRenderer,
    pub map: MapPane,
    client: Option<FetchClient>,
    pub chat: Vec<ChatMessage>,
    pub input: String,
    pub awaiting_reply: bool,
    pub focus: Focus,
    pub panes: PaneWidths,
    pub should_quit: bool,
    screen: Rect,
    drag: Option<Drag>,
}

impl App {
    pub fn new(config: Config, base: MapRenderer, client: Option<FetchClient>) -> Self {
        Self {
            config,
            base,
            map: MapPane::Unavailable {
                reason: "not yet mounted".to_string(),
            },
            client,
            chat: vec![ChatMessage {
                role: Role::Assistant,
                content: WELCOME.to_string(),
            }],
            input: String::new(),
            awaiting_reply: false,
            focus: Focus::Map,
            panes: PaneWidths::default(),
            should_quit: false,
            screen: Rect::default(),
            drag: None,
        }
    }

    pub fn controller(&self) -> Option<&MapController<BrailleSurface>> {
        match &self.map {
            MapPane::Ready(c) => Some(c),
            MapPane::Unavailable { .. } => None,
        }
    }

    pub fn controller_mut(&mut self) -> Option<&mut MapController<BrailleSurface>> {
        match &mut self.map {
            MapPane::Ready(c) => Some(c),
            MapPane::Unavailable { .. } => None,
        }
    }

    /// Split the screen into panes
    pub fn layout(&self) -> AppLayout {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(self.screen);

        let sidebar = if self.panes.sidebar_collapsed {
            SIDEBAR_COLLAPSED
        } else {
            self.panes.sidebar
        };
        let chat = if self.panes.chat_open { self.panes.chat } else { 0 };
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(sidebar),
                Constraint::Min(0),
                Constraint::Length(chat),
            ])
            .split(rows[0]);

        let map = cols[1];
        let map_inner = Rect {
            x: map.x.saturating_add(1),
            y: map.y.saturating_add(1),
            width: map.width.saturating_sub(2),
            height: map.height.saturating_sub(2),
        };
        AppLayout {
            sidebar: cols[0],
            map,
            map_inner,
            chat: cols[2],
            status: rows[1],
        }
    }

    fn map_container(&self) -> ContainerSize {
        let inner = self.layout().map_inner;
        ContainerSize::new(inner.width, inner.height)
    }

    /// The terminal changed size
    pub fn on_terminal_resize(&mut self, cols: u16, rows: u16, now: Instant) {
        self.screen = Rect::new(0, 0, cols, rows);
        self.layout_changed(now);
    }

    /// Pane geometry changed: report the new container size and debounce
    /// the relayout, or retry creating the map if it is still unavailable
    fn layout_changed(&mut self, now: Instant) {
        let container = self.map_container();
        if let MapPane::Ready(controller) = &mut self.map {
            controller.surface_mut().set_container_size(container);
            controller.notify_resize(now);
            return;
        }
        self.try_init_map(container);
    }

    fn try_init_map(&mut self, container: ContainerSize) {
        match BrailleSurface::initialize(
            container,
            self.config.center,
            self.config.zoom,
            self.base.clone(),
        ) {
            Ok(surface) => {
                self.map = MapPane::Ready(MapController::new(surface, self.config.resize_debounce));
                self.refresh();
            }
            Err(e) => {
                warn!(error = %e, "map not created");
                self.map = MapPane::Unavailable {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Drive the resize debounce and reconcile changed inputs
    pub fn tick(&mut self, now: Instant) {
        if let Some(controller) = self.controller_mut() {
            controller.tick(now);
            controller.sync();
        }
    }

    /// Re-fetch both sources
    pub fn refresh(&mut self) {
        let Some(client) = &self.client else {
            return;
        };
        let MapPane::Ready(controller) = &mut self.map else {
            return;
        };
        for source in SourceKind::ALL {
            if let Some(ticket) = controller.begin_fetch(source) {
                client.spawn_fetch(ticket);
            }
        }
    }

    pub fn handle_worker(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Fetched(outcome) => {
                if let Some(controller) = self.controller_mut() {
                    controller.apply_fetch(outcome);
                }
            }
            WorkerEvent::Chat(reply) => {
                self.awaiting_reply = false;
                let content = match reply {
                    Ok(text) => text,
                    Err(e) => format!("Sorry, I could not answer that ({e})."),
                };
                self.chat.push(ChatMessage {
                    role: Role::Assistant,
                    content,
                });
            }
        }
    }

    /// Send the chat input. Offline, the assistant echoes the message.
    pub fn send_message(&mut self) {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.input.clear();
        self.chat.push(ChatMessage {
            role: Role::User,
            content: message.clone(),
        });
        match &self.client {
            Some(client) => {
                self.awaiting_reply = true;
                client.spawn_chat(message);
            }
            None => self.chat.push(ChatMessage {
                role: Role::Assistant,
                content: format!("You said: {message}"),
            }),
        }
    }

    pub fn select_category(&mut self, category: Category) {
        if let Some(controller) = self.controller_mut() {
            controller.select_category(category);
        }
    }

    pub fn toggle_historical(&mut self) {
        if let Some(controller) = self.controller_mut() {
            controller.toggle_historical();
        }
    }

    pub fn resize_sidebar(&mut self, delta: i16, now: Instant) {
        self.panes.sidebar = self
            .panes
            .sidebar
            .saturating_add_signed(delta)
            .clamp(SIDEBAR_MIN, SIDEBAR_MAX);
        self.panes.sidebar_collapsed = false;
        self.layout_changed(now);
    }

    pub fn resize_chat(&mut self, delta: i16, now: Instant) {
        self.panes.chat = self
            .panes
            .chat
            .saturating_add_signed(delta)
            .clamp(CHAT_MIN, CHAT_MAX);
        self.panes.chat_open = true;
        self.layout_changed(now);
    }

    pub fn toggle_sidebar(&mut self, now: Instant) {
        self.panes.sidebar_collapsed = !self.panes.sidebar_collapsed;
        self.layout_changed(now);
    }

    pub fn toggle_chat(&mut self, now: Instant) {
        self.panes.chat_open = !self.panes.chat_open;
        if !self.panes.chat_open && self.focus == Focus::Chat {
            self.focus = Focus::Map;
        }
        self.layout_changed(now);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Map if self.panes.chat_open => Focus::Chat,
            _ => Focus::Map,
        };
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        if let Some(controller) = self.controller_mut() {
            controller.surface_mut().viewport_mut().pan(dx, dy);
        }
    }

    pub fn zoom_in(&mut self) {
        if let Some(controller) = self.controller_mut() {
            controller.surface_mut().viewport_mut().zoom_in();
        }
    }

    pub fn zoom_out(&mut self) {
        if let Some(controller) = self.controller_mut() {
            controller.surface_mut().viewport_mut().zoom_out();
        }
    }

    /// Screen cell to map pixel, if inside the map container
    fn map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let inner = self.layout().map_inner;
        inner
            .contains((col, row).into())
            .then(|| (((col - inner.x) as i32) * 2, ((row - inner.y) as i32) * 4))
    }

    pub fn zoom_at(&mut self, col: u16, row: u16, zoom_in: bool) {
        let Some((px, py)) = self.map_pixel(col, row) else {
            return;
        };
        if let Some(controller) = self.controller_mut() {
            let viewport = controller.surface_mut().viewport_mut();
            if zoom_in {
                viewport.zoom_in_at(px, py);
            } else {
                viewport.zoom_out_at(px, py);
            }
        }
    }

    pub fn select_next(&mut self, forward: bool) {
        if let Some(controller) = self.controller_mut() {
            let at = if forward {
                controller.select_next()
            } else {
                controller.select_prev()
            };
            if let Some(at) = at {
                controller.surface_mut().center_on(at);
            }
        }
    }

    pub fn close_popup(&mut self) {
        if let Some(controller) = self.controller_mut() {
            controller.close_popup();
        }
    }

    /// Left button pressed
    pub fn mouse_down(&mut self, col: u16, row: u16) {
        let layout = self.layout();

        if self.panes.chat_open && layout.chat.width > 0 && col == layout.chat.x {
            self.drag = Some(Drag::ChatEdge);
            return;
        }
        if !self.panes.sidebar_collapsed && col + 1 == layout.sidebar.right() {
            self.drag = Some(Drag::SidebarEdge);
            return;
        }

        if layout.sidebar.contains((col, row).into()) {
            self.sidebar_click(row.saturating_sub(layout.sidebar.y + 1));
            return;
        }

        if layout.chat.contains((col, row).into()) {
            self.focus = Focus::Chat;
            return;
        }

        let inner = layout.map_inner;
        if inner.contains((col, row).into()) {
            self.focus = Focus::Map;
            let hit = self
                .controller()
                .and_then(|c| c.surface().marker_at(col - inner.x, row - inner.y));
            match hit {
                Some(marker) => {
                    if let Some(controller) = self.controller_mut() {
                        controller.open_popup(marker);
                    }
                }
                None => self.drag = Some(Drag::Map { col, row }),
            }
        }
    }

    fn sidebar_click(&mut self, line: u16) {
        if self.panes.sidebar_collapsed {
            return;
        }
        if let Some(idx) = line.checked_sub(CATEGORY_FIRST_ROW) {
            if let Some(&category) = Category::ALL.get(idx as usize) {
                self.select_category(category);
                return;
            }
        }
        if line == HISTORICAL_ROW {
            self.toggle_historical();
        }
    }

    pub fn mouse_drag(&mut self, col: u16, row: u16, now: Instant) {
        match self.drag {
            Some(Drag::Map {
                col: last_col,
                row: last_row,
            }) => {
                let dx = (last_col as i32 - col as i32) * 2;
                let dy = (last_row as i32 - row as i32) * 4;
                self.pan(dx, dy);
                self.drag = Some(Drag::Map { col, row });
            }
            Some(Drag::SidebarEdge) => {
                let width = (col + 1).clamp(SIDEBAR_MIN, SIDEBAR_MAX);
                if width != self.panes.sidebar {
                    self.panes.sidebar = width;
                    self.layout_changed(now);
                }
            }
            Some(Drag::ChatEdge) => {
                let width = self.screen.width.saturating_sub(col).clamp(CHAT_MIN, CHAT_MAX);
                if width != self.panes.chat {
                    self.panes.chat = width;
                    self.layout_changed(now);
                }
            }
            None => {}
        }
    }

    pub fn mouse_up(&mut self) {
        self.drag = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Tear the map down before the terminal is restored
    pub fn shutdown(&mut self) {
        if let Some(controller) = self.controller_mut() {
            controller.teardown();
        }
        info!("shutdown complete");
    }

    pub fn zoom_label(&self) -> String {
        self.controller()
            .map(|c| format!("z{:.1}", c.surface().viewport().level()))
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn center_label(&self) -> String {
        self.controller()
            .map(|c| c.surface().viewport().center.to_compass_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::geo::RIYADH;
    use crate::overlay::FilterState;
    use crate::records::fixtures::venue;
    use crate::surface::MapSurface;

    fn config() -> Config {
        Config {
            api_base: "http://localhost:5000".into(),
            data_dir: PathBuf::from("data"),
            center: RIYADH,
            zoom: 11.0,
            resize_debounce: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
            log_file: PathBuf::from("raya-map.log"),
            fetch: false,
        }
    }

    fn app(cols: u16, rows: u16) -> (App, Instant) {
        let mut app = App::new(config(), MapRenderer::new(), None);
        let now = Instant::now();
        app.on_terminal_resize(cols, rows, now);
        (app, now)
    }

    #[test]
    fn test_map_unavailable_until_area() {
        let (mut app, now) = app(0, 0);
        assert!(matches!(app.map, MapPane::Unavailable { .. }));
        app.on_terminal_resize(120, 40, now);
        assert!(app.controller().is_some());
    }

    #[test]
    fn test_layout_sums_to_screen() {
        let (app, _) = app(120, 40);
        let l = app.layout();
        assert_eq!(l.sidebar.width, 24);
        assert_eq!(l.chat.width, 36);
        assert_eq!(l.map.width, 60);
        assert_eq!(l.map_inner, Rect::new(25, 1, 58, 37));
        assert_eq!(l.status, Rect::new(0, 39, 120, 1));
    }

    #[test]
    fn test_pane_resize_debounced() {
        let (mut app, now) = app(120, 40);
        for i in 0..4 {
            app.resize_sidebar(2, now + Duration::from_millis(i * 10));
        }
        app.tick(now + Duration::from_millis(50));
        let surface = app.controller().unwrap().surface();
        assert_eq!(surface.relayout_count(), 0);
        assert_eq!(surface.container(), ContainerSize::new(50, 37));

        app.tick(now + Duration::from_millis(200));
        let surface = app.controller().unwrap().surface();
        assert_eq!(surface.relayout_count(), 1);
        assert_eq!(surface.laid_out(), ContainerSize::new(50, 37));
    }

    #[test]
    fn test_width_clamped() {
        let (mut app, now) = app(120, 40);
        app.resize_sidebar(-100, now);
        assert_eq!(app.panes.sidebar, SIDEBAR_MIN);
        app.resize_chat(100, now);
        assert_eq!(app.panes.chat, CHAT_MAX);
    }

    #[test]
    fn test_sidebar_clicks_filter() {
        let (mut app, _) = app(120, 40);
        // Border row + first category line
        app.mouse_down(5, 1 + CATEGORY_FIRST_ROW);
        assert_eq!(
            app.controller().unwrap().filter().selected_category,
            Some(Category::Food)
        );
        app.mouse_down(5, 1 + CATEGORY_FIRST_ROW);
        assert_eq!(app.controller().unwrap().filter(), &FilterState::default());

        app.mouse_down(5, 1 + HISTORICAL_ROW);
        assert!(!app.controller().unwrap().filter().show_historical);
    }

    #[test]
    fn test_click_marker_opens_popup() {
        let (mut app, now) = app(120, 40);
        let controller = app.controller_mut().unwrap();
        controller.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), RIYADH.lat, RIYADH.lng)],
        );
        app.tick(now);

        // A single venue is fitted to the middle of the map
        let inner = app.layout().map_inner;
        let (col, row) = (inner.x + inner.width / 2, inner.y + inner.height / 2);
        app.mouse_down(col, row);
        let surface = app.controller().unwrap().surface();
        let (_, content) = surface.open_popup().unwrap();
        assert_eq!(content.title, "Venue a");
    }

    #[test]
    fn test_offline_chat_echoes() {
        let (mut app, _) = app(120, 40);
        app.input = "  hello  ".into();
        app.send_message();
        assert!(app.input.is_empty());
        assert_eq!(app.chat.len(), 3);
        assert_eq!(app.chat[2].content, "You said: hello");

        app.send_message();
        assert_eq!(app.chat.len(), 3);
    }

    #[test]
    fn test_chat_error_becomes_assistant_message() {
        let (mut app, _) = app(120, 40);
        app.handle_worker(WorkerEvent::Chat(Err("assistant returned 500".into())));
        let last = app.chat.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("500"));
    }

    #[test]
    fn test_shutdown_tears_down_map() {
        let (mut app, _) = app(120, 40);
        app.shutdown();
        assert!(!app.controller().unwrap().is_alive());
        assert!(app.controller().unwrap().surface().is_torn_down());
    }
}
