use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::Receiver;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::info;

use raya_map::app::{App, Focus};
use raya_map::config::{CliArgs, Config};
use raya_map::data;
use raya_map::fetch::{FetchClient, WorkerEvent};
use raya_map::map::MapRenderer;
use raya_map::records::Category;
use raya_map::{logging, ui};

/// Upper bound on one event poll, ~60fps
const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    let config = Config::try_from(CliArgs::parse())?;
    logging::init(&config.log_file)?;
    info!(api = %config.api_base, fetch = config.fetch, "starting");

    let mut base = MapRenderer::new();
    let loaded = data::load_base_map(&mut base, &config.data_dir);
    info!(files = loaded, "base map loaded");

    let (client, events) = if config.fetch {
        let (client, rx) = FetchClient::new(&config.api_base, config.timeout)?;
        (Some(client), Some(rx))
    } else {
        (None, None)
    };
    let mut app = App::new(config, base, client);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &mut app, events.as_ref());

    app.shutdown();
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    if app.focus == Focus::Chat {
        match key.code {
            KeyCode::Enter => app.send_message(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Tab | KeyCode::Esc => app.toggle_focus(),
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.close_popup(),
        KeyCode::Tab => app.toggle_focus(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Filters
        KeyCode::Char(c @ '1'..='6') => {
            let idx = c as usize - '1' as usize;
            app.select_category(Category::ALL[idx]);
        }
        KeyCode::Char('t') => app.toggle_historical(),

        // Markers
        KeyCode::Char('n') => app.select_next(true),
        KeyCode::Char('N') => app.select_next(false),

        // Panes
        KeyCode::Char('<') => app.resize_sidebar(-2, now),
        KeyCode::Char('>') => app.resize_sidebar(2, now),
        KeyCode::Char('{') => app.resize_chat(2, now),
        KeyCode::Char('}') => app.resize_chat(-2, now),
        KeyCode::Char('S') => app.toggle_sidebar(now),
        KeyCode::Char('C') => app.toggle_chat(now),

        // Base map layers
        KeyCode::Char('b') => toggle_base(app, |r| r.toggle_borders()),
        KeyCode::Char('L') => toggle_base(app, |r| r.toggle_labels()),

        KeyCode::Char('R') => app.refresh(),
        _ => {}
    }
}

fn toggle_base(app: &mut App, toggle: impl FnOnce(&mut MapRenderer)) {
    if let Some(controller) = app.controller_mut() {
        toggle(controller.surface_mut().base_mut());
    }
}

/// Handle mouse events for panning, zooming, picking and pane dragging
fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_at(mouse.column, mouse.row, true),
        MouseEventKind::ScrollDown => app.zoom_at(mouse.column, mouse.row, false),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row, now),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    events: Option<&Receiver<WorkerEvent>>,
) -> Result<()> {
    let size = terminal.size()?;
    app.on_terminal_resize(size.width, size.height, Instant::now());

    loop {
        if let Some(rx) = events {
            for event in rx.try_iter() {
                app.handle_worker(event);
            }
        }
        app.tick(Instant::now());

        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake up in time for a pending relayout
        let timeout = app
            .controller()
            .and_then(|c| c.next_deadline(Instant::now()))
            .map_or(FRAME, |d| d.min(FRAME));

        if event::poll(timeout)? {
            let now = Instant::now();
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key, now),
                Event::Mouse(mouse) => handle_mouse(app, mouse, now),
                Event::Resize(width, height) => app.on_terminal_resize(width, height, now),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
