mod controller;
mod state;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::time::interval;
use tracing::info;

use crate::playback::SEEK_STEP_SECS;

pub use controller::AppController;
pub use state::{App, Screen};

pub async fn run(mut app: App) -> Result<()> {
    app.bootstrap();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(200));

    let outcome = loop {
        if let Err(err) = terminal.draw(|frame| ui::draw(frame, &mut app)) {
            break Err(err.into());
        }

        tokio::select! {
            _ = ticker.tick() => {},
            maybe_event = reader.next() => {
                if let Some(Ok(event)) = maybe_event {
                    if let Err(err) = handle_event(&mut app, event) {
                        break Err(err);
                    }
                }
            }
            Some(message) = app.msg_rx.recv() => {
                app.handle_message(message);
            }
        }

        if app.should_quit {
            break Ok(());
        }
    };

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    info!("terminal restored");
    outcome
}

fn handle_event(app: &mut App, event: Event) -> Result<()> {
    match event {
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
            handle_key_event(app, key_event)?
        }
        _ => {}
    }
    Ok(())
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Tab => app.next_screen(),
        KeyCode::BackTab => app.previous_screen(),
        KeyCode::Up => app.move_selection(-1),
        KeyCode::Down => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::Enter if app.screen == Screen::Albums => app.open_selected_album(),
        KeyCode::Char('f') => app.toggle_selected_favorite(),
        KeyCode::Char('s') => app.save_selected_artwork()?,
        KeyCode::Char('r') => app.retry_current(),
        KeyCode::Char('p') | KeyCode::Char(' ') => app.toggle_selected_preview()?,
        KeyCode::Left => app.seek_preview(-SEEK_STEP_SECS)?,
        KeyCode::Right => app.seek_preview(SEEK_STEP_SECS)?,
        KeyCode::Char('x') => app.stop_preview()?,
        _ => {}
    }
    Ok(())
}
