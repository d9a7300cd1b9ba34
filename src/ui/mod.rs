pub mod render;

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::app::{App, Focus};
use crate::domain::commands::Command;
use crate::integrations::playback::MediaBackend;
use crate::integrations::scheduler::Scheduler;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    pub fn run<B: MediaBackend, S: Scheduler>(&mut self, app: &mut App<B, S>) -> Result<()> {
        while app.running {
            app.pump();
            self.terminal
                .draw(|frame| render::render(frame, app))
                .map_err(anyhow::Error::from)?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        handle_key_event(app, key);
                    }
                }
            }
        }

        Ok(())
    }
}

fn handle_key_event<B: MediaBackend, S: Scheduler>(app: &mut App<B, S>, key: KeyEvent) {
    let result = match (app.focus, key.modifiers, key.code) {
        (_, KeyModifiers::CONTROL, KeyCode::Char('c')) => app.request_quit().map(drop),
        (Focus::Command, _, KeyCode::Esc) => {
            app.close_command_input();
            Ok(())
        }
        (Focus::Command, _, KeyCode::Enter) => app.submit_command_input().map(drop),
        (Focus::Command, _, KeyCode::Backspace) => {
            app.backspace_input();
            Ok(())
        }
        (Focus::Command, _, KeyCode::Char(c)) => {
            app.push_char(c);
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Up | KeyCode::Char('k')) => {
            app.select_previous();
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Down | KeyCode::Char('j')) => {
            app.select_next();
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Enter) => app.activate_selected().map(drop),
        (Focus::Stations, _, KeyCode::Char(' ')) => app.toggle_playback().map(drop),
        (Focus::Stations, _, KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right) => {
            app.volume_up();
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Char('-') | KeyCode::Left) => {
            app.volume_down();
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Char('m')) => app.execute(Command::Mute).map(drop),
        (Focus::Stations, _, KeyCode::Char('/')) => {
            app.open_command_input();
            Ok(())
        }
        (Focus::Stations, _, KeyCode::Char('q')) => app.request_quit().map(drop),
        _ => Ok(()),
    };

    if let Err(err) = result {
        app.status_message = format!("Error: {err}");
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}
