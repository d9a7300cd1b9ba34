use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};

use crate::app::{App, Focus, VolumeLevel};
use crate::domain::models::{PlaybackState, Station};
use crate::integrations::playback::MediaBackend;
use crate::integrations::scheduler::Scheduler;

pub fn render<B: MediaBackend, S: Scheduler>(frame: &mut ratatui::Frame<'_>, app: &App<B, S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(9),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let now_playing = app.now_playing();
    let current = app.current_station();

    let header = Paragraph::new(
        "nightride | Space play/stop | Enter select | +/- volume | m mute | / command | q quit",
    )
    .style(Style::default().fg(accent(current)).add_modifier(Modifier::BOLD))
    .block(Block::default().borders(Borders::ALL).title("Session"));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let list_items: Vec<ListItem<'_>> = app
        .catalog()
        .stations()
        .iter()
        .enumerate()
        .map(|(idx, station)| {
            let ornament = if station.key == now_playing.station_key {
                "● "
            } else {
                "  "
            };
            let mut style = Style::default().fg(accent(station));
            if idx == app.selected_index {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if station.key == now_playing.station_key {
                style = style.add_modifier(Modifier::BOLD);
            }
            ListItem::new(Line::from(format!("{ornament}{}", station.label))).style(style)
        })
        .collect();

    let stations = List::new(list_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Stations ({})", app.catalog().len())),
    );
    frame.render_widget(stations, body[0]);

    let state_color = match now_playing.state {
        PlaybackState::Idle => Color::Gray,
        PlaybackState::Connecting => Color::Yellow,
        PlaybackState::Playing => Color::Green,
        PlaybackState::ErrorRecovering => Color::Red,
    };
    let details = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            current.label,
            Style::default()
                .fg(accent(current))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "Track: {}",
            now_playing.title.as_deref().unwrap_or("—")
        )),
        Line::from(Span::styled(
            format!("Playback: {}", now_playing.state.label()),
            Style::default().fg(state_color),
        )),
        Line::from(format!("Stream: {}", current.stream_url)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Now Playing")
            .border_style(Style::default().fg(gradient_end(current))),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(details, body[1]);

    let level = app.volume_level();
    let volume = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Volume ({})", level.label())),
        )
        .gauge_style(Style::default().fg(if level == VolumeLevel::Muted {
            Color::DarkGray
        } else {
            accent(current)
        }))
        .ratio(now_playing.volume.clamp(0.0, 1.0));
    frame.render_widget(volume, chunks[2]);

    let (input_title, input_value) = match app.focus {
        Focus::Command => ("Command (Enter runs, Esc cancels)", app.command_input.clone()),
        Focus::Stations => ("Command (press /)", String::new()),
    };
    let input = Paragraph::new(Text::from(input_value))
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, chunks[3]);

    let status = Paragraph::new(app.status_message.clone())
        .style(Style::default().fg(Color::Yellow))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[4]);
}

fn accent(station: &Station) -> Color {
    station
        .gradient_rgb()
        .map(|((r, g, b), _)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Cyan)
}

fn gradient_end(station: &Station) -> Color {
    station
        .gradient_rgb()
        .map(|(_, (r, g, b))| Color::Rgb(r, g, b))
        .unwrap_or(Color::Blue)
}
