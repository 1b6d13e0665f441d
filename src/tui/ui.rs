use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::catalog::{Collection, Phase};
use crate::models::{Album, Track};
use crate::playback::{PreviewPlayback, PreviewStatus};

use super::App;
use super::state::{FavoriteEntry, Screen};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_tabs(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    match app.screen {
        Screen::Songs => {
            draw_song_list(frame, app, body[0]);
            let lines = match app.selected_track() {
                Some(track) => track_detail_lines(
                    track,
                    app.favorites.is_track_favorite(&track.id),
                    &app.preview,
                ),
                None => vec![Line::from("Select a song").style(dim_style())],
            };
            draw_detail(frame, "Song", lines, body[1]);
        }
        Screen::Albums => {
            draw_album_list(frame, app, body[0]);
            let lines = match app.selected_album() {
                Some(album) => {
                    let mut lines =
                        album_detail_lines(&album, app.favorites.is_album_favorite(&album.id));
                    lines.extend(album_track_lines(app, &album.id));
                    lines
                }
                None => vec![Line::from("Select an album").style(dim_style())],
            };
            draw_detail(frame, "Album", lines, body[1]);
        }
        Screen::Favorites => {
            draw_favorite_list(frame, app, body[0]);
            let lines = match app.selected_favorite() {
                Some(FavoriteEntry::Track {
                    track: Some(track), ..
                }) => track_detail_lines(track, true, &app.preview),
                Some(FavoriteEntry::Album {
                    album: Some(album), ..
                }) => album_detail_lines(album, true),
                Some(
                    FavoriteEntry::Track { id, track: None }
                    | FavoriteEntry::Album { id, album: None },
                ) => vec![
                    Line::from(format!("Favorite {id}")),
                    Line::from("Not in the currently loaded charts").style(dim_style()),
                ],
                None => vec![
                    Line::from("Nothing favorited yet, press f on a song or album")
                        .style(dim_style()),
                ],
            };
            draw_detail(frame, "Favorite", lines, body[1]);
        }
    }

    draw_logs(frame, app, chunks[2]);
    draw_footer(frame, chunks[3]);
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Screen::ALL
        .iter()
        .map(|screen| Line::from(screen.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("chartdeck").borders(Borders::ALL))
        .select(app.screen.index())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn draw_song_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let collection = &app.catalog.top_tracks;
    let items: Vec<ListItem> = if collection.items().is_empty() {
        vec![placeholder_item(collection, "No music found.")]
    } else {
        collection
            .items()
            .iter()
            .enumerate()
            .map(|(idx, track)| {
                let favorite = app.favorites.is_track_favorite(&track.id);
                ListItem::new(format!("{:>2}. {} {}", idx + 1, star(favorite), track.display_name()))
            })
            .collect()
    };

    let list = List::new(items)
        .block(list_block("Top Songs", collection.phase()))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.track_state);
}

fn draw_album_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let collection = &app.catalog.top_albums;
    let items: Vec<ListItem> = if collection.items().is_empty() {
        vec![placeholder_item(collection, "No albums found.")]
    } else {
        collection
            .items()
            .iter()
            .enumerate()
            .map(|(idx, album)| {
                let favorite = app.favorites.is_album_favorite(&album.id);
                ListItem::new(format!("{:>2}. {} {}", idx + 1, star(favorite), album.display_name()))
            })
            .collect()
    };

    let list = List::new(items)
        .block(list_block("Top Albums", collection.phase()))
        .highlight_style(
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.album_state);
}

fn draw_favorite_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = {
        let entries = app.favorite_entries();
        if entries.is_empty() {
            vec![ListItem::new("No favorites yet").style(dim_style())]
        } else {
            entries
                .into_iter()
                .map(|entry| match entry {
                    FavoriteEntry::Track { id, track } => ListItem::new(format!(
                        "♪ {}",
                        track.map_or_else(|| id.to_string(), Track::display_name)
                    )),
                    FavoriteEntry::Album { id, album } => ListItem::new(format!(
                        "◎ {}",
                        album.map_or_else(|| id.to_string(), Album::display_name)
                    )),
                })
                .collect()
        }
    };

    let list = List::new(items)
        .block(Block::default().title("Favorites").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.favorite_state);
}

fn draw_detail(frame: &mut Frame, title: &str, lines: Vec<Line<'static>>, area: Rect) {
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .logs
        .iter()
        .rev()
        .take(100)
        .map(|entry| Line::from(entry.clone()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Activity").borders(Borders::ALL))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(
        "Tab: switch • ↑/↓: move • Enter: album tracks • p: preview • ←/→: seek • x: stop • f: favorite • s: save artwork • r: reload • q: quit",
    )
    .style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, area);
}

fn track_detail_lines(
    track: &Track,
    favorite: bool,
    preview: &PreviewPlayback,
) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(track.title.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(track.artist.clone()),
        Line::from(""),
    ];
    push_field(&mut lines, "Album", track.album.as_deref());
    push_field(&mut lines, "Category", track.category.as_deref());
    push_field(
        &mut lines,
        "Release",
        track
            .release_date_label
            .as_deref()
            .or(track.release_date.as_deref()),
    );
    push_field(&mut lines, "Price", track.price_display().as_deref());
    if track.duration_ms.is_some() {
        push_field(&mut lines, "Duration", Some(track.duration_label().as_str()));
    }
    push_field(&mut lines, "Page", track.page_url.as_deref());
    push_field(&mut lines, "Artwork", track.artwork_url.as_deref());
    lines.push(preview_line(track, preview));
    lines.push(favorite_line(favorite));
    lines
}

fn preview_line(track: &Track, preview: &PreviewPlayback) -> Line<'static> {
    if track.preview_url.is_none() {
        return Line::from("No preview available").style(dim_style());
    }
    if !preview.is_current(&track.id) {
        return Line::from("♪ Press p to play the preview").style(dim_style());
    }
    let style = match preview.status() {
        PreviewStatus::Playing => Style::default().fg(Color::LightGreen),
        PreviewStatus::Failed => Style::default().fg(Color::Red),
        PreviewStatus::Loading | PreviewStatus::Paused | PreviewStatus::Stopped => {
            Style::default().fg(Color::Yellow)
        }
    };
    Line::from(format!("Preview {}", preview.label())).style(style)
}

fn album_detail_lines(album: &Album, favorite: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(album.title.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(album.artist.clone()),
        Line::from(""),
    ];
    push_field(&mut lines, "Category", album.category.as_deref());
    push_field(
        &mut lines,
        "Release",
        album
            .release_date_label
            .as_deref()
            .or(album.release_date.as_deref()),
    );
    push_field(&mut lines, "Tracks", Some(album.item_count_label().as_str()));
    push_field(&mut lines, "Page", album.page_url.as_deref());
    lines.push(favorite_line(favorite));
    lines
}

fn album_track_lines(app: &App, album_id: &str) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        Line::from("Tracks").style(Style::default().add_modifier(Modifier::BOLD)),
    ];
    match app.catalog.album_tracks(album_id) {
        None => lines.push(enter_hint()),
        Some(collection) => match collection.phase() {
            Phase::Idle => lines.push(enter_hint()),
            Phase::Loading => lines.push(Line::from("Loading tracks…").style(dim_style())),
            Phase::Failed => lines.push(
                Line::from(collection.error().unwrap_or("Failed to load tracks").to_string())
                    .style(Style::default().fg(Color::Red)),
            ),
            Phase::Succeeded if collection.items().is_empty() => {
                lines.push(Line::from("No tracks found for this album.").style(dim_style()))
            }
            Phase::Succeeded => {
                for track in collection.items() {
                    let number = track
                        .track_number
                        .map_or_else(|| String::from("-"), |n| n.to_string());
                    lines.push(Line::from(format!(
                        "{number:>3}  {} {}  {}",
                        star(app.favorites.is_track_favorite(&track.id)),
                        track.title,
                        track.duration_label()
                    )));
                }
            }
        },
    }
    lines
}

fn enter_hint() -> Line<'static> {
    Line::from("Press Enter to load the track listing").style(dim_style())
}

fn push_field(lines: &mut Vec<Line<'static>>, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        lines.push(Line::from(format!("{label}: {value}")));
    }
}

fn favorite_line(favorite: bool) -> Line<'static> {
    if favorite {
        Line::from("★ Favorited").style(Style::default().fg(Color::Yellow))
    } else {
        Line::from("☆ Press f to favorite").style(dim_style())
    }
}

fn placeholder_item<T>(collection: &Collection<T>, empty_text: &str) -> ListItem<'static> {
    match collection.phase() {
        Phase::Idle => ListItem::new("Not loaded yet").style(dim_style()),
        Phase::Loading => ListItem::new("Loading…").style(dim_style()),
        Phase::Failed => ListItem::new(collection.error().unwrap_or("Fetch failed").to_string())
            .style(Style::default().fg(Color::Red)),
        Phase::Succeeded => ListItem::new(empty_text.to_string()).style(dim_style()),
    }
}

fn list_block(title: &str, phase: Phase) -> Block<'static> {
    let suffix = match phase {
        Phase::Loading => " (loading)",
        Phase::Failed => " (failed, r to retry)",
        Phase::Idle | Phase::Succeeded => "",
    };
    Block::default()
        .title(format!("{title}{suffix}"))
        .borders(Borders::ALL)
}

fn star(favorite: bool) -> &'static str {
    if favorite { "★" } else { " " }
}

fn dim_style() -> Style {
    Style::default().fg(Color::DarkGray)
}
