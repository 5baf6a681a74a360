use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        canvas::{Canvas, Map, MapResolution},
        Block, Borders, Clear, List, ListItem, Paragraph, Wrap,
    },
    Frame,
};

use unicode_width::UnicodeWidthStr;

use murshid_core::map::{MarkerKind, SurfaceSize, ATTRIBUTION};
use murshid_core::{strings, ChatRole, ChatTurn, Language, Theme, ViewMode};

use crate::app::{App, InputMode, SettingsItem, SETTINGS_ITEMS};

struct Palette {
    fg: Color,
    muted: Color,
    accent: Color,
    user: Color,
    error: Color,
    land: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            fg: Color::Black,
            muted: Color::Gray,
            accent: Color::Rgb(4, 120, 87),
            user: Color::Blue,
            error: Color::Red,
            land: Color::Gray,
        },
        Theme::Dark | Theme::System => Palette {
            fg: Color::White,
            muted: Color::DarkGray,
            accent: Color::Rgb(16, 185, 129),
            user: Color::Cyan,
            error: Color::LightRed,
            land: Color::DarkGray,
        },
    }
}

/// `#rrggbb` to a terminal colour
fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| digits.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok());
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }
    Line::from(spans)
}

/// Rows a line occupies once wrapped at `width`
fn wrapped_height(line: &Line, width: usize) -> usize {
    let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
    if width == 0 || chars == 0 {
        1
    } else {
        chars.div_ceil(width)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let colors = palette(app.effective_theme());

    let ad_height = if app.assistant.show_ads { 1 } else { 0 };
    let chips_height =
        if app.assistant.suggestion_chips_visible() && app.assistant.view == ViewMode::Chat { 1 } else { 0 };

    let [header_area, ad_area, body_area, chips_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(ad_height),
        Constraint::Min(0),
        Constraint::Length(chips_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &colors);
    if ad_height > 0 {
        render_ad_banner(app, frame, ad_area, &colors);
    }

    match app.assistant.view {
        ViewMode::Chat => render_chat(app, frame, body_area, &colors),
        ViewMode::Map => render_map(app, frame, body_area, &colors),
    }

    if chips_height > 0 {
        render_chips(app, frame, chips_area, &colors);
    }
    render_input(app, frame, input_area, &colors);
    render_footer(app, frame, footer_area, &colors);

    if app.show_language_picker {
        render_language_picker(app, frame, area, &colors);
    } else if app.show_settings {
        render_settings(app, frame, area, &colors);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());

    let location = if app.locating {
        Span::styled(" … ", Style::default().fg(colors.muted))
    } else if let Some(label) = app.assistant.location_status().label() {
        Span::styled(format!(" ⚠ {} (l) ", label), Style::default().fg(colors.error))
    } else if app.assistant.user_fix().is_some() {
        Span::styled(format!(" ● {} ", s.location_set), Style::default().fg(colors.accent))
    } else {
        Span::styled(format!(" ○ {} (l) ", s.location_disabled), Style::default().fg(colors.muted))
    };

    let [title_area, status_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(location.width() as u16)]).areas(area);

    let title = Line::from(vec![
        Span::styled(format!(" {} ", s.app_title), Style::default().fg(colors.accent).bold()),
        Span::styled(s.subtitle, Style::default().fg(colors.muted)),
        Span::raw(" "),
        Span::styled(format!("v{}", env!("CARGO_PKG_VERSION")), Style::default().fg(colors.muted)),
    ]);
    frame.render_widget(Paragraph::new(title), title_area);
    frame.render_widget(Paragraph::new(Line::from(location)), status_area);
}

fn render_ad_banner(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let line = Line::from(vec![
        Span::styled(" Ad ", Style::default().bg(colors.muted).fg(colors.fg).bold()),
        Span::raw(" "),
        Span::styled(s.ad_banner, Style::default().fg(colors.muted)),
        Span::styled("  [x]", Style::default().fg(colors.muted)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn turn_lines(turn: &ChatTurn, app: &App, colors: &Palette) -> Vec<Line<'static>> {
    let s = strings(app.language());
    let mut lines = Vec::new();

    match turn.role {
        ChatRole::User => {
            for line in turn.text.lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(colors.user),
                )));
            }
        }
        ChatRole::Assistant if turn.pending => {
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                dots,
                Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
            )));
        }
        ChatRole::Assistant => {
            lines.extend(turn.text.lines().map(parse_markdown_line));
            for place in &turn.places {
                lines.push(Line::from(vec![
                    Span::styled("📍 ", Style::default().fg(colors.error)),
                    Span::styled(
                        place.display_title(s.place_unavailable).to_string(),
                        Style::default().fg(colors.accent).bold(),
                    ),
                    Span::styled(format!("  {}", place.uri), Style::default().fg(colors.muted)),
                ]));
                if let Some(snippet) = &place.review_snippet {
                    lines.push(Line::from(Span::styled(
                        format!("   \"{}\"", snippet),
                        Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.muted))
        .title(format!(" {} ", s.chat_mode));

    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let lines: Vec<Line> = app
        .assistant
        .turns()
        .iter()
        .flat_map(|turn| turn_lines(turn, app, colors))
        .collect();

    let total: usize = lines
        .iter()
        .map(|line| wrapped_height(line, app.chat_width as usize))
        .sum();
    let max_scroll = total.saturating_sub(app.chat_height as usize).min(u16::MAX as usize) as u16;
    if app.follow_chat || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_chat = true;
    }

    let alignment = if app.language().is_rtl() { Alignment::Right } else { Alignment::Left };
    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .alignment(alignment)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_map(app: &mut App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let language = app.language();
    let s = strings(language);

    let [map_area, legend_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(34)]).areas(area);

    let status = app
        .projector
        .status()
        .map(|status| format!(" {} ", status.label(language)))
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.muted))
        .title(format!(" {} ", s.map_mode))
        .title_bottom(Line::from(format!(" {} ", ATTRIBUTION)).right_aligned())
        .title_top(Line::from(status).right_aligned());

    let inner = block.inner(map_area);
    // Braille cells hold 2x4 dots
    app.attach_map(SurfaceSize::new(u32::from(inner.width) * 2, u32::from(inner.height) * 4));

    let Some(surface) = app.projector.surface() else {
        frame.render_widget(block, map_area);
        return;
    };
    let bounds = app.projector.viewport().visible_bounds(surface);

    let mut place_number = 0;
    let labels: Vec<(f64, f64, Span<'static>)> = app
        .projector
        .markers()
        .iter()
        .map(|marker| {
            let symbol = match marker.kind {
                MarkerKind::User if app.pulse_on => "◉".to_string(),
                MarkerKind::User => "●".to_string(),
                MarkerKind::DefaultLocation => "○".to_string(),
                MarkerKind::Place => {
                    place_number += 1;
                    place_number.to_string()
                }
            };
            let style = Style::default().fg(hex_color(marker.color)).bold();
            (marker.position.lon, marker.position.lat, Span::styled(symbol, style))
        })
        .collect();

    let land = colors.land;
    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds([bounds.west, bounds.east])
        .y_bounds([bounds.south, bounds.north])
        .paint(move |ctx| {
            ctx.draw(&Map { color: land, resolution: MapResolution::High });
            ctx.layer();
            for (x, y, span) in &labels {
                ctx.print(*x, *y, span.clone());
            }
        });
    frame.render_widget(canvas, map_area);

    render_map_legend(app, frame, legend_area, colors);
}

fn render_map_legend(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let mut lines = Vec::new();
    let mut place_number = 0;

    for marker in app.projector.markers() {
        let symbol = match marker.kind {
            MarkerKind::User => "●".to_string(),
            MarkerKind::DefaultLocation => "○".to_string(),
            MarkerKind::Place => {
                place_number += 1;
                place_number.to_string()
            }
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", symbol), Style::default().fg(hex_color(marker.color)).bold()),
            Span::styled(marker.popup_title.clone(), Style::default().fg(colors.fg)),
        ]));
        if let Some(body) = &marker.popup_body {
            lines.push(Line::from(Span::styled(
                format!("  {}", body),
                Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
            )));
        }
    }

    let legend = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.muted))
                .title(format!(" {} ", s.map.details)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(legend, area);
}

fn render_chips(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let mut spans = Vec::new();
    for (i, chip) in app.assistant.suggestion_chips().iter().enumerate() {
        spans.push(Span::styled(
            format!(" {} ", i + 1),
            Style::default().bg(colors.accent).fg(Color::White).bold(),
        ));
        spans.push(Span::styled(format!(" {}  ", chip.label), Style::default().fg(colors.fg)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let editing = app.input_mode == InputMode::Editing;
    let border = if editing { colors.accent } else { colors.muted };

    let text = if app.input.is_empty() {
        Line::from(Span::styled(s.input_placeholder, Style::default().fg(colors.muted)))
    } else {
        Line::from(Span::styled(app.input.as_str(), Style::default().fg(colors.fg)))
    };

    let inner_width = area.width.saturating_sub(2);
    let (scroll, cursor) = input_viewport(&app.input, app.input_cursor, inner_width);

    let input = Paragraph::new(text).scroll((0, scroll)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(input, area);

    if editing && !app.show_settings && !app.show_language_picker {
        frame.set_cursor_position((area.x + 1 + cursor, area.y + 1));
    }
}

/// Horizontal scroll and cursor column for a one-line input, both in
/// terminal cells. `cursor` counts chars.
fn input_viewport(input: &str, cursor: usize, inner_width: u16) -> (u16, u16) {
    if inner_width == 0 {
        return (0, 0);
    }
    let before: String = input.chars().take(cursor).collect();
    let column = u16::try_from(before.width()).unwrap_or(u16::MAX);
    // Leave the last cell free for the cursor itself
    let scroll = column.saturating_sub(inner_width - 1);
    (scroll, column - scroll)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let key_style = Style::default().bg(colors.muted).fg(Color::White);
    let label_style = Style::default().fg(colors.fg);

    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => Span::styled(" INPUT ", Style::default().bg(colors.accent).fg(Color::White)),
    };
    let view = match app.assistant.view {
        ViewMode::Chat => s.map_mode,
        ViewMode::Map => s.chat_mode,
    };

    let mut spans = vec![mode, Span::raw(" ")];
    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Editing => vec![("Enter", "send"), ("Tab", view), ("Esc", "keys")],
        InputMode::Normal => vec![
            ("i", "type"),
            ("m", view),
            ("s", s.settings),
            ("d", s.delete_chat),
            ("l", "location"),
            ("q", "quit"),
        ],
    };
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if app.api_key_missing {
        spans.push(Span::styled(" GEMINI_API_KEY not set ", Style::default().fg(colors.error)));
    } else {
        spans.push(Span::styled(format!(" {}", s.disclaimer), Style::default().fg(colors.muted)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.width.saturating_sub(width) / 2,
        area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let popup = popup_area(area, 44, SETTINGS_ITEMS.len() as u16 + 2);
    frame.render_widget(Clear, popup);

    let theme_label = match app.assistant.theme {
        Theme::Light => s.theme_light,
        Theme::Dark => s.theme_dark,
        Theme::System => s.theme_system,
    };
    let items: Vec<ListItem> = SETTINGS_ITEMS
        .iter()
        .map(|item| {
            let text = match item {
                SettingsItem::Language => format!("{}: {}", s.language, app.language().native_name()),
                SettingsItem::Theme => format!("{}: {}", s.appearance, theme_label),
                SettingsItem::Ads => format!(
                    "{}: {}",
                    s.ads,
                    if app.assistant.show_ads { "✓" } else { "✗" }
                ),
                SettingsItem::DeleteChat => s.delete_chat.to_string(),
                SettingsItem::ClearData => s.clear_data.to_string(),
            };
            let style = match item {
                SettingsItem::ClearData => Style::default().fg(colors.error),
                _ => Style::default().fg(colors.fg),
            };
            ListItem::new(format!(" {} ", text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.accent))
                .title(format!(" {} ", s.settings)),
        )
        .highlight_style(Style::default().bg(colors.accent).fg(Color::White).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.settings_state);
}

fn render_language_picker(app: &mut App, frame: &mut Frame, area: Rect, colors: &Palette) {
    let s = strings(app.language());
    let languages = Language::all();
    let popup = popup_area(area, 36, languages.len() as u16 + 2);
    frame.render_widget(Clear, popup);

    let current = app.language();
    let items: Vec<ListItem> = languages
        .iter()
        .map(|language| {
            let style = if *language == current {
                Style::default().fg(colors.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg)
            };
            ListItem::new(format!(" {} ({}) ", language.native_name(), language.code())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.accent))
                .title(format!(" {} ", s.language)),
        )
        .highlight_style(Style::default().bg(colors.accent).fg(Color::White).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.language_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#059669"), Color::Rgb(5, 150, 105));
        assert_eq!(hex_color("#ef4444"), Color::Rgb(239, 68, 68));
        assert_eq!(hex_color("nope"), Color::Reset);
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Try **Café Clock** today");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Café Clock");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("**open");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "**open");
    }

    #[test]
    fn test_input_cursor_uses_display_width() {
        assert_eq!(input_viewport("hello", 3, 20), (0, 3));
        // Arabic letters take one cell each, CJK ideographs two
        assert_eq!(input_viewport("مرحبا", 5, 20), (0, 5));
        assert_eq!(input_viewport("東京タワー", 2, 20), (0, 4));
        assert_eq!(input_viewport("", 0, 20), (0, 0));
    }

    #[test]
    fn test_long_input_scrolls_to_cursor() {
        let input = "restaurants near the medina";
        assert_eq!(input_viewport(input, input.chars().count(), 10), (18, 9));
        assert_eq!(input_viewport(input, 4, 10), (0, 4));
        assert_eq!(input_viewport("東京東京東京", 6, 8), (5, 7));
        assert_eq!(input_viewport("abc", 3, 0), (0, 0));
    }

    #[test]
    fn test_wrapped_height() {
        let line = Line::from("abcdefghij");
        assert_eq!(wrapped_height(&line, 4), 3);
        assert_eq!(wrapped_height(&Line::default(), 4), 1);
    }
}
