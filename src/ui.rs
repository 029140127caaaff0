use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Field, NoticeKind, Screen};
use crate::loan::LoanEstimate;

const TITLE: &str = "Real Estate Price Predictor";

/// Groups digits the Indian way: 12,34,567.
pub fn format_inr(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

pub fn rupees(value: f64) -> String {
    format!("₹ {}", format_inr(value.round().max(0.0) as u64))
}

pub fn ui(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Landing => render_landing_screen(f, app),
        Screen::Predict => render_predict_screen(f, app),
        Screen::Result => render_result_screen(f, app),
        Screen::Schedule => render_schedule_screen(f, app),
    }
}

fn title_bar(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn help_bar(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP))
}

fn notice_line(app: &App) -> Paragraph<'static> {
    match &app.notice {
        Some(notice) => {
            let color = match notice.kind {
                NoticeKind::Info => Color::Green,
                NoticeKind::Error => Color::Red,
            };
            Paragraph::new(notice.text.clone())
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
        }
        None => Paragraph::new(""),
    }
}

fn render_landing_screen(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    f.render_widget(title_bar(TITLE), chunks[0]);

    let body = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Residential • Commercial • Any Location",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from("Discover the worth of any property in seconds."),
        Line::from("Enter a few details, get a price estimate, then plan your loan."),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to start",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    ];
    let intro = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(intro, chunks[1]);

    f.render_widget(notice_line(app), chunks[2]);
    f.render_widget(help_bar("Enter/p: predict | r: last result | q/Esc: quit"), chunks[3]);
}

fn field_block(app: &App, field: Field) -> Block<'static> {
    let focused = app.form.focus == field;
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(field.label())
}

fn select_text(value: Option<u8>) -> String {
    match value {
        Some(v) => format!("◀ {} ▶", v),
        None => "◀ Select ▶".to_string(),
    }
}

fn render_predict_screen(f: &mut Frame, app: &App) {
    let matcher = &app.form.location;
    let list_height = if matcher.shows_list() {
        (matcher.suggestion_count() as u16).min(8) + 2
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(list_height),
                Constraint::Min(0),
                Constraint::Length(2),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    f.render_widget(title_bar("Enter Property Details"), chunks[0]);

    let numbers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);
    let selects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[2]);

    let placeholder = Style::default().fg(Color::DarkGray);
    let value_style = Style::default().fg(Color::Yellow);

    let sqft = if app.form.total_sqft.is_empty() {
        Paragraph::new("e.g., 1200").style(placeholder)
    } else {
        Paragraph::new(app.form.total_sqft.as_str()).style(value_style)
    };
    f.render_widget(sqft.block(field_block(app, Field::TotalSqft)), numbers[0]);

    let ppsf = if app.form.price_per_sqft.is_empty() {
        Paragraph::new("e.g., 7500").style(placeholder)
    } else {
        Paragraph::new(app.form.price_per_sqft.as_str()).style(value_style)
    };
    f.render_widget(ppsf.block(field_block(app, Field::PricePerSqft)), numbers[1]);

    f.render_widget(
        Paragraph::new(select_text(app.form.bath))
            .style(value_style)
            .block(field_block(app, Field::Bath)),
        selects[0],
    );
    f.render_widget(
        Paragraph::new(select_text(app.form.balcony))
            .style(value_style)
            .block(field_block(app, Field::Balcony)),
        selects[1],
    );

    let location = if matcher.value().is_empty() {
        Paragraph::new("Type or choose location").style(placeholder)
    } else {
        Paragraph::new(matcher.value()).style(value_style)
    };
    f.render_widget(location.block(field_block(app, Field::Location)), chunks[3]);

    if matcher.shows_list() {
        render_suggestions(f, app, chunks[4]);
    }

    f.render_widget(notice_line(app), chunks[6]);

    let help = if app.form.focus == Field::Location && matcher.is_visible() {
        "↑/↓: highlight | Enter: choose | Esc: close list | Tab: next field"
    } else {
        "Tab/Shift-Tab: move | ←/→: change selection | Enter: predict | Esc: back"
    };
    f.render_widget(help_bar(help), chunks[7]);
}

fn render_suggestions(f: &mut Frame, app: &App, area: Rect) {
    let matcher = &app.form.location;
    let items: Vec<ListItem> = matcher.suggestions().map(ListItem::new).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} matches", matcher.suggestion_count())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");
    let mut state = ListState::default().with_selected(matcher.highlight());
    f.render_stateful_widget(list, area, &mut state);
}

fn render_result_screen(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    f.render_widget(title_bar("Predicted Property Price"), chunks[0]);

    match app.estimate() {
        Some(estimate) => render_estimate(f, app, &estimate, chunks[1]),
        None => {
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No prediction available yet.",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )),
                Line::from("Fill in the property details to get an estimate."),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Result"));
            f.render_widget(empty, chunks[1]);
        }
    }

    f.render_widget(notice_line(app), chunks[2]);

    let help = if app.prediction.is_some() {
        "←/→: loan term | ↑/↓: interest rate | s: schedule | n: predict another | Esc: home | q: quit"
    } else {
        "n/Enter: predict | Esc: home | q: quit"
    };
    f.render_widget(help_bar(help), chunks[3]);
}

fn render_estimate(f: &mut Frame, app: &App, estimate: &LoanEstimate, area: Rect) {
    let factors = app
        .prediction
        .as_ref()
        .map(|p| p.top_contributions(5))
        .unwrap_or_default();
    let factors_height = if factors.is_empty() { 0 } else { factors.len() as u16 + 2 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Length(6),
                Constraint::Length(factors_height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    let price = Paragraph::new(format!("₹ {:.2} Lakhs", estimate.price_lakhs))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Estimate"));
    f.render_widget(price, chunks[0]);

    let breakdown: Vec<Line> = estimate
        .breakdown
        .iter()
        .map(|item| {
            Line::from(vec![
                Span::styled(format!("{}: ", item.label), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(rupees(item.value), Style::default().fg(Color::Green)),
                Span::styled(format!("  ({})", item.tooltip), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(breakdown).block(Block::default().borders(Borders::ALL).title("Price Breakdown")),
        chunks[1],
    );

    let params = &estimate.params;
    let emi_text = vec![
        Line::from(vec![
            Span::styled("Loan Term: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("◀ {} yrs ▶", params.term_years())),
            Span::styled("  Total loan period in years", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled("Interest Rate: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{:.1}%", params.annual_rate_percent())),
            Span::styled("  Annual interest rate of the loan", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} / month", rupees(estimate.emi as f64)),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(
        Paragraph::new(emi_text).block(Block::default().borders(Borders::ALL).title("Estimated EMI")),
        chunks[2],
    );

    if !factors.is_empty() {
        let lines: Vec<Line> = factors
            .iter()
            .map(|c| {
                let color = if c.contribution >= 0.0 { Color::Green } else { Color::Red };
                Line::from(vec![
                    Span::raw(format!("{}: ", c.feature)),
                    Span::styled(format!("{:+.2}", c.contribution), Style::default().fg(color)),
                ])
            })
            .collect();
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Top Factors")),
            chunks[3],
        );
    }
}

fn render_schedule_screen(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let Some(schedule) = &app.schedule else {
        return;
    };

    let header = Row::new(vec!["Month", "Payment", "Interest", "Principal", "Balance"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .height(1);

    let rows = schedule.rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.month.to_string()),
            Cell::from(rupees(row.payment)),
            Cell::from(rupees(row.interest)),
            Cell::from(rupees(row.principal)),
            Cell::from(rupees(row.balance)),
        ])
        .height(1)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(16),
    ];

    let title = format!(
        "Repayment Schedule: {} yrs at {:.1}%",
        app.loan.term_years(),
        app.loan.annual_rate_percent()
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    let summary = &schedule.summary;
    let summary_line = Paragraph::new(Line::from(vec![
        Span::styled("Total Paid: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(rupees(summary.total_paid)),
        Span::styled("  Interest: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(rupees(summary.total_interest), Style::default().fg(Color::Red)),
        Span::styled("  Principal: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(rupees(summary.total_principal), Style::default().fg(Color::Green)),
    ]))
    .alignment(Alignment::Center);

    let notice = notice_line(app);
    f.render_stateful_widget(table, chunks[0], &mut app.table_state);
    f.render_widget(summary_line, chunks[1]);
    f.render_widget(notice, chunks[2]);
    f.render_widget(
        help_bar("j/k or ↑/↓: navigate | g/G: top/bottom | e: export CSV | h/←: back | q: quit"),
        chunks[3],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::predict::PredictionResult;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn indian_grouping() {
        assert_eq!(format_inr(0), "0");
        assert_eq!(format_inr(999), "999");
        assert_eq!(format_inr(1_000), "1,000");
        assert_eq!(format_inr(46_607), "46,607");
        assert_eq!(format_inr(1_234_567), "12,34,567");
        assert_eq!(format_inr(5_000_000), "50,00,000");
        assert_eq!(format_inr(123_456_789), "12,34,56,789");
    }

    #[test]
    fn result_screen_without_data_shows_empty_state() {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Result;
        let text = screen_text(&mut app);
        assert!(text.contains("No prediction available yet."));
        assert!(!text.contains("Estimated EMI"));
    }

    #[test]
    fn result_screen_shows_emi_and_breakdown() {
        let mut app = App::new(&Settings::default());
        app.show_result(PredictionResult { predicted_price_lakhs: 50.0, shap_values: vec![] });
        let text = screen_text(&mut app);
        assert!(text.contains("46,607 / month"));
        assert!(text.contains("37,50,000"));
        assert!(text.contains("Location Premium"));
    }
}
