use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::TableState;
use tracing::{info, warn};

use crate::config::{Catalog, LocationMode, Settings};
use crate::error::{AppError, Result};
use crate::loan::{check_price, LoanEstimate, LoanParameters};
use crate::location::{Direction, LocationMatcher};
use crate::predict::{
    PredictionRequest, PredictionResult, PredictionService, BALCONY_OPTIONS, BATH_OPTIONS,
};
use crate::schedule::RepaymentSchedule;

pub const DEFAULT_EXPORT_FILE: &str = "emi_schedule.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Predict,
    Result,
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TotalSqft,
    PricePerSqft,
    Bath,
    Balcony,
    Location,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::TotalSqft,
        Field::PricePerSqft,
        Field::Bath,
        Field::Balcony,
        Field::Location,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::TotalSqft => "Total Sqft",
            Field::PricePerSqft => "Price Per Sqft (₹)",
            Field::Bath => "Bathrooms",
            Field::Balcony => "Balcony",
            Field::Location => "Location",
        }
    }

    fn index(self) -> usize {
        Field::ALL.iter().position(|&f| f == self).unwrap_or(0)
    }

    fn next(self) -> Field {
        Field::ALL[(self.index() + 1) % Field::ALL.len()]
    }

    fn prev(self) -> Field {
        Field::ALL[(self.index() + Field::ALL.len() - 1) % Field::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct PredictForm {
    pub total_sqft: String,
    pub price_per_sqft: String,
    pub bath: Option<u8>,
    pub balcony: Option<u8>,
    pub location: LocationMatcher,
    pub focus: Field,
}

impl PredictForm {
    pub fn new(catalog: Arc<Catalog>, mode: LocationMode) -> Self {
        Self {
            total_sqft: String::new(),
            price_per_sqft: String::new(),
            bath: None,
            balcony: None,
            location: LocationMatcher::new(catalog, mode),
            focus: Field::TotalSqft,
        }
    }

    /// Parses the raw inputs. Location membership is checked by `PredictionRequest::validate`.
    pub fn to_request(&self) -> Result<PredictionRequest> {
        Ok(PredictionRequest {
            total_sqft: parse_amount(Field::TotalSqft, &self.total_sqft)?,
            bath: self.bath.ok_or_else(|| missing(Field::Bath))?,
            balcony: self.balcony.ok_or_else(|| missing(Field::Balcony))?,
            price_per_sqft: parse_amount(Field::PricePerSqft, &self.price_per_sqft)?,
            location: self.location.value().to_string(),
        })
    }

    fn focus_next(&mut self) {
        self.location.dismiss();
        self.focus = self.focus.next();
    }

    fn focus_prev(&mut self) {
        self.location.dismiss();
        self.focus = self.focus.prev();
    }
}

fn missing(field: Field) -> AppError {
    AppError::InvalidField {
        field: field.label(),
        reason: "please select a value".into(),
    }
}

fn parse_amount(field: Field, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidField {
            field: field.label(),
            reason: "is required".into(),
        });
    }
    raw.parse::<f64>().map_err(|_| AppError::InvalidField {
        field: field.label(),
        reason: format!("\"{}\" is not a number", raw),
    })
}

fn cycle_option(options: &[u8], current: Option<u8>, forward: bool) -> Option<u8> {
    let pos = current.and_then(|v| options.iter().position(|&o| o == v));
    let next = match (pos, forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1).min(options.len() - 1),
        (Some(i), false) => i.saturating_sub(1),
    };
    options.get(next).copied()
}

/// Submit the form: validate locally, then ask the service.
pub fn run_prediction(
    request: &PredictionRequest,
    catalog: &Catalog,
    service: &dyn PredictionService,
) -> Result<PredictionResult> {
    if let Err(e) = request.validate(catalog) {
        warn!(error = %e, "prediction form rejected");
        return Err(e);
    }
    service.predict(request)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Submit,
    Quit,
}

pub struct App {
    pub screen: Screen,
    pub form: PredictForm,
    pub prediction: Option<PredictionResult>,
    pub loan: LoanParameters,
    pub schedule: Option<RepaymentSchedule>,
    pub table_state: TableState,
    pub notice: Option<Notice>,
    pub export_path: PathBuf,
    catalog: Arc<Catalog>,
    mode: LocationMode,
}

impl App {
    pub fn new(settings: &Settings) -> Self {
        Self {
            screen: Screen::Landing,
            form: PredictForm::new(settings.catalog.clone(), settings.location_mode),
            prediction: None,
            loan: LoanParameters::default(),
            schedule: None,
            table_state: TableState::default(),
            notice: None,
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            catalog: settings.catalog.clone(),
            mode: settings.location_mode,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice { kind: NoticeKind::Info, text: text.into() });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice { kind: NoticeKind::Error, text: text.into() });
    }

    /// Numbers for the result view, or `None` when nothing has been predicted.
    pub fn estimate(&self) -> Option<LoanEstimate> {
        self.prediction
            .as_ref()
            .filter(|p| check_price(p.predicted_price_lakhs).is_ok())
            .map(|p| LoanEstimate::compute(p.predicted_price_lakhs, self.loan))
    }

    /// Runs the debounce timer. Returns true when the view changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.form.location.poll(now)
    }

    pub fn submit(&mut self, service: &dyn PredictionService) {
        let request = match self.form.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "prediction form incomplete");
                self.error(e.user_message());
                return;
            }
        };
        match run_prediction(&request, &self.catalog, service) {
            Ok(result) => self.show_result(result),
            Err(e) => self.error(e.user_message()),
        }
    }

    /// Moves to the result view. A price the loan maths cannot use is dropped
    /// and reported like any other service failure.
    pub fn show_result(&mut self, result: PredictionResult) {
        if let Err(e) = check_price(result.predicted_price_lakhs) {
            warn!(error = %e, "prediction discarded");
            self.error(e.user_message());
            return;
        }
        info!(price_lakhs = result.predicted_price_lakhs, "showing prediction");
        self.prediction = Some(result);
        self.loan = LoanParameters::default();
        self.schedule = None;
        self.notice = None;
        self.screen = Screen::Result;
    }

    pub fn open_schedule(&mut self) {
        match self.prediction.as_ref().filter(|p| check_price(p.predicted_price_lakhs).is_ok()) {
            Some(p) => {
                self.schedule = Some(RepaymentSchedule::build(p.predicted_price_lakhs, &self.loan));
                self.table_state.select(Some(0));
                self.notice = None;
                self.screen = Screen::Schedule;
            }
            None => self.error(AppError::NoPrediction.user_message()),
        }
    }

    pub fn new_prediction(&mut self) {
        self.form = PredictForm::new(self.catalog.clone(), self.mode);
        self.notice = None;
        self.screen = Screen::Predict;
    }

    pub fn export_schedule(&mut self) {
        let Some(schedule) = &self.schedule else {
            return;
        };
        match schedule.export_to_csv(&self.export_path) {
            Ok(()) => {
                info!(path = %self.export_path.display(), "schedule exported");
                let msg = format!("Exported to {}", self.export_path.display());
                self.info(msg);
            }
            Err(e) => {
                warn!(error = %e, "schedule export failed");
                self.error(format!("Error exporting to CSV: {:#}", e));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }
        match self.screen {
            Screen::Landing => handle_landing_input(self, key),
            Screen::Predict => handle_predict_input(self, key, now),
            Screen::Result => handle_result_input(self, key),
            Screen::Schedule => handle_schedule_input(self, key),
        }
    }
}

fn handle_landing_input(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter | KeyCode::Char('p') | KeyCode::Char('l') | KeyCode::Right => {
            app.notice = None;
            app.screen = Screen::Predict;
            Action::None
        }
        KeyCode::Char('r') => {
            app.screen = Screen::Result;
            Action::None
        }
        KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}

fn handle_predict_input(app: &mut App, key: KeyEvent, now: Instant) -> Action {
    let form = &mut app.form;
    match key.code {
        KeyCode::Tab => {
            form.focus_next();
            return Action::None;
        }
        KeyCode::BackTab => {
            form.focus_prev();
            return Action::None;
        }
        _ => {}
    }

    let focus = form.focus;
    match focus {
        Field::Location => return handle_location_input(app, key, now),
        Field::TotalSqft | Field::PricePerSqft => {
            let text = if focus == Field::TotalSqft {
                &mut form.total_sqft
            } else {
                &mut form.price_per_sqft
            };
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => text.push(c),
                KeyCode::Backspace => {
                    text.pop();
                }
                _ => return handle_form_navigation(app, key),
            }
        }
        Field::Bath | Field::Balcony => {
            let (options, value): (&[u8], &mut Option<u8>) = if focus == Field::Bath {
                (&BATH_OPTIONS[..], &mut form.bath)
            } else {
                (&BALCONY_OPTIONS[..], &mut form.balcony)
            };
            match key.code {
                KeyCode::Right | KeyCode::Char('l') => *value = cycle_option(options, *value, true),
                KeyCode::Left | KeyCode::Char('h') => *value = cycle_option(options, *value, false),
                KeyCode::Char(c) => {
                    if let Some(n) = c.to_digit(10) {
                        let n = n as u8;
                        if options.contains(&n) {
                            *value = Some(n);
                        }
                    }
                }
                KeyCode::Backspace => *value = None,
                _ => return handle_form_navigation(app, key),
            }
        }
    }
    Action::None
}

fn handle_form_navigation(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Down => app.form.focus_next(),
        KeyCode::Up => app.form.focus_prev(),
        KeyCode::Enter => return Action::Submit,
        KeyCode::Esc => app.screen = Screen::Landing,
        _ => {}
    }
    Action::None
}

fn handle_location_input(app: &mut App, key: KeyEvent, now: Instant) -> Action {
    let matcher = &mut app.form.location;
    let closed = matcher.mode() == LocationMode::ClosedSelect;
    match key.code {
        KeyCode::Char(c) if !closed => matcher.push_char(c, now),
        KeyCode::Backspace if !closed => matcher.pop_char(now),
        KeyCode::Down | KeyCode::Up => {
            if !matcher.is_visible() {
                if key.code == KeyCode::Up {
                    app.form.focus_prev();
                    return Action::None;
                }
                matcher.open();
            }
            let direction = if key.code == KeyCode::Down { Direction::Down } else { Direction::Up };
            matcher.move_highlight(direction);
        }
        KeyCode::Enter if matcher.is_visible() => {
            matcher.commit_highlighted();
        }
        KeyCode::Esc if matcher.is_visible() => matcher.dismiss(),
        KeyCode::Enter => return Action::Submit,
        KeyCode::Esc => app.screen = Screen::Landing,
        _ => {}
    }
    Action::None
}

fn handle_result_input(app: &mut App, key: KeyEvent) -> Action {
    if app.prediction.is_none() {
        return match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('n') | KeyCode::Enter => {
                app.new_prediction();
                Action::None
            }
            KeyCode::Esc | KeyCode::Char('h') => {
                app.screen = Screen::Landing;
                Action::None
            }
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Action::Quit,
        KeyCode::Right | KeyCode::Char('l') => app.loan.next_term(),
        KeyCode::Left | KeyCode::Char('h') => app.loan.prev_term(),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('+') => app.loan.raise_rate(),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('-') => app.loan.lower_rate(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.open_schedule(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.new_prediction(),
        KeyCode::Esc => app.screen = Screen::Landing,
        _ => {}
    }
    Action::None
}

fn handle_schedule_input(app: &mut App, key: KeyEvent) -> Action {
    let len = app.schedule.as_ref().map_or(0, |s| s.rows.len());
    let current = app.table_state.selected().unwrap_or(0);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Action::Quit,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => app.screen = Screen::Result,
        KeyCode::Char('e') | KeyCode::Char('E') => app.export_schedule(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.table_state.select(Some((current + 12).min(len.saturating_sub(1))));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.table_state.select(Some(current.saturating_sub(12)));
        }
        KeyCode::PageDown => {
            app.table_state.select(Some((current + 12).min(len.saturating_sub(1))));
        }
        KeyCode::PageUp => {
            app.table_state.select(Some(current.saturating_sub(12)));
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if current + 1 < len {
                app.table_state.select(Some(current + 1));
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.table_state.select(Some(current.saturating_sub(1)));
        }
        KeyCode::Char('g') => app.table_state.select(Some(0)),
        KeyCode::Char('G') => {
            if len > 0 {
                app.table_state.select(Some(len - 1));
            }
        }
        _ => {}
    }
    Action::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    struct FakeService {
        calls: Cell<usize>,
        response: Option<f64>,
    }

    impl FakeService {
        fn returning(price: f64) -> Self {
            Self { calls: Cell::new(0), response: Some(price) }
        }

        fn failing() -> Self {
            Self { calls: Cell::new(0), response: None }
        }
    }

    impl PredictionService for FakeService {
        fn predict(&self, _request: &PredictionRequest) -> Result<PredictionResult> {
            self.calls.set(self.calls.get() + 1);
            match self.response {
                Some(price) => Ok(PredictionResult { predicted_price_lakhs: price, shap_values: vec![] }),
                None => Err(AppError::Status(500)),
            }
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
    }

    fn filled_app(location: &str) -> App {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Predict;
        app.form.total_sqft = "1200".into();
        app.form.price_per_sqft = "7500".into();
        app.form.bath = Some(2);
        app.form.balcony = Some(1);
        app.form.location.commit_value(location);
        app
    }

    #[test]
    fn unknown_location_is_rejected_before_network() {
        let mut app = filled_app("Nowhereville");
        let service = FakeService::returning(50.0);
        app.submit(&service);
        assert_eq!(service.calls.get(), 0);
        assert_eq!(app.screen, Screen::Predict);
        assert_eq!(app.form.location.value(), "Nowhereville");
        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.text.contains("valid location"));
    }

    #[test]
    fn successful_submit_moves_to_result() {
        let mut app = filled_app("Whitefield");
        let service = FakeService::returning(50.0);
        app.submit(&service);
        assert_eq!(service.calls.get(), 1);
        assert_eq!(app.screen, Screen::Result);
        let estimate = app.estimate().unwrap();
        assert_eq!(estimate.emi, 46_607);
    }

    #[test]
    fn transport_failure_keeps_form() {
        let mut app = filled_app("Hebbal");
        let service = FakeService::failing();
        app.submit(&service);
        assert_eq!(service.calls.get(), 1);
        assert_eq!(app.screen, Screen::Predict);
        assert!(app.prediction.is_none());
        assert!(app.notice.unwrap().text.starts_with("Something went wrong"));
    }

    #[test]
    fn zero_or_negative_price_is_not_shown() {
        for price in [0.0, -5.0] {
            let mut app = filled_app("Whitefield");
            let service = FakeService::returning(price);
            app.submit(&service);
            assert_eq!(service.calls.get(), 1);
            assert_eq!(app.screen, Screen::Predict, "price {}", price);
            assert!(app.prediction.is_none());
            assert!(app.estimate().is_none());
            assert!(app.notice.clone().unwrap().text.starts_with("Something went wrong"));
        }
    }

    #[test]
    fn estimate_skips_an_unusable_stored_price() {
        let mut app = App::new(&Settings::default());
        app.prediction = Some(PredictionResult { predicted_price_lakhs: -5.0, shap_values: vec![] });
        assert!(app.estimate().is_none());
        app.open_schedule();
        assert!(app.schedule.is_none());
    }

    #[test]
    fn location_is_matched_exactly_as_entered() {
        let mut app = filled_app("Whitefield ");
        let service = FakeService::returning(50.0);
        app.submit(&service);
        assert_eq!(service.calls.get(), 0);
        assert_eq!(app.screen, Screen::Predict);
        assert!(app.notice.unwrap().text.contains("valid location"));
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut app = filled_app("Hebbal");
        app.form.bath = None;
        let service = FakeService::returning(10.0);
        app.submit(&service);
        assert_eq!(service.calls.get(), 0);
        assert!(app.notice.unwrap().text.contains("Bathrooms"));
    }

    #[test]
    fn result_without_prediction_computes_nothing() {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Result;
        assert!(app.estimate().is_none());
        // rate keys do nothing without a price
        app.handle_key(key(KeyCode::Up), Instant::now());
        assert_eq!(app.loan, LoanParameters::default());
        app.open_schedule();
        assert!(app.schedule.is_none());
    }

    #[test]
    fn result_keys_recompute_emi() {
        let mut app = filled_app("Whitefield");
        app.submit(&FakeService::returning(50.0));
        let before = app.estimate().unwrap().emi;
        app.handle_key(key(KeyCode::Up), Instant::now());
        let higher_rate = app.estimate().unwrap().emi;
        assert!(higher_rate > before);
        app.handle_key(key(KeyCode::Right), Instant::now());
        let longer_term = app.estimate().unwrap().emi;
        assert!(longer_term < higher_rate);
        assert_eq!(app.loan.term_years(), 25);
    }

    #[test]
    fn location_typing_filters_after_debounce() {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Predict;
        app.form.focus = Field::Location;
        let t0 = Instant::now();
        type_text(&mut app, "koram", t0);
        assert!(app.form.location.is_visible());
        assert!(!app.tick(t0 + Duration::from_millis(50)));
        assert!(app.tick(t0 + Duration::from_millis(250)));
        assert_eq!(app.form.location.suggestions().collect::<Vec<_>>(), vec!["Koramangala"]);

        app.handle_key(key(KeyCode::Down), t0);
        assert_eq!(app.handle_key(key(KeyCode::Enter), t0), Action::None);
        assert_eq!(app.form.location.value(), "Koramangala");
        assert!(!app.form.location.is_visible());

        // list closed, so Enter now submits
        assert_eq!(app.handle_key(key(KeyCode::Enter), t0), Action::Submit);
    }

    #[test]
    fn select_fields_cycle_and_clamp() {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Predict;
        app.form.focus = Field::Balcony;
        app.handle_key(key(KeyCode::Right), Instant::now());
        assert_eq!(app.form.balcony, Some(0));
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Right), Instant::now());
        }
        assert_eq!(app.form.balcony, Some(3));
        app.handle_key(key(KeyCode::Char('9')), Instant::now());
        assert_eq!(app.form.balcony, Some(3));
        app.handle_key(key(KeyCode::Char('1')), Instant::now());
        assert_eq!(app.form.balcony, Some(1));
    }

    #[test]
    fn numeric_fields_accept_only_numbers() {
        let mut app = App::new(&Settings::default());
        app.screen = Screen::Predict;
        type_text(&mut app, "12a0.5", Instant::now());
        assert_eq!(app.form.total_sqft, "120.5");
        app.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(app.form.focus, Field::PricePerSqft);
    }

    #[test]
    fn schedule_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = filled_app("Whitefield");
        app.submit(&FakeService::returning(25.0));
        app.export_path = dir.path().join("schedule.csv");
        app.handle_key(key(KeyCode::Char('s')), Instant::now());
        assert_eq!(app.screen, Screen::Schedule);
        app.handle_key(key(KeyCode::Char('G')), Instant::now());
        assert_eq!(app.table_state.selected(), Some(239));
        app.handle_key(key(KeyCode::Char('e')), Instant::now());
        assert_eq!(app.notice.as_ref().unwrap().kind, NoticeKind::Info);
        let text = std::fs::read_to_string(dir.path().join("schedule.csv")).unwrap();
        assert!(text.starts_with("Month,Payment"));
    }
}
