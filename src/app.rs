use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;

use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use healthai_core::metrics;
use healthai_core::prompt::{
    Cuisine, DietGoal, DietRequest, DietaryRestriction, Equipment, FitnessLevel, Intensity,
    WorkoutRequest, WorkoutType, YogaFocus, YogaRequest, CALORIE_RANGE, WORKOUT_MINUTES,
    YOGA_MINUTES,
};
use healthai_core::{
    Choice, CompletionResult, Config, GroqClient, Orchestrator, PendingTurn, PromptRequest, Reply,
    Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Dashboard,
    Diet,
    Workout,
    Yoga,
    Coach,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Dashboard,
        Screen::Diet,
        Screen::Workout,
        Screen::Yoga,
        Screen::Coach,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Diet => "Diet Planner",
            Screen::Workout => "Workout Generator",
            Screen::Yoga => "Yoga Advisor",
            Screen::Coach => "AI Coach",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Screen {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Screen {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// One line of a form as the UI draws it.
pub struct FormRow {
    pub label: &'static str,
    pub value: String,
}

/// Keyboard-driven form: a focused row that can be adjusted or toggled.
pub trait Form {
    fn rows(&self) -> Vec<FormRow>;
    fn focus(&self) -> usize;
    fn set_focus(&mut self, focus: usize);
    /// Left/right on the focused row.
    fn adjust(&mut self, delta: i32);
    /// Space on the focused row; only multi-select rows react.
    fn toggle(&mut self) {}

    fn move_focus(&mut self, delta: i32) {
        let len = self.rows().len() as i32;
        if len > 0 {
            let next = (self.focus() as i32 + delta).clamp(0, len - 1);
            self.set_focus(next as usize);
        }
    }
}

fn cycle<T: Choice + PartialEq>(current: T, delta: i32) -> T {
    let all = T::ALL;
    let len = all.len() as i32;
    let i = all.iter().position(|c| *c == current).unwrap_or(0) as i32;
    all[(i + delta).rem_euclid(len) as usize]
}

fn step(value: u32, delta: i32, step: u32, range: &RangeInclusive<u32>) -> u32 {
    let next = value as i64 + delta as i64 * step as i64;
    next.clamp(*range.start() as i64, *range.end() as i64) as u32
}

/// Multi-select over a `Choice` enum with its own cursor.
pub struct MultiSelect<T: Choice + Ord> {
    pub selected: BTreeSet<T>,
    pub cursor: usize,
}

impl<T: Choice + Ord> MultiSelect<T> {
    fn new() -> Self {
        Self {
            selected: BTreeSet::new(),
            cursor: 0,
        }
    }

    fn move_cursor(&mut self, delta: i32) {
        let len = T::ALL.len() as i32;
        self.cursor = (self.cursor as i32 + delta).rem_euclid(len) as usize;
    }

    fn toggle(&mut self) {
        if let Some(&item) = T::ALL.get(self.cursor) {
            if !self.selected.remove(&item) {
                self.selected.insert(item);
            }
        }
    }

    fn display(&self) -> String {
        T::ALL
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mark = if self.selected.contains(item) { "x" } else { " " };
                let entry = format!("[{}] {}", mark, item.label());
                if i == self.cursor {
                    format!(">{}<", entry)
                } else {
                    entry
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

pub struct DietForm {
    pub goal: DietGoal,
    pub restrictions: MultiSelect<DietaryRestriction>,
    pub calorie_target: u32,
    pub cuisine: Cuisine,
    focus: usize,
}

impl Default for DietForm {
    fn default() -> Self {
        Self {
            goal: DietGoal::WeightLoss,
            restrictions: MultiSelect::new(),
            calorie_target: 2000,
            cuisine: Cuisine::Any,
            focus: 0,
        }
    }
}

impl DietForm {
    pub fn request(&self) -> PromptRequest {
        PromptRequest::Diet(DietRequest {
            goal: self.goal,
            restrictions: self.restrictions.selected.clone(),
            calorie_target: self.calorie_target,
            cuisine: self.cuisine,
        })
    }
}

impl Form for DietForm {
    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow { label: "Primary Goal", value: self.goal.to_string() },
            FormRow { label: "Restrictions", value: self.restrictions.display() },
            FormRow { label: "Daily Calories", value: format!("{} kcal", self.calorie_target) },
            FormRow { label: "Cuisine", value: self.cuisine.to_string() },
        ]
    }

    fn focus(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, focus: usize) {
        self.focus = focus;
    }

    fn adjust(&mut self, delta: i32) {
        match self.focus {
            0 => self.goal = cycle(self.goal, delta),
            1 => self.restrictions.move_cursor(delta),
            2 => self.calorie_target = step(self.calorie_target, delta, 50, &CALORIE_RANGE),
            _ => self.cuisine = cycle(self.cuisine, delta),
        }
    }

    fn toggle(&mut self) {
        if self.focus == 1 {
            self.restrictions.toggle();
        }
    }
}

pub struct WorkoutForm {
    pub fitness_level: FitnessLevel,
    pub workout_type: WorkoutType,
    pub equipment: MultiSelect<Equipment>,
    pub duration_minutes: u32,
    focus: usize,
}

impl Default for WorkoutForm {
    fn default() -> Self {
        Self {
            fitness_level: FitnessLevel::Beginner,
            workout_type: WorkoutType::FullBody,
            equipment: MultiSelect::new(),
            duration_minutes: 45,
            focus: 0,
        }
    }
}

impl WorkoutForm {
    pub fn request(&self) -> PromptRequest {
        PromptRequest::Workout(WorkoutRequest {
            fitness_level: self.fitness_level,
            workout_type: self.workout_type,
            equipment: self.equipment.selected.clone(),
            duration_minutes: self.duration_minutes,
        })
    }
}

impl Form for WorkoutForm {
    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow { label: "Fitness Level", value: self.fitness_level.to_string() },
            FormRow { label: "Workout Type", value: self.workout_type.to_string() },
            FormRow { label: "Equipment", value: self.equipment.display() },
            FormRow { label: "Duration", value: format!("{} min", self.duration_minutes) },
        ]
    }

    fn focus(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, focus: usize) {
        self.focus = focus;
    }

    fn adjust(&mut self, delta: i32) {
        match self.focus {
            0 => self.fitness_level = cycle(self.fitness_level, delta),
            1 => self.workout_type = cycle(self.workout_type, delta),
            2 => self.equipment.move_cursor(delta),
            _ => self.duration_minutes = step(self.duration_minutes, delta, 5, &WORKOUT_MINUTES),
        }
    }

    fn toggle(&mut self) {
        if self.focus == 2 {
            self.equipment.toggle();
        }
    }
}

pub struct YogaForm {
    pub focus_area: YogaFocus,
    pub experience_level: FitnessLevel,
    pub duration_minutes: u32,
    pub intensity: Intensity,
    focus: usize,
}

impl Default for YogaForm {
    fn default() -> Self {
        Self {
            focus_area: YogaFocus::StressRelief,
            experience_level: FitnessLevel::Beginner,
            duration_minutes: 30,
            intensity: Intensity::Gentle,
            focus: 0,
        }
    }
}

impl YogaForm {
    pub fn request(&self) -> PromptRequest {
        PromptRequest::Yoga(YogaRequest {
            focus: self.focus_area,
            experience_level: self.experience_level,
            duration_minutes: self.duration_minutes,
            intensity: self.intensity,
        })
    }
}

impl Form for YogaForm {
    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow { label: "Session Focus", value: self.focus_area.to_string() },
            FormRow { label: "Experience", value: self.experience_level.to_string() },
            FormRow { label: "Duration", value: format!("{} min", self.duration_minutes) },
            FormRow { label: "Intensity", value: self.intensity.to_string() },
        ]
    }

    fn focus(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, focus: usize) {
        self.focus = focus;
    }

    fn adjust(&mut self, delta: i32) {
        match self.focus {
            0 => self.focus_area = cycle(self.focus_area, delta),
            1 => self.experience_level = cycle(self.experience_level, delta),
            2 => self.duration_minutes = step(self.duration_minutes, delta, 5, &YOGA_MINUTES),
            _ => self.intensity = cycle(self.intensity, delta),
        }
    }
}

pub struct BodyMetricsForm {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub bmi: Option<f64>,
    focus: usize,
}

impl Default for BodyMetricsForm {
    fn default() -> Self {
        Self {
            weight_kg: 65.0,
            height_cm: 170.0,
            bmi: None,
            focus: 0,
        }
    }
}

impl BodyMetricsForm {
    pub fn calculate(&mut self) {
        self.bmi = Some(metrics::bmi(self.weight_kg, self.height_cm));
    }
}

impl Form for BodyMetricsForm {
    fn rows(&self) -> Vec<FormRow> {
        vec![
            FormRow { label: "Weight", value: format!("{:.1} kg", self.weight_kg) },
            FormRow { label: "Height", value: format!("{:.1} cm", self.height_cm) },
        ]
    }

    fn focus(&self) -> usize {
        self.focus
    }

    fn set_focus(&mut self, focus: usize) {
        self.focus = focus;
    }

    fn adjust(&mut self, delta: i32) {
        match self.focus {
            0 => self.weight_kg = (self.weight_kg + delta as f64 * 0.5).clamp(30.0, 200.0),
            _ => self.height_cm = (self.height_cm + delta as f64).clamp(100.0, 250.0),
        }
    }
}

/// The completion currently being awaited, and where its reply goes.
pub struct InFlight {
    pub screen: Screen,
    pub turn: PendingTurn,
    pub task: JoinHandle<CompletionResult>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Forms
    pub metrics_form: BodyMetricsForm,
    pub diet_form: DietForm,
    pub workout_form: WorkoutForm,
    pub yoga_form: YogaForm,

    // Latest reply per planner screen
    pub replies: HashMap<Screen, Reply>,
    pub output_scroll: u16,

    // Coach state
    pub chat_input: String,
    pub chat_cursor: usize,
    pub coach_error: Option<String>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Completion in progress
    pub in_flight: Option<InFlight>,
    pub animation_frame: u8,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,

    pub session: Session,
    pub orchestrator: Orchestrator,
}

impl App {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Dashboard,
            input_mode: InputMode::Normal,

            metrics_form: BodyMetricsForm::default(),
            diet_form: DietForm::default(),
            workout_form: WorkoutForm::default(),
            yoga_form: YogaForm::default(),

            replies: HashMap::new(),
            output_scroll: 0,

            chat_input: String::new(),
            chat_cursor: 0,
            coach_error: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            in_flight: None,
            animation_frame: 0,

            show_model_picker: false,
            available_models: GroqClient::list_models(),
            model_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,

            session: Session::new(),
            orchestrator,
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        self.output_scroll = 0;
    }

    pub fn active_form(&self) -> Option<&dyn Form> {
        match self.screen {
            Screen::Dashboard => Some(&self.metrics_form),
            Screen::Diet => Some(&self.diet_form),
            Screen::Workout => Some(&self.workout_form),
            Screen::Yoga => Some(&self.yoga_form),
            Screen::Coach => None,
        }
    }

    pub fn active_form_mut(&mut self) -> Option<&mut dyn Form> {
        match self.screen {
            Screen::Dashboard => Some(&mut self.metrics_form),
            Screen::Diet => Some(&mut self.diet_form),
            Screen::Workout => Some(&mut self.workout_form),
            Screen::Yoga => Some(&mut self.yoga_form),
            Screen::Coach => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn loading_screen(&self) -> Option<Screen> {
        self.in_flight.as_ref().map(|f| f.screen)
    }

    /// Generate a plan for the current planner screen.
    pub fn submit_plan(&mut self) {
        let request = match self.screen {
            Screen::Diet => self.diet_form.request(),
            Screen::Workout => self.workout_form.request(),
            Screen::Yoga => self.yoga_form.request(),
            Screen::Dashboard => {
                self.metrics_form.calculate();
                return;
            }
            Screen::Coach => return,
        };
        if self.is_loading() {
            return;
        }
        self.replies.remove(&self.screen);
        self.output_scroll = 0;
        self.start(self.screen, request);
    }

    /// Send the coach input line as a free-form turn.
    pub fn submit_chat(&mut self) {
        if self.is_loading() {
            return;
        }
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.coach_error = None;
        self.start(Screen::Coach, PromptRequest::freeform(&text));
        self.scroll_chat_to_bottom();
    }

    /// One completion at a time per session.
    fn start(&mut self, screen: Screen, request: PromptRequest) {
        if self.in_flight.is_some() {
            warn!("completion already in progress; ignoring submit");
            return;
        }

        let turn = self.orchestrator.begin(&mut self.session, &request);
        info!(screen = screen.title(), "submitting request");

        let task_turn = turn.clone();
        let task = tokio::spawn(async move { task_turn.run().await });
        self.in_flight = Some(InFlight { screen, turn, task });
    }

    /// Collect a finished completion, if any. Called once per loop iteration.
    pub async fn poll_completion(&mut self) {
        let finished = self
            .in_flight
            .as_ref()
            .map(|f| f.task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        let reply = match in_flight.task.await {
            Ok(result) => self.orchestrator.finish(&mut self.session, in_flight.turn, result),
            Err(e) => Reply::Error(format!("Error: completion task failed: {}", e)),
        };

        match in_flight.screen {
            Screen::Coach => {
                if reply.is_error() {
                    self.coach_error = Some(reply.text().to_string());
                }
                self.scroll_chat_to_bottom();
            }
            screen => {
                self.replies.insert(screen, reply);
            }
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_output_down(&mut self) {
        self.output_scroll = self.output_scroll.saturating_add(3);
    }

    pub fn scroll_output_up(&mut self) {
        self.output_scroll = self.output_scroll.saturating_sub(3);
    }

    /// Scroll chat to bottom so the newest turn is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.all() {
            total_lines += 1; // role line
            for line in msg.content().lines() {
                let char_count = line.chars().count();
                total_lines += (char_count / wrap_width) + 1;
            }
            total_lines += 1; // blank line after message
        }
        if self.is_loading() || self.coach_error.is_some() {
            total_lines += 2;
        }

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        let current = self.orchestrator.client().model().to_string();
        if !self.available_models.contains(&current) {
            self.available_models.insert(0, current.clone());
        }
        let index = self.available_models.iter().position(|m| *m == current);
        self.model_picker_state.select(index.or(Some(0)));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i).cloned() {
                self.orchestrator.set_model(&model);
                self.show_model_picker = false;
                info!(model = %model, "model selected");
                if let Err(e) = Config::save_model(&model) {
                    warn!(error = %e, "could not save model to config");
                }
            }
        }
    }

    // API key methods
    pub fn open_api_key_input(&mut self) {
        self.show_api_key_input = true;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    /// Session-only: the key is never written to disk.
    pub fn apply_api_key(&mut self) {
        self.session.set_api_key(&self.api_key_input);
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn key_source_label(&self) -> &'static str {
        self.orchestrator.credential_source(&self.session).as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthai_core::{ChatMessage, CredentialResolver, SecretStore};

    fn app() -> App {
        App::new(Orchestrator::new(
            CredentialResolver::new(SecretStore::empty()),
            GroqClient::new("gsk_test").with_base_url("http://127.0.0.1:1"),
        ))
    }

    #[test]
    fn test_screen_cycle_wraps() {
        assert_eq!(Screen::Coach.next(), Screen::Dashboard);
        assert_eq!(Screen::Dashboard.prev(), Screen::Coach);
        assert_eq!(Screen::Diet.next(), Screen::Workout);
    }

    #[test]
    fn test_numeric_fields_are_clamped() {
        let mut form = DietForm::default();
        form.set_focus(2);
        for _ in 0..100 {
            form.adjust(1);
        }
        assert_eq!(form.calorie_target, 3000);
        for _ in 0..100 {
            form.adjust(-1);
        }
        assert_eq!(form.calorie_target, 1200);

        let mut yoga = YogaForm::default();
        yoga.set_focus(2);
        yoga.adjust(-10);
        assert_eq!(yoga.duration_minutes, 10);
    }

    #[test]
    fn test_choice_fields_wrap_around() {
        let mut form = WorkoutForm::default();
        form.adjust(-1);
        assert_eq!(form.fitness_level, FitnessLevel::Advanced);
        form.adjust(1);
        assert_eq!(form.fitness_level, FitnessLevel::Beginner);
    }

    #[test]
    fn test_multiselect_toggle_builds_request() {
        let mut form = WorkoutForm::default();
        form.move_focus(2);
        assert_eq!(form.focus(), 2);
        form.toggle();
        form.adjust(3);
        form.toggle();

        match form.request() {
            PromptRequest::Workout(r) => {
                let expected: BTreeSet<Equipment> =
                    [Equipment::Dumbbells, Equipment::Barbell].into_iter().collect();
                assert_eq!(r.equipment, expected);
            }
            other => panic!("unexpected request {:?}", other),
        }

        form.toggle();
        assert!(!form.equipment.selected.contains(&Equipment::Barbell));
    }

    #[test]
    fn test_focus_stays_in_bounds() {
        let mut form = YogaForm::default();
        form.move_focus(10);
        assert_eq!(form.focus(), 3);
        form.move_focus(-10);
        assert_eq!(form.focus(), 0);
    }

    #[test]
    fn test_api_key_is_session_only() {
        let mut app = app();
        app.open_api_key_input();
        app.api_key_input = "gsk_typed".to_string();
        app.apply_api_key();
        assert_eq!(app.session.api_key(), Some("gsk_typed"));
        assert_eq!(app.key_source_label(), "session");
        assert!(!app.show_api_key_input);
    }

    #[test]
    fn test_long_chat_scroll_saturates() {
        let mut app = app();
        app.chat_width = 1;
        app.chat_height = 10;
        let reply = "x".repeat(4000);
        for _ in 0..20 {
            app.session.append(ChatMessage::user("more?"));
            app.session.append(ChatMessage::assistant(&reply));
        }

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }

    #[test]
    fn test_dashboard_enter_calculates_bmi() {
        let mut app = app();
        app.submit_plan();
        let bmi = app.metrics_form.bmi.unwrap();
        assert!((bmi - 22.49).abs() < 0.01);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_chat_failure_records_only_user_turn() {
        let mut app = app();
        app.screen = Screen::Coach;
        app.chat_input = "hello".to_string();
        app.submit_chat();
        assert!(app.is_loading());
        assert_eq!(app.session.len(), 1);

        // A second submit while one is in flight is ignored and keeps its text.
        app.chat_input = "again".to_string();
        app.submit_chat();
        assert_eq!(app.session.len(), 1);
        assert_eq!(app.chat_input, "again");

        while app.is_loading() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            app.poll_completion().await;
        }
        assert_eq!(app.session.len(), 1);
        assert!(app.coach_error.as_deref().unwrap_or_default().starts_with("Error: "));
    }
}
