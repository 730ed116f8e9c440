use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::predict::{
    coerce_features, fallback_prediction, predict_or_fallback, ModelKind, Outcome,
};

/// Measurement field labels, in feature-vector order.
pub const FIELD_LABELS: [&str; 4] = [
    "Sepal Length",
    "Sepal Width",
    "Petal Length",
    "Petal Width",
];

/// Default measurements: a known Iris setosa sample.
const SEED_FEATURES: [&str; 4] = ["5.1", "3.5", "1.4", "0.2"];

/// How long a status message stays in the info line.
const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Measurements,
    Model,
}

/// A settled prediction request, tagged with the token it was issued under.
#[derive(Debug)]
pub struct Settlement {
    pub token: u64,
    pub outcome: Outcome,
}

pub struct App {
    pub section: Section,

    // Form state: four textual measurement fields plus the model toggle.
    pub features: [String; 4],
    pub selected_field: usize,
    pub model: ModelKind,

    // Prediction state
    pub loading: bool,
    pub result: Option<Outcome>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub show_help: bool,

    // Monotonic token so only the most recently issued request commits.
    request_token: u64,
    settlements_tx: UnboundedSender<Settlement>,
    settlements_rx: UnboundedReceiver<Settlement>,
}

impl App {
    pub fn new() -> Self {
        let (settlements_tx, settlements_rx) = mpsc::unbounded_channel();
        Self {
            section: Section::Measurements,
            features: SEED_FEATURES.map(String::from),
            selected_field: 0,
            model: ModelKind::default(),
            loading: false,
            result: None,
            status_message: None,
            status_message_time: None,
            show_help: false,
            request_token: 0,
            settlements_tx,
            settlements_rx,
        }
    }

    /// Set a status message (auto-clears after a few seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return Ok(());
        }

        match key.code {
            // Section cycling
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Measurements => Section::Model,
                    Section::Model => Section::Measurements,
                };
            }

            // Field navigation
            KeyCode::Down => self.move_down(),
            KeyCode::Up => self.move_up(),

            // Predict from anywhere
            KeyCode::Enter => self.trigger_predict(),

            KeyCode::F(1) => self.show_help = true,

            // Model toggle; in the measurements section every printable
            // character belongs to the focused field instead.
            KeyCode::Left | KeyCode::Right => {
                if self.section == Section::Model {
                    self.model = self.model.toggled();
                }
            }

            KeyCode::Char(c) => match self.section {
                Section::Measurements => {
                    self.features[self.selected_field].push(c);
                }
                Section::Model => match c {
                    ' ' | 'm' => self.model = self.model.toggled(),
                    '?' => self.show_help = true,
                    _ => {}
                },
            },

            KeyCode::Backspace => {
                if self.section == Section::Measurements {
                    self.features[self.selected_field].pop();
                }
            }

            _ => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        if self.section == Section::Measurements {
            self.selected_field = (self.selected_field + 1) % FIELD_LABELS.len();
        }
    }

    fn move_up(&mut self) {
        if self.section == Section::Measurements {
            self.selected_field = self
                .selected_field
                .checked_sub(1)
                .unwrap_or(FIELD_LABELS.len() - 1);
        }
    }

    /// Issue a new request token and mark the app as loading.
    fn begin_request(&mut self) -> u64 {
        self.request_token += 1;
        self.loading = true;
        self.request_token
    }

    /// Kick off a prediction for the current form contents. Repeated triggers
    /// while a request is pending are allowed; older settlements lose.
    pub fn trigger_predict(&mut self) {
        let token = self.begin_request();
        let features = coerce_features(&self.features);
        let model = self.model;
        let tx = self.settlements_tx.clone();
        tracing::debug!("issuing prediction request {}", token);
        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || predict_or_fallback(features, model))
                .await
                .unwrap_or_else(|e| Outcome::Fallback {
                    prediction: fallback_prediction(),
                    reason: format!("prediction worker panicked: {}", e),
                });
            // Receiver gone means the app is shutting down.
            let _ = tx.send(Settlement { token, outcome });
        });
    }

    /// Drain settled requests and expire the status message. Called once per
    /// event-loop iteration.
    pub fn tick(&mut self) {
        while let Ok(settlement) = self.settlements_rx.try_recv() {
            self.commit(settlement);
        }

        if let Some(time) = self.status_message_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Commit a settlement unless a newer request has been issued since.
    fn commit(&mut self, settlement: Settlement) {
        if settlement.token != self.request_token {
            tracing::debug!(
                "dropping stale settlement for request {} (current {})",
                settlement.token,
                self.request_token
            );
            return;
        }
        self.loading = false;
        if let Outcome::Fallback { reason, .. } = &settlement.outcome {
            self.set_status(format!("Backend unavailable, showing fallback: {}", reason));
        }
        self.result = Some(settlement.outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{Prediction, Species, FALLBACK_PROBABILITIES};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
    }

    fn outcome(species: Species, probabilities: Vec<f64>) -> Outcome {
        Outcome::Predicted(Prediction {
            species,
            probabilities,
        })
    }

    #[tokio::test]
    async fn editing_touches_only_the_focused_field() {
        let mut app = App::new();
        let before = app.features.clone();

        app.handle_key(key(KeyCode::Down)).await.unwrap();
        type_text(&mut app, "99").await;

        assert_eq!(app.features[0], before[0]);
        assert_eq!(app.features[1], format!("{}99", before[1]));
        assert_eq!(app.features[2], before[2]);
        assert_eq!(app.features[3], before[3]);

        app.handle_key(key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.features[1], format!("{}9", before[1]));
        assert_eq!(app.features[0], before[0]);
    }

    #[tokio::test]
    async fn fields_accept_non_numeric_text() {
        let mut app = App::new();
        app.features[0].clear();
        type_text(&mut app, "not a number").await;
        assert_eq!(app.features[0], "not a number");
    }

    #[tokio::test]
    async fn model_toggle_leaves_measurements_alone() {
        let mut app = App::new();
        let before = app.features.clone();

        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.section, Section::Model);
        app.handle_key(key(KeyCode::Right)).await.unwrap();
        assert_eq!(app.model, ModelKind::DecisionTree);
        app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
        assert_eq!(app.model, ModelKind::Logistic);

        assert_eq!(app.features, before);
    }

    #[tokio::test]
    async fn field_navigation_wraps() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Up)).await.unwrap();
        assert_eq!(app.selected_field, 3);
        app.handle_key(key(KeyCode::Down)).await.unwrap();
        assert_eq!(app.selected_field, 0);
    }

    #[test]
    fn loading_spans_trigger_to_settlement() {
        let mut app = App::new();
        assert!(!app.loading);

        let token = app.begin_request();
        assert!(app.loading);

        app.commit(Settlement {
            token,
            outcome: outcome(Species::Setosa, vec![0.97, 0.02, 0.01]),
        });
        assert!(!app.loading);
        let prediction = app.result.as_ref().unwrap().prediction();
        assert_eq!(prediction.species.label(), "Setosa");
        assert_eq!(prediction.confidence_percent(), "97.0%");
    }

    #[test]
    fn stale_settlement_is_dropped() {
        let mut app = App::new();
        let first = app.begin_request();
        let second = app.begin_request();

        // The newer request settles first and wins.
        app.commit(Settlement {
            token: second,
            outcome: outcome(Species::Virginica, vec![0.1, 0.2, 0.7]),
        });
        assert!(!app.loading);

        // The abandoned first request settles later; nothing changes.
        app.commit(Settlement {
            token: first,
            outcome: outcome(Species::Setosa, vec![0.9, 0.05, 0.05]),
        });
        let prediction = app.result.as_ref().unwrap().prediction();
        assert_eq!(prediction.species, Species::Virginica);
    }

    #[test]
    fn older_request_does_not_clear_loading_for_newer_one() {
        let mut app = App::new();
        let first = app.begin_request();
        let _second = app.begin_request();

        app.commit(Settlement {
            token: first,
            outcome: outcome(Species::Setosa, vec![0.9, 0.05, 0.05]),
        });
        // Still waiting on the newer request.
        assert!(app.loading);
        assert!(app.result.is_none());
    }

    #[test]
    fn fallback_commit_surfaces_a_status_message() {
        let mut app = App::new();
        let token = app.begin_request();
        app.commit(Settlement {
            token,
            outcome: Outcome::Fallback {
                prediction: Prediction {
                    species: Species::Versicolor,
                    probabilities: FALLBACK_PROBABILITIES.to_vec(),
                },
                reason: "request failed: connection refused".to_string(),
            },
        });
        assert!(app.status_message.as_deref().unwrap().contains("fallback"));
        let result = app.result.as_ref().unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.prediction().confidence_percent(), "80.0%");
    }

    // Full pipeline against the fixed endpoint. Nothing listens on the
    // backend port in the test environment, so this exercises the fallback
    // path end to end: trigger, settle, commit, loading cleared.
    #[tokio::test(flavor = "multi_thread")]
    async fn trigger_settles_even_without_a_backend() {
        let mut app = App::new();
        app.trigger_predict();
        app.trigger_predict(); // rapid double-trigger must not break anything
        assert!(app.loading);

        let deadline = Instant::now() + Duration::from_secs(10);
        while app.result.is_none() && Instant::now() < deadline {
            app.tick();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let result = app.result.as_ref().expect("request never settled");
        assert!(!app.loading);
        if result.is_fallback() {
            assert_eq!(
                result.prediction().probabilities,
                FALLBACK_PROBABILITIES.to_vec()
            );
        }
    }
}
