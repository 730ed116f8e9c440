mod app;
mod predict;
mod theme;
mod ui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Section};
use predict::ModelKind;

#[derive(Parser, Debug)]
#[command(name = "ayame")]
#[command(version = "0.1.0")]
#[command(about = "A terminal-friendly iris species prediction client")]
struct Args {
    /// Predict once for four comma-separated measurements and print JSON
    #[arg(short, long, value_name = "SL,SW,PL,PW")]
    features: Option<String>,

    /// Model to use: "logistic" or "decision_tree"
    #[arg(short, long, default_value = "logistic")]
    model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let Some(model) = ModelKind::from_wire(&args.model) else {
        bail!(
            "unknown model '{}'; expected 'logistic' or 'decision_tree'",
            args.model
        );
    };

    // One-shot CLI mode
    if let Some(list) = args.features {
        return predict_once(&list, model).await;
    }

    // Run TUI
    run_tui(model).await
}

/// Perform a single prediction and print the outcome as JSON.
async fn predict_once(list: &str, model: ModelKind) -> Result<()> {
    let features = parse_feature_list(list)?;
    let outcome =
        tokio::task::spawn_blocking(move || predict::predict_or_fallback(features, model))
            .await
            .context("prediction worker panicked")?;

    let prediction = outcome.prediction();
    let output = serde_json::json!({
        "species": prediction.species.label(),
        "class": prediction.species.class_index(),
        "confidence": prediction.confidence(),
        "probabilities": prediction.probabilities,
        "model": model.wire_name(),
        "fallback": outcome.is_fallback(),
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

/// Split "5.1,3.5,1.4,0.2" into a feature vector. Values that do not parse
/// become NaN, same as in the interactive form.
fn parse_feature_list(list: &str) -> Result<[f64; 4]> {
    let parts: Vec<&str> = list.split(',').collect();
    if parts.len() != 4 {
        bail!(
            "expected 4 comma-separated measurements (sepal length, sepal width, petal length, petal width), got {}",
            parts.len()
        );
    }
    let buffers: [String; 4] = std::array::from_fn(|i| parts[i].to_string());
    Ok(predict::coerce_features(&buffers))
}

async fn run_tui(model: ModelKind) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new();
    app.model = model;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc if !app.show_help => return Ok(()),
                        // 'q' is ordinary field text in the measurements section
                        KeyCode::Char('q')
                            if !app.show_help && app.section == Section::Model =>
                        {
                            return Ok(())
                        }
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Drain settled predictions
        app.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_list_parses_leniently() {
        let features = parse_feature_list("5.1,3.5,1.4,0.2").unwrap();
        assert_eq!(features, [5.1, 3.5, 1.4, 0.2]);

        let features = parse_feature_list("5.1, oops ,1.4,").unwrap();
        assert_eq!(features[0], 5.1);
        assert!(features[1].is_nan());
        assert_eq!(features[2], 1.4);
        assert!(features[3].is_nan());
    }

    #[test]
    fn feature_list_requires_four_values() {
        assert!(parse_feature_list("5.1,3.5,1.4").is_err());
        assert!(parse_feature_list("1,2,3,4,5").is_err());
    }
}
