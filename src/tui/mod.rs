//! TUI module - Terminal dashboard with ratatui

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
};
use std::io::{Stdout, stdout};
use tracing::warn;

use crate::analysis::{AnalysisResult, Imbalance, Trend, analyze};
use crate::config::AnalysisConfig;
use crate::db::Database;
use crate::exercises::MuscleGroupMap;
use crate::report::{WeightUnit, progression_line, share_bar};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App {
    db: Database,
    /// Stored exercise templates are layered on top at each reload
    base_map: MuscleGroupMap,
    config: AnalysisConfig,
    unit: WeightUnit,
    result: AnalysisResult,
    status: String,
    should_quit: bool,
}

fn trend_color(trend: Trend) -> Color {
    match trend {
        Trend::Increasing => Color::Green,
        Trend::Decreasing => Color::Red,
        Trend::Plateaued => Color::Yellow,
        Trend::InsufficientData => Color::DarkGray,
    }
}

impl App {
    pub fn new(db: Database, base_map: MuscleGroupMap, config: AnalysisConfig, unit: WeightUnit) -> Result<Self> {
        let mut app = Self {
            db,
            base_map,
            config,
            unit,
            result: AnalysisResult::default(),
            status: String::new(),
            should_quit: false,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-read the database and re-run the analysis
    fn reload(&mut self) -> Result<()> {
        let sessions = self.db.get_sessions(None)?;
        let map = self.db.muscle_map(self.base_map.clone())?;
        match analyze(&sessions, &map, &self.config) {
            Ok(result) => {
                self.status = format!(
                    "{} sessions, {} exercises, last {} days",
                    result.sessions_analyzed,
                    result.progression.len(),
                    self.config.window_days
                );
                self.result = result;
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                self.status = e.to_string();
            }
        }
        Ok(())
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(8),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new(format!("Workout Optimizer - {}", self.status))
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        self.render_progression(frame, body[0]);
        self.render_balance(frame, body[1]);

        // Recommendations
        let items: Vec<ListItem> = self
            .result
            .recommendations
            .iter()
            .map(|r| ListItem::new(format!("- {}", r)))
            .collect();
        let recommendations = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Recommendations"));
        frame.render_widget(recommendations, chunks[2]);

        // Footer
        let footer = Paragraph::new("q: quit | r: reload | u: kg/lbs")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn render_progression(&self, frame: &mut Frame, area: Rect) {
        if self.result.is_empty() {
            let empty = Paragraph::new("No workouts yet. Run `workout-optimizer sync` or `import` first.")
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Progression"));
            frame.render_widget(empty, area);
            return;
        }

        let rows: Vec<Row> = self
            .result
            .progression
            .iter()
            .map(|p| {
                let sessions = self.result.frequency.exercises.get(&p.exercise).copied().unwrap_or(0);
                Row::new(vec![
                    Cell::from(p.exercise.clone()),
                    Cell::from(progression_line(p, self.unit))
                        .style(Style::default().fg(trend_color(p.trend))),
                    Cell::from(sessions.to_string()),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Length(26), Constraint::Min(30), Constraint::Length(8)],
        )
        .header(Row::new(vec!["Exercise", "Progress", "Recent"]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Progression"));

        frame.render_widget(table, area);
    }

    fn render_balance(&self, frame: &mut Frame, area: Rect) {
        let balance = &self.result.balance;
        let max = balance.groups.iter().map(|g| g.sets).max().unwrap_or(0);

        let rows: Vec<Row> = balance
            .groups
            .iter()
            .map(|g| {
                let ratio = if max > 0 { g.sets as f64 / max as f64 } else { 0.0 };
                let color = match balance.findings.iter().find(|f| f.group == g.group).map(|f| f.kind) {
                    Some(Imbalance::Untrained) => Color::DarkGray,
                    Some(Imbalance::UnderTrained) => Color::Yellow,
                    Some(Imbalance::OverTrained) => Color::Magenta,
                    None => Color::Reset,
                };
                Row::new(vec![
                    Cell::from(g.group.name()),
                    Cell::from(share_bar(ratio)),
                    Cell::from(format!("{:.0}%", g.share * 100.0)),
                ])
                .style(Style::default().fg(color))
            })
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Length(12), Constraint::Length(8), Constraint::Length(6)],
        )
        .header(Row::new(vec!["Group", "Volume", "Share"]).style(Style::default().bold()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Balance ({} sets)", balance.total_sets)),
        );

        frame.render_widget(table, area);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('r') => self.reload()?,
                KeyCode::Char('u') => {
                    self.unit = match self.unit {
                        WeightUnit::Kg => WeightUnit::Lbs,
                        WeightUnit::Lbs => WeightUnit::Kg,
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::MuscleGroup;
    use crate::models::{ExerciseEntry, ExerciseTemplate, Session, SetRecord};
    use chrono::{TimeZone, Utc};
    use ratatui::backend::TestBackend;

    fn create_app(sessions: &[Session]) -> App {
        let db = Database::open(":memory:").unwrap();
        db.upsert_sessions(sessions).unwrap();
        App::new(db, MuscleGroupMap::builtin(), AnalysisConfig::default(), WeightUnit::Kg).unwrap()
    }

    fn buffer_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_empty_dashboard() {
        let app = create_app(&[]);
        assert!(app.result.is_empty());
        assert!(buffer_text(&app).contains("No workouts yet"));
    }

    #[test]
    fn test_dashboard_shows_exercises() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let sessions = vec![Session::new(
            "a",
            start,
            vec![ExerciseEntry::new("Squat", vec![SetRecord::weighted(100.0, 5)])],
        )];
        let app = create_app(&sessions);

        assert_eq!(app.result.progression.len(), 1);
        assert!(buffer_text(&app).contains("Squat"));
        assert!(app.status.starts_with("1 sessions"));
    }

    #[test]
    fn test_reload_picks_up_stored_templates() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let mut entry = ExerciseEntry::new("Landmine Thing", vec![SetRecord::weighted(40.0, 10)]);
        entry.template_id = Some("C0FFEE01".to_string());
        let mut app = create_app(&[Session::new("a", start, vec![entry])]);
        assert_eq!(app.result.balance.unclassified_sets, 1);

        app.db
            .replace_templates(&[ExerciseTemplate {
                id: "C0FFEE01".to_string(),
                title: "Landmine Press".to_string(),
                primary_muscle_group: Some("shoulders".to_string()),
                secondary_muscle_groups: Vec::new(),
            }])
            .unwrap();
        app.reload().unwrap();

        assert_eq!(app.result.balance.unclassified_sets, 0);
        assert_eq!(app.result.balance.groups[0].group, MuscleGroup::Shoulders);
        assert_eq!(app.result.balance.groups[0].sets, 1);
    }
}
