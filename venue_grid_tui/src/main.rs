mod crowd;

use anyhow::{Context, Result};
use clap::Parser;
use crowd::Crowd;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::HashSet,
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use venue_grid_core::{PathOptions, Pathfinder, Position, TileType, load_venue_from_string};

const DEFAULT_VENUE: &str = include_str!("../maps/venue01.txt");

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Venue layout file to load (defaults to the bundled venue)
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Number of patrons to spawn
    #[arg(short, long, default_value_t = 12)]
    patrons: usize,

    /// Seed for patron placement and goal choice
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Milliseconds between simulation ticks
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Fold crowd density into step costs
    #[arg(short, long)]
    density: bool,

    /// Restrict movement to the four orthogonal directions
    #[arg(long)]
    no_diagonal: bool,

    /// Path options as JSON, e.g. '{"heuristicWeight": 1.2}'
    #[arg(long, value_name = "JSON")]
    options: Option<String>,
}

impl Args {
    /// Resolves the options bundle patrons plan with: the JSON bundle if
    /// given, else the next-step preset, then the command line flags on top.
    fn path_options(&self) -> Result<PathOptions> {
        let mut options = match &self.options {
            Some(json) => serde_json::from_str(json).context("Invalid --options JSON")?,
            None => PathOptions::next_step(),
        };
        if self.density {
            options.consider_crowd_density = true;
        }
        if self.no_diagonal {
            options.allow_diagonal = false;
        }
        Ok(options)
    }
}

struct App {
    /// The search engine, owning the venue grid.
    pathfinder: Pathfinder,
    crowd: Crowd,
    options: PathOptions,
    /// Index of the patron whose route is drawn.
    selected: usize,
    paused: bool,
    ticks: u64,
    should_quit: bool,
}

impl App {
    fn new(layout: &str, args: &Args) -> Result<Self> {
        let mut venue = load_venue_from_string(layout)?;
        let crowd = Crowd::spawn(&mut venue.grid, &venue.entrances, args.patrons, args.seed)?;

        Ok(App {
            pathfinder: Pathfinder::new(venue.grid),
            crowd,
            options: args.path_options()?,
            selected: 0,
            paused: false,
            ticks: 0,
            should_quit: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        self.crowd.tick(&mut self.pathfinder, &self.options)?;
        self.ticks += 1;
        Ok(())
    }

    fn toggle_density(&mut self) {
        self.options.consider_crowd_density = !self.options.consider_crowd_density;
    }

    fn select_next(&mut self) {
        if !self.crowd.patrons.is_empty() {
            self.selected = (self.selected + 1) % self.crowd.patrons.len();
        }
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let layout = match &args.map {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read map file {}", path.display()))?,
        None => DEFAULT_VENUE.to_string(),
    };

    // Build the app before touching the terminal so load errors print cleanly.
    let mut app = App::new(&layout, &args)?;
    let tick_rate = Duration::from_millis(args.tick_ms);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('d') => app.toggle_density(),
                    KeyCode::Tab | KeyCode::Char('n') => app.select_next(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65), // Venue map
            Constraint::Percentage(25), // Patron list
            Constraint::Percentage(10), // Status/help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_patrons(frame, main_layout[1], app);

    let status = format!(
        "tick {}{} | density {} | diagonal {} | {} occupied | space pause, d density, n next, q quit",
        app.ticks,
        if app.paused { " (paused)" } else { "" },
        on_off(app.options.consider_crowd_density),
        on_off(app.options.allow_diagonal),
        app.pathfinder.grid().occupied_count(),
    );
    let help_text = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Lists each patron's position, goal and progress.
fn render_patrons(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .crowd
        .patrons
        .iter()
        .enumerate()
        .map(|(index, patron)| {
            let goal = patron
                .goal
                .map(|g| format!("({}, {})", g.x, g.y))
                .unwrap_or_else(|| "-".to_string());
            let text = format!(
                "Patron {:>2} at ({:>2}, {:>2}) goal {:<9} route {:>2} steps {:>4} stalls {}",
                patron.id,
                patron.position.x,
                patron.position.y,
                goal,
                patron.route.len().saturating_sub(1),
                patron.steps_taken,
                patron.stalls,
            );
            let style = if index == app.selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };
            ListItem::from(Line::from(Span::styled(text, style)))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Patrons"));
    frame.render_widget(list, area);
}

fn tile_glyph(tile_type: TileType) -> (&'static str, Style) {
    match tile_type {
        TileType::Empty => (" ", Style::default()),
        TileType::Floor => (".", Style::default().fg(Color::DarkGray)),
        TileType::DanceFloor => ("~", Style::default().fg(Color::Magenta)),
        TileType::Wall => ("#", Style::default().fg(Color::Gray)),
        TileType::Door => ("+", Style::default().fg(Color::Yellow)),
        TileType::Bar => ("B", Style::default().fg(Color::Cyan)),
        TileType::Toilet => ("T", Style::default().fg(Color::Blue)),
        TileType::Stage => ("S", Style::default().fg(Color::LightMagenta)),
        TileType::Vip => ("V", Style::default().fg(Color::LightYellow)),
        TileType::Entrance => ("E", Style::default().fg(Color::Green)),
    }
}

/// Renders the venue with patrons and the selected patron's route.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let grid = app.pathfinder.grid();
    let selected = app.crowd.patrons.get(app.selected);
    let route: HashSet<Position> = selected
        .map(|p| p.route.iter().copied().collect())
        .unwrap_or_default();
    let goal = selected.and_then(|p| p.goal);

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let pos = Position::new(x, y);
            let Ok(tile) = grid.get_tile(x, y) else {
                continue;
            };

            let span = if let Some(id) = tile.occupant() {
                let color = if selected.is_some_and(|p| p.id == id) {
                    Color::Yellow
                } else {
                    Color::Red
                };
                Span::styled("@", Style::default().fg(color).bold())
            } else if goal == Some(pos) {
                Span::styled("X", Style::default().fg(Color::Yellow).bold())
            } else if route.contains(&pos) {
                Span::styled("*", Style::default().fg(Color::Yellow))
            } else {
                let (glyph, style) = tile_glyph(tile.tile_type());
                Span::styled(glyph, style)
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Venue").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_json_options() {
        let args = Args::try_parse_from([
            "venue_grid_tui",
            "--options",
            r#"{"heuristicWeight": 1.2, "maxSearchNodes": 300}"#,
            "--density",
            "--no-diagonal",
        ])
        .unwrap();
        let options = args.path_options().unwrap();
        assert_eq!(options.heuristic_weight, 1.2);
        assert_eq!(options.max_search_nodes, 300);
        assert!(options.consider_crowd_density);
        assert!(!options.allow_diagonal);
    }

    #[test]
    fn defaults_to_next_step_preset() {
        let args = Args::try_parse_from(["venue_grid_tui"]).unwrap();
        assert_eq!(args.path_options().unwrap(), PathOptions::next_step());
        assert_eq!(args.patrons, 12);
    }

    #[test]
    fn bad_json_is_reported() {
        let args = Args::try_parse_from(["venue_grid_tui", "--options", "{nope"]).unwrap();
        assert!(args.path_options().is_err());
    }

    #[test]
    fn bundled_venue_runs() {
        let args = Args::try_parse_from(["venue_grid_tui", "--patrons", "20", "--density"]).unwrap();
        let mut app = App::new(DEFAULT_VENUE, &args).unwrap();
        assert_eq!(app.crowd.patrons.len(), 20);
        for _ in 0..25 {
            app.tick().unwrap();
        }
        assert_eq!(app.ticks, 25);
        assert_eq!(app.pathfinder.grid().occupied_count(), 20);

        app.paused = true;
        app.tick().unwrap();
        assert_eq!(app.ticks, 25);
    }
}
