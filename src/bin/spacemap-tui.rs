use clap::{ArgAction, Parser};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use indextree::NodeId;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect as UiRect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::{Frame, Terminal};
use spacemap::config::ViewerConfig;
use spacemap::crawler::{ProgressReporter, ScanPhase, ScanProgress, ScanStats};
use spacemap::fs_source::FileSystemSource;
use spacemap::render_tree::{describe_node, visible_tiles, Tile};
use spacemap::source::format_size;
use spacemap::{Colour, ColourGenerator, Rect, TmTree, TreeResult};
use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "spacemap-tui", version, about = "Interactive treemap of a folder")]
struct Cli {
    /// Folder to visualise
    #[arg(default_value = ".")]
    path: PathBuf,

    /// TOML settings file
    #[arg(short, long, env = "SPACEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for leaf colours
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction a leaf grows or shrinks per Up/Down press
    #[arg(long)]
    resize_step: Option<f64>,

    /// Leave out dot files and folders
    #[arg(long)]
    skip_hidden: bool,

    /// Write logs here; without it logs are discarded
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Raise log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    debug: u8,
}

impl Cli {
    fn viewer_config(&self) -> TreeResult<ViewerConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(step) = self.resize_step {
            config.resize_step = step;
        }
        config.skip_hidden |= self.skip_hidden;
        config.validate()?;
        Ok(config)
    }
}

fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> io::Result<()> {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // The terminal belongs to the treemap; logs only ever go to a file.
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)?;

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // RUST_LOG, when set, refines the level picked by -d.
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .init();
    info!(?filter, "logging to {}", path.display());
    Ok(())
}

enum ScanEvent {
    Progress(ScanProgress),
    Completed(TreeResult<Loaded>),
}

struct Loaded {
    tree: TmTree,
    stats: ScanStats,
}

fn load_tree(path: &Path, config: &ViewerConfig, reporter: ProgressReporter) -> TreeResult<Loaded> {
    let source = FileSystemSource::scan_with_progress(path, config.scan_options(), Some(reporter))?;
    let stats = source.stats().clone();
    let root_identity = source.root_identity();
    let colours = match config.seed {
        Some(seed) => ColourGenerator::seeded(seed),
        None => ColourGenerator::from_entropy(),
    };
    let mut tree = TmTree::from_source(Arc::new(source), &root_identity, colours)?;
    let root = tree.root();
    tree.update_colours_and_depths(root);
    Ok(Loaded { tree, stats })
}

struct App {
    config: ViewerConfig,
    scan_path: PathBuf,
    status: String,
    scan_progress: Option<ScanProgress>,
    scan_rx: Option<Receiver<ScanEvent>>,

    tree: Option<TmTree>,
    selected: Option<NodeId>,
    target: Option<NodeId>,
    treemap_area: Option<UiRect>,

    should_quit: bool,
}

impl App {
    fn new(config: ViewerConfig, scan_path: PathBuf) -> Self {
        Self {
            config,
            scan_path,
            status: String::from("Starting scan"),
            scan_progress: None,
            scan_rx: None,
            tree: None,
            selected: None,
            target: None,
            treemap_area: None,
            should_quit: false,
        }
    }

    fn start_scan(&mut self) {
        if self.scan_rx.is_some() {
            return;
        }

        let path = self.scan_path.clone();
        let config = self.config.clone();
        self.status = format!("Scanning {} ...", path.display());
        self.scan_progress = Some(ScanProgress {
            phase: ScanPhase::Discovering,
            discovered_entries: 0,
            processed_entries: 0,
            total_size: 0,
        });

        let (tx, rx) = mpsc::channel::<ScanEvent>();
        self.scan_rx = Some(rx);

        thread::spawn(move || {
            let progress_tx = tx.clone();
            let reporter: ProgressReporter = Arc::new(move |progress: ScanProgress| {
                let _ = progress_tx.send(ScanEvent::Progress(progress));
            });
            let result = load_tree(&path, &config, reporter);
            let _ = tx.send(ScanEvent::Completed(result));
        });
    }

    fn poll_scan_updates(&mut self) {
        let mut done: Option<TreeResult<Loaded>> = None;
        let mut disconnected = false;

        if let Some(rx) = self.scan_rx.as_ref() {
            loop {
                match rx.try_recv() {
                    Ok(ScanEvent::Progress(progress)) => self.scan_progress = Some(progress),
                    Ok(ScanEvent::Completed(result)) => done = Some(result),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }

        if disconnected && done.is_none() {
            self.scan_rx = None;
            self.scan_progress = None;
            self.status = "Scan thread stopped unexpectedly".to_string();
        }

        if let Some(result) = done {
            self.scan_rx = None;
            self.scan_progress = None;
            match result {
                Ok(loaded) => {
                    self.status = format!(
                        "Scan complete: {} files, {} dirs, {} in {} ms",
                        loaded.stats.total_files,
                        loaded.stats.total_dirs,
                        format_size(loaded.stats.total_size),
                        loaded.stats.duration_ms,
                    );
                    info!(stats = ?loaded.stats, "tree ready");
                    self.selected = Some(loaded.tree.root());
                    self.target = None;
                    self.tree = Some(loaded.tree);
                }
                Err(e) => {
                    warn!(error = %e, "scan failed");
                    self.status = format!("Scan failed: {e}");
                }
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.tree = None;
                self.start_scan();
            }
            KeyCode::Char('e') => self.edit(|tree, id| tree.expand(id)),
            KeyCode::Char('a') => self.edit(|tree, id| tree.expand_all(id)),
            KeyCode::Char('c') => self.edit(|tree, id| tree.collapse(id)),
            KeyCode::Char('x') => self.edit(|tree, id| tree.collapse_all(id)),
            KeyCode::Up => {
                let step = self.config.resize_step;
                self.edit(|tree, id| tree.change_size(id, step));
            }
            KeyCode::Down => {
                let step = self.config.resize_step;
                self.edit(|tree, id| tree.change_size(id, -step));
            }
            KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('m') => self.move_selected(),
            KeyCode::Char('p') => {
                if let Some(target) = self.target {
                    self.edit(|tree, id| tree.copy_paste(id, target));
                }
            }
            KeyCode::Char('d') => self.duplicate_selected(),
            KeyCode::Esc => self.target = None,
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        let MouseEventKind::Down(button) = event.kind else {
            return;
        };
        let Some(hit) = self.node_at(event.column, event.row) else {
            return;
        };
        match button {
            MouseButton::Left => {
                self.selected = Some(hit);
                self.refresh_status();
            }
            MouseButton::Right => {
                self.target = Some(hit);
                if let Some(tree) = self.tree.as_ref() {
                    self.status = format!("Target: {}", describe_node(tree, hit));
                }
            }
            MouseButton::Middle => {}
        }
    }

    /// Run `op` on the selection, then recolour and refresh the status line.
    fn edit(&mut self, op: impl FnOnce(&mut TmTree, NodeId)) {
        let (Some(tree), Some(id)) = (self.tree.as_mut(), self.selected) else {
            return;
        };
        op(tree, id);
        let root = tree.root();
        tree.update_colours_and_depths(root);
        self.refresh_status();
    }

    fn delete_selected(&mut self) {
        let (Some(tree), Some(id)) = (self.tree.as_mut(), self.selected) else {
            return;
        };
        if !tree.delete_self(id) {
            self.status = "The root cannot be deleted".to_string();
            return;
        }
        self.selected = tree.nearest_attached(id);
        if self.target.is_some_and(|t| !tree.is_attached(t)) {
            self.target = None;
        }
        // A cascading delete detaches a chain of emptied ancestors.
        let mut current = Some(id);
        while let Some(node) = current.filter(|&n| tree.contains(n) && !tree.is_attached(n)) {
            current = tree.parent(node);
            tree.discard(node);
        }
        debug!(?id, selected = ?self.selected, "deleted node");

        let root = tree.root();
        tree.update_colours_and_depths(root);
        self.refresh_status();
    }

    fn move_selected(&mut self) {
        let Some(target) = self.target else {
            self.status = "Right click a folder to pick a target first".to_string();
            return;
        };
        self.edit(|tree, id| tree.move_to(id, target));
    }

    fn duplicate_selected(&mut self) {
        let (Some(tree), Some(id)) = (self.tree.as_mut(), self.selected) else {
            return;
        };
        if let Some(twin) = tree.duplicate(id) {
            self.selected = Some(twin);
        }
        let root = tree.root();
        tree.update_colours_and_depths(root);
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        if let (Some(tree), Some(id)) = (self.tree.as_ref(), self.selected) {
            if tree.contains(id) {
                self.status = describe_node(tree, id);
            }
        }
    }

    /// Lay the tree out over the treemap area and snapshot the frontier.
    fn layout_tiles(&mut self, area: UiRect) -> Vec<Tile> {
        let Some(tree) = self.tree.as_mut() else {
            return Vec::new();
        };
        let root = tree.root();
        tree.update_rectangles(root, Rect::new(0, 0, area.width as u32, area.height as u32));
        visible_tiles(tree, root)
    }

    /// Cell `(column, row)` covers the layout point one unit right of and
    /// below its top-left corner.
    fn node_at(&self, column: u16, row: u16) -> Option<NodeId> {
        let area = self.treemap_area?;
        if !point_in_rect(area, column, row) {
            return None;
        }
        let tree = self.tree.as_ref()?;
        let point = ((column - area.x) as u32 + 1, (row - area.y) as u32 + 1);
        tree.get_tree_at_position(tree.root(), point)
    }
}

fn point_in_rect(rect: UiRect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn tile_bounds_in_area(rect: Rect, area: UiRect) -> Option<(u16, u16, u16, u16)> {
    if rect.is_empty() || area.width == 0 || area.height == 0 {
        return None;
    }
    let max_x = area.x.saturating_add(area.width - 1);
    let max_y = area.y.saturating_add(area.height - 1);
    let x0 = area.x.saturating_add(rect.x as u16).min(max_x);
    let y0 = area.y.saturating_add(rect.y as u16).min(max_y);
    let x1 = (x0 as u32 + rect.width - 1).min(max_x as u32) as u16;
    let y1 = (y0 as u32 + rect.height - 1).min(max_y as u32) as u16;
    Some((x0, y0, x1, y1))
}

fn progress_status(progress: &ScanProgress) -> String {
    match progress.fraction() {
        None => format!("Discovering entries... {} found", progress.discovered_entries),
        Some(frac) => format!(
            "Processing {:.0}% | {} of {} | {}",
            frac * 100.0,
            progress.processed_entries,
            progress.discovered_entries,
            format_size(progress.total_size),
        ),
    }
}

fn to_color(colour: Colour) -> Color {
    Color::Rgb(colour.r, colour.g, colour.b)
}

fn text_color(colour: Colour) -> Color {
    let luma = 299 * colour.r as u32 + 587 * colour.g as u32 + 114 * colour.b as u32;
    if luma > 128_000 {
        Color::Black
    } else {
        Color::White
    }
}

struct TreemapWidget<'a> {
    tiles: &'a [Tile],
    selected: Option<NodeId>,
    target: Option<NodeId>,
}

impl Widget for TreemapWidget<'_> {
    fn render(self, area: UiRect, buf: &mut Buffer) {
        for tile in self.tiles {
            let Some((x0, y0, x1, y1)) = tile_bounds_in_area(tile.rect, area) else {
                continue;
            };
            let bg = to_color(tile.colour);
            let fg = text_color(tile.colour);

            for y in y0..=y1 {
                for x in x0..=x1 {
                    buf[(x, y)].set_char(' ').set_style(Style::default().bg(bg));
                }
            }

            let marker = if Some(tile.id) == self.selected {
                Some(Color::Rgb(246, 211, 101))
            } else if Some(tile.id) == self.target {
                Some(Color::Rgb(120, 220, 255))
            } else {
                None
            };
            if let Some(border) = marker {
                let style = Style::default().fg(border).bg(bg);
                for x in x0..=x1 {
                    buf[(x, y0)].set_char('▀').set_style(style);
                    buf[(x, y1)].set_char('▄').set_style(style);
                }
            }

            if let Some(label) = tile.label() {
                let style = Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD);
                for (i, ch) in label.chars().enumerate() {
                    let x = x0.saturating_add(i as u16);
                    if x > x1 {
                        break;
                    }
                    buf[(x, y0)].set_char(ch).set_style(style);
                }
            }
        }
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let rows = Layout::vertical([
        Constraint::Min(5),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .split(frame.area());

    let treemap_block = Block::default()
        .title(format!(" spacemap: {} ", app.scan_path.display()))
        .borders(Borders::ALL);
    let treemap_inner = treemap_block.inner(rows[0]);
    frame.render_widget(treemap_block, rows[0]);
    app.treemap_area = Some(treemap_inner);

    let tiles = app.layout_tiles(treemap_inner);
    if tiles.is_empty() {
        let hint = if app.scan_rx.is_some() {
            "Scanning..."
        } else {
            "Nothing to show. Press r to rescan."
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::Gray)),
            treemap_inner,
        );
    } else {
        frame.render_widget(
            TreemapWidget {
                tiles: &tiles,
                selected: app.selected,
                target: app.target,
            },
            treemap_inner,
        );
    }

    let status_text = app
        .scan_progress
        .as_ref()
        .map(progress_status)
        .unwrap_or_else(|| app.status.clone());
    frame.render_widget(
        Paragraph::new(status_text).block(Block::default().title(" Status ").borders(Borders::ALL)),
        rows[1],
    );

    let help = Line::from(vec![
        Span::styled("click", Style::default().fg(Color::Yellow)),
        Span::raw(" select  "),
        Span::styled("right click", Style::default().fg(Color::Yellow)),
        Span::raw(" target  "),
        Span::styled("e/a c/x", Style::default().fg(Color::Yellow)),
        Span::raw(" expand/all collapse/all  "),
        Span::styled("Up/Down", Style::default().fg(Color::Yellow)),
        Span::raw(" resize  "),
        Span::styled("Del m p d", Style::default().fg(Color::Yellow)),
        Span::raw(" delete move paste duplicate  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]);
    frame.render_widget(Paragraph::new(help), rows[2]);
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let tick = Duration::from_millis(app.config.tick_ms);
    app.start_scan();

    loop {
        app.poll_scan_updates();

        terminal.draw(|frame| draw_ui(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) | Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.log_file.as_deref())?;

    let config = match cli.viewer_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    debug!(?config, "viewer settings");
    let mut app = App::new(config, cli.path.clone());

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result
}
