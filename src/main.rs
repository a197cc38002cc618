use proxyscope::app::{App, AppMessage};
use proxyscope::session::SessionEvent;
use proxyscope::storage::{self, load_prefs};
use proxyscope::ui;

use color_eyre::Result;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Logging goes to a file under the data dir; stderr belongs to the terminal
/// UI while the alternate screen is active.
fn init_tracing() {
    let Ok(dir) = storage::data_dir() else {
        return;
    };
    let Ok(file) = std::fs::File::options()
        .create(true)
        .append(true)
        .open(dir.join("proxyscope.log"))
    else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(file)
        .with_ansi(false)
        .init();
}

/// Restore the terminal to cooked mode even when the app errored out.
fn restore_terminal<B: ratatui::backend::Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    mut message_rx: mpsc::UnboundedReceiver<AppMessage>,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal.draw(|f| ui::render(f, app))?;
        if app.should_quit {
            return Ok(());
        }

        tokio::select! {
            _ = tick.tick() => {
                app.tick();
            }
            event = input.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => app.handle_key(key),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                }
            }
            Some(event) = session_rx.recv() => {
                app.handle_session_event(event);
                // Drain whatever else arrived so one draw covers the burst.
                while let Ok(event) = session_rx.try_recv() {
                    app.handle_session_event(event);
                }
            }
            Some(message) = message_rx.recv() => {
                app.handle_message(message);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let prefs = match storage::prefs_path() {
        Ok(path) => load_prefs(&path),
        Err(_) => Default::default(),
    };

    let (session_tx, session_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let mut app = App::new(prefs, session_tx, message_tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app, session_rx, message_rx).await;

    app.shutdown();
    restore_terminal(&mut terminal)?;
    result
}
