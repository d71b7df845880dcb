//! Event loop for the post viewer.
//!
//! Multiplexes terminal input with the process-wide shutdown token.

use anyhow::Result;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tokio_util::sync::CancellationToken;

use super::input::{handle_input, Action};
use super::render::render;
use super::state::PostList;
use crate::storage::Post;

/// Show `posts` in a scrollable list until the user quits or `shutdown` fires.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding,
/// ensuring the terminal is not left in raw mode on panic.
///
/// # Errors
///
/// Returns an error if terminal setup or drawing fails.
pub async fn run(posts: Vec<Post>, shutdown: CancellationToken) -> Result<()> {
    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut list = PostList::new(posts);

    let result = loop {
        if list.needs_redraw {
            if let Err(e) = terminal.draw(|f| render(f, &list)) {
                break Err(e.into());
            }
            list.needs_redraw = false;
        }

        tokio::select! {
            biased;

            // SIGINT/SIGTERM are turned into this token in main; in raw mode
            // Ctrl-C arrives as a key event instead
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, closing viewer");
                break Ok(());
            }

            maybe_event = event_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match handle_input(&mut list, key.code, key.modifiers) {
                        Action::Quit => break Ok(()),
                        Action::Open(url) => {
                            if let Err(e) = open::that(&url) {
                                list.set_status(format!("Failed to open browser: {}", e));
                            }
                        }
                        Action::Continue => {}
                    }
                }
                Some(Ok(Event::Resize(_, _))) => list.needs_redraw = true,
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            },
        }
    };

    restore_terminal(terminal)?;
    result
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
