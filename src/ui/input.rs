use crossterm::event::{KeyCode, KeyModifiers};
use url::Url;

use super::state::PostList;

/// Result of handling a key press event.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Open this URL in the system browser.
    Open(String),
    /// Exit the viewer and restore the terminal.
    Quit,
}

pub fn handle_input(list: &mut PostList, code: KeyCode, modifiers: KeyModifiers) -> Action {
    list.status = None;
    list.needs_redraw = true;

    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            list.next();
            Action::Continue
        }
        KeyCode::Char('k') | KeyCode::Up => {
            list.previous();
            Action::Continue
        }
        KeyCode::Char('g') | KeyCode::Home => {
            list.first();
            Action::Continue
        }
        KeyCode::Char('G') | KeyCode::End => {
            list.last();
            Action::Continue
        }
        KeyCode::Enter => match list.selected_post() {
            Some(post) => match validate_url_for_open(&post.url) {
                Ok(url) => Action::Open(url.into()),
                Err(e) => {
                    list.set_status(e);
                    Action::Continue
                }
            },
            None => Action::Continue,
        },
        _ => {
            list.needs_redraw = false;
            Action::Continue
        }
    }
}

/// Parse a post link for the system opener: well-formed http(s) with a host,
/// returned in normalized form.
fn validate_url_for_open(link: &str) -> Result<Url, String> {
    if link.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("Refusing to open URL with whitespace: {link:?}"));
    }
    let url = Url::parse(link).map_err(|e| format!("Invalid URL {link}: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Refusing to open non-http URL ({other}): {link}")),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("URL has no host: {link}"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::sample_posts;

    fn press(list: &mut PostList, code: KeyCode) -> Action {
        handle_input(list, code, KeyModifiers::NONE)
    }

    #[test]
    fn test_vim_and_arrow_navigation() {
        let mut list = PostList::new(sample_posts(5));
        press(&mut list, KeyCode::Char('j'));
        press(&mut list, KeyCode::Down);
        assert_eq!(list.selected, 2);
        press(&mut list, KeyCode::Char('k'));
        assert_eq!(list.selected, 1);
        press(&mut list, KeyCode::Char('G'));
        assert_eq!(list.selected, 4);
        press(&mut list, KeyCode::Char('g'));
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_quit_keys() {
        let mut list = PostList::new(sample_posts(1));
        assert_eq!(press(&mut list, KeyCode::Char('q')), Action::Quit);
        assert_eq!(press(&mut list, KeyCode::Esc), Action::Quit);
        assert_eq!(
            handle_input(&mut list, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Action::Quit
        );
        assert_eq!(press(&mut list, KeyCode::Char('c')), Action::Continue);
    }

    #[test]
    fn test_enter_opens_selected_url() {
        let mut list = PostList::new(sample_posts(2));
        press(&mut list, KeyCode::Down);
        assert_eq!(
            press(&mut list, KeyCode::Enter),
            Action::Open("https://example.com/1".to_string())
        );
    }

    #[test]
    fn test_enter_refuses_other_schemes() {
        let mut posts = sample_posts(1);
        posts[0].url = "file:///etc/passwd".to_string();
        let mut list = PostList::new(posts);
        assert_eq!(press(&mut list, KeyCode::Enter), Action::Continue);
        assert!(list.status.as_deref().unwrap_or_default().contains("non-http"));
    }

    #[test]
    fn test_enter_opens_normalized_url() {
        let mut posts = sample_posts(1);
        posts[0].url = "HTTPS://Example.COM/a%20b".to_string();
        let mut list = PostList::new(posts);
        assert_eq!(
            press(&mut list, KeyCode::Enter),
            Action::Open("https://example.com/a%20b".to_string())
        );
    }

    #[test]
    fn test_malformed_links_are_refused() {
        for link in [
            "http://",
            "https://exa mple.com/\nx",
            "https://example.com/a\nb",
            "HTTP://[::1",
            "https://%zz",
            "not a url",
            "javascript:alert(1)",
            "mailto:someone@example.com",
        ] {
            assert!(validate_url_for_open(link).is_err(), "accepted {link:?}");
        }
    }

    #[test]
    fn test_wellformed_links_are_accepted() {
        for link in [
            "https://example.com",
            "http://blog.example.com:8080/posts/1?ref=rss#top",
            "https://[::1]/feed",
        ] {
            assert!(validate_url_for_open(link).is_ok(), "refused {link:?}");
        }
    }
}
