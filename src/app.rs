use ratatui::layout::Rect;

use crate::client::ChatClient;
use crate::session::ChatSession;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct App {
    pub should_quit: bool,
    pub title: String,

    // Chat state
    pub session: ChatSession,
    pub client: ChatClient,

    // Message list scrolling, in rendered lines
    pub scroll: u16,
    pub max_scroll: u16,
    pub chat_height: u16,
    // Conversation length the scroll position was last synced to
    pub synced_turns: usize,

    // Animation state
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>,
}

impl App {
    pub fn new(title: impl Into<String>, client: ChatClient) -> Self {
        Self {
            should_quit: false,
            title: title.into(),
            session: ChatSession::new(),
            client,
            scroll: 0,
            max_scroll: 0,
            chat_height: 0,
            synced_turns: 0,
            animation_frame: 0,
            chat_area: None,
            send_area: None,
        }
    }

    pub fn submit(&mut self) -> bool {
        self.session.submit(&self.client)
    }

    /// Collect a finished reply, if any.
    pub async fn poll_reply(&mut self) -> bool {
        self.session.poll_reply().await
    }

    /// Advance the busy indicator (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = ((self.animation_frame as usize + 1) % SPINNER_FRAMES.len()) as u8;
        } else {
            self.animation_frame = 0;
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.animation_frame as usize % SPINNER_FRAMES.len()]
    }

    /// Record the message list geometry from the latest render.
    ///
    /// Whenever the conversation changed since the last sync the view jumps
    /// to the bottom; otherwise the manual scroll position is kept in range.
    pub fn sync_scroll(&mut self, total_lines: u16, visible_height: u16) {
        self.chat_height = visible_height;
        self.max_scroll = total_lines.saturating_sub(visible_height);

        let turns = self.session.conversation().len();
        if turns != self.synced_turns {
            self.synced_turns = turns;
            self.scroll = self.max_scroll;
        } else {
            self.scroll = self.scroll.min(self.max_scroll);
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_up(self.chat_height.max(1));
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_down(self.chat_height.max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new("Rail AI", ChatClient::new("http://127.0.0.1:1", None).unwrap())
    }

    #[tokio::test]
    async fn test_new_turns_scroll_to_bottom() {
        let mut app = test_app();
        app.sync_scroll(50, 10);
        assert_eq!(app.scroll, 0);

        app.session.update_draft("hi");
        assert!(app.submit());
        app.sync_scroll(60, 10);
        assert_eq!(app.scroll, 50);

        app.scroll_up(20);
        app.sync_scroll(60, 10);
        assert_eq!(app.scroll, 30);

        app.session.wait_reply().await;
        app.sync_scroll(64, 10);
        assert_eq!(app.scroll, 54);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut app = test_app();
        app.sync_scroll(30, 10);
        app.scroll_down(100);
        assert_eq!(app.scroll, 20);
        app.scroll_page_up();
        assert_eq!(app.scroll, 10);
        app.scroll_to_top();
        app.scroll_page_up();
        assert_eq!(app.scroll, 0);
        app.scroll_to_bottom();
        assert_eq!(app.scroll, 20);

        // Resize to a taller view shrinks the range
        app.sync_scroll(30, 25);
        assert_eq!(app.scroll, 5);
    }

    #[tokio::test]
    async fn test_spinner_only_moves_while_pending() {
        let mut app = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.session.update_draft("x");
        app.submit();
        for _ in 0..12 {
            app.tick_animation();
        }
        assert_eq!(app.animation_frame, 2);
        assert_eq!(app.spinner(), SPINNER_FRAMES[2]);

        app.session.wait_reply().await;
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
