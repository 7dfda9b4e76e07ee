use std::path::PathBuf;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tertulia_core::{AssistantReply, ChatSession, Config, Dispatcher, OutgoingRequest};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A request handed to the backend on a background task.
struct PendingRoundTrip {
    request: OutgoingRequest,
    task: JoinHandle<AssistantReply>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub session: ChatSession,
    pub dispatcher: Dispatcher,
    pending: Option<PendingRoundTrip>,

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    /// Where the chosen model is remembered; `None` disables persistence.
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(dispatcher: Dispatcher, config_path: Option<PathBuf>) -> Self {
        Self {
            should_quit: false,
            session: ChatSession::new(),
            dispatcher,
            pending: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            show_model_picker: false,
            model_picker_state: ListState::default(),

            config_path,
        }
    }

    /// Fetch the model list. An empty or failed list blocks the session.
    pub async fn load_models(&mut self, preferred: Option<&str>) {
        self.session
            .bootstrap(self.dispatcher.backend(), preferred)
            .await;
        if let Some(model) = self.session.selected_model() {
            info!(model, "chat ready");
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a round trip from the current draft. The backend call runs on
    /// its own task; [`App::poll_round_trip`] picks up the reply.
    pub fn submit(&mut self) {
        let Some(request) = self.dispatcher.begin(&mut self.session) else {
            return;
        };

        let dispatcher = self.dispatcher.clone();
        let task_request = request.clone();
        let task = tokio::spawn(async move { dispatcher.resolve(&task_request).await });

        self.pending = Some(PendingRoundTrip { request, task });
        self.scroll_to_bottom();
    }

    /// Finish the round trip if its task is done.
    pub async fn poll_round_trip(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.task.is_finished()) {
            self.complete_round_trip().await;
        }
    }

    /// Wait for the in-flight round trip, if any, and finish it.
    pub async fn complete_round_trip(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let reply = match pending.task.await {
            Ok(reply) => reply,
            Err(e) => {
                // The request still gets its one assistant message.
                warn!(error = %e, "round trip task failed, using fallback reply");
                self.dispatcher.fallback_reply(&pending.request)
            }
        };

        self.dispatcher.finish(&mut self.session, reply);
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.transcript_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn page_size(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    /// Scroll chat to bottom so the latest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.transcript_lines();
        let visible_height = self.visible_height();

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript, estimated from the wrap width.
    /// Saturates at `u16::MAX`, the largest offset a `Paragraph` can scroll to.
    fn transcript_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.session.transcript().messages() {
            // Role line ("You" or "AI") and the blank line after the message
            total_lines = total_lines.saturating_add(2);
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
        }

        if self.is_waiting() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        if self.session.models().is_empty() {
            return;
        }
        self.model_picker_state
            .select(Some(self.session.selected_index().unwrap_or(0)));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.session.models().len();
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
        let Some(i) = self.model_picker_state.selected() else {
            return;
        };
        let Some(model) = self.session.select_model(i).map(str::to_string) else {
            return;
        };
        self.show_model_picker = false;

        // Save to config
        if let Some(path) = &self.config_path {
            if let Err(e) = Config::save_default_model(path, &model) {
                warn!(error = %e, "failed to save default model");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        make_app, BrokenChatBackend, EchoBackend, LongReplyBackend, PanickingBackend,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tertulia_core::{ChatRole, OfflineBackend};

    #[tokio::test]
    async fn test_submit_runs_round_trip_in_background() {
        let mut app = make_app(Arc::new(EchoBackend));
        app.load_models(None).await;

        app.session.composer_mut().insert_str("Hello");
        app.submit();
        assert!(app.is_waiting());
        assert!(app.session.is_busy());
        assert!(app.session.composer().is_empty());

        app.complete_round_trip().await;
        assert!(!app.is_waiting());
        assert!(app.session.input_enabled());

        let last = app.session.transcript().last().expect("reply");
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, "llama2 says Hello");
    }

    #[tokio::test]
    async fn test_failed_chat_falls_back() {
        let mut app = make_app(Arc::new(BrokenChatBackend));
        app.load_models(None).await;

        app.session.composer_mut().insert_str("Hello");
        app.submit();
        app.complete_round_trip().await;

        let last = app.session.transcript().last().expect("reply");
        assert_eq!(last.content, "[llama2] Static reply from AI");
    }

    #[tokio::test]
    async fn test_panicking_task_still_gets_one_reply() {
        let mut app = make_app(Arc::new(PanickingBackend));
        app.load_models(None).await;

        app.session.composer_mut().insert_str("Hello");
        app.submit();
        app.complete_round_trip().await;

        assert!(!app.is_waiting());
        assert!(app.session.input_enabled());
        assert_eq!(app.session.transcript().count_role(ChatRole::Assistant), 1);
        let last = app.session.transcript().last().expect("reply");
        assert_eq!(last.content, "[llama2] Static reply from AI");
    }

    #[tokio::test]
    async fn test_huge_reply_saturates_scroll() {
        let mut app = make_app(Arc::new(LongReplyBackend { lines: 70_000 }));
        app.load_models(None).await;
        app.chat_height = 10;
        app.chat_width = 40;

        app.session.composer_mut().insert_str("Hello");
        app.submit();
        app.complete_round_trip().await;

        assert_eq!(app.transcript_lines(), u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX - 10);
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }

    #[tokio::test]
    async fn test_poll_waits_for_task() {
        let mut app = App::new(
            Dispatcher::new(Arc::new(EchoBackend)).with_delay(Duration::from_millis(200)),
            None,
        );
        app.load_models(None).await;

        app.session.composer_mut().insert_str("Hello");
        app.submit();
        app.poll_round_trip().await;
        assert!(app.is_waiting());
        assert_eq!(app.session.transcript().len(), 1);

        app.complete_round_trip().await;
        assert_eq!(app.session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_offline_app_is_blocked() {
        let mut app = make_app(Arc::new(OfflineBackend));
        app.load_models(None).await;

        assert!(app.session.is_blocked());
        app.session.composer_mut().insert_str("Hello");
        app.submit();
        assert!(!app.is_waiting());
        assert!(app.session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_model_picker_selection_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut app = App::new(
            Dispatcher::new(Arc::new(EchoBackend)).with_delay(Duration::ZERO),
            Some(path.clone()),
        );
        app.load_models(None).await;

        app.open_model_picker();
        assert_eq!(app.model_picker_state.selected(), Some(0));
        app.model_picker_nav_down();
        app.model_picker_nav_down();
        app.select_model();

        assert!(!app.show_model_picker);
        assert_eq!(app.session.selected_model(), Some("mistral"));
        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.default_model.as_deref(), Some("mistral"));
    }

    #[test]
    fn test_scroll_to_bottom_follows_transcript() {
        let mut app = make_app(Arc::new(EchoBackend));
        app.chat_height = 4;
        app.chat_width = 40;
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 0);

        app.session
            .install_models(Ok(vec!["llama2".to_string()]), None);
        let dispatcher = app.dispatcher.clone();
        for text in ["one", "two"] {
            app.session.composer_mut().insert_str(text);
            let request = dispatcher.begin(&mut app.session).expect("request");
            let reply = dispatcher.fallback_reply(&request);
            dispatcher.finish(&mut app.session, reply);
        }

        // 4 messages, 3 lines each
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 12 - 4);
        app.scroll_up(100);
        assert_eq!(app.chat_scroll, 0);
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 8);
    }
}
