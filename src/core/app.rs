//! Main application loop

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::core::events::{Event, EventHandler, EventResult, KeyBindings};
use crate::core::session::SessionConfig;
use crate::core::state::{AppState, NotificationLevel};
use crate::facts;
use crate::integrations::ports::PortProbe;
use crate::integrations::runtime::ContainerRuntime;
use crate::ui::renderer::Renderer;
use crate::update::{BatchReport, Dispatcher};

/// Spinner animation and notification expiry
const TICK_RATE: Duration = Duration::from_millis(100);

pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: AppState,
    session: SessionConfig,
    runtime: Arc<dyn ContainerRuntime>,
    dispatcher: Dispatcher,
    event_tx: mpsc::UnboundedSender<Event>,
}

impl App {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        probe: Arc<dyn PortProbe>,
        config: &Config,
    ) -> Result<Self> {
        let backend = CrosstermBackend::new(std::io::stdout());
        let terminal = Terminal::new(backend)?;

        let session = SessionConfig::from_display(&config.display);
        let dispatcher = Dispatcher::new(Arc::clone(&runtime), probe, config.update.clone());

        // Replaced in run() once the event sources exist
        let (event_tx, _) = mpsc::unbounded_channel::<Event>();

        Ok(Self {
            terminal,
            state: AppState::new(),
            session,
            runtime,
            dispatcher,
            event_tx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        // A failed first listing is shown in the table, not fatal
        let inventory = self.runtime.list_containers().await;
        self.state.apply_fetch(inventory);

        self.setup_terminal()?;

        let (mut event_handler, event_tx) = EventHandler::new();
        self.event_tx = event_tx.clone();
        EventHandler::spawn_sources(event_tx, TICK_RATE);

        let result = match self.render() {
            Ok(()) => self.event_loop(&mut event_handler).await,
            Err(e) => Err(e),
        };

        self.shutdown()?;
        result
    }

    fn setup_terminal(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::cursor::Hide,
        )?;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show,
        )?;
        Ok(())
    }

    async fn event_loop(&mut self, event_handler: &mut EventHandler) -> Result<()> {
        loop {
            let Some(event) = event_handler.next().await else {
                break;
            };

            match self.handle_event(event).await? {
                EventResult::Continue => {}
                EventResult::Quit => break,
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) -> Result<EventResult> {
        let result = match event {
            Event::Key(key) => self.handle_key(key).await,
            Event::Resize(w, h) => {
                self.state.terminal_size = (w, h);
                EventResult::Continue
            }
            Event::Tick => {
                self.state.tick();
                EventResult::Continue
            }
            Event::UpdateProgress { name, stage } => {
                self.state.record_progress(name, stage);
                EventResult::Continue
            }
            Event::BatchCompleted(report) => {
                self.complete_batch(report).await;
                EventResult::Continue
            }
        };

        if result == EventResult::Continue {
            self.render()?;
        }
        Ok(result)
    }

    async fn handle_key(&mut self, key: KeyEvent) -> EventResult {
        if KeyBindings::quit_alt().matches(&key) {
            if self.state.is_running() {
                tracing::warn!("quitting with an update batch still running");
            }
            return EventResult::Quit;
        }

        if KeyBindings::quit().matches(&key) {
            if self.state.is_running() {
                self.state.add_notification(
                    "Update in progress, press ctrl+c to quit anyway".to_string(),
                    NotificationLevel::Warning,
                );
                return EventResult::Continue;
            }
            return EventResult::Quit;
        }

        // Navigation stays available while a batch runs
        if KeyBindings::up().matches(&key) || KeyBindings::vim_up().matches(&key) {
            self.state.move_up();
            return EventResult::Continue;
        }

        if KeyBindings::down().matches(&key) || KeyBindings::vim_down().matches(&key) {
            self.state.move_down();
            return EventResult::Continue;
        }

        if KeyBindings::toggle().matches(&key) || KeyBindings::toggle_alt().matches(&key) {
            self.state.toggle_selected();
            return EventResult::Continue;
        }

        if KeyBindings::update().matches(&key) {
            if let Some(batch) = self.state.begin_batch() {
                self.dispatcher.spawn(batch, self.event_tx.clone());
            }
            return EventResult::Continue;
        }

        if KeyBindings::reload().matches(&key) && self.state.can_reload() {
            let inventory = self.runtime.list_containers().await;
            self.state.apply_reload(inventory);
        }

        EventResult::Continue
    }

    async fn complete_batch(&mut self, report: BatchReport) {
        for entry in &report.entries {
            tracing::info!("{}", entry.describe());
        }

        let refetch = self.runtime.list_containers().await;
        let fact = self
            .session
            .show_facts
            .then(facts::random_fact)
            .flatten()
            .map(str::to_string);

        self.state.finish_batch(report, refetch, fact);
    }

    fn render(&mut self) -> Result<()> {
        let state = &self.state;
        let session = &self.session;
        self.terminal.draw(|frame| {
            Renderer::render(frame, state, session);
        })?;
        Ok(())
    }
}
