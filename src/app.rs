use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::feed::{Command, DashboardState, FeedEvent, FeedHandle};
use crate::model::{DashboardData, Strategy, Transaction};
use crate::notifications::{self, NotificationKind, NotificationQueue};
use crate::storage::{LocalStore, Persisted};
use crate::timing::{Debounced, Interval};

/// How long a status line message stays up
const STATUS_MESSAGE_SECS: u64 = 3;

/// Cache keys
const KEY_ACTIVE_TAB: &str = "sentinel.activeTab";
const KEY_SIDEBAR_COLLAPSED: &str = "sentinel.sidebarCollapsed";
const KEY_CHAIN_FILTER: &str = "sentinel.chainFilter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Overview,
    Portfolio,
    Strategies,
    Transactions,
    Analytics,
    MultiChain,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Overview,
        Tab::Portfolio,
        Tab::Strategies,
        Tab::Transactions,
        Tab::Analytics,
        Tab::MultiChain,
        Tab::Settings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Portfolio => "Portfolio",
            Tab::Strategies => "Strategies",
            Tab::Transactions => "Transactions",
            Tab::Analytics => "Analytics",
            Tab::MultiChain => "Multi-Chain",
            Tab::Settings => "Settings",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tab::Overview => "Portfolio and performance overview",
            Tab::Portfolio => "Multi-chain asset tracking",
            Tab::Strategies => "Trading automation and DCA",
            Tab::Transactions => "Transaction history and status",
            Tab::Analytics => "Performance metrics and insights",
            Tab::MultiChain => "Cross-chain operations",
            Tab::Settings => "Configuration and preferences",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Tab::Overview => "󰄨",
            Tab::Portfolio => "󰖄",
            Tab::Strategies => "󰚩",
            Tab::Transactions => "󰯎",
            Tab::Analytics => "󰄫",
            Tab::MultiChain => "󰖟",
            Tab::Settings => "󰒓",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Results coming back from spawned HTTP requests
#[derive(Debug)]
pub enum ApiEvent {
    Dashboard(Result<DashboardData, String>),
}

pub struct App {
    pub config: AppConfig,
    pub popup: Popup,

    // Persisted view preferences
    pub tab: Persisted<Tab>,
    pub sidebar_collapsed: Persisted<bool>,
    pub chain_filter: Persisted<Option<String>>,

    // Dashboard snapshot and connection state
    pub state: DashboardState,
    pub connected: bool,
    pub connection_error: Option<String>,
    pub offline: bool,

    // Per-view state
    pub selected_strategy: usize,
    pub tx_scroll: usize,
    pub searching: bool,
    pub search: Debounced<String>,
    pub export_dir: PathBuf,

    pub notifications: NotificationQueue,

    // Status message (shown in top bar, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub spinner_frame: usize,
    pub refreshing: bool,

    feed: Option<FeedHandle>,
    feed_events: Option<mpsc::UnboundedReceiver<FeedEvent>>,
    api: Option<ApiClient>,
    api_tx: mpsc::UnboundedSender<ApiEvent>,
    api_rx: mpsc::UnboundedReceiver<ApiEvent>,
    refresh_interval: Interval,
}

impl App {
    pub fn new(config: AppConfig, store: &LocalStore, initial: Option<DashboardData>) -> Self {
        let now = Instant::now();
        let (api_tx, api_rx) = mpsc::unbounded_channel();
        let export_dir = store
            .path()
            .and_then(|p| p.parent())
            .map(|p| p.join("exports"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            popup: Popup::None,

            tab: Persisted::load(store, KEY_ACTIVE_TAB, Tab::Overview),
            sidebar_collapsed: Persisted::load(store, KEY_SIDEBAR_COLLAPSED, false),
            chain_filter: Persisted::load(store, KEY_CHAIN_FILTER, None),

            offline: initial.is_some(),
            state: DashboardState::new(initial),
            connected: false,
            connection_error: None,

            selected_strategy: 0,
            tx_scroll: 0,
            searching: false,
            search: Debounced::new(String::new(), config.search_debounce()),
            export_dir,

            notifications: NotificationQueue::new(),

            status_message: None,
            status_message_time: None,

            spinner_frame: 0,
            refreshing: false,

            feed: None,
            feed_events: None,
            api: None,
            api_tx,
            api_rx,
            refresh_interval: Interval::new(config.refresh_interval(), now),

            config,
        }
    }

    /// Attach a running feed; the app drains its events on every tick
    pub fn with_feed(mut self, handle: FeedHandle, events: mpsc::UnboundedReceiver<FeedEvent>) -> Self {
        self.offline = false;
        self.feed = Some(handle);
        self.feed_events = Some(events);
        self
    }

    pub fn with_api(mut self, api: ApiClient) -> Self {
        self.api = Some(api);
        self
    }

    /// Stop the feed task, closing the socket
    pub async fn shutdown(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.shutdown().await;
        }
    }

    pub fn data(&self) -> Option<&DashboardData> {
        self.state.data()
    }

    pub fn active_tab(&self) -> Tab {
        *self.tab.get()
    }

    /// `q` quits only when no popup or text input has the keyboard
    pub fn accepts_quit(&self) -> bool {
        self.popup == Popup::None && !self.searching
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    fn notify(&mut self, kind: NotificationKind, title: &str, message: impl Into<String>) {
        let message = message.into();
        if self.config.desktop_notifications && kind == NotificationKind::Error {
            if let Err(e) = notifications::send_desktop(title, &message) {
                tracing::debug!("Desktop notification failed: {}", e);
            }
        }
        self.notifications.push(kind, title, message);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        if self.searching {
            self.handle_search_key(key);
            return Ok(());
        }

        self.handle_normal_key(key)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            // Navigation between views
            KeyCode::Tab => self.select_tab(self.active_tab().next()),
            KeyCode::BackTab => self.select_tab(self.active_tab().prev()),
            KeyCode::Char(c @ '1'..='7') => {
                let idx = c as usize - '1' as usize;
                self.select_tab(Tab::ALL[idx]);
            }

            // Vertical navigation inside a view
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Sidebar collapse
            KeyCode::Char('[') => self.sidebar_collapsed.update(|c| !c),

            KeyCode::Char('r') if key.modifiers.is_empty() => self.request_refresh(),

            // Strategy controls
            KeyCode::Char('p') | KeyCode::Char(' ') | KeyCode::Enter => {
                if self.active_tab() == Tab::Strategies {
                    self.toggle_selected_strategy();
                }
            }

            // Transaction list controls
            KeyCode::Char('f') => {
                if self.active_tab() == Tab::Transactions {
                    self.cycle_chain_filter();
                }
            }
            KeyCode::Char('/') => {
                if self.active_tab() == Tab::Transactions {
                    self.searching = true;
                }
            }
            KeyCode::Char('e') => {
                if self.active_tab() == Tab::Transactions {
                    match self.export_transactions() {
                        Ok(path) => self.notify(
                            NotificationKind::Success,
                            "Export complete",
                            format!("Saved to {}", path.display()),
                        ),
                        Err(e) => self.notify(NotificationKind::Error, "Export failed", e.to_string()),
                    }
                }
            }

            // Notifications
            KeyCode::Char('x') => {
                let newest = self.notifications.iter().next().map(|n| n.id);
                if let Some(id) = newest {
                    self.notifications.remove(id);
                }
            }
            KeyCode::Char('c') => self.notifications.clear(),

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                }
            }
            Popup::None => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match key.code {
            KeyCode::Esc => {
                self.searching = false;
                self.search.set(String::new(), now);
            }
            KeyCode::Enter => self.searching = false,
            KeyCode::Backspace => {
                let mut query = self.search.current().clone();
                query.pop();
                self.search.set(query, now);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let mut query = self.search.current().clone();
                query.push(c);
                self.search.set(query, now);
            }
            _ => {}
        }
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if self.active_tab() != tab {
            self.tab.set(tab);
            self.tx_scroll = 0;
        }
    }

    fn move_down(&mut self) {
        match self.active_tab() {
            Tab::Strategies => {
                let len = self.data().map(|d| d.strategies.len()).unwrap_or(0);
                if len > 0 {
                    self.selected_strategy = (self.selected_strategy + 1) % len;
                }
            }
            Tab::Transactions => {
                let len = self.filtered_transactions().len();
                if self.tx_scroll + 1 < len {
                    self.tx_scroll += 1;
                }
            }
            _ => {}
        }
    }

    fn move_up(&mut self) {
        match self.active_tab() {
            Tab::Strategies => {
                let len = self.data().map(|d| d.strategies.len()).unwrap_or(0);
                if len > 0 {
                    self.selected_strategy = self.selected_strategy.checked_sub(1).unwrap_or(len - 1);
                }
            }
            Tab::Transactions => self.tx_scroll = self.tx_scroll.saturating_sub(1),
            _ => {}
        }
    }

    pub fn selected_strategy(&self) -> Option<&Strategy> {
        self.data()?.strategies.get(self.selected_strategy)
    }

    /// Ask the server to pause an active strategy or resume a paused one
    fn toggle_selected_strategy(&mut self) {
        let Some(strategy) = self.selected_strategy() else {
            return;
        };
        let (command, verb) = if strategy.is_paused() {
            (Command::ResumeStrategy(strategy.id), "Resume")
        } else {
            (Command::PauseStrategy(strategy.id), "Pause")
        };
        let name = strategy.name.clone();

        let sent = self.feed.as_ref().map(|f| f.send_command(command)).unwrap_or(false);
        if sent {
            tracing::info!("{} requested for strategy {}", verb, name);
            self.set_status(format!("{} requested: {}", verb, name));
        } else {
            self.set_status("Not connected, command dropped");
        }
    }

    /// Chains present in the transaction list, in first-seen order
    pub fn chain_options(&self) -> Vec<String> {
        let mut chains: Vec<String> = Vec::new();
        if let Some(data) = self.data() {
            for tx in &data.transactions {
                if !tx.chain.is_empty() && !chains.contains(&tx.chain) {
                    chains.push(tx.chain.clone());
                }
            }
        }
        chains
    }

    /// All Chains -> each chain -> All Chains
    fn cycle_chain_filter(&mut self) {
        let options = self.chain_options();
        let next = match self.chain_filter.get() {
            None => options.first().cloned(),
            Some(current) => options
                .iter()
                .position(|c| c == current)
                .and_then(|i| options.get(i + 1))
                .cloned(),
        };
        self.chain_filter.set(next);
        self.tx_scroll = 0;
    }

    /// Transactions after the chain filter and the settled search query
    pub fn filtered_transactions(&self) -> Vec<&Transaction> {
        let Some(data) = self.data() else {
            return Vec::new();
        };
        let chain = self.chain_filter.get().as_deref();
        let query = self.search.settled();
        data.transactions
            .iter()
            .filter(|tx| chain.map(|c| tx.chain == c).unwrap_or(true))
            .filter(|tx| tx.matches(query))
            .collect()
    }

    /// Write the filtered transactions as JSON into the export directory
    pub fn export_transactions(&self) -> Result<PathBuf> {
        let transactions = self.filtered_transactions();
        std::fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("Could not create {}", self.export_dir.display()))?;

        let filename = format!("transactions-{}.json", chrono::Utc::now().format("%Y%m%d-%H%M%S"));
        let path = self.export_dir.join(filename);
        let content = serde_json::to_string_pretty(&transactions)?;
        std::fs::write(&path, content).with_context(|| format!("Could not write {}", path.display()))?;

        tracing::info!("Exported {} transactions to {}", transactions.len(), path.display());
        Ok(path)
    }

    /// Re-request state over the socket and the REST API
    pub fn request_refresh(&mut self) {
        if self.offline {
            self.set_status("Offline mode, nothing to refresh");
            return;
        }

        if let Some(feed) = &self.feed {
            for command in [Command::GetPortfolio, Command::GetStrategies, Command::GetTransactions] {
                feed.send_command(command);
            }
        }

        if let Some(api) = self.api.clone() {
            let tx = self.api_tx.clone();
            self.refreshing = true;
            tokio::spawn(async move {
                let result = api.dashboard().await.map_err(|e| e.to_string());
                let _ = tx.send(ApiEvent::Dashboard(result));
            });
        }
        self.set_status("Refreshing...");
    }

    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => {
                self.connected = true;
                self.connection_error = None;
                self.notify(NotificationKind::Success, "Connected", "Live feed connected");
            }
            FeedEvent::Disconnected => {
                if self.connected {
                    let delay = self.config.reconnect_delay().as_secs_f32();
                    self.notify(
                        NotificationKind::Warning,
                        "Disconnected",
                        format!("Reconnecting in {:.0}s", delay),
                    );
                }
                self.connected = false;
            }
            FeedEvent::Error(message) => {
                // Only surface a new error, the retry loop repeats the same one
                if self.connection_error.as_deref() != Some(message.as_str()) {
                    self.notify(NotificationKind::Error, "Connection error", message.clone());
                }
                self.connection_error = Some(message);
            }
            FeedEvent::Message(message) => {
                if self.state.apply(message) {
                    self.clamp_selection();
                }
            }
        }
    }

    fn handle_api_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Dashboard(Ok(data)) => {
                self.state.replace(data);
                self.clamp_selection();
            }
            ApiEvent::Dashboard(Err(message)) => {
                self.notify(NotificationKind::Error, "Refresh failed", message);
            }
        }
        self.refreshing = self.api.as_ref().map(|a| a.loading()).unwrap_or(false);
    }

    fn clamp_selection(&mut self) {
        let strategies = self.data().map(|d| d.strategies.len()).unwrap_or(0);
        if self.selected_strategy >= strategies {
            self.selected_strategy = strategies.saturating_sub(1);
        }
        let transactions = self.filtered_transactions().len();
        if self.tx_scroll >= transactions {
            self.tx_scroll = transactions.saturating_sub(1);
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();

        // Drain everything the background tasks produced since the last frame
        let mut feed_events = Vec::new();
        if let Some(rx) = self.feed_events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                feed_events.push(event);
            }
        }
        for event in feed_events {
            self.handle_feed_event(event);
        }
        while let Ok(event) = self.api_rx.try_recv() {
            self.handle_api_event(event);
        }

        if self.search.poll(now) {
            self.tx_scroll = 0;
        }

        if self.refresh_interval.due(now) && self.api.is_some() && !self.offline {
            tracing::debug!("Periodic dashboard refresh");
            self.request_refresh();
        }

        self.notifications.prune(now);

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed() >= Duration::from_secs(STATUS_MESSAGE_SECS) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    /// Counts for the sidebar footer: (chains monitored, active strategies)
    pub fn agent_summary(&self) -> (usize, usize) {
        match self.data() {
            Some(data) => {
                let chains = if data.chains.is_empty() {
                    data.portfolio.distribution.len()
                } else {
                    data.chains.len()
                };
                let active = data.strategies.iter().filter(|s| s.is_active()).count();
                (chains, active)
            }
            None => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::socket::{Connector, SessionEnd, SessionIo};
    use crate::feed::{Envelope, FeedError, FeedMessage};
    use crate::model::mock;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_config() -> AppConfig {
        AppConfig {
            search_debounce_ms: 0,
            refresh_interval_secs: 0,
            ..Default::default()
        }
    }

    fn offline_app() -> App {
        App::new(test_config(), &LocalStore::in_memory(), Some(mock::dashboard()))
    }

    #[test]
    fn test_tab_cycling_and_number_keys() {
        let mut app = offline_app();
        assert_eq!(app.active_tab(), Tab::Overview);

        app.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.active_tab(), Tab::Portfolio);

        app.handle_key(key(KeyCode::BackTab)).unwrap();
        app.handle_key(key(KeyCode::BackTab)).unwrap();
        assert_eq!(app.active_tab(), Tab::Settings);

        app.handle_key(key(KeyCode::Char('4'))).unwrap();
        assert_eq!(app.active_tab(), Tab::Transactions);
    }

    #[test]
    fn test_view_preferences_persist() {
        let store = LocalStore::in_memory();
        {
            let mut app = App::new(test_config(), &store, Some(mock::dashboard()));
            app.handle_key(key(KeyCode::Char('3'))).unwrap();
            app.handle_key(key(KeyCode::Char('['))).unwrap();
        }

        let app = App::new(test_config(), &store, None);
        assert_eq!(app.active_tab(), Tab::Strategies);
        assert!(*app.sidebar_collapsed.get());
    }

    #[test]
    fn test_feed_events_update_state() {
        let mut app = App::new(test_config(), &LocalStore::in_memory(), None);
        assert!(!app.state.is_loaded());

        app.handle_feed_event(FeedEvent::Connected);
        assert!(app.connected);

        let snapshot = mock::dashboard();
        app.handle_feed_event(FeedEvent::Message(FeedMessage::InitialData(snapshot.clone())));
        assert_eq!(app.data(), Some(&snapshot));

        app.handle_feed_event(FeedEvent::Message(FeedMessage::StrategiesUpdate(Vec::new())));
        assert!(app.data().unwrap().strategies.is_empty());
        assert_eq!(app.data().unwrap().portfolio, snapshot.portfolio);
    }

    #[test]
    fn test_repeated_connection_errors_notify_once() {
        let mut app = App::new(test_config(), &LocalStore::in_memory(), None);
        for _ in 0..5 {
            app.handle_feed_event(FeedEvent::Error("connection refused".to_string()));
            app.handle_feed_event(FeedEvent::Disconnected);
        }
        assert_eq!(app.notifications.len(), 1);
        assert_eq!(app.connection_error.as_deref(), Some("connection refused"));

        app.handle_feed_event(FeedEvent::Connected);
        assert_eq!(app.connection_error, None);
        app.handle_feed_event(FeedEvent::Disconnected);
        let kinds: Vec<NotificationKind> = app.notifications.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NotificationKind::Warning, NotificationKind::Success, NotificationKind::Error]
        );
    }

    #[test]
    fn test_strategy_selection_wraps() {
        let mut app = offline_app();
        app.select_tab(Tab::Strategies);

        app.handle_key(key(KeyCode::Up)).unwrap();
        assert_eq!(app.selected_strategy, 2);
        app.handle_key(key(KeyCode::Down)).unwrap();
        assert_eq!(app.selected_strategy, 0);
    }

    #[test]
    fn test_toggle_without_feed_is_dropped() {
        let mut app = offline_app();
        app.select_tab(Tab::Strategies);
        app.handle_key(key(KeyCode::Char('p'))).unwrap();
        assert_eq!(app.status_message.as_deref(), Some("Not connected, command dropped"));
    }

    #[test]
    fn test_chain_filter_cycles_through_chains() {
        let mut app = offline_app();
        app.select_tab(Tab::Transactions);
        assert_eq!(app.filtered_transactions().len(), 3);

        app.handle_key(key(KeyCode::Char('f'))).unwrap();
        assert_eq!(app.chain_filter.get().as_deref(), Some("X Layer"));
        assert_eq!(app.filtered_transactions().len(), 2);

        app.handle_key(key(KeyCode::Char('f'))).unwrap();
        assert_eq!(app.chain_filter.get().as_deref(), Some("Polygon"));
        assert_eq!(app.filtered_transactions().len(), 1);

        app.handle_key(key(KeyCode::Char('f'))).unwrap();
        assert_eq!(app.chain_filter.get(), &None);
    }

    #[test]
    fn test_search_input_captures_keys() {
        let mut app = offline_app();
        app.select_tab(Tab::Transactions);

        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        assert!(app.searching);
        assert!(!app.accepts_quit());
        for c in "grid".chars() {
            app.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        app.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.active_tab(), Tab::Transactions);
        app.handle_key(key(KeyCode::Enter)).unwrap();

        app.tick();
        let kinds: Vec<&str> = app.filtered_transactions().iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Grid Order"]);

        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        app.handle_key(key(KeyCode::Esc)).unwrap();
        app.tick();
        assert_eq!(app.filtered_transactions().len(), 3);
    }

    #[test]
    fn test_export_writes_filtered_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app();
        app.export_dir = dir.path().join("exports");
        app.select_tab(Tab::Transactions);
        app.handle_key(key(KeyCode::Char('f'))).unwrap();

        let path = app.export_transactions().unwrap();
        let written: Vec<Transaction> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|t| t.chain == "X Layer"));
    }

    #[test]
    fn test_help_popup_blocks_quit() {
        let mut app = offline_app();
        app.handle_key(key(KeyCode::Char('?'))).unwrap();
        assert_eq!(app.popup, Popup::Help);
        assert!(!app.accepts_quit());
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(app.accepts_quit());
    }

    #[test]
    fn test_agent_summary() {
        let app = offline_app();
        assert_eq!(app.agent_summary(), (3, 2));
    }

    /// Connector that stays open and records everything sent to it
    #[derive(Clone, Default)]
    struct RecordingConnector {
        sent: Arc<Mutex<Vec<Envelope>>>,
    }

    #[async_trait]
    impl Connector for RecordingConnector {
        async fn run_session(&self, _url: &str, mut io: SessionIo<'_>) -> Result<SessionEnd, FeedError> {
            io.opened();
            loop {
                tokio::select! {
                    _ = io.shutdown.changed() => return Ok(SessionEnd::Shutdown),
                    Some(envelope) = io.outbound.recv() => self.sent.lock().unwrap().push(envelope),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_pause_and_resume_go_out_over_feed() {
        let connector = RecordingConnector::default();
        let sent = connector.sent.clone();
        let (handle, events) = FeedHandle::spawn_with(connector, "ws://test", Duration::from_millis(10));

        let mut app = App::new(test_config(), &LocalStore::in_memory(), Some(mock::dashboard()))
            .with_feed(handle, events);
        for _ in 0..200 {
            app.tick();
            if app.connected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(app.connected);

        app.select_tab(Tab::Strategies);
        app.handle_key(key(KeyCode::Char('p'))).unwrap(); // strategy 1 is active
        app.handle_key(key(KeyCode::Char('j'))).unwrap();
        app.handle_key(key(KeyCode::Char('j'))).unwrap();
        app.handle_key(key(KeyCode::Char('p'))).unwrap(); // strategy 3 is paused

        for _ in 0..200 {
            if sent.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let sent = sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![Command::PauseStrategy(1).envelope(), Command::ResumeStrategy(3).envelope()]
        );

        app.shutdown().await;
    }
}
