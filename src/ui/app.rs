use std::io::stdout;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::config::Config;
use crate::pagination::NavigationState;
use crate::remote::censys::CensysClient;
use crate::remote::{sample, SearchError, SearchParams, SearchResult, VirtualHosts};

use super::draw;

/// How long a fetched result may be reused for identical parameters
/// without going back to the service.
const RESULT_TTL: Duration = Duration::from_secs(60);

/// Page sizes offered by the advanced options, in cycling order.
const PER_PAGE_CHOICES: &[u32] = &[5, 10, 25, 50];

/// Sort orders offered by the advanced options, as (label, wire value).
pub const SORT_CHOICES: &[(&str, Option<&str>)] = &[
    ("Relevance", None),
    ("IP ascending", Some("+ip")),
    ("IP descending", Some("-ip")),
    ("ASN ascending", Some("+autonomous_system.asn")),
    ("ASN descending", Some("-autonomous_system.asn")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Input,
    Results,
}

/// Outcome of a background fetch, tagged with the request id that
/// produced it so superseded responses can be discarded.
struct FetchDone {
    id: u64,
    params: SearchParams,
    outcome: Result<SearchResult, SearchError>,
}

struct CachedResult {
    params: SearchParams,
    result: SearchResult,
    fetched_at: Instant,
}

pub struct App {
    config: Config,
    offline: bool,
    client: CensysClient,
    // Search form
    pub search_input: Input,
    pub focus: PaneFocus,
    // Current submitted parameters (cursor comes from `nav`)
    pub params: SearchParams,
    pub nav: NavigationState,
    // Last completed fetch
    pub result: Option<SearchResult>,
    pub error: Option<SearchError>,
    pub selected: usize,
    // One in-flight request at most; only the latest id is accepted
    in_flight: Option<u64>,
    next_request_id: u64,
    tx: Sender<FetchDone>,
    rx: Receiver<FetchDone>,
    cache: Option<CachedResult>,
    pub status: Option<String>,
    pub help_popup: Option<PopupState>,
}

impl App {
    pub fn new(config: Config, offline: bool) -> Result<Self> {
        let client = CensysClient::new(&config.api_url, config.credentials())?;
        let (tx, rx) = mpsc::channel();

        let params = SearchParams {
            query: config.startup_query.clone(),
            per_page: config.per_page,
            virtual_hosts: config.virtual_hosts,
            sort: config.sort.clone(),
            ..Default::default()
        };

        let mut app = Self {
            search_input: Input::new(params.query.clone()),
            focus: PaneFocus::Input,
            params,
            nav: NavigationState::default(),
            result: None,
            error: None,
            selected: 0,
            in_flight: None,
            next_request_id: 0,
            tx,
            rx,
            cache: None,
            status: None,
            help_popup: None,
            client,
            config,
            offline,
        };

        // Load initial results right away, like the original search form
        // does on first render; skipped when it could only fail.
        if app.offline || app.client.has_credentials() {
            app.request_fetch();
        }
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.pump_fetches();
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Parameters for the request the UI currently wants on screen.
    fn effective_params(&self) -> SearchParams {
        let mut params = self.params.clone();
        params.cursor = self.nav.cursor_param().map(str::to_string);
        params
    }

    fn request_fetch(&mut self) {
        let params = self.effective_params();

        // Recent identical fetch: reuse it instead of hitting the service.
        if let Some(cache) = &self.cache {
            if cache.params == params && cache.fetched_at.elapsed() < RESULT_TTL {
                self.result = Some(cache.result.clone());
                self.error = None;
                self.selected = 0;
                self.set_status("Results from cache");
                return;
            }
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(id);

        let tx = self.tx.clone();
        let offline = self.offline;
        let client = self.client.clone();
        thread::spawn(move || {
            let outcome = if offline {
                Ok(sample::search(&params))
            } else {
                client.search(&params)
            };
            let _ = tx.send(FetchDone { id, params, outcome });
        });
        self.set_status("Searching...");
    }

    /// Drain completed fetches, keeping only the most recently issued
    /// request's outcome; anything older was superseded by the user.
    fn pump_fetches(&mut self) {
        while let Ok(done) = self.rx.try_recv() {
            if Some(done.id) != self.in_flight {
                continue;
            }
            self.in_flight = None;
            match done.outcome {
                Ok(result) => {
                    self.cache = Some(CachedResult {
                        params: done.params,
                        result: result.clone(),
                        fetched_at: Instant::now(),
                    });
                    self.error = None;
                    self.selected = 0;
                    self.set_status(format!(
                        "{} hosts, page {}",
                        result.total,
                        self.nav.page_number()
                    ));
                    self.result = Some(result);
                }
                Err(err) => {
                    self.set_status("Search failed");
                    self.error = Some(err);
                }
            }
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn credentials_configured(&self) -> bool {
        self.client.has_credentials()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Key handling
    // =========================================================================

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.help_popup.is_some() {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::F(1)
            ) {
                self.help_popup = None;
            }
            return Ok(false);
        }

        if matches!(key.code, KeyCode::F(1)) {
            self.help_popup = Some(PopupState::default());
            return Ok(false);
        }

        match self.focus {
            PaneFocus::Input => self.handle_input_key(key),
            PaneFocus::Results => self.handle_results_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => self.submit_search(),
            KeyCode::Esc | KeyCode::Tab | KeyCode::Down => self.focus = PaneFocus::Results,
            _ => {
                self.search_input.handle_event(&Event::Key(key));
            }
        }
        Ok(false)
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') | KeyCode::Char('i') | KeyCode::Tab => {
                self.focus = PaneFocus::Input;
            }
            KeyCode::Char('?') => self.help_popup = Some(PopupState::default()),
            KeyCode::Char('j') | KeyCode::Down => self.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.select_prev(),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => self.next_page(),
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => self.prev_page(),
            KeyCode::Char('g') | KeyCode::Home => self.first_page(),
            KeyCode::Char('v') => self.cycle_virtual_hosts(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.cycle_per_page(1),
            KeyCode::Char('-') => self.cycle_per_page(-1),
            KeyCode::Char('s') => self.cycle_sort(),
            _ => {}
        }
        Ok(false)
    }

    // =========================================================================
    // Search and pagination actions
    // =========================================================================

    fn submit_search(&mut self) {
        let raw = self.search_input.value().trim().to_string();
        if raw.is_empty() {
            self.set_status("Enter a query first");
            return;
        }
        self.params.query = raw;
        self.nav.reset();
        self.focus = PaneFocus::Results;
        self.request_fetch();
    }

    fn next_page(&mut self) {
        if self.is_fetching() {
            self.set_status("A request is already in flight");
            return;
        }
        let next = self
            .result
            .as_ref()
            .and_then(|r| r.links.next_cursor())
            .map(str::to_string);
        if self.nav.advance(next.as_deref()) {
            self.request_fetch();
        } else {
            self.set_status("No more pages");
        }
    }

    fn prev_page(&mut self) {
        if self.is_fetching() {
            self.set_status("A request is already in flight");
            return;
        }
        let prev = self
            .result
            .as_ref()
            .and_then(|r| r.links.prev_cursor())
            .map(str::to_string);
        if self.nav.retreat(prev.as_deref()) {
            self.request_fetch();
        }
    }

    fn first_page(&mut self) {
        self.nav.reset();
        self.request_fetch();
    }

    // =========================================================================
    // Advanced options
    // =========================================================================

    /// Changing an option is a new search: reset pagination and refetch.
    fn cycle_per_page(&mut self, step: isize) {
        let current = PER_PAGE_CHOICES
            .iter()
            .position(|&p| p == self.params.per_page)
            .unwrap_or(1);
        let len = PER_PAGE_CHOICES.len() as isize;
        let next = (current as isize + step).rem_euclid(len) as usize;
        self.params.per_page = PER_PAGE_CHOICES[next];
        self.nav.reset();
        self.request_fetch();
    }

    fn cycle_virtual_hosts(&mut self) {
        self.params.virtual_hosts = match self.params.virtual_hosts {
            None => Some(VirtualHosts::Include),
            Some(VirtualHosts::Include) => Some(VirtualHosts::Only),
            Some(VirtualHosts::Only) => Some(VirtualHosts::Exclude),
            Some(VirtualHosts::Exclude) => None,
        };
        self.nav.reset();
        self.request_fetch();
    }

    fn cycle_sort(&mut self) {
        let current = SORT_CHOICES
            .iter()
            .position(|(_, value)| *value == self.params.sort.as_deref())
            .unwrap_or(0);
        let (_, next) = SORT_CHOICES[(current + 1) % SORT_CHOICES.len()];
        self.params.sort = next.map(str::to_string);
        self.nav.reset();
        self.request_fetch();
    }

    // =========================================================================
    // Selection and status
    // =========================================================================

    fn visible_hits(&self) -> usize {
        self.result.as_ref().map(|r| r.hits.len()).unwrap_or(0)
    }

    fn select_next(&mut self) {
        let count = self.visible_hits();
        if count > 0 && self.selected + 1 < count {
            self.selected += 1;
        }
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_host(&self) -> Option<&crate::remote::Host> {
        self.result.as_ref().and_then(|r| r.hits.get(self.selected))
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Label for the current virtual-hosts setting.
    pub fn virtual_hosts_label(&self) -> &'static str {
        match self.params.virtual_hosts {
            None => "default",
            Some(vh) => vh.as_param(),
        }
    }

    /// Label for the current sort setting.
    pub fn sort_label(&self) -> &'static str {
        SORT_CHOICES
            .iter()
            .find(|(_, value)| *value == self.params.sort.as_deref())
            .map(|(label, _)| *label)
            .unwrap_or("custom")
    }
}
