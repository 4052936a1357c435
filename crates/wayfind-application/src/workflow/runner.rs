//! The single update path.
//!
//! One task owns [`WorkflowState`] and applies commands and client
//! completions strictly one at a time, in arrival order. Client calls are
//! spawned as separate tasks that report back through the same channel, so
//! nothing else ever touches the state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use wayfind_core::config::WorkflowConfig;
use wayfind_core::error::WayfindError;
use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::operation::{OperationKind, Ticket};
use wayfind_core::search::{
    ATTR_MATCH_ADDRESS, ATTR_MATCH_TITLE, FeatureQuery, FeatureSource, GeocodeClient, ResultItem,
    ResultSet, Suggestion,
};

use super::command::{Command, Completion, InputField, Message, SearchRequest};
use super::event::{DisplayEvent, ResultStream, SuggestLookup};
use super::operations::{self, LocationContext, POI_CATEGORY, SearchJob, SuggestJob};
use super::state::WorkflowState;

pub(crate) struct WorkflowRunner {
    state: WorkflowState,
    client: Arc<dyn GeocodeClient>,
    features: Option<Arc<dyn FeatureSource>>,
    config: WorkflowConfig,
    /// Completion path back into this runner
    tx: mpsc::UnboundedSender<Message>,
    events: broadcast::Sender<DisplayEvent>,
    shutdown: CancellationToken,
}

impl WorkflowRunner {
    pub fn new(
        client: Arc<dyn GeocodeClient>,
        features: Option<Arc<dyn FeatureSource>>,
        config: WorkflowConfig,
        tx: mpsc::UnboundedSender<Message>,
        events: broadcast::Sender<DisplayEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state: WorkflowState::new(),
            client,
            features,
            config,
            tx,
            events,
            shutdown,
        }
    }

    /// Runs until the shutdown token fires.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        tracing::info!("[Workflow] Update loop started");

        loop {
            let message = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match message {
                Message::Command(command) => self.apply_command(command),
                Message::Completion(completion) => self.apply_completion(completion),
            }
            self.flush_status_changes();
        }

        tracing::info!("[Workflow] Update loop stopped");
    }

    fn apply_command(&mut self, command: Command) {
        tracing::trace!("[Workflow] Command: {:?}", command);

        match command {
            Command::TextEdited { field, text } => {
                self.dismiss_callout();
                self.state.set_text(field, text);
            }
            Command::TextSettled { field, text } => self.request_suggestions(field, text),
            Command::Submit(request) => self.submit(request),
            Command::SubmitCurrent { restrict_to_extent } => {
                let request = SearchRequest {
                    text: self.state.search_text.clone(),
                    location_text: self.state.location_text.clone(),
                    restrict_to_extent,
                };
                self.submit(request);
            }
            Command::QueryFeatures { text } => self.query_features(text),
            Command::ReverseLookup { point } => self.reverse_lookup(point),
            Command::Select { result_id } => self.select(&result_id),
            Command::Clear => self.clear(),
            Command::Identify { point } => self.identify(point),
            Command::SetVisibleArea(area) => self.state.visible_area = Some(area),
            Command::SetDeviceLocation(point) => self.state.device_location = Some(point),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let ticket = *completion.ticket();
        if !self.state.tracker.is_current(&ticket) {
            self.report_failure(ticket, WayfindError::superseded(ticket.kind.to_string()));
            return;
        }

        match completion {
            Completion::Search { ticket, outcome } => match outcome {
                Ok(results) => self.finish_search(ticket, results),
                Err(e) => self.report_failure(ticket, e),
            },
            Completion::Suggest {
                ticket,
                field,
                text,
                outcome,
            } => match outcome {
                Ok(suggestions) => {
                    let found = suggestions.len();
                    self.show_suggestions(field, suggestions);
                    let lookup = SuggestLookup {
                        text,
                        found,
                        failed: false,
                    };
                    self.state.record_lookup(field, lookup);
                }
                Err(e) => {
                    self.report_failure(ticket, e);
                    let lookup = SuggestLookup {
                        text,
                        found: 0,
                        failed: true,
                    };
                    self.state.record_lookup(field, lookup);
                }
            },
            Completion::FeatureQuery { ticket, outcome } => match outcome {
                Ok(results) => self.finish_feature_query(ticket, results),
                Err(e) => self.report_failure(ticket, e),
            },
            Completion::ReverseLookup {
                ticket,
                point,
                outcome,
            } => match outcome {
                Ok(found) => {
                    let address = found.map(address_of);
                    tracing::info!("[ReverseLookup] {} -> {:?}", point, address);
                    self.emit(DisplayEvent::AddressResolved { point, address });
                }
                Err(e) => self.report_failure(ticket, e),
            },
        }
    }

    // ============================================================================
    // Search
    // ============================================================================

    fn submit(&mut self, request: SearchRequest) {
        self.dismiss_callout();
        self.clear_results(ResultStream::Search);
        self.clear_selection();

        self.state.search_text = request.text.clone();
        self.state.location_text = request.location_text.clone();

        let text = request.text.trim().to_string();
        if text.is_empty() {
            tracing::debug!("[Search] Blank search text, nothing to do");
            self.abandon(OperationKind::Search);
            self.state.search_status.reset();
            return;
        }

        let search_area = if request.restrict_to_extent {
            if self.state.visible_area.is_none() {
                tracing::warn!("[Search] No visible area known, searching without restriction");
            }
            self.state.visible_area
        } else {
            None
        };

        let job = SearchJob {
            text,
            location_text: request.location_text,
            location: self.location_context(),
            search_area,
            max_results: self.config.geocoder.max_results,
            enrich_with_address: self.config.search.enrich_with_address,
        };

        let ticket = self.state.tracker.begin(OperationKind::Search);
        self.state.search_status.begin(ticket);
        tracing::info!("[Search] Starting {} for '{}'", ticket, job.text);

        let client = self.client.clone();
        self.spawn_operation(ticket, async move {
            Completion::Search {
                ticket,
                outcome: operations::run_search(client, job).await,
            }
        });
    }

    fn finish_search(&mut self, ticket: Ticket, results: ResultSet) {
        self.state.search_status.complete(&ticket);
        let results = self.install_results(ResultStream::Search, results);
        self.request_viewpoint(results.extent());
    }

    fn request_suggestions(&mut self, field: InputField, text: String) {
        let kind = field.suggest_kind();
        let text = text.trim().to_string();
        if text.is_empty() {
            self.abandon(kind);
            let suggestions = self.state.suggestions_mut(field);
            if !suggestions.is_empty() {
                suggestions.clear();
                self.emit(DisplayEvent::SuggestionsUpdated {
                    field,
                    labels: Vec::new(),
                });
            }
            self.state.record_lookup(
                field,
                SuggestLookup {
                    text,
                    found: 0,
                    failed: false,
                },
            );
            return;
        }

        let job = match field {
            InputField::Search => SuggestJob {
                text,
                categories: if self.config.search.poi_only_suggestions {
                    vec![POI_CATEGORY.to_string()]
                } else {
                    Vec::new()
                },
                bias_text: Some(self.state.location_text.clone()),
                location: self.location_context(),
                max_results: self.config.geocoder.max_results,
            },
            InputField::Location => SuggestJob {
                text,
                categories: Vec::new(),
                bias_text: None,
                location: self.location_context(),
                max_results: self.config.geocoder.max_results,
            },
        };

        let ticket = self.state.tracker.begin(kind);
        tracing::debug!("[Suggest] Starting {} for '{}'", ticket, job.text);

        let client = self.client.clone();
        self.spawn_operation(ticket, async move {
            let text = job.text.clone();
            Completion::Suggest {
                ticket,
                field,
                outcome: operations::run_suggest(client, job).await,
                text,
            }
        });
    }

    fn show_suggestions(&mut self, field: InputField, suggestions: Vec<Suggestion>) {
        if suggestions.is_empty() {
            tracing::debug!("[Suggest] No suggestions for {:?}, keeping previous list", field);
            return;
        }

        let mut labels: Vec<String> = suggestions.into_iter().map(|s| s.label).collect();
        if field == InputField::Location {
            labels.insert(0, self.config.search.current_location_label.clone());
        }

        *self.state.suggestions_mut(field) = labels.clone();
        self.emit(DisplayEvent::SuggestionsUpdated { field, labels });
    }

    fn reverse_lookup(&mut self, point: Point) {
        let ticket = self.state.tracker.begin(OperationKind::ReverseLookup);
        tracing::debug!("[ReverseLookup] Starting {} at {}", ticket, point);

        let client = self.client.clone();
        self.spawn_operation(ticket, async move {
            let outcome = client.reverse_lookup(&point).await;
            Completion::ReverseLookup {
                ticket,
                point,
                outcome,
            }
        });
    }

    // ============================================================================
    // Feature query
    // ============================================================================

    fn query_features(&mut self, text: String) {
        self.dismiss_callout();
        self.clear_selection();
        self.clear_results(ResultStream::Features);

        let Some(source) = self.features.clone() else {
            tracing::warn!("[FeatureQuery] No feature source configured");
            self.emit(DisplayEvent::Error {
                operation: OperationKind::FeatureQuery.to_string(),
                message: WayfindError::config("no feature source configured").to_string(),
            });
            return;
        };

        let query = FeatureQuery::new(self.config.feature_query.field.clone(), &text);
        let ticket = self.state.tracker.begin(OperationKind::FeatureQuery);
        self.state.feature_status.begin(ticket);
        tracing::info!("[FeatureQuery] Starting {}: {}", ticket, query.where_clause());

        self.spawn_operation(ticket, async move {
            Completion::FeatureQuery {
                ticket,
                outcome: operations::run_feature_query(source, query).await,
            }
        });
    }

    fn finish_feature_query(&mut self, ticket: Ticket, results: ResultSet) {
        self.state.feature_status.complete(&ticket);
        let results = self.install_results(ResultStream::Features, results);

        if self.state.selection.select_all(results.items()) > 0 {
            self.emit_selection();
            self.request_viewpoint(self.state.selection.bounding_extent());
        }
    }

    // ============================================================================
    // Selection and callouts
    // ============================================================================

    fn select(&mut self, result_id: &str) {
        match self.state.find_result(result_id) {
            Some(result) => {
                if self.state.selection.select(result) {
                    self.emit_selection();
                }
            }
            None => {
                let error = WayfindError::not_found("result", result_id);
                tracing::warn!("[Selection] {}", error);
                self.emit(DisplayEvent::Error {
                    operation: "select".to_string(),
                    message: error.to_string(),
                });
            }
        }
    }

    fn clear(&mut self) {
        self.dismiss_callout();
        for kind in [
            OperationKind::Search,
            OperationKind::FeatureQuery,
            OperationKind::ReverseLookup,
        ] {
            self.abandon(kind);
        }
        self.state.search_status.reset();
        self.state.feature_status.reset();

        self.clear_results(ResultStream::Search);
        self.clear_results(ResultStream::Features);
        self.clear_selection();
    }

    fn identify(&mut self, point: Point) {
        let tolerance = self.config.search.identify_tolerance;
        let Some(result) = self.state.identify(&point, tolerance) else {
            self.dismiss_callout();
            return;
        };

        let title = result
            .attribute_str(ATTR_MATCH_TITLE)
            .unwrap_or(result.label.as_str())
            .to_string();
        let detail = result.attribute_str(ATTR_MATCH_ADDRESS).map(str::to_string);
        let location = result.location().unwrap_or(point);

        self.state.callout_open = true;
        self.emit(DisplayEvent::CalloutShown {
            title,
            detail,
            location,
        });
    }

    fn dismiss_callout(&mut self) {
        if std::mem::take(&mut self.state.callout_open) {
            self.emit(DisplayEvent::CalloutDismissed);
        }
    }

    fn clear_selection(&mut self) {
        if !self.state.selection.is_empty() {
            self.state.selection.clear();
            self.emit_selection();
        }
    }

    fn emit_selection(&self) {
        self.emit(DisplayEvent::SelectionChanged {
            count: self.state.selection.len(),
            extent: self.state.selection.bounding_extent(),
        });
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Installs `results` as the live set of `stream`. An empty set is still
    /// installed and additionally reported as no matches.
    fn install_results(&mut self, stream: ResultStream, results: ResultSet) -> Arc<ResultSet> {
        let results = Arc::new(results);
        *self.state.results_mut(stream) = Some(results.clone());

        self.emit(DisplayEvent::ResultsReplaced {
            stream,
            results: results.clone(),
        });
        if results.is_empty() {
            tracing::info!("[Workflow] No matches for '{}'", results.query().text());
            self.emit(DisplayEvent::NoMatches {
                stream,
                query: results.query().text().to_string(),
            });
        }
        results
    }

    fn clear_results(&mut self, stream: ResultStream) {
        if self.state.results_mut(stream).take().is_some() {
            self.emit(DisplayEvent::ResultsCleared { stream });
        }
    }

    fn request_viewpoint(&self, extent: Option<Envelope>) {
        if let Some(extent) = extent {
            let padded = extent.expand_by_ratio(
                self.config.search.viewpoint_padding,
                self.config.search.min_viewpoint_size,
            );
            self.emit(DisplayEvent::ViewpointRequested(padded));
        }
    }

    fn report_failure(&mut self, ticket: Ticket, error: WayfindError) {
        if !error.is_user_visible() {
            tracing::debug!("[Workflow] Discarding stale completion {}: {}", ticket, error);
            return;
        }

        tracing::error!("[Workflow] {} failed: {}", ticket, error);
        match ticket.kind {
            OperationKind::Search => {
                self.state.search_status.fail(&ticket, error.to_string());
            }
            OperationKind::FeatureQuery => {
                self.state.feature_status.fail(&ticket, error.to_string());
            }
            OperationKind::SearchSuggest
            | OperationKind::LocationSuggest
            | OperationKind::ReverseLookup => {}
        }

        self.emit(DisplayEvent::Error {
            operation: ticket.kind.to_string(),
            message: error.to_string(),
        });
    }

    /// Makes whatever is in flight for `kind` stale without starting anything.
    fn abandon(&mut self, kind: OperationKind) {
        self.state.tracker.invalidate(kind);
    }

    /// Runs `operation` off the update path and routes its completion back.
    ///
    /// A superseded operation keeps running; its completion is dropped on
    /// arrival. Only shutdown cancels it.
    fn spawn_operation<F>(&self, ticket: Ticket, operation: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("[Workflow] {} cancelled", ticket);
                }
                completion = operation => {
                    let _ = tx.send(Message::Completion(completion));
                }
            }
        });
    }

    fn location_context(&self) -> LocationContext {
        LocationContext::new(&self.config.search, self.state.device_location)
    }

    fn flush_status_changes(&mut self) {
        for change in self.state.drain_status_changes() {
            self.emit(DisplayEvent::StatusChanged(change));
        }
    }

    fn emit(&self, event: DisplayEvent) {
        // No subscribers is fine; the display may not be attached yet
        let _ = self.events.send(event);
    }
}

fn address_of(found: ResultItem) -> String {
    found
        .attribute_str(ATTR_MATCH_ADDRESS)
        .map(str::to_string)
        .unwrap_or(found.label)
}
